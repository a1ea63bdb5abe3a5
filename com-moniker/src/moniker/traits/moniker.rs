use core::ffi::c_void;

use windows::Win32::Foundation::{FALSE, FILETIME, TRUE};
use windows::Win32::System::Com::IMoniker;
use windows::core::{GUID, IUnknown, Interface};

use crate::bind_ctx::BindContext;
use crate::com_utils::{
    LocalWideString, RemoteString, raw_or_null, require_interface, take_interface,
    take_interface_checked,
};
use crate::errors::MonikerResult;
use crate::iterator::MonikerIterator;
use crate::moniker::{Moniker, ParsedName, moniker_from_raw};
use crate::status::{check, check_accepting, check_bool};
use crate::typedefs::{FileTime, MonikerHash, MonikerKind, ReduceDepth, codes};

fn raw_moniker(moniker: Option<&Moniker>) -> *mut c_void {
    raw_or_null(moniker.map(Moniker::as_interface))
}

/// Moniker functionality (`IMoniker`).
///
/// Each method forwards to exactly one vtable slot and translates the
/// returned status. Methods whose contract defines `S_FALSE` as a negative
/// answer return `bool`; everything else treats non-`S_OK` codes as errors
/// unless noted.
pub trait MonikerTrait {
    fn interface(&self) -> MonikerResult<&IMoniker>;

    /// Binds to the object the moniker names.
    ///
    /// # Arguments
    /// * `bind_ctx` - Bind context for this operation
    /// * `to_left` - Moniker to the left of this one in a composite, if any
    /// * `iid` - Interface requested from the bound object
    ///
    /// # Returns
    /// The object, as the requested interface viewed through `IUnknown`
    fn bind_to_object(
        &self,
        bind_ctx: &BindContext,
        to_left: Option<&Moniker>,
        iid: &GUID,
    ) -> MonikerResult<IUnknown> {
        let this = self.interface()?;
        let mut result = core::ptr::null_mut();
        // SAFETY: all interface pointers are live or null; `iid` and
        // `result` outlive the call. On success the callee hands us an
        // owned reference.
        let hr = unsafe {
            (this.vtable().BindToObject)(
                this.as_raw(),
                bind_ctx.as_raw(),
                raw_moniker(to_left),
                iid,
                &mut result,
            )
        };
        // SAFETY: null or an owned reference written by the callee.
        unsafe { require_interface(result, check(hr), "BindToObject") }
    }

    /// Typed variant of [`bind_to_object`](MonikerTrait::bind_to_object).
    fn bind_to_object_as<T: Interface>(
        &self,
        bind_ctx: &BindContext,
        to_left: Option<&Moniker>,
    ) -> MonikerResult<T>
    where
        Self: Sized,
    {
        let this = self.interface()?;
        let mut result = core::ptr::null_mut();
        // SAFETY: as in `bind_to_object`; the pointer written is a `T`
        // because `T::IID` was requested.
        let hr = unsafe {
            (this.vtable().BindToObject)(
                this.as_raw(),
                bind_ctx.as_raw(),
                raw_moniker(to_left),
                &T::IID,
                &mut result,
            )
        };
        // SAFETY: null or an owned `T` reference written by the callee.
        unsafe { require_interface(result, check(hr), "BindToObject") }
    }

    /// Binds to the storage (e.g. `IStorage`, `IStream`) of the named object.
    fn bind_to_storage(
        &self,
        bind_ctx: &BindContext,
        to_left: Option<&Moniker>,
        iid: &GUID,
    ) -> MonikerResult<IUnknown> {
        let this = self.interface()?;
        let mut result = core::ptr::null_mut();
        // SAFETY: see `bind_to_object`.
        let hr = unsafe {
            (this.vtable().BindToStorage)(
                this.as_raw(),
                bind_ctx.as_raw(),
                raw_moniker(to_left),
                iid,
                &mut result,
            )
        };
        // SAFETY: null or an owned reference written by the callee.
        unsafe { require_interface(result, check(hr), "BindToStorage") }
    }

    /// Reduces the moniker to a more efficient equivalent.
    ///
    /// `to_left` is in/out: the callee may replace the moniker to the
    /// left. `MK_S_REDUCED_TO_SELF` is success; the result is then this
    /// moniker again.
    fn reduce(
        &self,
        bind_ctx: &BindContext,
        depth: ReduceDepth,
        to_left: &mut Option<Moniker>,
    ) -> MonikerResult<Moniker> {
        let this = self.interface()?;
        let mut left = to_left
            .take()
            .map_or(core::ptr::null_mut(), |m| m.into_interface().into_raw());
        let mut reduced = core::ptr::null_mut();
        // SAFETY: ownership of `left` moves to the callee for the call; it
        // releases and replaces it, or leaves it untouched.
        let hr = unsafe {
            (this.vtable().Reduce)(
                this.as_raw(),
                bind_ctx.as_raw(),
                depth.as_raw(),
                &mut left,
                &mut reduced,
            )
        };
        // SAFETY: whatever is left in the slot is ours again.
        *to_left = unsafe { take_interface::<IMoniker>(left) }.map(Moniker::from);
        // SAFETY: null or an owned reference written by the callee.
        unsafe {
            moniker_from_raw(
                reduced,
                check_accepting(hr, &[codes::MK_S_REDUCED_TO_SELF]),
                "Reduce",
            )
        }
    }

    /// Composes this moniker with `right`.
    ///
    /// # Arguments
    /// * `right` - Moniker to append
    /// * `only_if_not_generic` - Fail with `MK_E_NEEDGENERIC` instead of
    ///   building a generic composite
    ///
    /// # Returns
    /// `None` when the two annihilate (e.g. an item followed by its inverse)
    fn compose_with(&self, right: &Moniker, only_if_not_generic: bool) -> MonikerResult<Option<Moniker>> {
        let this = self.interface()?;
        let only_if_not_generic = if only_if_not_generic { TRUE } else { FALSE };
        let mut composite = core::ptr::null_mut();
        // SAFETY: interface pointers are live; `composite` outlives the call.
        let hr = unsafe {
            (this.vtable().ComposeWith)(
                this.as_raw(),
                right.as_interface().as_raw(),
                only_if_not_generic,
                &mut composite,
            )
        };
        // SAFETY: null or an owned reference written by the callee.
        let composite = unsafe { take_interface_checked::<IMoniker>(composite, check(hr)) }?;
        Ok(composite.map(Moniker::from))
    }

    /// Enumerates the components of a composite moniker.
    ///
    /// # Returns
    /// `None` for monikers that are not composites
    fn enumerate(&self, forward: bool) -> MonikerResult<Option<MonikerIterator>> {
        let this = self.interface()?;
        let forward = if forward { TRUE } else { FALSE };
        let mut enumerator = core::ptr::null_mut();
        // SAFETY: `this` is live; `enumerator` outlives the call.
        let hr = unsafe { (this.vtable().Enum)(this.as_raw(), forward, &mut enumerator) };
        // SAFETY: null or an owned `IEnumMoniker` written by the callee.
        let enumerator = unsafe { take_interface_checked(enumerator, check(hr)) }?;
        Ok(enumerator.map(MonikerIterator::new))
    }

    /// Compares two monikers; `S_FALSE` yields `false`.
    fn is_equal(&self, other: &Moniker) -> MonikerResult<bool> {
        let this = self.interface()?;
        // SAFETY: both interfaces are live for the duration of the call.
        let hr = unsafe { (this.vtable().IsEqual)(this.as_raw(), other.as_interface().as_raw()) };
        check_bool(hr)
    }

    fn hash(&self) -> MonikerResult<MonikerHash> {
        let this = self.interface()?;
        let mut hash = 0u32;
        // SAFETY: `this` is live; `hash` outlives the call.
        let hr = unsafe { (this.vtable().Hash)(this.as_raw(), &mut hash) };
        check(hr)?;
        Ok(MonikerHash(hash))
    }

    /// Tests whether the named object is currently running.
    ///
    /// # Arguments
    /// * `bind_ctx` - Bind context for this operation
    /// * `to_left` - Moniker to the left of this one in a composite, if any
    /// * `newly_running` - Moniker most recently added to the ROT, if known
    fn is_running(
        &self,
        bind_ctx: &BindContext,
        to_left: Option<&Moniker>,
        newly_running: Option<&Moniker>,
    ) -> MonikerResult<bool> {
        let this = self.interface()?;
        // SAFETY: all pointers are live or null for the call.
        let hr = unsafe {
            (this.vtable().IsRunning)(
                this.as_raw(),
                bind_ctx.as_raw(),
                raw_moniker(to_left),
                raw_moniker(newly_running),
            )
        };
        check_bool(hr)
    }

    fn time_of_last_change(
        &self,
        bind_ctx: &BindContext,
        to_left: Option<&Moniker>,
    ) -> MonikerResult<FileTime> {
        let this = self.interface()?;
        let mut file_time = FILETIME::default();
        // SAFETY: pointers are live or null; `file_time` outlives the call.
        let hr = unsafe {
            (this.vtable().GetTimeOfLastChange)(
                this.as_raw(),
                bind_ctx.as_raw(),
                raw_moniker(to_left),
                &mut file_time,
            )
        };
        check(hr)?;
        Ok(file_time.into())
    }

    /// Returns the moniker that, composed to the right, annihilates this one.
    fn inverse(&self) -> MonikerResult<Moniker> {
        let this = self.interface()?;
        let mut inverse = core::ptr::null_mut();
        // SAFETY: `this` is live; `inverse` outlives the call.
        let hr = unsafe { (this.vtable().Inverse)(this.as_raw(), &mut inverse) };
        // SAFETY: null or an owned reference written by the callee.
        unsafe { moniker_from_raw(inverse, check(hr), "Inverse") }
    }

    /// Finds the prefix shared with `other`.
    ///
    /// `MK_S_ME`, `MK_S_HIM` and `MK_S_US` (one or both monikers are the
    /// whole prefix) are success; `MK_E_NOPREFIX` is an error.
    fn common_prefix_with(&self, other: &Moniker) -> MonikerResult<Moniker> {
        let this = self.interface()?;
        let mut prefix = core::ptr::null_mut();
        // SAFETY: both interfaces are live; `prefix` outlives the call.
        let hr = unsafe {
            (this.vtable().CommonPrefixWith)(
                this.as_raw(),
                other.as_interface().as_raw(),
                &mut prefix,
            )
        };
        let status = check_accepting(hr, &[codes::MK_S_ME, codes::MK_S_HIM, codes::MK_S_US]);
        // SAFETY: null or an owned reference written by the callee.
        unsafe { moniker_from_raw(prefix, status, "CommonPrefixWith") }
    }

    /// Builds the relative moniker that leads from this one to `other`.
    ///
    /// `MK_S_HIM` (no relative path exists, `other` itself is returned)
    /// is success.
    fn relative_path_to(&self, other: &Moniker) -> MonikerResult<Moniker> {
        let this = self.interface()?;
        let mut relative = core::ptr::null_mut();
        // SAFETY: both interfaces are live; `relative` outlives the call.
        let hr = unsafe {
            (this.vtable().RelativePathTo)(
                this.as_raw(),
                other.as_interface().as_raw(),
                &mut relative,
            )
        };
        let status = check_accepting(hr, &[codes::MK_S_HIM]);
        // SAFETY: null or an owned reference written by the callee.
        unsafe { moniker_from_raw(relative, status, "RelativePathTo") }
    }

    /// Gets the user-readable display name.
    ///
    /// The callee-allocated buffer is freed before returning. Unpaired
    /// surrogates are replaced with U+FFFD.
    fn display_name(&self, bind_ctx: &BindContext, to_left: Option<&Moniker>) -> MonikerResult<String> {
        let this = self.interface()?;
        let mut name = RemoteString::null();
        // SAFETY: pointers are live or null; `name` receives a task-allocated
        // string it frees on drop.
        let hr = unsafe {
            (this.vtable().GetDisplayName)(
                this.as_raw(),
                bind_ctx.as_raw(),
                raw_moniker(to_left),
                name.as_mut_pwstr_ptr(),
            )
        };
        check(hr)?;
        name.to_string_lossy()
    }

    /// Parses the remainder of a display name relative to this moniker.
    ///
    /// # Returns
    /// How many UTF-16 code units were consumed, and the moniker built
    /// from them
    fn parse_display_name(
        &self,
        bind_ctx: &BindContext,
        to_left: Option<&Moniker>,
        display_name: &str,
    ) -> MonikerResult<ParsedName> {
        let this = self.interface()?;
        let wide = LocalWideString::from(display_name);
        let mut eaten = 0u32;
        let mut parsed = core::ptr::null_mut();
        // SAFETY: `wide` is null-terminated and outlives the call; the
        // other pointers are live or null.
        let hr = unsafe {
            (this.vtable().ParseDisplayName)(
                this.as_raw(),
                bind_ctx.as_raw(),
                raw_moniker(to_left),
                wide.as_pcwstr(),
                &mut eaten,
                &mut parsed,
            )
        };
        // SAFETY: null or an owned reference written by the callee.
        let moniker =
            unsafe { require_interface::<IMoniker>(parsed, check(hr), "ParseDisplayName") }?;
        Ok(ParsedName {
            eaten: usize::try_from(eaten)?,
            moniker: moniker.into(),
        })
    }

    /// Classifies the moniker; `S_FALSE` means it is not a system moniker.
    fn system_kind(&self) -> MonikerResult<MonikerKind> {
        let this = self.interface()?;
        let mut raw = 0u32;
        // SAFETY: `this` is live; `raw` outlives the call.
        let hr = unsafe { (this.vtable().IsSystemMoniker)(this.as_raw(), &mut raw) };
        if check_bool(hr)? {
            Ok(MonikerKind::from(raw))
        } else {
            Ok(MonikerKind::None)
        }
    }
}
