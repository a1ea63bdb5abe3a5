use core::ffi::c_void;

use windows::Win32::System::Com::{BIND_OPTS, CreateBindCtx, IBindCtx};
use windows::core::{IUnknown, Interface};

use crate::errors::MonikerResult;
use crate::rot::RunningObjectTable;
use crate::typedefs::BindOptions;

/// Owned reference to an `IBindCtx`.
///
/// A bind context carries the options of one binding operation and keeps
/// the objects bound during it alive until [`release_bound_objects`] or
/// drop.
///
/// [`release_bound_objects`]: BindContext::release_bound_objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindContext {
    inner: IBindCtx,
}

impl BindContext {
    /// Creates a bind context with default options.
    pub fn new() -> MonikerResult<Self> {
        // SAFETY: the reserved argument must be zero.
        let inner = unsafe { CreateBindCtx(0)? };
        Ok(Self { inner })
    }

    /// Creates a bind context and applies `options` to it.
    pub fn with_options(options: &BindOptions) -> MonikerResult<Self> {
        let ctx = Self::new()?;
        ctx.set_options(options)?;
        Ok(ctx)
    }

    pub fn interface(&self) -> &IBindCtx {
        &self.inner
    }

    /// Raw interface pointer, borrowed.
    pub fn as_raw(&self) -> *mut c_void {
        self.inner.as_raw()
    }

    /// Reads the current `BIND_OPTS`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn options(&self) -> MonikerResult<BindOptions> {
        let mut raw = BIND_OPTS {
            cbStruct: size_of::<BIND_OPTS>() as u32,
            ..Default::default()
        };
        // SAFETY: `raw` is a valid BIND_OPTS with `cbStruct` set.
        unsafe { self.inner.GetBindOptions(&mut raw)? };
        Ok(BindOptions::from_raw(
            raw.grfFlags,
            raw.grfMode,
            raw.dwTickCountDeadline,
        ))
    }

    /// Replaces the `BIND_OPTS` of this context.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_options(&self, options: &BindOptions) -> MonikerResult<()> {
        let raw = BIND_OPTS {
            cbStruct: size_of::<BIND_OPTS>() as u32,
            grfFlags: options.flags.bits(),
            grfMode: options.mode.bits(),
            dwTickCountDeadline: options.raw_deadline(),
        };
        // SAFETY: `raw` outlives the call; the callee copies it.
        unsafe { self.inner.SetBindOptions(&raw)? };
        tracing::trace!(?options, "Bind options applied");
        Ok(())
    }

    /// Keeps `object` alive until the context releases its bound objects.
    pub fn register_object_bound(&self, object: &IUnknown) -> MonikerResult<()> {
        // SAFETY: `object` is live; the context AddRefs it.
        unsafe { self.inner.RegisterObjectBound(object)? };
        Ok(())
    }

    pub fn revoke_object_bound(&self, object: &IUnknown) -> MonikerResult<()> {
        // SAFETY: `object` is live for the call.
        unsafe { self.inner.RevokeObjectBound(object)? };
        Ok(())
    }

    /// Releases every object registered with this context.
    pub fn release_bound_objects(&self) -> MonikerResult<()> {
        // SAFETY: no arguments.
        unsafe { self.inner.ReleaseBoundObjects()? };
        Ok(())
    }

    /// Gets the Running Object Table this context binds against.
    pub fn running_object_table(&self) -> MonikerResult<RunningObjectTable> {
        // SAFETY: no arguments.
        let rot = unsafe { self.inner.GetRunningObjectTable()? };
        Ok(RunningObjectTable::from(rot))
    }
}

impl From<IBindCtx> for BindContext {
    fn from(inner: IBindCtx) -> Self {
        Self { inner }
    }
}
