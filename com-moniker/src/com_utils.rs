//! COM memory management and interface-pointer helpers.
//!
//! Strings returned by monikers are allocated by the callee with the COM
//! task allocator; strings passed in must be null-terminated UTF-16 that
//! outlives the call. Interface pointers cross the vtable boundary as raw
//! `*mut c_void`.

use core::ffi::c_void;

use windows::{
    Win32::System::Com::CoTaskMemFree,
    core::{Interface, PCWSTR, PWSTR},
};

use crate::errors::{MonikerError, MonikerResult};

// ── Memory Management ───────────────────────────────────────────────

/// A callee-allocated, null-terminated UTF-16 string.
///
/// Freed with `CoTaskMemFree` on drop.
#[repr(transparent)]
#[derive(Debug, PartialEq, Eq)]
pub struct RemoteString {
    inner: *mut u16,
}

impl RemoteString {
    /// Creates an empty out-slot.
    #[inline(always)]
    pub fn null() -> Self {
        Self {
            inner: core::ptr::null_mut(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.inner.is_null()
    }

    /// Returns the slot a vtable call writes the string into.
    #[inline(always)]
    pub fn as_mut_pwstr_ptr(&mut self) -> *mut PWSTR {
        (&raw mut self.inner).cast::<PWSTR>()
    }

    /// Decodes the string, leaving ownership with `self`.
    ///
    /// Unpaired surrogates (legal in NTFS names) become U+FFFD.
    ///
    /// # Errors
    /// Returns `E_POINTER` if no string was written.
    pub fn to_string_lossy(&self) -> MonikerResult<String> {
        if self.inner.is_null() {
            return Err(MonikerError::NullInterface("display name"));
        }

        // Non-null and written by the callee as a null-terminated UTF-16
        // string that stays alive until `self` is dropped.
        let pwstr = PWSTR(self.inner);
        // SAFETY: see above.
        let wide = unsafe { pwstr.as_wide() };
        Ok(String::from_utf16_lossy(wide))
    }
}

impl Default for RemoteString {
    fn default() -> Self {
        Self::null()
    }
}

impl TryFrom<RemoteString> for String {
    type Error = MonikerError;

    fn try_from(value: RemoteString) -> Result<Self, Self::Error> {
        value.to_string_lossy()
    }
}

impl Drop for RemoteString {
    #[inline(always)]
    fn drop(&mut self) {
        if !self.inner.is_null() {
            // SAFETY: the pointer was allocated by the callee with the COM
            // task allocator and is freed exactly once here.
            unsafe {
                CoTaskMemFree(Some(self.inner as *const c_void));
            }
        }
    }
}

/// A locally owned, null-terminated UTF-16 string passed into COM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalWideString {
    inner: Vec<u16>,
}

impl LocalWideString {
    /// Number of UTF-16 code units, excluding the terminator.
    pub fn len(&self) -> usize {
        self.inner.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pointer valid for as long as `self` is alive.
    #[inline(always)]
    pub fn as_pcwstr(&self) -> PCWSTR {
        PCWSTR::from_raw(self.inner.as_ptr())
    }

    /// Decodes the first `units` code units back to a string.
    ///
    /// Used to report how much of a display name a parse consumed.
    pub fn prefix(&self, units: usize) -> MonikerResult<String> {
        let end = units.min(self.len());
        Ok(String::from_utf16(&self.inner[..end])?)
    }
}

impl<S: AsRef<str>> From<S> for LocalWideString {
    /// Converts a string slice to a null-terminated UTF-16 buffer.
    #[inline(always)]
    fn from(s: S) -> Self {
        Self {
            inner: s.as_ref().encode_utf16().chain(Some(0)).collect(),
        }
    }
}

// ── Interface Pointers ──────────────────────────────────────────────

/// Borrows an optional interface as a raw pointer; `None` becomes null.
#[inline(always)]
pub fn raw_or_null<I: Interface>(value: Option<&I>) -> *mut c_void {
    value.map_or(core::ptr::null_mut(), Interface::as_raw)
}

/// Takes ownership of an out-pointer written by a vtable call.
///
/// Returns `None` for a null pointer.
///
/// # Safety
/// `raw` must be null or an owned reference to an `I` (i.e. the callee
/// already called `AddRef` on our behalf).
#[inline(always)]
pub unsafe fn take_interface<I: Interface>(raw: *mut c_void) -> Option<I> {
    if raw.is_null() {
        None
    } else {
        // SAFETY: guaranteed by the caller.
        Some(unsafe { I::from_raw(raw) })
    }
}

/// Claims an out-pointer, then applies the call's status.
///
/// A reference the callee wrote alongside a rejected status is released
/// instead of leaked.
///
/// # Safety
/// Same contract as [`take_interface`].
#[inline(always)]
pub unsafe fn take_interface_checked<I: Interface>(
    raw: *mut c_void,
    status: MonikerResult<()>,
) -> MonikerResult<Option<I>> {
    // SAFETY: forwarded contract.
    let value = unsafe { take_interface(raw) };
    status?;
    Ok(value)
}

/// Like [`take_interface_checked`], but a null pointer is an error.
///
/// # Safety
/// Same contract as [`take_interface`].
#[inline(always)]
pub unsafe fn require_interface<I: Interface>(
    raw: *mut c_void,
    status: MonikerResult<()>,
    operation: &'static str,
) -> MonikerResult<I> {
    // SAFETY: forwarded contract.
    unsafe { take_interface_checked(raw, status) }?.ok_or(MonikerError::NullInterface(operation))
}
