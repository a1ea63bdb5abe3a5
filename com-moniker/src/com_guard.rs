//! RAII guard for COM initialization/teardown.
//!
//! Ensures `CoUninitialize` is called exactly once per successful
//! `CoInitializeEx`, even on early returns or panics.

use std::marker::PhantomData;
use windows::Win32::System::Com::{
    COINIT, COINIT_APARTMENTTHREADED, COINIT_DISABLE_OLE1DDE, COINIT_MULTITHREADED,
    CoInitializeEx, CoUninitialize,
};

use crate::errors::{MonikerError, MonikerResult};

/// Threading model requested from `CoInitializeEx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Apartment {
    /// Multi-Threaded Apartment.
    #[default]
    MultiThreaded,
    /// Single-Threaded Apartment. Required by some moniker providers
    /// (e.g. OLE document servers) that expect a message pump.
    SingleThreaded,
}

impl Apartment {
    fn flags(self) -> COINIT {
        match self {
            Self::MultiThreaded => COINIT_MULTITHREADED | COINIT_DISABLE_OLE1DDE,
            Self::SingleThreaded => COINIT_APARTMENTTHREADED | COINIT_DISABLE_OLE1DDE,
        }
    }
}

/// Drop guard for COM thread initialization.
///
/// # Thread Safety
///
/// `ComGuard` is intentionally `!Send` and `!Sync`. COM initialization
/// is per-thread: the guard **must** be created and dropped on the same
/// OS thread. This is enforced at compile time.
///
/// # Examples
///
/// ```no_run
/// # use com_moniker::{ComGuard, MonikerResult};
/// # fn main() -> MonikerResult<()> {
/// let _guard = ComGuard::new()?;
/// // ... moniker operations ...
/// // CoUninitialize called automatically on drop
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ComGuard {
    apartment: Apartment,
    /// Prevents `Send + Sync` auto-derivation. COM init is per-thread.
    _not_send: PhantomData<*mut ()>,
}

impl ComGuard {
    /// Initialize COM in Multi-Threaded Apartment (MTA) mode.
    pub fn new() -> MonikerResult<Self> {
        Self::with_apartment(Apartment::MultiThreaded)
    }

    /// Initialize COM with the given apartment model.
    ///
    /// `S_FALSE` (already initialized on this thread) counts as success
    /// and is balanced like any other successful call.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `CoInitializeEx` fails, including
    /// `RPC_E_CHANGED_MODE` when the thread already joined a different
    /// apartment.
    pub fn with_apartment(apartment: Apartment) -> MonikerResult<Self> {
        // SAFETY: `CoInitializeEx` is a standard Win32 FFI call with no
        // pointer arguments. The result is checked below, and
        // `CoUninitialize` is guaranteed via Drop.
        let hr = unsafe { CoInitializeEx(None, apartment.flags()) };

        if let Err(e) = hr.ok() {
            tracing::error!(error = ?e, ?apartment, "COM initialization failed");
            return Err(MonikerError::Com { source: e });
        }

        tracing::debug!(?apartment, "COM initialized");

        Ok(Self {
            apartment,
            _not_send: PhantomData,
        })
    }

    pub fn apartment(&self) -> Apartment {
        self.apartment
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        tracing::debug!(apartment = ?self.apartment, "COM teardown");
        // SAFETY: Paired with the successful `CoInitializeEx` in
        // `with_apartment()`. Only runs on the creating thread (!Send).
        unsafe {
            CoUninitialize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn com_guard_constructs_and_drops() {
        let guard = ComGuard::new();
        assert!(guard.is_ok(), "ComGuard::new() should succeed: {guard:?}");
        assert_eq!(guard.unwrap().apartment(), Apartment::MultiThreaded);
    }

    #[test]
    fn com_guard_nested_init_is_balanced() {
        let outer = ComGuard::new().unwrap();
        let inner = ComGuard::new().unwrap();
        drop(inner);
        drop(outer);
    }

    #[test]
    fn com_guard_rejects_apartment_change() {
        std::thread::spawn(|| {
            let _sta = ComGuard::with_apartment(Apartment::SingleThreaded).unwrap();
            let err = ComGuard::new().unwrap_err();
            assert_eq!(
                err.hresult(),
                Some(crate::typedefs::codes::RPC_E_CHANGED_MODE)
            );
        })
        .join()
        .unwrap();
    }
}
