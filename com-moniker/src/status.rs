//! Translation of foreign status codes into results.
//!
//! Every vtable call in this crate funnels its HRESULT through one of the
//! helpers below, so the status-to-outcome mapping lives in one place.

use windows::core::HRESULT;

use crate::errors::{MonikerError, MonikerResult};
use crate::typedefs::codes::{S_FALSE, S_OK};

/// The three outcomes a moniker call can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `S_OK`.
    Success,
    /// `S_FALSE`: a negative answer, not a failure.
    SoftFalse,
    /// Any other success code (`MK_S_*`).
    Informational(HRESULT),
    /// A failure code.
    Failure(HRESULT),
}

impl Status {
    pub fn from_hresult(hr: HRESULT) -> Self {
        if hr == S_OK {
            Self::Success
        } else if hr == S_FALSE {
            Self::SoftFalse
        } else if hr.is_ok() {
            Self::Informational(hr)
        } else {
            Self::Failure(hr)
        }
    }
}

/// Accepts only `S_OK`.
///
/// Other success codes are treated as errors, which matches operations
/// whose contract defines no informational results.
pub fn check(hr: HRESULT) -> MonikerResult<()> {
    match Status::from_hresult(hr) {
        Status::Success => Ok(()),
        _ => Err(MonikerError::from_hresult(hr)),
    }
}

/// Accepts any success code, returning it for the caller to inspect.
pub fn check_success(hr: HRESULT) -> MonikerResult<HRESULT> {
    match Status::from_hresult(hr) {
        Status::Failure(_) => Err(MonikerError::from_hresult(hr)),
        _ => Ok(hr),
    }
}

/// Accepts `S_OK` and the listed informational codes.
///
/// Use [`check_success`] when the caller needs to know which success code
/// was reported.
pub fn check_accepting(hr: HRESULT, accepted: &[HRESULT]) -> MonikerResult<()> {
    if hr == S_OK || accepted.contains(&hr) {
        Ok(())
    } else {
        Err(MonikerError::from_hresult(hr))
    }
}

/// Maps `S_OK` to `true` and `S_FALSE` to `false`; everything else fails.
pub fn check_bool(hr: HRESULT) -> MonikerResult<bool> {
    match Status::from_hresult(hr) {
        Status::Success => Ok(true),
        Status::SoftFalse => Ok(false),
        _ => Err(MonikerError::from_hresult(hr)),
    }
}
