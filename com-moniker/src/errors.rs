use thiserror::Error;
use windows::core::HRESULT;

use crate::typedefs::codes;

/// Result type alias for moniker operations.
pub type MonikerResult<T> = Result<T, MonikerError>;

/// Centralized error enum for the moniker bindings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MonikerError {
    /// A vtable call returned a failure HRESULT.
    ///
    /// The original status is preserved in [`windows::core::Error::code`].
    #[error("COM error: {source} ({})", friendly_hresult_hint(.source.code()).unwrap_or("No hint available"))]
    Com {
        #[from]
        source: windows::core::Error,
    },

    /// The call succeeded but left a mandatory out-pointer null.
    #[error("{0} returned a null interface pointer")]
    NullInterface(&'static str),

    /// UTF-16 or integer conversion failed while marshalling arguments.
    #[error("Data conversion failed: {0}")]
    Conversion(String),

    /// The COM worker thread could not service the request.
    #[error("COM worker unavailable: {0}")]
    Worker(String),

    /// Catch-all for unexpected internal failures.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MonikerError {
    /// Builds a [`MonikerError::Com`] from a raw status code.
    pub fn from_hresult(hr: HRESULT) -> Self {
        Self::Com {
            source: windows::core::Error::from_hresult(hr),
        }
    }

    /// Returns the HRESULT carried by a COM failure, if any.
    pub fn hresult(&self) -> Option<HRESULT> {
        match self {
            Self::Com { source } => Some(source.code()),
            Self::NullInterface(_) => Some(codes::E_POINTER),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for MonikerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for MonikerError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Worker(format!("Async task join failed: {err}"))
    }
}

impl From<std::num::TryFromIntError> for MonikerError {
    fn from(err: std::num::TryFromIntError) -> Self {
        Self::Conversion(format!("Integer conversion error: {err}"))
    }
}

impl From<std::string::FromUtf16Error> for MonikerError {
    fn from(err: std::string::FromUtf16Error) -> Self {
        Self::Conversion(format!("Invalid UTF-16 display name: {err}"))
    }
}

/// Helper to format HRESULT with friendly hints.
#[allow(clippy::cast_sign_loss)]
pub fn format_hresult(hr: HRESULT) -> String {
    let hex = format!("0x{:08X}", hr.0 as u32);
    match friendly_hresult_hint(hr) {
        Some(hint) => format!("{hex}: {hint}"),
        None => hex,
    }
}

/// Maps moniker-related status codes to actionable hints.
#[allow(clippy::cast_sign_loss)]
pub fn friendly_hresult_hint(hr: HRESULT) -> Option<&'static str> {
    match hr.0 as u32 {
        0x8000_4003 => Some("Invalid pointer (E_POINTER)"),
        0x8000_4001 => Some("The moniker does not implement this operation (E_NOTIMPL)"),
        0x8000_4002 => Some("The bound object does not expose the requested interface"),
        0x8007_0057 => Some("One or more arguments are invalid (E_INVALIDARG)"),
        0x8001_0106 => Some("COM was already initialized on this thread with another apartment"),
        0x8004_01F0 => Some("COM is not initialized on the calling thread"),
        0x8004_01E0 => Some("The object must be connected to manually (MK_E_CONNECTMANUALLY)"),
        0x8004_01E1 => Some("Binding did not finish before the bind context deadline"),
        0x8004_01E2 => Some("The moniker can only be composed generically (MK_E_NEEDGENERIC)"),
        0x8004_01E3 => Some("The object is not available without binding it (MK_E_UNAVAILABLE)"),
        0x8004_01E4 => Some("The display name could not be parsed (MK_E_SYNTAX)"),
        0x8004_01E5 => Some("The object named by the moniker does not exist (MK_E_NOOBJECT)"),
        0x8004_01E6 => Some("No application is registered for the file extension"),
        0x8004_01E7 => Some("An intermediate object does not support a required interface"),
        0x8004_01E8 => Some("The moniker cannot be bound (MK_E_NOTBINDABLE)"),
        0x8004_01E9 => Some("The moniker is not bound (MK_E_NOTBOUND)"),
        0x8004_01EA => Some("The file named by the moniker could not be opened"),
        0x8004_01EB => Some("Binding requires user interaction (MK_E_MUSTBOTHERUSER)"),
        0x8004_01EC => Some("The moniker has no inverse (MK_E_NOINVERSE)"),
        0x8004_01ED => Some("The object has no storage (MK_E_NOSTORAGE)"),
        0x8004_01EE => Some("The monikers share no common prefix (MK_E_NOPREFIX)"),
        0x8004_01EF => Some("Enumerating the composite failed (MK_E_ENUMERATION_FAILED)"),
        _ => None,
    }
}

/// Maps a [`MonikerError`] to a friendly hint if it carries an HRESULT.
pub fn friendly_com_hint(error: &MonikerError) -> Option<&'static str> {
    error.hresult().and_then(friendly_hresult_hint)
}

/// Returns `true` when the failure only means the named object is not
/// running or cannot be reached without binding.
pub fn is_unavailable(error: &MonikerError) -> bool {
    matches!(
        error.hresult(),
        Some(hr) if hr == codes::MK_E_UNAVAILABLE || hr == codes::MK_E_NOOBJECT || hr == codes::MK_E_NOTBOUND
    )
}
