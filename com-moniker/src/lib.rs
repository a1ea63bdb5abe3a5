//! # com-moniker
//!
//! Rust bindings for the COM moniker protocol.
//!
//! [`Moniker`] wraps an `IMoniker` and exposes every operation through
//! [`MonikerTrait`] and [`PersistStreamTrait`], translating the returned
//! HRESULT into a [`MonikerResult`]. Companion interfaces are wrapped by
//! [`BindContext`], [`RunningObjectTable`] and [`MonikerIterator`].
//!
//! Moniker interfaces are apartment-bound. [`MonikerClient`] runs them on
//! a dedicated COM thread behind the async [`MonikerProvider`] trait.
//!
//! ## Features
//! - `test-support`: Enables `MockMonikerProvider` via `mockall`

mod backend;
mod bind_ctx;
mod com_guard;
mod com_worker;
mod errors;
mod helpers;
mod iterator;
mod moniker;
mod provider;
mod rot;

pub mod com_utils;
pub mod status;
pub mod typedefs;

// Stable public API
pub use bind_ctx::BindContext;
pub use com_guard::{Apartment, ComGuard};
pub use errors::{
    MonikerError, MonikerResult, format_hresult, friendly_com_hint, friendly_hresult_hint,
    is_unavailable,
};
pub use helpers::{filetime_to_string, guid_to_string};
pub use iterator::MonikerIterator;
pub use moniker::{Moniker, MonikerTrait, ParsedName, PersistStreamTrait};
pub use provider::{Comparison, MonikerInfo, MonikerProvider};
pub use rot::{ALLOW_ANY_CLIENT, REGISTRATION_KEEPS_ALIVE, Registration, RunningObjectTable};
pub use typedefs::{
    AccessMode, BindFlags, BindOptions, FileTime, MonikerHash, MonikerKind, ReduceDepth,
};

// Worker-backed provider
pub use backend::client::MonikerClient;
pub use backend::resolver::{ComMoniker, ComResolver, MonikerResolver, ResolvedMoniker};
pub use com_worker::{MonikerRequest, MonikerWorker};

// Test support re-export
#[cfg(feature = "test-support")]
pub use provider::MockMonikerProvider;
