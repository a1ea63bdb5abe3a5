use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::MonikerResult;
use crate::typedefs::{MonikerHash, MonikerKind};

#[cfg(feature = "test-support")]
use mockall::automock;

/// Everything known about one parsed display name.
///
/// Returned by [`MonikerProvider::describe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonikerInfo {
    /// Display name the moniker reports for itself (may differ from the input).
    pub display_name: String,
    /// UTF-16 code units of the input consumed while parsing.
    pub eaten: usize,
    pub kind: MonikerKind,
    pub hash: MonikerHash,
    /// Whether the named object is in the Running Object Table.
    pub running: bool,
    /// Last change time, if the moniker can report one without binding.
    pub last_change: Option<DateTime<Utc>>,
    /// Registry form of the moniker class id.
    pub class_id: Option<String>,
    /// Upper bound of the persisted size in bytes.
    pub size_max: Option<u64>,
    /// Display names of the components, left to right. Empty unless composite.
    pub components: Vec<String>,
}

/// Relationship between two display names.
///
/// Returned by [`MonikerProvider::compare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub equal: bool,
    /// Display name of the shared prefix, `None` when there is none.
    pub common_prefix: Option<String>,
    /// Display name of the path from left to right, when one can be built.
    pub relative_path: Option<String>,
}

/// Async trait for moniker inspection.
///
/// This is the stable public API. Moniker interfaces are apartment-bound,
/// so implementations run the COM calls on a thread they own.
#[cfg_attr(feature = "test-support", automock)]
#[async_trait]
pub trait MonikerProvider: Send + Sync {
    /// Parse a display name and report what the resulting moniker knows.
    ///
    /// # Errors
    /// Returns `Err` if the display name cannot be parsed or the moniker
    /// fails a mandatory query (display name, kind, hash).
    async fn describe(&self, display_name: &str) -> MonikerResult<MonikerInfo>;

    /// Parse two display names and relate them.
    ///
    /// # Errors
    /// Returns `Err` if either name cannot be parsed or the equality test
    /// fails.
    async fn compare(&self, left: &str, right: &str) -> MonikerResult<Comparison>;

    /// Display names of every object registered in the Running Object Table.
    ///
    /// # Errors
    /// Returns `Err` if the table cannot be opened or enumerated.
    async fn list_running(&self) -> MonikerResult<Vec<String>>;
}
