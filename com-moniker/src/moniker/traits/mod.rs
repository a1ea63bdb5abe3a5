/// Moniker trait definitions.
///
/// The traits mirror the COM interface hierarchy:
/// - PersistStreamTrait: `IPersist` + `IPersistStream`
/// - MonikerTrait: `IMoniker`
mod moniker;
mod persist_stream;

pub use moniker::*;
pub use persist_stream::*;
