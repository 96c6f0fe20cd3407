//! Domain types and models

pub mod directory;
pub mod record;
pub mod request;
pub mod response;

pub use directory::{EmailMessage, ProfileLookup};
pub use record::{FieldValue, Record};
pub use request::{CollectionQuery, Location, ReadTarget};
pub use response::{ConcurrencyTag, WriteOutcome};

/// Execution mode of a client, decided once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Calls go to the real platform.
    Live,
    /// Local development: fixtures for reads, dry runs for writes.
    Local,
}

impl Mode {
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }
}
