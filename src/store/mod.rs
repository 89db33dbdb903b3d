//! Persistence for the version record
//!
//! [VersionStore] is the seam between the engine and wherever the record
//! lives:
//!
//! - [file::ConfigStore]: the TOML backing file, also carrying auxiliary settings
//! - [memory::MemoryStore]: an in-memory store for tests, with call counters and
//!   forced failures
//!
//! The engine only ever talks to the trait.

pub mod file;
pub mod memory;

pub use file::ConfigStore;
pub use memory::MemoryStore;

use crate::domain::VersionRecord;
use crate::error::Result;

/// Load and persist the version record.
///
/// ## Errors
///
/// Implementations report read failures as
/// [StoreRead](crate::error::VersionError::StoreRead) and write failures as
/// [StoreWrite](crate::error::VersionError::StoreWrite). A missing record is
/// not an error: `load` returns the zero record instead.
pub trait VersionStore: Send + Sync {
    /// Read the current record, or `0.0.0` with commit 0 if none has been saved.
    fn load(&mut self) -> Result<VersionRecord>;

    /// Replace the persisted record.
    ///
    /// Either the new record is fully persisted or the old one is left intact.
    fn save(&mut self, record: &VersionRecord) -> Result<()>;

    /// Human readable location, used in log lines.
    fn describe(&self) -> String;
}
