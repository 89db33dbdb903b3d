//! Domain logic - the version record and the events fired when it changes

pub mod event;
pub mod record;

pub use event::{EventKind, VersionEvent};
pub use record::{check_counter, VersionBump, VersionRecord, MAX_COUNTER};
