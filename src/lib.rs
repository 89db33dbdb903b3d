pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod format;
pub mod source;
pub mod store;
pub mod ui;

pub use domain::{EventKind, VersionEvent, VersionRecord};
pub use engine::VersionEngine;
pub use error::{Result, VersionError};
