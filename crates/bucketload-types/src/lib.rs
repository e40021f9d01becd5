//! Shared model types for the bucketload workspace.
//!
//! Records flow from the source crate through the engine into the sink crate;
//! everything they have in common lives here so the crates stay decoupled.

pub mod format;
pub mod location;
pub mod record;
pub mod target;

pub use format::{Format, FormatError};
pub use location::StorageLocation;
pub use record::{project, value_as_text, Record, Row, ERROR_COLUMN, VALIDATION_FAILED};
pub use target::{InsertTarget, TargetError};
