//! Per-document tracked state.
//!
//! The organizer's own record of each document: its reading status, the
//! signals seen at the last classification, and the audit trail of status
//! changes. Stored as a single JSON file that survives restarts.

mod model;
mod repository;

pub use model::{ReadingStatus, SignalsSnapshot, TrackedState, Transition};
pub use repository::{STATE_FILE_VERSION, StateRepository};
