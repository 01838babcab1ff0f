//! Metadata store adapter.
//!
//! This module provides:
//! - **Models**: [`DocumentRecord`] and [`FolderRecord`] as the reader
//!   application stores them
//! - **Candidate detection**: the [`SourcePatterns`] predicate
//! - **Store seam**: the [`DocumentStore`] trait, with the on-device
//!   [`XochitlStore`] and the in-memory [`MemoryStore`]
//!
//! The organizer reads nearly every field of a record but only ever writes
//! a document's parent folder.

mod memory;
mod model;
mod patterns;
mod store;
mod xochitl;

pub use memory::MemoryStore;
pub use model::{CandidateScan, DocumentId, DocumentRecord, FolderId, FolderRecord};
pub use patterns::SourcePatterns;
pub use store::DocumentStore;
pub use xochitl::{DEFAULT_IO_TIMEOUT, XochitlStore};
