//! # rmshelf-core
//!
//! Reading-status engine for the `rmshelf` reMarkable organizer.
//!
//! This crate provides:
//! - **Document store access** - reads the tablet's document records and
//!   moves documents between folders
//! - **Tracked state** - durable per-document reading status with an audit
//!   trail
//! - **Reading signals** - page coverage, annotations, open time, bookmarks
//! - **Classification** - an ordered list of transition rules
//! - **Mover** - managed folders and date buckets
//! - **Organizer** - the poll loop tying it together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod classify;
pub mod config;
pub mod document;
mod error;
mod fsio;
pub mod mover;
pub mod organizer;
pub mod signals;
pub mod state;

pub use classify::{ADOPTED_RULE, ClassifierInput, Decision, Rule, classify};
pub use config::{Config, ValidationError, ValidationResult, validate_config};
pub use document::{
    CandidateScan, DocumentId, DocumentRecord, DocumentStore, FolderId, FolderRecord,
    MemoryStore, SourcePatterns, XochitlStore,
};
pub use error::{Error, Result};
pub use mover::{FolderMap, Mover, Placement, bucket_name};
pub use organizer::{CycleReport, Organizer};
pub use state::{ReadingStatus, SignalsSnapshot, StateRepository, TrackedState, Transition};
