//! Version history index for nexus.
//!
//! This crate is the metadata core of the registry: which versions exist for
//! each model, where each version's bytes live in remote storage, and which
//! version each model's `latest` pointer currently names. It knows nothing
//! about buckets or providers — remote keys are opaque strings recorded and
//! handed back.
//!
//! # Architecture
//! The index stores two things per model:
//! - **History**: an insertion-ordered list of [`VersionRecord`]s, one per
//!   recorded version. Insertion order is chronological and a version id
//!   never repeats within one model. Records are immutable once created.
//! - **Latest pointer**: the version id considered current. Every
//!   [`add_version`](VersionIndex::add_version) advances it; rollback
//!   repoints it without touching history.
//!
//! The index is an explicit value, not an ambient singleton: callers own the
//! instance, pass it to every operation, and decide when a mutation becomes
//! durable by calling [`save`](VersionIndex::save). The snapshot file is
//! owned by exactly one process at a time; there is no internal locking.

pub mod error;
mod index;
mod models;
mod snapshot;

pub use crate::index::VersionIndex;
pub use crate::models::{ModelEntry, VersionRecord, VersionSelector};

/// Name of the index snapshot file within a project root.
pub const SNAPSHOT_FILE: &str = ".nexus_meta.json";
