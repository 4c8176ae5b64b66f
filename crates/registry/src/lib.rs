//! Registry façade for nexus.
//!
//! Orchestrates the two halves of the system: given a local artifact, it
//! computes a content identity, uploads the bytes through the storage
//! gateway, records the version in the index, and persists the snapshot —
//! in that order, so a version is never recorded before its bytes are
//! confirmed stored. Retrieval runs the pipeline backwards: resolve the
//! selector against the index, then download.

pub mod error;
mod registry;

pub use crate::registry::Registry;
