//! Object storage gateway for nexus.
//!
//! This crate is the seam between the registry and whichever object store a
//! project configured: a two-way transfer contract ([`StorageBackend`]) plus
//! one adapter per supported provider. The registry core never sees provider
//! details — it hands a local path and a remote key to whatever
//! [`BackendHandle`] it was given.

pub mod backend;
pub mod error;
mod key;

pub use crate::backend::StorageBackend;
pub use crate::key::validate as validate_key;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
