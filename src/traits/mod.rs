//! Trait definitions for swappable collaborators
//!
//! Ledgers depend on these traits rather than on a concrete storage
//! backend, so tests can run against in-memory implementations.

pub mod kv;

pub use kv::{KeyValueStore, KeyValueStoreExt};
