//! SQLite-backed storage for versioned response caches.
//!
//! This module provides named cache buckets (one per app version) holding
//! response snapshots, with async access via tokio-rusqlite. It supports:
//!
//! - Request-identity keys using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Generation sweeps that drop every bucket but the current one

pub mod buckets;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheStorage;
pub use entries::CachedEntry;
