//! Core types and shared functionality for pwacache.
//!
//! This crate provides:
//! - Versioned cache storage with SQLite backend
//! - Unified error types
//! - Layered worker configuration

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheStorage, CachedEntry};
pub use config::{AppConfig, ConfigError, NotificationDefaults, PersistPolicy, Strategy, StrategyRule};
pub use error::Error;
