//! Core types and durable storage for tabtrail.
//!
//! This crate provides:
//! - The SQLite-backed visit history store and favicon cache
//! - URL normalization and eligibility rules
//! - Unified error types
//! - Layered configuration

pub mod config;
pub mod error;
pub mod store;
pub mod url;

pub use config::EngineConfig;
pub use error::Error;
pub use store::{FaviconEntry, Store, VisitRecord};
