//! SQLite-backed durable store for visit history and the favicon cache.
//!
//! Two logical tables, each with a primary key and a numeric secondary
//! index:
//!
//! - `visit_history`: one row per normalized URL, indexed by visit count
//!   and by last visit time so recency/frequency reads never scan.
//! - `favicon_cache`: TTL-bound icon payloads keyed by source URL,
//!   indexed by insertion time for expiry sweeps.
//!
//! Access is async via tokio-rusqlite: every operation runs on the
//! connection's background thread, which serializes writers. Secondary
//! indices are maintained by SQLite in the same transaction as the row
//! write, so a reader can never observe a row without its index entries.

pub mod connection;
pub mod favicons;
pub mod history;
pub mod migrations;

pub use crate::Error;

pub use connection::Store;
pub use favicons::{FAVICON_TTL_MS, FaviconEntry};
pub use history::VisitRecord;

/// Current time as epoch milliseconds. All store timestamps use this.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
