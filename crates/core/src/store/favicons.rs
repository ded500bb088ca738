//! Favicon cache operations.
//!
//! TTL-bound payloads keyed by the icon's canonical source URL. An entry
//! past its TTL is logically absent: reads delete it and report a miss,
//! and the sweep removes whatever reads have not touched. Failed fetches
//! are cached too, as default-fallback entries, so they are not retried
//! inside the TTL window.

use super::connection::Store;
use super::now_ms;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Entries are valid for 24 hours from insertion.
pub const FAVICON_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// A cached favicon payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaviconEntry {
    pub source_url: String,
    pub inserted_at: i64,
    pub payload: String,
    pub is_default: bool,
}

impl Store {
    /// Get a cached favicon by source URL.
    ///
    /// Returns None if the entry is absent or expired. An expired entry
    /// is deleted in the same call so it can never be served later.
    pub async fn get_favicon(&self, source_url: &str) -> Result<Option<FaviconEntry>, Error> {
        self.get_favicon_at(source_url, now_ms()).await
    }

    /// Like [`Store::get_favicon`] with an explicit current time.
    pub async fn get_favicon_at(&self, source_url: &str, now: i64) -> Result<Option<FaviconEntry>, Error> {
        let source_url = source_url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<FaviconEntry>, Error> {
                let result = conn.query_row(
                    "SELECT source_url, inserted_at, payload, is_default
                     FROM favicon_cache WHERE source_url = ?1",
                    params![source_url],
                    |row| {
                        Ok(FaviconEntry {
                            source_url: row.get(0)?,
                            inserted_at: row.get(1)?,
                            payload: row.get(2)?,
                            is_default: row.get::<_, i64>(3)? != 0,
                        })
                    },
                );

                match result {
                    Ok(entry) if now - entry.inserted_at >= FAVICON_TTL_MS => {
                        conn.execute("DELETE FROM favicon_cache WHERE source_url = ?1", params![entry.source_url])?;
                        tracing::debug!(source_url = %entry.source_url, "expired favicon purged on read");
                        Ok(None)
                    }
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite a cached favicon, resetting its TTL.
    ///
    /// `is_default` marks a designated fallback payload stored after a
    /// failed fetch; it expires exactly like a real one.
    pub async fn put_favicon(&self, source_url: &str, payload: &str, is_default: bool) -> Result<(), Error> {
        self.put_favicon_at(source_url, payload, is_default, now_ms()).await
    }

    /// Like [`Store::put_favicon`] with an explicit insertion time.
    pub async fn put_favicon_at(
        &self, source_url: &str, payload: &str, is_default: bool, now: i64,
    ) -> Result<(), Error> {
        let source_url = source_url.to_string();
        let payload = payload.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO favicon_cache (source_url, inserted_at, payload, is_default)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(source_url) DO UPDATE SET
                        inserted_at = excluded.inserted_at,
                        payload = excluded.payload,
                        is_default = excluded.is_default",
                    params![source_url, now, payload, is_default as i64],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete all expired favicon entries.
    ///
    /// Returns the number of deleted entries. Walks the insertion-time
    /// index, not the whole table.
    pub async fn purge_expired_favicons(&self) -> Result<u64, Error> {
        self.purge_expired_favicons_at(now_ms()).await
    }

    /// Like [`Store::purge_expired_favicons`] with an explicit current time.
    pub async fn purge_expired_favicons_at(&self, now: i64) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM favicon_cache WHERE inserted_at <= ?1",
                    params![now - FAVICON_TTL_MS],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
