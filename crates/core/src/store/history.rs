//! Visit history operations.
//!
//! One row per normalized URL, aggregating title, visit count, and timing
//! metadata. The upsert is a single `INSERT .. ON CONFLICT DO UPDATE`
//! statement wrapped in a transaction with its read-back, so the row and
//! both secondary indices commit or roll back together; a failed update
//! leaves the prior state intact.

use super::connection::Store;
use super::now_ms;
use crate::{Error, url};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Search draws candidates from the most-visited rows rather than a full
/// scan: best effort among the most significant records. Tunable, not a
/// contract.
const SEARCH_CANDIDATE_FACTOR: usize = 3;
const SEARCH_CANDIDATE_MIN: usize = 50;

/// Only http(s) rows are eligible on the read path. Applied in SQL ahead
/// of LIMIT so stale ineligible rows never displace eligible ones.
const ELIGIBLE_SQL: &str = "(url LIKE 'http://%' OR url LIKE 'https://%')";

/// A recorded visit aggregate for one URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitRecord {
    pub url: String,
    pub title: String,
    pub domain: String,
    pub visit_count: i64,
    pub first_visit_time: i64,
    pub last_visit_time: i64,
    pub favicon_url: Option<String>,
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<VisitRecord> {
    Ok(VisitRecord {
        url: row.get(0)?,
        title: row.get(1)?,
        domain: row.get(2)?,
        visit_count: row.get(3)?,
        first_visit_time: row.get(4)?,
        last_visit_time: row.get(5)?,
        favicon_url: row.get(6)?,
    })
}

const RECORD_COLUMNS: &str = "url, title, domain, visit_count, first_visit_time, last_visit_time, favicon_url";

impl Store {
    /// Record a visit, creating or updating the row for this URL.
    ///
    /// On first visit the record starts with `visit_count = 1` and
    /// `first_visit_time = last_visit_time = now`. On subsequent visits
    /// the count increments, `last_visit_time` advances, the title is
    /// overwritten, and the favicon reference is overwritten only when a
    /// new one is supplied.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` before any write if the URL is not an
    /// eligible http(s) URL.
    pub async fn upsert_visit(
        &self, input_url: &str, title: &str, favicon_url: Option<&str>,
    ) -> Result<VisitRecord, Error> {
        self.upsert_visit_at(input_url, title, favicon_url, now_ms()).await
    }

    /// Like [`Store::upsert_visit`] with an explicit timestamp.
    pub async fn upsert_visit_at(
        &self, input_url: &str, title: &str, favicon_url: Option<&str>, now: i64,
    ) -> Result<VisitRecord, Error> {
        let parsed = url::normalize(input_url)?;
        let domain = url::domain_of(&parsed);
        let normalized = parsed.to_string();
        let title = title.to_string();
        let favicon_url = favicon_url.map(str::to_string);

        self.conn
            .call(move |conn| -> Result<VisitRecord, Error> {
                let tx = conn.transaction()?;

                tx.execute(
                    "INSERT INTO visit_history
                        (url, title, domain, visit_count, first_visit_time, last_visit_time, favicon_url)
                     VALUES (?1, ?2, ?3, 1, ?4, ?4, ?5)
                     ON CONFLICT(url) DO UPDATE SET
                        title = excluded.title,
                        visit_count = visit_history.visit_count + 1,
                        last_visit_time = excluded.last_visit_time,
                        favicon_url = COALESCE(excluded.favicon_url, visit_history.favicon_url)",
                    params![normalized, title, domain, now, favicon_url],
                )?;

                let record = tx.query_row(
                    &format!("SELECT {RECORD_COLUMNS} FROM visit_history WHERE url = ?1"),
                    params![normalized],
                    row_to_record,
                )?;

                tx.commit()?;
                Ok(record)
            })
            .await
            .map_err(Error::from)
    }

    /// Get a visit record by URL.
    ///
    /// Returns None if no record exists.
    pub async fn get_visit(&self, url: &str) -> Result<Option<VisitRecord>, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<VisitRecord>, Error> {
                let result = conn.query_row(
                    &format!("SELECT {RECORD_COLUMNS} FROM visit_history WHERE url = ?1"),
                    params![url],
                    row_to_record,
                );

                match result {
                    Ok(record) => Ok(Some(record)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a single record.
    ///
    /// Returns whether a record existed. Missing keys are not an error.
    pub async fn delete_visit(&self, url: &str) -> Result<bool, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM visit_history WHERE url = ?1", params![url])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete all records whose last visit predates `cutoff_ms`.
    ///
    /// Returns the number of deleted records. Driven by the recency
    /// index; a concurrent upsert to a matching URL either recreates the
    /// row afterwards or carries it past the cutoff, never a torn state.
    pub async fn delete_visits_before(&self, cutoff_ms: i64) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM visit_history WHERE last_visit_time < ?1",
                    params![cutoff_ms],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete all records whose last visit falls in `[start_ms, end_ms]`.
    pub async fn delete_visits_in_range(&self, start_ms: i64, end_ms: i64) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM visit_history WHERE last_visit_time >= ?1 AND last_visit_time <= ?2",
                    params![start_ms, end_ms],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a batch of records by URL in one transaction.
    ///
    /// Returns the number of records that existed and were deleted.
    pub async fn delete_visits_by_urls(&self, urls: Vec<String>) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let mut deleted = 0u64;
                {
                    let mut stmt = tx.prepare("DELETE FROM visit_history WHERE url = ?1")?;
                    for url in &urls {
                        deleted += stmt.execute(params![url])? as u64;
                    }
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await
            .map_err(Error::from)
    }

    /// Most-visited records, descending by visit count, ties broken by
    /// more recent last visit. Fresh read each call, bounded to `limit`.
    pub async fn most_visited(&self, limit: usize) -> Result<Vec<VisitRecord>, Error> {
        self.ordered_visits("visit_count DESC, last_visit_time DESC", limit).await
    }

    /// Most recently visited records, descending by last visit time.
    pub async fn recent_visits(&self, limit: usize) -> Result<Vec<VisitRecord>, Error> {
        self.ordered_visits("last_visit_time DESC", limit).await
    }

    async fn ordered_visits(&self, order_by: &'static str, limit: usize) -> Result<Vec<VisitRecord>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<VisitRecord>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RECORD_COLUMNS} FROM visit_history
                     WHERE {ELIGIBLE_SQL}
                     ORDER BY {order_by} LIMIT ?1"
                ))?;
                let rows = stmt.query_map(params![limit as i64], row_to_record)?;
                let mut records = Vec::new();
                for row in rows {
                    records.push(row?);
                }
                Ok(records)
            })
            .await
            .map(|records| {
                // Backstop for http-prefixed rows that no longer parse.
                records.into_iter().filter(|r| url::is_eligible(&r.url)).collect()
            })
            .map_err(Error::from)
    }

    /// Case-insensitive substring search over title, url, and domain.
    ///
    /// Candidates are the `max(3 * limit, 50)` most-visited rows; matches
    /// are returned in visit-count order, truncated to `limit`.
    pub async fn search_visits(&self, query: &str, limit: usize) -> Result<Vec<VisitRecord>, Error> {
        let candidate_n = (SEARCH_CANDIDATE_FACTOR * limit).max(SEARCH_CANDIDATE_MIN);
        let candidates = self.most_visited(candidate_n).await?;

        let needle = query.to_lowercase();
        Ok(candidates
            .into_iter()
            .filter(|r| {
                let haystack = format!("{} {} {}", r.title, r.url, r.domain).to_lowercase();
                haystack.contains(&needle)
            })
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_creates_record() {
        let store = Store::open_in_memory().await.unwrap();
        let record = store
            .upsert_visit("https://example.com/page", "Example", None)
            .await
            .unwrap();

        assert_eq!(record.url, "https://example.com/page");
        assert_eq!(record.title, "Example");
        assert_eq!(record.domain, "example.com");
        assert_eq!(record.visit_count, 1);
        assert_eq!(record.first_visit_time, record.last_visit_time);
    }

    #[tokio::test]
    async fn test_upsert_monotonicity() {
        let store = Store::open_in_memory().await.unwrap();
        let url = "https://example.com";

        let first = store.upsert_visit_at(url, "t1", None, 1_000).await.unwrap();
        store.upsert_visit_at(url, "t2", None, 2_000).await.unwrap();
        let third = store.upsert_visit_at(url, "t3", None, 3_000).await.unwrap();

        assert_eq!(third.visit_count, 3);
        assert_eq!(third.first_visit_time, first.first_visit_time);
        assert_eq!(third.first_visit_time, 1_000);
        assert_eq!(third.last_visit_time, 3_000);
        assert_eq!(third.title, "t3");
    }

    #[tokio::test]
    async fn test_upsert_retains_favicon_when_none_supplied() {
        let store = Store::open_in_memory().await.unwrap();
        let url = "https://example.com";

        store
            .upsert_visit(url, "t", Some("https://example.com/favicon.ico"))
            .await
            .unwrap();
        let updated = store.upsert_visit(url, "t", None).await.unwrap();
        assert_eq!(updated.favicon_url.as_deref(), Some("https://example.com/favicon.ico"));

        let replaced = store
            .upsert_visit(url, "t", Some("https://example.com/new.ico"))
            .await
            .unwrap();
        assert_eq!(replaced.favicon_url.as_deref(), Some("https://example.com/new.ico"));
    }

    #[tokio::test]
    async fn test_upsert_rejects_ineligible_url() {
        let store = Store::open_in_memory().await.unwrap();
        let result = store.upsert_visit("chrome://newtab", "New Tab", None).await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
        assert!(store.get_visit("chrome://newtab").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_normalizes_key() {
        let store = Store::open_in_memory().await.unwrap();
        store
            .upsert_visit("https://EXAMPLE.com/page#frag", "t", None)
            .await
            .unwrap();
        store.upsert_visit("https://example.com/page", "t", None).await.unwrap();

        let record = store.get_visit("https://example.com/page").await.unwrap().unwrap();
        assert_eq!(record.visit_count, 2);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = Store::open_in_memory().await.unwrap();
        assert!(store.get_visit("https://nowhere.example").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_visit() {
        let store = Store::open_in_memory().await.unwrap();
        store.upsert_visit("https://example.com", "t", None).await.unwrap();

        assert!(store.delete_visit("https://example.com/").await.unwrap());
        assert!(!store.delete_visit("https://example.com/").await.unwrap());
        assert!(store.get_visit("https://example.com/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_most_visited_ordering() {
        let store = Store::open_in_memory().await.unwrap();
        for _ in 0..3 {
            store.upsert_visit("https://a.com", "A", None).await.unwrap();
        }
        store.upsert_visit("https://b.com", "B", None).await.unwrap();

        let top = store.most_visited(1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].url, "https://a.com/");
        assert_eq!(top[0].visit_count, 3);
        assert_eq!(top[0].domain, "a.com");
    }

    #[tokio::test]
    async fn test_most_visited_tie_break_by_recency() {
        let store = Store::open_in_memory().await.unwrap();
        store.upsert_visit_at("https://old.com", "old", None, 1_000).await.unwrap();
        store.upsert_visit_at("https://new.com", "new", None, 2_000).await.unwrap();

        let records = store.most_visited(2).await.unwrap();
        assert_eq!(records[0].url, "https://new.com/");
        assert_eq!(records[1].url, "https://old.com/");
    }

    #[tokio::test]
    async fn test_recent_visits_ordering() {
        let store = Store::open_in_memory().await.unwrap();
        store.upsert_visit_at("https://a.com", "a", None, 1_000).await.unwrap();
        store.upsert_visit_at("https://b.com", "b", None, 3_000).await.unwrap();
        store.upsert_visit_at("https://c.com", "c", None, 2_000).await.unwrap();

        let records = store.recent_visits(10).await.unwrap();
        let urls: Vec<_> = records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://b.com/", "https://c.com/", "https://a.com/"]);
    }

    #[tokio::test]
    async fn test_queries_bounded_by_limit() {
        let store = Store::open_in_memory().await.unwrap();
        for i in 0..10 {
            store
                .upsert_visit(&format!("https://site{i}.com"), "t", None)
                .await
                .unwrap();
        }

        assert_eq!(store.most_visited(4).await.unwrap().len(), 4);
        assert_eq!(store.recent_visits(4).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_queries_exclude_stale_ineligible_rows() {
        let store = Store::open_in_memory().await.unwrap();
        store.upsert_visit("https://a.com", "a", None).await.unwrap();

        // Simulate a row written before the eligibility filter existed.
        store
            .conn
            .call(|conn| {
                conn.execute(
                    "INSERT INTO visit_history
                        (url, title, domain, visit_count, first_visit_time, last_visit_time, favicon_url)
                     VALUES ('chrome://newtab', 'New Tab', 'newtab', 99, 0, 9999999999999, NULL)",
                    [],
                )?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .unwrap();

        let most = store.most_visited(10).await.unwrap();
        assert!(most.iter().all(|r| r.url.starts_with("http")));
        let recent = store.recent_visits(10).await.unwrap();
        assert!(recent.iter().all(|r| r.url.starts_with("http")));
        let found = store.search_visits("newtab", 10).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_delete_before_cutoff() {
        let store = Store::open_in_memory().await.unwrap();
        store.upsert_visit_at("https://old.com", "old", None, 1_000).await.unwrap();
        store.upsert_visit_at("https://new.com", "new", None, 5_000).await.unwrap();

        let deleted = store.delete_visits_before(3_000).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get_visit("https://old.com/").await.unwrap().is_none());
        assert!(store.get_visit("https://new.com/").await.unwrap().is_some());

        // Idempotent with no intervening writes.
        assert_eq!(store.delete_visits_before(3_000).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_in_range() {
        let store = Store::open_in_memory().await.unwrap();
        store.upsert_visit_at("https://a.com", "a", None, 1_000).await.unwrap();
        store.upsert_visit_at("https://b.com", "b", None, 2_000).await.unwrap();
        store.upsert_visit_at("https://c.com", "c", None, 3_000).await.unwrap();

        let deleted = store.delete_visits_in_range(1_500, 2_500).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get_visit("https://b.com/").await.unwrap().is_none());
        assert!(store.get_visit("https://a.com/").await.unwrap().is_some());
        assert!(store.get_visit("https://c.com/").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_batch() {
        let store = Store::open_in_memory().await.unwrap();
        store.upsert_visit("https://a.com", "a", None).await.unwrap();
        store.upsert_visit("https://b.com", "b", None).await.unwrap();
        store.upsert_visit("https://c.com", "c", None).await.unwrap();

        let deleted = store
            .delete_visits_by_urls(vec![
                "https://a.com/".to_string(),
                "https://b.com/".to_string(),
                "https://missing.com/".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert!(store.get_visit("https://c.com/").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_search_matches_title_url_domain() {
        let store = Store::open_in_memory().await.unwrap();
        store
            .upsert_visit("https://docs.rs/tokio", "Tokio Documentation", None)
            .await
            .unwrap();
        store
            .upsert_visit("https://www.rust-lang.org", "Rust Programming Language", None)
            .await
            .unwrap();

        let by_title = store.search_visits("TOKIO", 10).await.unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].url, "https://docs.rs/tokio");

        let by_domain = store.search_visits("rust-lang", 10).await.unwrap();
        assert_eq!(by_domain.len(), 1);

        let none = store.search_visits("zzzzz", 10).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_search_bounded_and_ordered() {
        let store = Store::open_in_memory().await.unwrap();
        for i in 0..8 {
            for _ in 0..=i {
                store
                    .upsert_visit(&format!("https://site{i}.com"), "common", None)
                    .await
                    .unwrap();
            }
        }

        let results = store.search_visits("common", 5).await.unwrap();
        assert_eq!(results.len(), 5);
        for pair in results.windows(2) {
            assert!(pair[0].visit_count >= pair[1].visit_count);
        }
        for r in &results {
            assert!(r.title.to_lowercase().contains("common"));
        }
    }
}
