//! Stored response entries.
//!
//! An entry is one response snapshot (status, headers, body) stored in a
//! bucket under the hash of its request identity.

use super::connection::CacheStorage;
use super::hash::compute_cache_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub bucket: String,
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    /// Header name/value pairs in response order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CachedEntry {
    /// Build an entry for `bucket`, deriving the key from method and URL.
    pub fn new(
        bucket: &str, method: &str, url: &str, status: u16, headers: Vec<(String, String)>, body: Vec<u8>,
    ) -> Self {
        Self {
            bucket: bucket.to_string(),
            key_hash: compute_cache_key(method, url),
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            status,
            headers,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// First header value with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

const ENTRY_COLUMNS: &str = "bucket, key_hash, method, url, status, headers_json, body, stored_at";

fn insert_entry(conn: &rusqlite::Connection, entry: &CachedEntry) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&entry.headers).map_err(|e| Error::CorruptEntry(e.to_string()))?;

    conn.execute(
        "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
        params![&entry.bucket, &entry.stored_at],
    )?;
    conn.execute(
        "INSERT INTO entries (bucket, key_hash, method, url, status, headers_json, body, stored_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(bucket, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            &entry.bucket,
            &entry.key_hash,
            &entry.method,
            &entry.url,
            entry.status as i64,
            headers_json,
            &entry.body,
            &entry.stored_at,
        ],
    )?;
    Ok(())
}

fn read_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<(CachedEntry, String)> {
    let entry = CachedEntry {
        bucket: row.get(0)?,
        key_hash: row.get(1)?,
        method: row.get(2)?,
        url: row.get(3)?,
        status: row.get::<_, i64>(4)? as u16,
        headers: Vec::new(),
        body: row.get(6)?,
        stored_at: row.get(7)?,
    };
    Ok((entry, row.get(5)?))
}

fn decode_headers(raw: Option<(CachedEntry, String)>) -> Result<Option<CachedEntry>, Error> {
    match raw {
        Some((mut entry, headers_json)) => {
            entry.headers =
                serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(format!("{}: {e}", entry.url)))?;
            Ok(Some(entry))
        }
        None => Ok(None),
    }
}

impl CacheStorage {
    /// Insert or replace an entry, creating its bucket if needed.
    pub async fn put_entry(&self, entry: &CachedEntry) -> Result<(), Error> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> { insert_entry(conn, &entry) })
            .await
            .map_err(Error::from)
    }

    /// Store every entry or none of them.
    pub async fn put_entries(&self, entries: Vec<CachedEntry>) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for entry in &entries {
                    insert_entry(&tx, entry)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry in one bucket.
    pub async fn match_entry(&self, bucket: &str, key_hash: &str) -> Result<Option<CachedEntry>, Error> {
        let bucket = bucket.to_string();
        let key_hash = key_hash.to_string();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<(CachedEntry, String)>, Error> {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE bucket = ?1 AND key_hash = ?2");
                let mut stmt = conn.prepare(&sql)?;

                match stmt.query_row(params![bucket, key_hash], read_entry) {
                    Ok(found) => Ok(Some(found)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        decode_headers(raw)
    }

    /// Look up an entry in any bucket, oldest bucket first.
    pub async fn match_any(&self, key_hash: &str) -> Result<Option<CachedEntry>, Error> {
        let key_hash = key_hash.to_string();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<(CachedEntry, String)>, Error> {
                let sql = format!(
                    "SELECT e.{} FROM entries e JOIN buckets b ON b.name = e.bucket
                    WHERE e.key_hash = ?1 ORDER BY b.created_at ASC, b.rowid ASC LIMIT 1",
                    ENTRY_COLUMNS.replace(", ", ", e.")
                );
                let mut stmt = conn.prepare(&sql)?;

                match stmt.query_row(params![key_hash], read_entry) {
                    Ok(found) => Ok(Some(found)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        decode_headers(raw)
    }

    /// URLs stored in a bucket, in insertion order.
    pub async fn entry_urls(&self, bucket: &str) -> Result<Vec<String>, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE bucket = ?1 ORDER BY rowid ASC")?;
                let urls = stmt
                    .query_map(params![bucket], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry(bucket: &str, url: &str, body: &str) -> CachedEntry {
        CachedEntry::new(
            bucket,
            "GET",
            url,
            200,
            vec![("content-type".into(), "text/css".into())],
            body.as_bytes().to_vec(),
        )
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheStorage::open_in_memory().await.unwrap();
        let entry = make_entry("app-v1", "https://example.com/app.css", "body{}");

        db.put_entry(&entry).await.unwrap();

        let found = db.match_entry("app-v1", &entry.key_hash).await.unwrap().unwrap();
        assert_eq!(found, entry);
        assert_eq!(found.header("Content-Type"), Some("text/css"));
        assert!(db.has_bucket("app-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheStorage::open_in_memory().await.unwrap();
        let key = compute_cache_key("GET", "https://example.com/none.js");
        assert!(db.match_entry("app-v1", &key).await.unwrap().is_none());
        assert!(db.match_any(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_body() {
        let db = CacheStorage::open_in_memory().await.unwrap();
        db.put_entry(&make_entry("app-v1", "https://example.com/a.js", "old"))
            .await
            .unwrap();
        let newer = make_entry("app-v1", "https://example.com/a.js", "new");
        db.put_entry(&newer).await.unwrap();

        let found = db.match_entry("app-v1", &newer.key_hash).await.unwrap().unwrap();
        assert_eq!(found.body, b"new");
        assert_eq!(db.entry_urls("app-v1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_match_any_prefers_oldest_bucket() {
        let db = CacheStorage::open_in_memory().await.unwrap();
        db.open_bucket("app-v1").await.unwrap();
        db.open_bucket("app-v2").await.unwrap();
        db.put_entry(&make_entry("app-v2", "https://example.com/a.js", "v2"))
            .await
            .unwrap();
        let old = make_entry("app-v1", "https://example.com/a.js", "v1");
        db.put_entry(&old).await.unwrap();

        let found = db.match_any(&old.key_hash).await.unwrap().unwrap();
        assert_eq!(found.bucket, "app-v1");
    }

    #[tokio::test]
    async fn test_put_entries_is_atomic() {
        let db = CacheStorage::open_in_memory().await.unwrap();
        let entries = vec![
            make_entry("app-v1", "https://example.com/", "index"),
            make_entry("app-v1", "https://example.com/manifest.json", "{}"),
        ];
        db.put_entries(entries).await.unwrap();

        let urls = db.entry_urls("app-v1").await.unwrap();
        assert_eq!(urls, vec!["https://example.com/", "https://example.com/manifest.json"]);
    }
}
