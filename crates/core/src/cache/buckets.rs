//! Cache generations.
//!
//! Buckets are named `<app>-<version>`. Deleting a bucket drops its entries
//! through the foreign-key cascade.

use super::connection::CacheStorage;
use crate::Error;
use chrono::Utc;
use tokio_rusqlite::params;

impl CacheStorage {
    /// Create a bucket if it does not exist yet.
    pub async fn open_bucket(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM buckets WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All bucket names, oldest first.
    pub async fn bucket_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM buckets ORDER BY created_at ASC, rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a bucket and its entries. Returns whether it existed.
    pub async fn delete_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM buckets WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every bucket that starts with `prefix` except `keep`.
    ///
    /// Returns the deleted names. Buckets of other apps are untouched.
    pub async fn sweep_generations(&self, prefix: &str, keep: &str) -> Result<Vec<String>, Error> {
        let prefix = prefix.to_string();
        let keep = keep.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.transaction()?;
                let names: Vec<String> = {
                    let mut stmt = tx.prepare("SELECT name FROM buckets ORDER BY created_at ASC, rowid ASC")?;
                    let names = stmt
                        .query_map([], |row| row.get(0))?
                        .collect::<Result<Vec<String>, _>>()?;
                    names
                };
                let stale: Vec<String> = names
                    .into_iter()
                    .filter(|name| name.starts_with(&prefix) && *name != keep)
                    .collect();
                for name in &stale {
                    tx.execute("DELETE FROM buckets WHERE name = ?1", params![name])?;
                }
                tx.commit()?;
                Ok(stale)
            })
            .await
            .map_err(Error::from)
    }
}
