//! libSQL storage layer for enriched postings.
//!
//! The [`Storage`] struct wraps a local libSQL database holding one row per
//! posting id. Writes are insert-or-update keyed by id; every write advances
//! `scraped_at`.
//!
//! **Access rules:**
//! - the run loop: read-write (sole writer) via [`Storage::open`]
//! - reporting commands (stats, list, export): read-only via [`Storage::open_readonly`]

mod migrations;

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use internscout_shared::{InternScoutError, Posting, Result};
use libsql::{Connection, Database, params};

const POSTING_COLUMNS: &str = "id, company_name, title, locations_json, season, sponsorship, url, \
     active, is_visible, date_posted, date_updated, raw_json, keywords_json, scraped_at";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| InternScoutError::io(parent, e))?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| InternScoutError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| InternScoutError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(InternScoutError::Storage(format!(
                "database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| InternScoutError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| InternScoutError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        InternScoutError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(InternScoutError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Posting operations
    // -----------------------------------------------------------------------

    /// Insert or overwrite a posting by id. Returns the stored `scraped_at`.
    ///
    /// On conflict every mutable column is replaced and `scraped_at` becomes
    /// `max(now, previous + 1µs)`, so it strictly increases per id even when
    /// two writes land within the clock's resolution.
    pub async fn upsert_posting(&self, posting: &Posting) -> Result<DateTime<Utc>> {
        self.check_writable()?;

        let locations_json = serde_json::to_string(&posting.locations)
            .map_err(|e| InternScoutError::Storage(format!("encode locations: {e}")))?;
        let raw_json = serde_json::to_string(&posting.raw)
            .map_err(|e| InternScoutError::Storage(format!("encode raw payload: {e}")))?;
        let keywords_json = posting
            .keywords
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| InternScoutError::Storage(format!("encode keywords: {e}")))?;
        let now = Utc::now().timestamp_micros();

        let mut rows = self
            .conn
            .query(
                "INSERT INTO postings (id, company_name, title, locations_json, season, sponsorship, url,
                                       active, is_visible, date_posted, date_updated, raw_json,
                                       keywords_json, scraped_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                 ON CONFLICT(id) DO UPDATE SET
                   company_name = excluded.company_name,
                   title = excluded.title,
                   locations_json = excluded.locations_json,
                   season = excluded.season,
                   sponsorship = excluded.sponsorship,
                   url = excluded.url,
                   active = excluded.active,
                   is_visible = excluded.is_visible,
                   date_posted = excluded.date_posted,
                   date_updated = excluded.date_updated,
                   raw_json = excluded.raw_json,
                   keywords_json = excluded.keywords_json,
                   scraped_at = MAX(excluded.scraped_at, postings.scraped_at + 1)
                 RETURNING scraped_at",
                params![
                    posting.id.as_str(),
                    posting.company_name.as_str(),
                    posting.title.as_str(),
                    locations_json,
                    posting.season.as_str(),
                    posting.sponsorship.as_str(),
                    posting.url.as_str(),
                    i64::from(posting.active),
                    i64::from(posting.visible),
                    posting.date_posted,
                    posting.date_updated,
                    raw_json,
                    keywords_json,
                    now,
                ],
            )
            .await
            .map_err(|e| InternScoutError::Storage(format!("upsert {}: {e}", posting.id)))?;

        let row = rows
            .next()
            .await
            .map_err(|e| InternScoutError::Storage(e.to_string()))?
            .ok_or_else(|| {
                InternScoutError::Storage(format!("upsert {} returned no row", posting.id))
            })?;
        let micros: i64 = row
            .get(0)
            .map_err(|e| InternScoutError::Storage(e.to_string()))?;
        micros_to_datetime(micros)
    }

    /// Get a posting by id.
    pub async fn get_posting(&self, id: &str) -> Result<Option<Posting>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {POSTING_COLUMNS} FROM postings WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| InternScoutError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_posting(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(InternScoutError::Storage(e.to_string())),
        }
    }

    /// List postings, most recently scraped first.
    pub async fn list_postings(&self, limit: Option<u32>) -> Result<Vec<Posting>> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map(i64::from).unwrap_or(-1);
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {POSTING_COLUMNS} FROM postings
                     ORDER BY scraped_at DESC, id
                     LIMIT ?1"
                ),
                params![limit],
            )
            .await
            .map_err(|e| InternScoutError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| InternScoutError::Storage(e.to_string()))?
        {
            results.push(row_to_posting(&row)?);
        }
        Ok(results)
    }

    /// Total number of stored postings.
    pub async fn count_postings(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM postings", params![])
            .await
            .map_err(|e| InternScoutError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row
                .get::<u64>(0)
                .map_err(|e| InternScoutError::Storage(e.to_string()))?),
            Ok(None) => Ok(0),
            Err(e) => Err(InternScoutError::Storage(e.to_string())),
        }
    }
}

fn micros_to_datetime(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| InternScoutError::Storage(format!("invalid scraped_at: {micros}")))
}

/// Convert a database row to a [`Posting`].
fn row_to_posting(row: &libsql::Row) -> Result<Posting> {
    let text = |idx: i32| -> Result<String> {
        row.get::<String>(idx)
            .map_err(|e| InternScoutError::Storage(e.to_string()))
    };
    let int = |idx: i32| -> Result<i64> {
        row.get::<i64>(idx)
            .map_err(|e| InternScoutError::Storage(e.to_string()))
    };

    let locations: Vec<String> = serde_json::from_str(&text(3)?)
        .map_err(|e| InternScoutError::Storage(format!("invalid locations_json: {e}")))?;
    let raw: serde_json::Value = serde_json::from_str(&text(11)?)
        .map_err(|e| InternScoutError::Storage(format!("invalid raw_json: {e}")))?;
    let keywords = match row.get::<String>(12).ok() {
        Some(json) => Some(
            serde_json::from_str::<BTreeSet<String>>(&json)
                .map_err(|e| InternScoutError::Storage(format!("invalid keywords_json: {e}")))?,
        ),
        None => None,
    };

    Ok(Posting {
        id: text(0)?,
        company_name: text(1)?,
        title: text(2)?,
        locations,
        season: text(4)?,
        sponsorship: text(5)?,
        url: text(6)?,
        active: int(7)? != 0,
        visible: int(8)? != 0,
        date_posted: int(9)?,
        date_updated: int(10)?,
        raw,
        keywords,
        scraped_at: Some(micros_to_datetime(int(13)?)?),
    })
}
