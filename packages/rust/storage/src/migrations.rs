//! SQL migration definitions for the InternScout database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: postings",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Enriched postings, keyed by the feed's id.
-- keywords_json is NULL until extraction has been attempted.
-- scraped_at is microseconds since the Unix epoch.
CREATE TABLE IF NOT EXISTS postings (
    id             TEXT PRIMARY KEY,
    company_name   TEXT NOT NULL,
    title          TEXT NOT NULL,
    locations_json TEXT NOT NULL,
    season         TEXT NOT NULL,
    sponsorship    TEXT NOT NULL,
    url            TEXT NOT NULL,
    active         INTEGER NOT NULL,
    is_visible     INTEGER NOT NULL,
    date_posted    INTEGER NOT NULL,
    date_updated   INTEGER NOT NULL,
    raw_json       TEXT NOT NULL,
    keywords_json  TEXT,
    scraped_at     INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_postings_company ON postings(company_name);
CREATE INDEX IF NOT EXISTS idx_postings_scraped_at ON postings(scraped_at);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
