//! Database schema definitions for the SQLite record sink

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    record_count INTEGER NOT NULL DEFAULT 0
);

-- Scraped detail records, append-only
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    title TEXT NOT NULL,
    price TEXT NOT NULL,
    availability TEXT NOT NULL,
    rating TEXT NOT NULL,
    category TEXT NOT NULL,
    description TEXT NOT NULL,
    image_url TEXT NOT NULL,
    url TEXT NOT NULL,
    stored_at TEXT NOT NULL
);

-- Product information table rows of each record, in page order
CREATE TABLE IF NOT EXISTS product_information (
    record_id INTEGER NOT NULL REFERENCES records(id),
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (record_id, position)
);

CREATE INDEX IF NOT EXISTS idx_records_run ON records(run_id);
CREATE INDEX IF NOT EXISTS idx_records_url ON records(url);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
