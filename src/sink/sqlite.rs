//! SQLite record sink
//!
//! Every crawl gets a row in `runs`; each stored record points at it.

use crate::queue::DetailRecord;
use crate::sink::schema::initialize_schema;
use crate::sink::{RecordSink, RunStatus, SinkError, SinkResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// A crawl run as stored in the database
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub record_count: u64,
}

/// Connection to a record database
pub struct RecordDatabase {
    conn: Connection,
}

impl RecordDatabase {
    /// Opens (or creates) the database at `path` and ensures the schema exists
    pub fn open(path: &Path) -> SinkResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> SinkResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    // ===== Run Management =====

    /// Creates a new run and returns its ID
    pub fn create_run(&self, config_hash: &str) -> SinkResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Stamps a run with its final status, finish time and record count
    pub fn finish_run(&self, run_id: i64, status: RunStatus) -> SinkResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs
             SET status = ?1,
                 finished_at = ?2,
                 record_count = (SELECT COUNT(*) FROM records WHERE run_id = ?3)
             WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;

        if updated == 0 {
            return Err(SinkError::RunNotFound(run_id));
        }
        Ok(())
    }

    pub fn get_run(&self, run_id: i64) -> SinkResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, record_count
                 FROM runs WHERE id = ?1",
                params![run_id],
                Self::run_from_row,
            )
            .optional()?
            .ok_or(SinkError::RunNotFound(run_id))
    }

    pub fn get_latest_run(&self) -> SinkResult<Option<RunRecord>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, record_count
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                Self::run_from_row,
            )
            .optional()?)
    }

    fn run_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(RunStatus::Failed),
            record_count: row.get::<_, i64>(5)? as u64,
        })
    }

    // ===== Records =====

    /// Inserts a record and its product information rows
    pub fn insert_record(&mut self, run_id: i64, record: &DetailRecord) -> SinkResult<i64> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO records
             (run_id, title, price, availability, rating, category, description, image_url, url, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                run_id,
                record.title,
                record.price,
                record.availability,
                record.rating,
                record.category,
                record.description,
                record.image_url,
                record.url,
                now
            ],
        )?;
        let record_id = tx.last_insert_rowid();

        for (position, (name, value)) in record.product_information.iter().enumerate() {
            tx.execute(
                "INSERT INTO product_information (record_id, position, name, value)
                 VALUES (?1, ?2, ?3, ?4)",
                params![record_id, position as i64, name, value],
            )?;
        }

        tx.commit()?;
        Ok(record_id)
    }

    fn product_information(&self, record_id: i64) -> SinkResult<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, value FROM product_information WHERE record_id = ?1 ORDER BY position",
        )?;
        let rows = stmt
            .query_map(params![record_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Loads all records of a run in insertion order
    pub fn records_for_run(&self, run_id: i64) -> SinkResult<Vec<DetailRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, price, availability, rating, category, description, image_url, url
             FROM records WHERE run_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                let record = DetailRecord {
                    title: row.get(1)?,
                    price: row.get(2)?,
                    availability: row.get(3)?,
                    rating: row.get(4)?,
                    category: row.get(5)?,
                    description: row.get(6)?,
                    image_url: row.get(7)?,
                    url: row.get(8)?,
                    product_information: Vec::new(),
                };
                Ok((row.get::<_, i64>(0)?, record))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(record_id, mut record)| {
                record.product_information = self.product_information(record_id)?;
                Ok(record)
            })
            .collect()
    }

    // ===== Statistics =====

    pub fn count_runs(&self) -> SinkResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn count_records(&self) -> SinkResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn count_distinct_urls(&self) -> SinkResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT url) FROM records", [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }

    /// Counts records whose availability text says they are in stock
    pub fn count_in_stock(&self) -> SinkResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE availability LIKE 'In stock%'",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Record counts grouped by rating, most common first
    pub fn records_by_rating(&self) -> SinkResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT rating, COUNT(*) AS n FROM records GROUP BY rating ORDER BY n DESC, rating",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

/// Record sink writing to a SQLite database
pub struct SqliteSink {
    db: RecordDatabase,
    run_id: i64,
    closed: bool,
}

impl SqliteSink {
    /// Opens the database at `path` and starts a new run in it
    pub fn open(path: &Path, config_hash: &str) -> SinkResult<Self> {
        Self::with_database(RecordDatabase::open(path)?, config_hash)
    }

    /// Starts a new run in an already open database
    pub fn with_database(db: RecordDatabase, config_hash: &str) -> SinkResult<Self> {
        let run_id = db.create_run(config_hash)?;
        tracing::info!("Recording into run {}", run_id);
        Ok(Self {
            db,
            run_id,
            closed: false,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    pub fn database(&self) -> &RecordDatabase {
        &self.db
    }
}

impl RecordSink for SqliteSink {
    fn store(&mut self, record: &DetailRecord) -> SinkResult<()> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        self.db.insert_record(self.run_id, record)?;
        Ok(())
    }

    fn close(&mut self, status: RunStatus) -> SinkResult<()> {
        if self.closed {
            return Ok(());
        }
        self.db.finish_run(self.run_id, status)?;
        self.closed = true;
        Ok(())
    }
}
