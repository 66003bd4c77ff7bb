//! Core CustomerStore implementation
//!
//! One SQLite database holds the source table, the exclusion table, the
//! export target table, and the run bookkeeping. The source cursor keeps a
//! connection open for a whole run; every other operation opens a
//! short-lived connection scoped to its single call. The database runs in
//! WAL journal mode so those writers coexist with the open cursor.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use eyre::{Context, Result};
use rusqlite::{Connection, Row, Rows, params};
use tracing::{debug, info};

use crate::record::{Customer, JobRun, NewCustomer, RunStatus};

/// Source query: exactly the six source columns, in order, no filtering.
/// All filtering happens downstream in the transformer.
pub const SELECT_CUSTOMERS: &str =
    "SELECT firstname, lastname, email, contactNumber, country, dob FROM customer";

const SELECT_EXCLUDED: &str = "SELECT country FROM excluded_country";

const INSERT_CUSTOMER: &str = "INSERT INTO customer (firstname, lastname, email, contactNumber, country, dob) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const INSERT_NEW_CUSTOMER: &str = "INSERT INTO new_customer (full_name, birthday, nation, phone_number, email) \
     VALUES (?1, ?2, ?3, ?4, ?5)";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS customer (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    firstname     TEXT NOT NULL,
    lastname      TEXT NOT NULL,
    email         TEXT NOT NULL,
    contactNumber TEXT NOT NULL,
    country       TEXT NOT NULL,
    dob           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS excluded_country (
    country TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS new_customer (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name    TEXT NOT NULL,
    birthday     TEXT NOT NULL,
    nation       TEXT NOT NULL,
    phone_number TEXT NOT NULL,
    email        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS job_run (
    run_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at    TEXT NOT NULL,
    finished_at   TEXT,
    status        TEXT NOT NULL,
    read_count    INTEGER NOT NULL DEFAULT 0,
    written_count INTEGER NOT NULL DEFAULT 0,
    error         TEXT
);
";

/// The main customer store
pub struct CustomerStore {
    /// Path to the SQLite database file
    path: PathBuf,
}

impl CustomerStore {
    /// Open or create the store at the given path, bootstrapping the schema
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context("Failed to create store directory")?;
        }

        let store = Self { path };
        let conn = store.connect()?;
        conn.execute_batch(SCHEMA).context("Failed to create store schema")?;
        debug!(path = %store.path.display(), "Opened customer store");
        Ok(store)
    }

    /// Path of the underlying database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the connection that backs the single-pass source cursor.
    /// The caller holds it for the duration of a run.
    pub fn read_connection(&self) -> Result<Connection> {
        self.connect()
    }

    fn connect_raw(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        // WAL lets the short-lived writers coexist with an open read cursor
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    fn connect(&self) -> Result<Connection> {
        self.connect_raw()
            .context(format!("Failed to open database at {}", self.path.display()))
    }

    /// Insert one source customer row
    pub fn insert_customer(&self, customer: &Customer) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            INSERT_CUSTOMER,
            params![
                customer.firstname,
                customer.lastname,
                customer.email,
                customer.contact_number,
                customer.country,
                customer.dob,
            ],
        )
        .context("Failed to insert customer")?;
        Ok(())
    }

    /// Number of rows in the source table
    pub fn customer_count(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM customer", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Number of rows in the export target table
    pub fn new_customer_count(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM new_customer", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// The current exclusion set, re-read from the table on every call.
    /// Membership is exact string equality. A short-lived connection is
    /// scoped to the single query.
    pub fn excluded_countries(&self) -> Result<HashSet<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(SELECT_EXCLUDED)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut excluded = HashSet::new();
        for country in rows {
            excluded.insert(country?);
        }
        debug!(count = excluded.len(), "Loaded exclusion set");
        Ok(excluded)
    }

    /// Add a country to the exclusion set (idempotent)
    pub fn add_excluded(&self, country: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR IGNORE INTO excluded_country (country) VALUES (?1)",
            params![country],
        )
        .context("Failed to add excluded country")?;
        Ok(())
    }

    /// Remove a country from the exclusion set; returns whether it was present
    pub fn remove_excluded(&self, country: &str) -> Result<bool> {
        let conn = self.connect()?;
        let removed = conn
            .execute("DELETE FROM excluded_country WHERE country = ?1", params![country])
            .context("Failed to remove excluded country")?;
        Ok(removed > 0)
    }

    /// All excluded countries, sorted
    pub fn list_excluded(&self) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT country FROM excluded_country ORDER BY country")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut countries = Vec::new();
        for country in rows {
            countries.push(country?);
        }
        Ok(countries)
    }

    /// Persist a batch of accepted records as new rows in one transaction.
    /// Create semantics: every call inserts, nothing is deduplicated.
    ///
    /// Returns the typed `rusqlite` error so the sink layer can classify
    /// store failures apart from file failures.
    pub fn insert_new_customers(&self, batch: &[NewCustomer]) -> rusqlite::Result<usize> {
        let mut conn = self.connect_raw()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(INSERT_NEW_CUSTOMER)?;
            for record in batch {
                stmt.execute(params![
                    record.full_name,
                    record.birthday,
                    record.nation,
                    record.phone_number,
                    record.email,
                ])?;
            }
        }
        tx.commit()?;
        debug!(count = batch.len(), "Committed new customer batch");
        Ok(batch.len())
    }

    /// Allocate the next run id and record the run as started
    pub fn begin_run(&self) -> Result<i64> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO job_run (started_at, status) VALUES (?1, ?2)",
            params![Utc::now(), RunStatus::Running.to_string()],
        )
        .context("Failed to record run start")?;
        let run_id = conn.last_insert_rowid();
        info!(run_id, "Started job run");
        Ok(run_id)
    }

    /// Record a run's terminal status and counts
    pub fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        read_count: u64,
        written_count: u64,
        error: Option<&str>,
    ) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE job_run SET finished_at = ?1, status = ?2, read_count = ?3, written_count = ?4, error = ?5 \
             WHERE run_id = ?6",
            params![Utc::now(), status.to_string(), read_count as i64, written_count as i64, error, run_id],
        )
        .context("Failed to record run end")?;
        info!(run_id, %status, read_count, written_count, "Finished job run");
        Ok(())
    }

    /// Most recent runs, newest first
    pub fn list_runs(&self, limit: usize) -> Result<Vec<JobRun>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT run_id, started_at, finished_at, status, read_count, written_count, error \
             FROM job_run ORDER BY run_id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], job_run_from_row)?;
        let mut runs = Vec::new();
        for run in rows {
            runs.push(run?);
        }
        Ok(runs)
    }
}

/// Forward-only cursor over the source table. Single-pass: once exhausted
/// it cannot be restarted.
pub struct CustomerCursor<'stmt> {
    rows: Rows<'stmt>,
}

impl<'stmt> CustomerCursor<'stmt> {
    /// Wrap the rows of an executed [`SELECT_CUSTOMERS`] statement
    pub fn new(rows: Rows<'stmt>) -> Self {
        Self { rows }
    }

    /// Pull up to `size` customers. An empty chunk means the source is
    /// exhausted.
    pub fn next_chunk(&mut self, size: usize) -> rusqlite::Result<Vec<Customer>> {
        let mut chunk = Vec::with_capacity(size);
        while chunk.len() < size {
            match self.rows.next()? {
                Some(row) => chunk.push(customer_from_row(row)?),
                None => break,
            }
        }
        Ok(chunk)
    }
}

fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        firstname: row.get(0)?,
        lastname: row.get(1)?,
        email: row.get(2)?,
        contact_number: row.get(3)?,
        country: row.get(4)?,
        dob: row.get(5)?,
    })
}

fn job_run_from_row(row: &Row<'_>) -> rusqlite::Result<JobRun> {
    let status: String = row.get(3)?;
    let status = status.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;
    Ok(JobRun {
        run_id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        status,
        read_count: row.get::<_, i64>(4)? as u64,
        written_count: row.get::<_, i64>(5)? as u64,
        error: row.get(6)?,
    })
}
