//! Migration history: the ledger of executed migrations and the tracker that
//! answers questions about it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, params};
use serde::{Deserialize, Serialize};
use stratum_schema::MatchStrategy;
use tracing::{debug, warn};

use crate::error::{MigrateResult, MigrationError};

/// A record of an executed migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Migration name, e.g. `1718000000000-create-users-table`.
    pub name: String,
    /// When the migration was applied.
    pub applied_at: DateTime<Utc>,
}

impl MigrationRecord {
    /// Create a record applied now.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            applied_at: Utc::now(),
        }
    }
}

/// Append-only storage of executed migrations.
pub trait MigrationLedger {
    /// All records, oldest first. A ledger that does not exist yet is empty.
    fn records(&self) -> MigrateResult<Vec<MigrationRecord>>;

    /// Append a record for an executed migration.
    fn append(&mut self, name: &str) -> MigrateResult<MigrationRecord>;

    /// Whether no migration was ever recorded.
    fn is_empty(&self) -> MigrateResult<bool> {
        Ok(self.records()?.is_empty())
    }
}

/// Ledger kept in a table of an SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    path: PathBuf,
    table: String,
}

impl SqliteLedger {
    /// Create a ledger over a database file and table.
    pub fn new(path: impl Into<PathBuf>, table: impl Into<String>) -> MigrateResult<Self> {
        let table = table.into();
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(MigrationError::ledger(format!(
                "invalid ledger table name: {table:?}"
            )));
        }

        Ok(Self {
            path: path.into(),
            table,
        })
    }

    /// The database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The ledger table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the ledger table if it does not exist.
    pub fn initialize(&self) -> MigrateResult<()> {
        let conn = Connection::open(&self.path)?;
        self.create_table(&conn)
    }

    fn create_table(&self, conn: &Connection) -> MigrateResult<()> {
        conn.execute_batch(&format!(
            r#"CREATE TABLE IF NOT EXISTS "{}" (
    name VARCHAR(255) NOT NULL PRIMARY KEY,
    applied_at TEXT NOT NULL
);"#,
            self.table
        ))?;
        Ok(())
    }

    fn table_exists(&self, conn: &Connection) -> MigrateResult<bool> {
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![self.table],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

impl MigrationLedger for SqliteLedger {
    fn records(&self) -> MigrateResult<Vec<MigrationRecord>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Database file does not exist, ledger is empty");
            return Ok(Vec::new());
        }

        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

        if !self.table_exists(&conn)? {
            warn!(table = %self.table, "Ledger table does not exist, returning empty list");
            return Ok(Vec::new());
        }

        let mut stmt = conn.prepare(&format!(
            r#"SELECT name, applied_at FROM "{}" ORDER BY applied_at, rowid"#,
            self.table
        ))?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (name, applied_at) = row?;
            let applied_at = DateTime::parse_from_rfc3339(&applied_at)
                .map_err(|e| {
                    MigrationError::ledger(format!("bad applied_at for '{name}': {e}"))
                })?
                .with_timezone(&Utc);
            records.push(MigrationRecord { name, applied_at });
        }

        Ok(records)
    }

    fn append(&mut self, name: &str) -> MigrateResult<MigrationRecord> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&self.path)?;
        self.create_table(&conn)?;

        let record = MigrationRecord::new(name);
        conn.execute(
            &format!(r#"INSERT INTO "{}" (name, applied_at) VALUES (?1, ?2)"#, self.table),
            params![record.name, record.applied_at.to_rfc3339()],
        )?;

        debug!(name = %record.name, "Recorded migration in ledger");
        Ok(record)
    }
}

/// Ledger kept in memory, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    records: Vec<MigrationRecord>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger holding the given migration names.
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            records: names.into_iter().map(MigrationRecord::new).collect(),
        }
    }
}

impl MigrationLedger for MemoryLedger {
    fn records(&self) -> MigrateResult<Vec<MigrationRecord>> {
        Ok(self.records.clone())
    }

    fn append(&mut self, name: &str) -> MigrateResult<MigrationRecord> {
        let record = MigrationRecord::new(name);
        self.records.push(record.clone());
        Ok(record)
    }
}

/// Decides whether a ledger entry belongs to a table.
pub trait TableMatcher {
    /// Whether `migration_name` is a migration of `table`.
    fn matches(&self, migration_name: &str, table: &str) -> bool;
}

impl TableMatcher for MatchStrategy {
    fn matches(&self, migration_name: &str, table: &str) -> bool {
        match self {
            // Coarse: `order` also matches `create-orders-table`.
            MatchStrategy::Containment => migration_name.contains(table),
            MatchStrategy::Delimited => migration_name.split('-').any(|part| part == table),
        }
    }
}

/// Answers "has this table been migrated" from a ledger.
#[derive(Debug, Clone)]
pub struct ExecutionTracker<L, M = MatchStrategy> {
    ledger: L,
    matcher: M,
}

impl<L: MigrationLedger> ExecutionTracker<L> {
    /// Create a tracker using token containment.
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            matcher: MatchStrategy::Containment,
        }
    }
}

impl<L: MigrationLedger, M: TableMatcher> ExecutionTracker<L, M> {
    /// Create a tracker with a custom matcher.
    pub fn with_matcher(ledger: L, matcher: M) -> Self {
        Self { ledger, matcher }
    }

    /// Whether any recorded migration belongs to `table`.
    pub fn has_migrated(&self, table: &str) -> MigrateResult<bool> {
        let migrated = self
            .ledger
            .records()?
            .iter()
            .any(|record| self.matcher.matches(&record.name, table));

        debug!(table = %table, migrated, "Checked ledger for table");
        Ok(migrated)
    }

    /// All recorded migrations.
    pub fn all_records(&self) -> MigrateResult<Vec<MigrationRecord>> {
        self.ledger.records()
    }

    /// Whether the ledger holds no migrations at all.
    pub fn ledger_is_empty(&self) -> MigrateResult<bool> {
        self.ledger.is_empty()
    }

    /// The underlying ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Mutable access to the underlying ledger.
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }
}
