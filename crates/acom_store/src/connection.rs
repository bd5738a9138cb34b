//! Shared handle to the backing SQLite store.

use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::types::EntityId;
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// A connection to the backing store, shareable across threads.
pub type SharedConnection = Arc<Mutex<Connection>>;

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS entity (
        id   INTEGER PRIMARY KEY AUTOINCREMENT,
        type TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS attribute (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        entity_id INTEGER NOT NULL,
        key       TEXT NOT NULL,
        value     TEXT
    );

    CREATE INDEX IF NOT EXISTS entity_type_idx ON entity (type);
    CREATE INDEX IF NOT EXISTS attribute_entity_idx ON attribute (entity_id);
    CREATE INDEX IF NOT EXISTS attribute_key_value_idx ON attribute (key, value);
";

/// Owns the one handle every entity store reads and writes through.
///
/// Construct it once with [`ConnectionManager::open`] and hand clones of the
/// returned `Arc` to each [`crate::EntityStore`]. Switching to the isolated
/// test store is an explicit call, [`ConnectionManager::enter_test_mode`],
/// and affects every store sharing this manager.
///
/// # Concurrency
///
/// The handle is guarded by a mutex that is held for the duration of a
/// single statement (or of `add`'s check-and-insert batch). Nothing else is
/// serialized: concurrent writers interleave at statement granularity and
/// readers can observe partially edited entities.
pub struct ConnectionManager {
    config: Config,
    handle: RwLock<SharedConnection>,
    test_mode: AtomicBool,
}

impl ConnectionManager {
    /// Opens the store described by `config` and creates the tables if
    /// they are missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema cannot be
    /// created.
    pub fn open(config: Config) -> StoreResult<Arc<Self>> {
        let conn = match &config.path {
            Some(path) => open_file(path, &config)?,
            None => open_memory(&config)?,
        };
        info!(path = ?config.path, "opened entity store");

        Ok(Arc::new(Self {
            config,
            handle: RwLock::new(Arc::new(Mutex::new(conn))),
            test_mode: AtomicBool::new(false),
        }))
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Arc<Self>> {
        Self::open(Config::in_memory())
    }

    /// Returns the configuration this manager was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the active handle.
    pub fn get(&self) -> SharedConnection {
        Arc::clone(&*self.handle.read())
    }

    /// Whether the manager has switched to the isolated test store.
    pub fn is_test_mode(&self) -> bool {
        self.test_mode.load(Ordering::Acquire)
    }

    /// Redirects all subsequent operations to the isolated test store.
    ///
    /// The test store lives next to the main file (see
    /// [`Config::test_store_path`]), or in memory for in-memory configs.
    /// There is no way back: the manager stays in test mode until dropped.
    /// Calling this again is a no-op.
    ///
    /// Must not run concurrently with live traffic against the main store.
    pub fn enter_test_mode(&self) -> StoreResult<()> {
        let mut handle = self.handle.write();
        if self.is_test_mode() {
            return Ok(());
        }

        let conn = match self.config.test_store_path() {
            Some(path) => open_file(&path, &self.config)?,
            None => open_memory(&self.config)?,
        };
        *handle = Arc::new(Mutex::new(conn));
        self.test_mode.store(true, Ordering::Release);

        info!(path = ?self.config.test_store_path(), "entered test mode");
        Ok(())
    }

    /// Number of entities per type, sorted by type name.
    pub fn type_counts(&self) -> StoreResult<Vec<(String, usize)>> {
        let shared = self.get();
        let conn = shared.lock();
        let mut stmt =
            conn.prepare("SELECT type, COUNT(*) FROM entity GROUP BY type ORDER BY type")?;
        let rows = stmt.query_map([], |row| {
            let count: i64 = row.get(1)?;
            Ok((row.get::<_, String>(0)?, usize::try_from(count).unwrap_or(0)))
        })?;
        let counts = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    /// Entities of `entity_type` with no attribute row for `primary`.
    ///
    /// These can only come from a crash between the entity insert and its
    /// attribute inserts, and no lookup will ever find them.
    pub fn malformed_entities(&self, entity_type: &str, primary: &str) -> StoreResult<Vec<EntityId>> {
        let shared = self.get();
        let conn = shared.lock();
        let mut stmt = conn.prepare(
            "SELECT e.id FROM entity e
             WHERE e.type = ?1
             AND NOT EXISTS (
                 SELECT 1 FROM attribute a WHERE a.entity_id = e.id AND a.key = ?2
             )
             ORDER BY e.id",
        )?;
        let rows = stmt.query_map(params![entity_type, primary], |row| {
            Ok(EntityId::new(row.get(0)?))
        })?;
        let ids = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("path", &self.config.path)
            .field("test_mode", &self.is_test_mode())
            .finish_non_exhaustive()
    }
}

fn open_file(path: &Path, config: &Config) -> StoreResult<Connection> {
    let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    if config.create_if_missing {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        flags |= OpenFlags::SQLITE_OPEN_CREATE;
    } else if !path.exists() {
        return Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist and create_if_missing is false", path.display()),
        )));
    }

    debug!(path = %path.display(), "opening database file");
    let conn = Connection::open_with_flags(path, flags)?;
    prepare(conn, config)
}

fn open_memory(config: &Config) -> StoreResult<Connection> {
    prepare(Connection::open_in_memory()?, config)
}

fn prepare(conn: Connection, config: &Config) -> StoreResult<Connection> {
    conn.busy_timeout(config.busy_timeout_duration())?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(conn)
}
