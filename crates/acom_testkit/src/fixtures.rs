//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up throwaway stores
//! and common test scenarios.

use acom_store::{Config, ConnectionManager, EntityStore, Schema};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The shared connection manager.
    pub connections: Arc<ConnectionManager>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        Self {
            connections: ConnectionManager::open_in_memory()
                .expect("Failed to open in-memory store"),
            _temp_dir: None,
        }
    }

    /// Creates a new file-based test store in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("acom.db");
        let connections =
            ConnectionManager::open(Config::new(path)).expect("Failed to open file store");

        Self {
            connections,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Creates a file-based test store already switched to test mode.
    pub fn test_mode() -> Self {
        let store = Self::file();
        store
            .connections
            .enter_test_mode()
            .expect("Failed to enter test mode");
        store
    }

    /// Returns the main store path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir.as_ref().map(|d| d.path().join("acom.db"))
    }

    /// Creates an entity store for `schema` on this store's connection.
    pub fn entities(&self, schema: Schema) -> EntityStore {
        EntityStore::new(Arc::clone(&self.connections), schema)
    }
}

impl std::ops::Deref for TestStore {
    type Target = ConnectionManager;

    fn deref(&self) -> &Self::Target {
        &self.connections
    }
}

/// Runs a test with a temporary in-memory store.
///
/// # Example
///
/// ```rust,ignore
/// use acom_testkit::{schemas, with_temp_store};
///
/// #[test]
/// fn my_test() {
///     with_temp_store(|connections| {
///         let hosts = EntityStore::new(connections, schemas::host());
///         // ... test operations
///     });
/// }
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(Arc<ConnectionManager>) -> R,
{
    let test_store = TestStore::memory();
    f(Arc::clone(&test_store.connections))
}

/// Runs a test with a temporary file-based store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(Arc<ConnectionManager>, &std::path::Path) -> R,
{
    let test_store = TestStore::file();
    let path = test_store.path().expect("File store should have a path");
    f(Arc::clone(&test_store.connections), &path)
}

/// Schemas shaped like the ones acom's inventory uses.
pub mod schemas {
    use acom_codec::Value;
    use acom_store::Schema;

    /// Hosts: named, grouped, with vars and a private salt.
    pub fn host() -> Schema {
        Schema::builder("host", "name")
            .required(["groups"])
            .optional("vars", Value::empty_map())
            .protected(["_salt", "_last_seen"])
            .private(["_salt"])
            .href("/api/hosts/{}/")
            .build()
            .expect("host schema is valid")
    }

    /// Groups: named, with an optional parent list.
    pub fn group() -> Schema {
        Schema::builder("group", "name")
            .optional("parents", Value::Array(Vec::new()))
            .optional("vars", Value::empty_map())
            .href("/api/groups/{}/")
            .build()
            .expect("group schema is valid")
    }

    /// Users: keyed by login, with a hidden password hash.
    pub fn user() -> Schema {
        Schema::builder("user", "login")
            .required(["password"])
            .optional("email", Value::Null)
            .hidden(["password"])
            .build()
            .expect("user schema is valid")
    }
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use acom_codec::Value;
    use acom_store::Properties;

    /// A host payload named `name` in `groups`.
    pub fn host_payload(name: &str, groups: &[&str]) -> Properties {
        Properties::from([
            ("name".to_string(), Value::from(name)),
            (
                "groups".to_string(),
                Value::Array(groups.iter().map(|g| Value::from(*g)).collect()),
            ),
        ])
    }

    /// Creates a store with `host_count` hosts named `host0`, `host1`, ...
    pub fn populated_hosts(host_count: usize) -> (TestStore, EntityStore) {
        let test_store = TestStore::memory();
        let hosts = test_store.entities(schemas::host());

        for i in 0..host_count {
            hosts
                .add(host_payload(&format!("host{i}"), &["all"]), false)
                .expect("Failed to add host");
        }

        (test_store, hosts)
    }
}
