//! CLI command implementations.

pub mod check;
pub mod dump;
pub mod types;

use acom_store::{Config, ConnectionManager};
use std::path::Path;
use std::sync::Arc;

/// Opens an existing store, switching to its test store if asked.
pub fn open(path: &Path, test: bool) -> Result<Arc<ConnectionManager>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {}", path.display()).into());
    }

    let connections = ConnectionManager::open(Config::new(path).create_if_missing(false))?;
    if test {
        connections.enter_test_mode()?;
    }
    Ok(connections)
}
