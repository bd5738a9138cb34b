//! Check command implementation.

use acom_codec::to_canonical_text;
use acom_store::{ConnectionManager, EntityId, EntityStore, Schema, Visibility};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Entities of one type that lookups cannot resolve.
#[derive(Debug, Default)]
pub struct CheckReport {
    /// Entities with no primary attribute.
    pub malformed: Vec<EntityId>,
    /// Primary values (canonical text) held by more than one entity, with the
    /// ids holding them.
    pub duplicates: BTreeMap<String, Vec<EntityId>>,
}

impl CheckReport {
    /// Whether nothing was found.
    pub fn is_clean(&self) -> bool {
        self.malformed.is_empty() && self.duplicates.is_empty()
    }

    /// Number of offending entities.
    pub fn problem_count(&self) -> usize {
        self.malformed.len() + self.duplicates.values().map(Vec::len).sum::<usize>()
    }
}

/// Scans `entity_type` for malformed and duplicated entities.
pub fn scan(
    connections: Arc<ConnectionManager>,
    entity_type: &str,
    primary: &str,
) -> Result<CheckReport, Box<dyn std::error::Error>> {
    let malformed = connections.malformed_entities(entity_type, primary)?;

    let schema = Schema::builder(entity_type, primary).build()?;
    let store = EntityStore::new(connections, schema);
    let mut holders: BTreeMap<String, Vec<EntityId>> = BTreeMap::new();
    for record in store.list(Visibility::Internal)? {
        if let Some(value) = record.get(primary) {
            holders
                .entry(to_canonical_text(value)?)
                .or_default()
                .push(record.id());
        }
    }
    holders.retain(|_, ids| ids.len() > 1);

    Ok(CheckReport {
        malformed,
        duplicates: holders,
    })
}

/// Runs the check command.
pub fn run(
    connections: Arc<ConnectionManager>,
    entity_type: &str,
    primary: &str,
) -> Result<CheckReport, Box<dyn std::error::Error>> {
    let report = scan(connections, entity_type, primary)?;

    println!("Checking {entity_type} (primary field '{primary}')");
    for id in &report.malformed {
        println!("  [{id}] has no '{primary}' attribute");
    }
    for (value, ids) in &report.duplicates {
        let ids: Vec<_> = ids.iter().map(ToString::to_string).collect();
        println!("  {value} is held by entities {}", ids.join(", "));
    }
    if report.is_clean() {
        println!("OK");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use acom_codec::Value;
    use acom_store::Properties;

    #[test]
    fn finds_malformed_and_duplicates() {
        let connections = ConnectionManager::open_in_memory().unwrap();
        {
            let shared = connections.get();
            let conn = shared.lock();
            conn.execute_batch(
                "INSERT INTO entity (id, type) VALUES (1, 'host'), (2, 'host'), (3, 'host'), (4, 'host');
                 INSERT INTO attribute (entity_id, key, value) VALUES (1, 'name', '\"dup\"');
                 INSERT INTO attribute (entity_id, key, value) VALUES (2, 'name', '\"dup\"');
                 INSERT INTO attribute (entity_id, key, value) VALUES (3, 'name', '\"ok\"');",
            )
            .unwrap();
        }

        let report = scan(connections, "host", "name").unwrap();
        assert_eq!(report.malformed, vec![EntityId::new(4)]);
        assert_eq!(
            report.duplicates.get(r#""dup""#),
            Some(&vec![EntityId::new(1), EntityId::new(2)])
        );
        assert_eq!(report.problem_count(), 3);
        assert!(!report.is_clean());
    }

    #[test]
    fn text_and_integer_primaries_are_distinct() {
        let connections = ConnectionManager::open_in_memory().unwrap();
        let store = EntityStore::new(
            connections.clone(),
            Schema::builder("host", "name").build().unwrap(),
        );
        for name in [Value::from("5"), Value::Integer(5)] {
            store
                .add(Properties::from([("name".to_string(), name.clone())]), false)
                .unwrap();
            store.lookup(&name, Visibility::Public).unwrap();
        }

        let report = scan(connections, "host", "name").unwrap();
        assert!(report.is_clean(), "{report:?}");
    }

    #[test]
    fn clean_store() {
        let connections = ConnectionManager::open_in_memory().unwrap();
        let report = scan(connections, "host", "name").unwrap();
        assert!(report.is_clean());
    }
}
