//! Dump command implementation.

use acom_store::{ConnectionManager, EntityStore, Record, Schema, Visibility};
use std::sync::Arc;

/// Reads every entity of `entity_type` through the internal view.
pub fn collect(
    connections: Arc<ConnectionManager>,
    entity_type: &str,
    primary: &str,
) -> Result<Vec<Record>, Box<dyn std::error::Error>> {
    let schema = Schema::builder(entity_type, primary).build()?;
    let store = EntityStore::new(connections, schema);
    Ok(store.list(Visibility::Internal)?)
}

/// Runs the dump command.
pub fn run(
    connections: Arc<ConnectionManager>,
    entity_type: &str,
    primary: &str,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = collect(connections, entity_type, primary)?;

    match format {
        "json" => {
            let json = records
                .iter()
                .map(|r| r.to_value().to_json())
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            for record in &records {
                println!("[{}] {}", record.id(), acom_codec::Value::Map(record.fields().clone()));
            }
            println!("{} {entity_type} entities", records.len());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use acom_codec::Value;
    use acom_store::Properties;

    #[test]
    fn dump_shows_protected_fields() {
        let connections = ConnectionManager::open_in_memory().unwrap();
        let hosts = EntityStore::new(
            connections.clone(),
            Schema::builder("host", "name")
                .protected(["_salt"])
                .private(["_salt"])
                .build()
                .unwrap(),
        );
        hosts
            .add(Properties::from([("name".to_string(), Value::from("web1"))]), false)
            .unwrap();
        hosts
            .edit(
                &Value::from("web1"),
                Properties::from([("_salt".to_string(), Value::from("s"))]),
                Visibility::Internal,
                false,
            )
            .unwrap();

        let records = collect(connections, "host", "name").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("_salt"), Some(&Value::from("s")));
    }
}
