//! Types command implementation.

use acom_store::ConnectionManager;
use serde::Serialize;

/// Entity count for one type.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TypeCount {
    /// Entity type.
    pub entity_type: String,
    /// Number of entities.
    pub count: usize,
}

/// Collects per-type entity counts.
pub fn collect(connections: &ConnectionManager) -> Result<Vec<TypeCount>, Box<dyn std::error::Error>> {
    let counts = connections
        .type_counts()?
        .into_iter()
        .map(|(entity_type, count)| TypeCount { entity_type, count })
        .collect();
    Ok(counts)
}

/// Runs the types command.
pub fn run(connections: &ConnectionManager, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let counts = collect(connections)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
        _ => {
            if counts.is_empty() {
                println!("(empty)");
            }
            for TypeCount { entity_type, count } in &counts {
                println!("{entity_type:<20} {count}");
            }
        }
    }

    Ok(())
}
