//! Reassembles flat attribute rows into per-entity records.

use crate::error::StoreResult;
use crate::record::Record;
use crate::schema::Schema;
use crate::types::{EntityId, Visibility};
use acom_codec::from_text;
use std::collections::BTreeMap;

/// One `(entity, key, value)` row as read from storage.
///
/// `key` and `value` are `None` for an entity with no attribute rows at all
/// (the LEFT JOIN side of the query).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRow {
    /// Owning entity.
    pub entity_id: EntityId,
    /// Attribute key.
    pub key: Option<String>,
    /// Canonical encoded value.
    pub value: Option<String>,
}

/// Applies a schema's visibility rules while grouping rows by entity.
#[derive(Debug, Clone, Copy)]
pub struct Projector<'a> {
    schema: &'a Schema,
    visibility: Visibility,
}

impl<'a> Projector<'a> {
    /// Creates a projector for `schema` at the given visibility.
    pub fn new(schema: &'a Schema, visibility: Visibility) -> Self {
        Self { schema, visibility }
    }

    fn shows(&self, key: &str) -> bool {
        self.visibility.is_internal() || !self.schema.is_concealed(key)
    }

    /// Groups rows into records, ordered by entity id.
    ///
    /// Concealed fields are dropped from public projections. The href is
    /// derived from the primary value only when the primary field itself is
    /// shown, so a hidden primary never leaks through its href.
    ///
    /// # Errors
    ///
    /// Returns a codec error if a stored value cannot be decoded.
    pub fn project<I>(&self, rows: I) -> StoreResult<Vec<Record>>
    where
        I: IntoIterator<Item = AttributeRow>,
    {
        let mut records: BTreeMap<EntityId, Record> = BTreeMap::new();

        for row in rows {
            let record = records
                .entry(row.entity_id)
                .or_insert_with(|| Record::new(row.entity_id));

            let (Some(key), Some(text)) = (row.key, row.value) else {
                continue;
            };
            if !self.shows(&key) {
                continue;
            }

            let value = from_text(&text)?;
            if key == self.schema.primary() {
                if let Some(href) = self.schema.href_for(&value) {
                    record.set_href(href);
                }
            }
            record.insert(key, value);
        }

        Ok(records.into_values().collect())
    }
}
