//! Projected entities.

use crate::schema::{HREF_FIELD, ID_FIELD};
use crate::types::EntityId;
use acom_codec::Value;
use std::collections::BTreeMap;

/// Field map accepted by `add` and `edit`.
pub type Properties = BTreeMap<String, Value>;

/// One entity as seen through a projection.
///
/// The surrogate id and the derived href are kept apart from the stored
/// fields; [`Record::to_value`] flattens all three into the single map shape
/// callers usually serialize.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: EntityId,
    fields: BTreeMap<String, Value>,
    href: Option<String>,
}

impl Record {
    /// Creates an empty record for `id`.
    #[must_use]
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
            href: None,
        }
    }

    /// The entity's surrogate id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// A visible field's decoded value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Whether a field is visible in this projection.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// All visible fields.
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// The derived reference URI, if the schema declares one.
    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    /// Consumes the record, returning its visible fields.
    pub fn into_fields(self) -> BTreeMap<String, Value> {
        self.fields
    }

    pub(crate) fn insert(&mut self, key: String, value: Value) {
        self.fields.insert(key, value);
    }

    pub(crate) fn set_href(&mut self, href: String) {
        self.href = Some(href);
    }

    /// Flattens into a map holding `id`, every visible field, and `href`
    /// when present.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = self.fields.clone();
        map.insert(ID_FIELD.to_string(), Value::Integer(self.id.as_i64()));
        if let Some(href) = &self.href {
            map.insert(HREF_FIELD.to_string(), Value::Text(href.clone()));
        }
        Value::Map(map)
    }
}
