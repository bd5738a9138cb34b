//! Per-type schema descriptors.

use crate::error::{StoreError, StoreResult};
use acom_codec::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Projection key carrying the entity's surrogate id.
pub const ID_FIELD: &str = "id";

/// Projection key carrying the derived reference URI.
pub const HREF_FIELD: &str = "href";

/// Marker injected into internal writes while the store runs in test mode.
pub const TEST_MODE_FIELD: &str = "TESTMODE";

/// Protected field whose presence in an external payload is a hard error
/// instead of being stripped like other protected fields.
pub const SALT_FIELD: &str = "_salt";

/// Placeholder replaced by the primary value in an href template.
const HREF_PLACEHOLDER: &str = "{}";

/// Field classification for one entity type.
///
/// A schema is immutable once built; stores share it behind an `Arc`.
///
/// # Example
///
/// ```
/// use acom_store::Schema;
/// use acom_codec::Value;
///
/// let hosts = Schema::builder("host", "name")
///     .required(["groups"])
///     .optional("vars", Value::empty_map())
///     .href("/api/hosts/{}/")
///     .build()
///     .unwrap();
///
/// assert_eq!(hosts.primary(), "name");
/// assert_eq!(hosts.href_for(&Value::from("web1")).as_deref(), Some("/api/hosts/web1/"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    entity_type: String,
    primary: String,
    required: Vec<String>,
    optional: BTreeMap<String, Value>,
    protected: BTreeSet<String>,
    private: BTreeSet<String>,
    hidden: BTreeSet<String>,
    href: Option<String>,
}

impl Schema {
    /// Starts a schema for `entity_type` keyed on the `primary` field.
    pub fn builder(entity_type: impl Into<String>, primary: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            schema: Schema {
                entity_type: entity_type.into(),
                primary: primary.into(),
                required: Vec::new(),
                optional: BTreeMap::new(),
                protected: BTreeSet::new(),
                private: BTreeSet::new(),
                hidden: BTreeSet::new(),
                href: None,
            },
        }
    }

    /// Type discriminator stored on every entity row.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Name of the primary field.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Required field names, in declaration order.
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Optional fields and their defaults.
    pub fn optional(&self) -> &BTreeMap<String, Value> {
        &self.optional
    }

    /// Protected (system-managed) field names.
    pub fn protected(&self) -> &BTreeSet<String> {
        &self.protected
    }

    /// Whether `field` is the primary, a required, or an optional field.
    pub fn is_declared(&self, field: &str) -> bool {
        field == self.primary
            || self.required.iter().any(|f| f == field)
            || self.optional.contains_key(field)
    }

    /// Whether `field` is protected.
    pub fn is_protected(&self, field: &str) -> bool {
        self.protected.contains(field)
    }

    /// Whether `field` is left out of public projections.
    pub fn is_concealed(&self, field: &str) -> bool {
        self.private.contains(field) || self.hidden.contains(field)
    }

    /// The href template, if declared.
    pub fn href_template(&self) -> Option<&str> {
        self.href.as_deref()
    }

    /// Renders the href for a primary value.
    pub fn href_for(&self, primary: &Value) -> Option<String> {
        self.href
            .as_ref()
            .map(|template| template.replacen(HREF_PLACEHOLDER, &primary.to_string(), 1))
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Adds required fields.
    #[must_use]
    pub fn required<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            if !self.schema.required.contains(&field) {
                self.schema.required.push(field);
            }
        }
        self
    }

    /// Adds an optional field with the default written when it is omitted
    /// on create.
    #[must_use]
    pub fn optional(mut self, field: impl Into<String>, default: impl Into<Value>) -> Self {
        self.schema.optional.insert(field.into(), default.into());
        self
    }

    /// Adds protected fields.
    #[must_use]
    pub fn protected<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.protected.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Adds private fields.
    #[must_use]
    pub fn private<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.private.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Adds hidden fields.
    #[must_use]
    pub fn hidden<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.hidden.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Sets the href template; `{}` is replaced by the primary value.
    #[must_use]
    pub fn href(mut self, template: impl Into<String>) -> Self {
        self.schema.href = Some(template.into());
        self
    }

    /// Checks the declaration and returns the schema.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a field is classified twice, a reserved
    /// projection key is declared as a field, or the href template lacks a
    /// `{}` placeholder.
    pub fn build(self) -> StoreResult<Schema> {
        let schema = self.schema;

        if schema.entity_type.is_empty() || schema.primary.is_empty() {
            return Err(StoreError::invalid_input(
                "schema needs an entity type and a primary field",
            ));
        }

        let mut seen = BTreeSet::new();
        let declared = std::iter::once(&schema.primary)
            .chain(schema.required.iter())
            .chain(schema.optional.keys())
            .chain(schema.protected.iter());
        for field in declared {
            if field == ID_FIELD || field == HREF_FIELD {
                return Err(StoreError::invalid_input(format!(
                    "{}: '{field}' is reserved",
                    schema.entity_type
                )));
            }
            if !seen.insert(field.as_str()) {
                return Err(StoreError::invalid_input(format!(
                    "{}: field '{field}' is classified more than once",
                    schema.entity_type
                )));
            }
        }

        if let Some(template) = &schema.href {
            if !template.contains(HREF_PLACEHOLDER) {
                return Err(StoreError::invalid_input(format!(
                    "{}: href template '{template}' has no {HREF_PLACEHOLDER} placeholder",
                    schema.entity_type
                )));
            }
        }

        Ok(schema)
    }
}
