//! Generic entity store.

use crate::connection::ConnectionManager;
use crate::error::{StoreError, StoreResult};
use crate::hooks::{DerivedFields, NoDerivedFields};
use crate::projector::{AttributeRow, Projector};
use crate::record::{Properties, Record};
use crate::schema::{Schema, HREF_FIELD, ID_FIELD, SALT_FIELD, TEST_MODE_FIELD};
use crate::types::{EntityId, Mode, Visibility};
use acom_codec::{to_canonical_text, Value};
use rusqlite::{params, Connection, Params};
use std::sync::Arc;
use tracing::{debug, info};

const LIST_SQL: &str = "
    SELECT e.id, a.key, a.value
    FROM entity e
    LEFT JOIN attribute a ON a.entity_id = e.id
    WHERE e.type = ?1
    ORDER BY e.id, a.id";

const FIND_SQL: &str = "
    SELECT e.id, a.key, a.value
    FROM entity e
    LEFT JOIN attribute a ON a.entity_id = e.id
    WHERE e.type = ?1
    AND e.id IN (
        SELECT ee.id
        FROM entity ee
        JOIN attribute aa ON aa.entity_id = ee.id
        WHERE ee.type = ?1
        AND aa.key = ?2
        AND aa.value = ?3
    )
    ORDER BY e.id, a.id";

const GET_BY_ID_SQL: &str = "
    SELECT e.id, a.key, a.value
    FROM entity e
    LEFT JOIN attribute a ON a.entity_id = e.id
    WHERE e.id = ?1
    AND e.type = ?2
    ORDER BY a.id";

/// Validation, CRUD and lookups for one entity type.
///
/// Every type shares the same two tables; the [`Schema`] passed at
/// construction decides which fields this store accepts and shows.
///
/// # Example
///
/// ```
/// use acom_codec::Value;
/// use acom_store::{ConnectionManager, EntityStore, Properties, Schema, Visibility};
///
/// let connections = ConnectionManager::open_in_memory().unwrap();
/// let hosts = EntityStore::new(
///     connections,
///     Schema::builder("host", "name")
///         .required(["groups"])
///         .optional("vars", Value::empty_map())
///         .build()
///         .unwrap(),
/// );
///
/// let added = hosts
///     .add(
///         Properties::from([
///             ("name".to_string(), Value::from("web1")),
///             ("groups".to_string(), Value::from(vec!["a"])),
///         ]),
///         false,
///     )
///     .unwrap();
/// assert_eq!(added.get("vars"), Some(&Value::empty_map()));
///
/// let found = hosts.lookup(&Value::from("web1"), Visibility::Public).unwrap();
/// assert_eq!(found.id(), added.id());
/// ```
///
/// # Consistency
///
/// `add` runs its existence check and inserts under the shared handle's
/// lock, so two stores sharing one [`ConnectionManager`] cannot both create
/// the same primary value. Separate processes writing the same file can.
/// `edit` commits each attribute write on its own; a failure part way
/// through leaves the earlier writes in place.
pub struct EntityStore {
    schema: Arc<Schema>,
    connections: Arc<ConnectionManager>,
    hooks: Arc<dyn DerivedFields>,
}

impl EntityStore {
    /// Creates a store for `schema` on the shared connection.
    pub fn new(connections: Arc<ConnectionManager>, schema: impl Into<Arc<Schema>>) -> Self {
        Self {
            schema: schema.into(),
            connections,
            hooks: Arc::new(NoDerivedFields),
        }
    }

    /// Attaches derived-field hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn DerivedFields>) -> Self {
        self.hooks = hooks;
        self
    }

    /// This store's schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The connection manager this store writes through.
    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    fn entity_type(&self) -> &str {
        self.schema.entity_type()
    }

    /// The schema's protected set, plus the test-mode marker while in test
    /// mode.
    fn is_protected(&self, field: &str) -> bool {
        self.schema.is_protected(field)
            || (field == TEST_MODE_FIELD && self.connections.is_test_mode())
    }

    /// Validates `fields` against the schema, editing the map in place.
    ///
    /// - In test mode, internal writes get the `TESTMODE` marker.
    /// - A caller-supplied `id` is dropped.
    /// - Public writes lose every protected field, except `_salt`, whose
    ///   presence is a [`StoreError::ForbiddenField`] error. The asymmetry is
    ///   long-standing behavior that callers rely on, so it is kept as is.
    /// - On create, the primary and required fields must be present and
    ///   missing optional fields receive their defaults.
    /// - Anything the schema does not declare is rejected.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a missing primary or required field or an unknown
    /// field; `ForbiddenField` as above.
    pub fn check_required_fields(
        &self,
        fields: &mut Properties,
        mode: Mode,
        visibility: Visibility,
    ) -> StoreResult<()> {
        let internal = visibility.is_internal();

        if internal && self.connections.is_test_mode() {
            fields.insert(TEST_MODE_FIELD.to_string(), Value::Integer(1));
        }

        fields.remove(ID_FIELD);

        if !internal {
            if fields.contains_key(SALT_FIELD) && self.is_protected(SALT_FIELD) {
                return Err(StoreError::ForbiddenField {
                    field: SALT_FIELD.to_string(),
                });
            }
            fields.retain(|name, _| !self.is_protected(name));
        }

        if mode == Mode::Create {
            let primary = self.schema.primary();
            if fields.get(primary).map_or(true, Value::is_null) {
                return Err(StoreError::invalid_input(format!(
                    "missing primary field: {primary}"
                )));
            }

            if let Some(missing) = self
                .schema
                .required()
                .iter()
                .find(|f| !fields.contains_key(f.as_str()))
            {
                return Err(StoreError::invalid_input(format!(
                    "field {missing} is required"
                )));
            }

            for (name, default) in self.schema.optional() {
                fields
                    .entry(name.clone())
                    .or_insert_with(|| default.clone());
            }
        }

        if let Some(unknown) = fields.keys().find(|name| {
            !(self.schema.is_declared(name) || (internal && self.is_protected(name)))
        }) {
            return Err(StoreError::invalid_input(format!("invalid field {unknown}")));
        }

        Ok(())
    }

    /// Creates an entity and returns its public projection.
    ///
    /// Unless `skip_hooks` is set, [`DerivedFields::on_add`] runs before
    /// returning; the returned record is the one read before the hook ran.
    ///
    /// # Errors
    ///
    /// `InvalidInput` from validation, `AlreadyExists` if the primary value
    /// is taken.
    pub fn add(&self, mut properties: Properties, skip_hooks: bool) -> StoreResult<Record> {
        properties.remove(HREF_FIELD);

        let primary = self.schema.primary();
        let name = properties.get(primary).cloned().ok_or_else(|| {
            StoreError::invalid_input(format!("missing value for name field: {primary}"))
        })?;
        self.check_required_fields(&mut properties, Mode::Create, Visibility::Public)?;

        let encoded = properties
            .iter()
            .map(|(key, value)| to_canonical_text(value).map(|text| (key.as_str(), text)))
            .collect::<Result<Vec<_>, _>>()?;

        let entity_id = {
            let shared = self.connections.get();
            let mut conn = shared.lock();

            if self.find_in(&conn, primary, &name, Visibility::Internal)?.is_empty() {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO entity (type) VALUES (?1)",
                    params![self.entity_type()],
                )?;
                let id = tx.last_insert_rowid();
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO attribute (entity_id, key, value) VALUES (?1, ?2, ?3)",
                    )?;
                    for (key, text) in &encoded {
                        stmt.execute(params![id, key, text])?;
                    }
                }
                tx.commit()?;
                EntityId::new(id)
            } else {
                return Err(StoreError::AlreadyExists {
                    entity_type: self.entity_type().to_string(),
                    primary: name.to_string(),
                });
            }
        };
        debug!(entity_type = self.entity_type(), %entity_id, %name, "added entity");

        let record = self.lookup(&name, Visibility::Public)?;
        if !skip_hooks {
            self.hooks.on_add(self, &name, &record)?;
        }
        Ok(record)
    }

    /// Updates fields of the entity whose primary value is `name`.
    ///
    /// Absent attributes are inserted, changed ones updated, unchanged ones
    /// left alone. Returns the entity projected at `visibility`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` or `ForbiddenField` from validation,
    /// `RenameNotSupported` if the payload carries a different primary
    /// value, `DoesNotExist`/`Ambiguous` from the lookup of `name`.
    pub fn edit(
        &self,
        name: &Value,
        mut properties: Properties,
        visibility: Visibility,
        skip_hooks: bool,
    ) -> StoreResult<Record> {
        properties.remove(HREF_FIELD);

        self.check_required_fields(&mut properties, Mode::Edit, visibility)?;

        if let Some(requested) = properties.get(self.schema.primary()) {
            if requested != name {
                return Err(StoreError::RenameNotSupported {
                    from: name.to_string(),
                    to: requested.to_string(),
                });
            }
        }

        let current = self.lookup(name, Visibility::Internal)?;
        let id = current.id();

        // Compared in stored form: 0.0 and -0.0 are equal values but distinct
        // text, and `find` matches on text.
        for (key, value) in &properties {
            match current.get(key) {
                None => self.insert_attribute(id, key, value)?,
                Some(existing) => {
                    if to_canonical_text(existing)? != to_canonical_text(value)? {
                        self.update_attribute(id, key, value)?;
                    }
                }
            }
        }

        let current = self.lookup(name, Visibility::Internal)?;
        if !skip_hooks {
            self.hooks.on_edit(self, name, &current)?;
        }
        self.lookup(name, visibility)
    }

    fn insert_attribute(&self, id: EntityId, key: &str, value: &Value) -> StoreResult<()> {
        let text = to_canonical_text(value)?;
        let shared = self.connections.get();
        let conn = shared.lock();
        conn.execute(
            "INSERT INTO attribute (entity_id, key, value) VALUES (?1, ?2, ?3)",
            params![id.as_i64(), key, text],
        )?;
        debug!(entity_type = self.entity_type(), entity_id = %id, key, "inserted attribute");
        Ok(())
    }

    fn update_attribute(&self, id: EntityId, key: &str, value: &Value) -> StoreResult<()> {
        let text = to_canonical_text(value)?;
        let shared = self.connections.get();
        let conn = shared.lock();
        conn.execute(
            "UPDATE attribute SET value = ?1 WHERE entity_id = ?2 AND key = ?3",
            params![text, id.as_i64(), key],
        )?;
        debug!(entity_type = self.entity_type(), entity_id = %id, key, "updated attribute");
        Ok(())
    }

    /// All entities having attribute `key` with exactly `value`.
    ///
    /// Matching compares canonical encodings, so `["a"]` does not match an
    /// entity whose value is `["a", "b"]`. Each returned record carries all
    /// of its fields, not just `key`.
    pub fn find(&self, key: &str, value: &Value, visibility: Visibility) -> StoreResult<Vec<Record>> {
        let shared = self.connections.get();
        let conn = shared.lock();
        self.find_in(&conn, key, value, visibility)
    }

    /// Like [`EntityStore::find`], but exactly one entity must match.
    ///
    /// # Errors
    ///
    /// `DoesNotExist` for no match, `Ambiguous` for several.
    pub fn find_one(&self, key: &str, value: &Value, visibility: Visibility) -> StoreResult<Record> {
        let records = self.find(key, value, visibility)?;
        self.expect_one(records, key, value)?.ok_or_else(|| StoreError::DoesNotExist {
            entity_type: self.entity_type().to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// The entity whose primary value is `value`.
    ///
    /// # Errors
    ///
    /// `DoesNotExist` for no match, `Ambiguous` for several.
    pub fn lookup(&self, value: &Value, visibility: Visibility) -> StoreResult<Record> {
        self.find_one(self.schema.primary(), value, visibility)
    }

    /// The entity whose primary value is `value`, or `None`.
    ///
    /// # Errors
    ///
    /// `Ambiguous` if several entities share the value.
    pub fn try_lookup(&self, value: &Value, visibility: Visibility) -> StoreResult<Option<Record>> {
        let primary = self.schema.primary();
        let records = self.find(primary, value, visibility)?;
        self.expect_one(records, primary, value)
    }

    /// The entity with surrogate id `id`.
    ///
    /// # Errors
    ///
    /// `DoesNotExist` if no entity of this type has that id.
    pub fn get_by_id(&self, id: EntityId, visibility: Visibility) -> StoreResult<Record> {
        self.find_by_id(id, visibility)?
            .ok_or_else(|| StoreError::DoesNotExist {
                entity_type: self.entity_type().to_string(),
                key: ID_FIELD.to_string(),
                value: id.to_string(),
            })
    }

    /// The entity with surrogate id `id`, or `None`.
    pub fn find_by_id(&self, id: EntityId, visibility: Visibility) -> StoreResult<Option<Record>> {
        let rows = {
            let shared = self.connections.get();
            let conn = shared.lock();
            query_rows(&conn, GET_BY_ID_SQL, params![id.as_i64(), self.entity_type()])?
        };
        let records = Projector::new(&self.schema, visibility).project(rows)?;
        self.expect_one(records, ID_FIELD, &Value::Integer(id.as_i64()))
    }

    /// Every entity of this type.
    pub fn list(&self, visibility: Visibility) -> StoreResult<Vec<Record>> {
        let rows = {
            let shared = self.connections.get();
            let conn = shared.lock();
            query_rows(&conn, LIST_SQL, params![self.entity_type()])?
        };
        Projector::new(&self.schema, visibility).project(rows)
    }

    /// Deletes the entity whose primary value is `value`, along with all of
    /// its attributes. Deleting a value that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// `Ambiguous` if several entities share the value.
    pub fn delete(&self, value: &Value) -> StoreResult<()> {
        let primary = self.schema.primary();
        let Some(record) = self.try_lookup(value, Visibility::Public)? else {
            debug!(entity_type = self.entity_type(), %value, "delete of absent entity");
            return Ok(());
        };

        let shared = self.connections.get();
        let mut conn = shared.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM attribute WHERE entity_id = ?1",
            params![record.id().as_i64()],
        )?;
        tx.execute("DELETE FROM entity WHERE id = ?1", params![record.id().as_i64()])?;
        tx.commit()?;

        info!(entity_type = self.entity_type(), entity_id = %record.id(), key = primary, %value, "deleted entity");
        Ok(())
    }

    /// Removes every entity of this type from the test store.
    ///
    /// Returns the number of entities removed.
    ///
    /// # Errors
    ///
    /// `TestModeRequired` unless the connection manager is in test mode.
    pub fn clear_test_data(&self) -> StoreResult<usize> {
        if !self.connections.is_test_mode() {
            return Err(StoreError::test_mode_required("clear_test_data"));
        }

        let shared = self.connections.get();
        let mut conn = shared.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM attribute WHERE entity_id IN (SELECT id FROM entity WHERE type = ?1)",
            params![self.entity_type()],
        )?;
        let removed = tx.execute(
            "DELETE FROM entity WHERE type = ?1",
            params![self.entity_type()],
        )?;
        tx.commit()?;

        info!(entity_type = self.entity_type(), removed, "cleared test data");
        Ok(removed)
    }

    fn find_in(
        &self,
        conn: &Connection,
        key: &str,
        value: &Value,
        visibility: Visibility,
    ) -> StoreResult<Vec<Record>> {
        let text = to_canonical_text(value)?;
        let rows = query_rows(conn, FIND_SQL, params![self.entity_type(), key, text])?;
        Projector::new(&self.schema, visibility).project(rows)
    }

    fn expect_one(
        &self,
        mut records: Vec<Record>,
        key: &str,
        value: &Value,
    ) -> StoreResult<Option<Record>> {
        match records.len() {
            0 => Ok(None),
            1 => Ok(records.pop()),
            count => Err(StoreError::Ambiguous {
                entity_type: self.entity_type().to_string(),
                key: key.to_string(),
                value: value.to_string(),
                count,
            }),
        }
    }
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("entity_type", &self.entity_type())
            .field("connections", &self.connections)
            .finish_non_exhaustive()
    }
}

fn query_rows<P: Params>(conn: &Connection, sql: &str, params: P) -> StoreResult<Vec<AttributeRow>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params, |row| {
        Ok(AttributeRow {
            entity_id: EntityId::new(row.get(0)?),
            key: row.get(1)?,
            value: row.get(2)?,
        })
    })?;
    let rows = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
