//! Integration tests for the entity store.

use acom_store::{
    Config, ConnectionManager, EntityId, EntityStore, Properties, Schema, StoreError, Value,
    Visibility,
};
use acom_testkit::prelude::*;
use acom_testkit::scenarios::host_payload;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

fn orphan_attributes(connections: &ConnectionManager) -> i64 {
    let shared = connections.get();
    let conn = shared.lock();
    conn.query_row(
        "SELECT COUNT(*) FROM attribute WHERE entity_id NOT IN (SELECT id FROM entity)",
        [],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn host_lifecycle() {
    let store = TestStore::memory();
    let hosts = store.entities(schemas::host());
    let web1 = Value::from("web1");

    let added = hosts.add(host_payload("web1", &["a"]), false).unwrap();
    assert_eq!(
        added.to_value(),
        Value::map([
            ("id", Value::Integer(1)),
            ("name", Value::from("web1")),
            ("groups", Value::from(vec!["a"])),
            ("vars", Value::empty_map()),
            ("href", Value::from("/api/hosts/web1/")),
        ])
    );

    let edited = hosts
        .edit(
            &web1,
            Properties::from([("groups".to_string(), Value::from(vec!["a", "b"]))]),
            Visibility::Public,
            false,
        )
        .unwrap();
    assert_eq!(
        edited.to_value(),
        Value::map([
            ("id", Value::Integer(1)),
            ("name", Value::from("web1")),
            ("groups", Value::from(vec!["a", "b"])),
            ("vars", Value::empty_map()),
            ("href", Value::from("/api/hosts/web1/")),
        ])
    );
    assert_eq!(hosts.lookup(&web1, Visibility::Public).unwrap(), edited);

    // matching is on the whole canonical value
    assert!(hosts
        .find("groups", &Value::from(vec!["a"]), Visibility::Public)
        .unwrap()
        .is_empty());
    let found = hosts
        .find("groups", &Value::from(vec!["a", "b"]), Visibility::Public)
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("name"), Some(&web1));

    hosts.delete(&web1).unwrap();
    assert!(hosts.lookup(&web1, Visibility::Public).unwrap_err().is_not_found());
    hosts.delete(&web1).unwrap();
    assert_eq!(orphan_attributes(&store), 0);
}

#[test]
fn to_value_carries_id_and_href() {
    let store = TestStore::memory();
    let hosts = store.entities(schemas::host());
    let record = hosts.add(host_payload("web1", &[]), false).unwrap();

    let value = record.to_value();
    assert_eq!(value.get("id"), Some(&Value::Integer(record.id().as_i64())));
    assert_eq!(value.get("href"), Some(&Value::from("/api/hosts/web1/")));
    assert_eq!(value.get("groups"), Some(&Value::Array(vec![])));
}

#[test]
fn types_share_tables_but_not_rows() {
    let store = TestStore::memory();
    let hosts = store.entities(schemas::host());
    let groups = store.entities(schemas::group());

    hosts.add(host_payload("web", &["web"]), false).unwrap();
    groups
        .add(Properties::from([("name".to_string(), Value::from("web"))]), false)
        .unwrap();

    let host = hosts.lookup(&Value::from("web"), Visibility::Public).unwrap();
    let group = groups.lookup(&Value::from("web"), Visibility::Public).unwrap();
    assert_ne!(host.id(), group.id());
    assert_eq!(group.get("parents"), Some(&Value::Array(vec![])));
    assert_eq!(group.href(), Some("/api/groups/web/"));

    hosts.delete(&Value::from("web")).unwrap();
    assert!(groups.try_lookup(&Value::from("web"), Visibility::Public).unwrap().is_some());
    assert_eq!(
        store.type_counts().unwrap(),
        vec![("group".to_string(), 1)]
    );
}

#[test]
fn hidden_fields_only_in_internal_view() {
    let store = TestStore::memory();
    let users = store.entities(schemas::user());
    let alice = Value::from("alice");

    let added = users
        .add(
            Properties::from([
                ("login".to_string(), alice.clone()),
                ("password".to_string(), Value::from("hash")),
            ]),
            false,
        )
        .unwrap();
    assert!(!added.contains_key("password"));
    assert_eq!(added.get("email"), Some(&Value::Null));
    assert_eq!(added.href(), None);

    let internal = users.lookup(&alice, Visibility::Internal).unwrap();
    assert_eq!(internal.get("password"), Some(&Value::from("hash")));
}

#[test]
fn fabricated_duplicates_are_ambiguous() {
    let store = TestStore::memory();
    let hosts = store.entities(schemas::host());
    {
        let shared = store.get();
        let conn = shared.lock();
        conn.execute_batch(
            "INSERT INTO entity (id, type) VALUES (1, 'host'), (2, 'host');
             INSERT INTO attribute (entity_id, key, value) VALUES (1, 'name', '\"dup\"');
             INSERT INTO attribute (entity_id, key, value) VALUES (2, 'name', '\"dup\"');",
        )
        .unwrap();
    }
    let dup = Value::from("dup");

    assert!(matches!(
        hosts.lookup(&dup, Visibility::Public),
        Err(StoreError::Ambiguous { count: 2, .. })
    ));
    assert!(matches!(
        hosts.try_lookup(&dup, Visibility::Public),
        Err(StoreError::Ambiguous { .. })
    ));
    assert!(matches!(hosts.delete(&dup), Err(StoreError::Ambiguous { .. })));
    assert!(matches!(
        hosts.add(host_payload("dup", &[]), false),
        Err(StoreError::AlreadyExists { .. })
    ));
    assert_eq!(hosts.list(Visibility::Public).unwrap().len(), 2);
}

#[test]
fn malformed_entities_are_reported() {
    let store = TestStore::memory();
    let hosts = store.entities(schemas::host());
    hosts.add(host_payload("web1", &[]), false).unwrap();
    {
        let shared = store.get();
        let conn = shared.lock();
        conn.execute("INSERT INTO entity (id, type) VALUES (50, 'host')", [])
            .unwrap();
    }

    assert_eq!(
        store.malformed_entities("host", "name").unwrap(),
        vec![EntityId::new(50)]
    );
    // listed, but no lookup can reach it
    let listed = hosts.list(Visibility::Public).unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed[1].fields().is_empty());
}

#[test]
fn clear_test_data_touches_only_its_type() {
    let store = TestStore::test_mode();
    let hosts = store.entities(schemas::host());
    let groups = store.entities(schemas::group());

    hosts.add(host_payload("web1", &[]), false).unwrap();
    hosts.add(host_payload("web2", &[]), false).unwrap();
    groups
        .add(Properties::from([("name".to_string(), Value::from("all"))]), false)
        .unwrap();

    assert_eq!(hosts.clear_test_data().unwrap(), 2);
    assert!(hosts.list(Visibility::Public).unwrap().is_empty());
    assert_eq!(groups.list(Visibility::Public).unwrap().len(), 1);
    assert_eq!(orphan_attributes(&store), 0);
}

#[test]
fn test_mode_leaves_main_store_alone() {
    let store = TestStore::file();
    let path = store.path().unwrap();
    let hosts = store.entities(schemas::host());
    hosts.add(host_payload("prod1", &[]), false).unwrap();

    store.enter_test_mode().unwrap();
    assert!(hosts.list(Visibility::Public).unwrap().is_empty());
    hosts.add(host_payload("scratch", &[]), false).unwrap();

    // test-mode writes through the internal view carry the marker
    let internal = hosts
        .edit(&Value::from("scratch"), Properties::new(), Visibility::Internal, false)
        .unwrap();
    assert_eq!(internal.get("TESTMODE"), Some(&Value::Integer(1)));
    hosts.clear_test_data().unwrap();

    let reopened = ConnectionManager::open(Config::new(&path)).unwrap();
    let main_hosts = EntityStore::new(reopened, schemas::host());
    let names: Vec<_> = main_hosts
        .list(Visibility::Public)
        .unwrap()
        .into_iter()
        .filter_map(|r| r.get("name").cloned())
        .collect();
    assert_eq!(names, vec![Value::from("prod1")]);
}

#[test]
fn data_persists_across_reopen() {
    with_file_store(|connections, path| {
        let hosts = EntityStore::new(connections, schemas::host());
        hosts.add(host_payload("web1", &["a"]), false).unwrap();
        drop(hosts);

        let reopened = ConnectionManager::open(Config::new(path)).unwrap();
        let hosts = EntityStore::new(reopened, schemas::host());
        let record = hosts.lookup(&Value::from("web1"), Visibility::Public).unwrap();
        assert_eq!(record.get("groups"), Some(&Value::from(vec!["a"])));
    });
}

#[test]
fn concurrent_adds_of_one_name_create_one_entity() {
    let store = TestStore::file();
    let hosts = Arc::new(store.entities(schemas::host()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let hosts = Arc::clone(&hosts);
            thread::spawn(move || {
                hosts.add(host_payload("contested", &[format!("g{i}").as_str()]), false)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let created = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(created, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, StoreError::AlreadyExists { .. })));
    assert!(hosts
        .try_lookup(&Value::from("contested"), Visibility::Public)
        .unwrap()
        .is_some());
}

#[test]
fn concurrent_adds_of_distinct_names() {
    with_temp_store(|connections| {
        let hosts = Arc::new(EntityStore::new(connections, schemas::host()));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let hosts = Arc::clone(&hosts);
                thread::spawn(move || {
                    for i in 0..10 {
                        hosts
                            .add(host_payload(&format!("t{t}-{i}"), &[]), false)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(hosts.list(Visibility::Public).unwrap().len(), 40);
    });
}

fn blob_schema() -> Schema {
    Schema::builder("blob", "name")
        .optional("data", Value::Null)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn stored_values_read_back_unchanged(data in value_strategy()) {
        let store = TestStore::memory();
        let blobs = store.entities(blob_schema());
        blobs
            .add(
                Properties::from([
                    ("name".to_string(), Value::from("b")),
                    ("data".to_string(), data.clone()),
                ]),
                false,
            )
            .unwrap();

        let record = blobs.lookup(&Value::from("b"), Visibility::Public).unwrap();
        prop_assert_eq!(record.get("data"), Some(&data));

        let found = blobs.find("data", &data, Visibility::Public).unwrap();
        prop_assert_eq!(found.len(), 1);
    }

    #[test]
    fn operations_match_model(ops in operation_sequence_strategy(4, 1, 40)) {
        let store = TestStore::memory();
        let hosts = store.entities(schemas::host());
        let mut model: BTreeMap<String, Value> = BTreeMap::new();

        for op in ops {
            match op {
                HostOperation::Add { name, groups } => {
                    let payload = Properties::from([
                        ("name".to_string(), Value::from(name.as_str())),
                        ("groups".to_string(), groups.clone()),
                    ]);
                    let result = hosts.add(payload, false);
                    if model.contains_key(&name) {
                        let is_duplicate = matches!(result, Err(StoreError::AlreadyExists { .. }));
                        prop_assert!(is_duplicate);
                    } else {
                        prop_assert!(result.is_ok());
                        model.insert(name, groups);
                    }
                }
                HostOperation::Edit { name, groups } => {
                    let payload = Properties::from([("groups".to_string(), groups.clone())]);
                    let result = hosts.edit(&Value::from(name.as_str()), payload, Visibility::Public, false);
                    match model.get_mut(&name) {
                        Some(current) => {
                            let record = result.unwrap();
                            prop_assert_eq!(record.get("groups"), Some(&groups));
                            *current = groups;
                        }
                        None => prop_assert!(result.unwrap_err().is_not_found()),
                    }
                }
                HostOperation::Delete { name } => {
                    hosts.delete(&Value::from(name.as_str())).unwrap();
                    model.remove(&name);
                }
            }
        }

        let stored: BTreeMap<String, Value> = hosts
            .list(Visibility::Public)
            .unwrap()
            .into_iter()
            .map(|r| {
                let name = r.get("name").and_then(Value::as_text).unwrap().to_string();
                (name, r.get("groups").cloned().unwrap())
            })
            .collect();
        prop_assert_eq!(stored, model);
        prop_assert_eq!(orphan_attributes(&store), 0);
    }
}
