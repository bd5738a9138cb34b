//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random values and store operations
//! that stay within what the store accepts.

use acom_codec::Value;
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for generating scalar values.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e12..1.0e12f64).prop_map(Value::Float),
        "\\PC{0,16}".prop_map(Value::Text),
    ]
}

/// Strategy for generating arbitrary nested values.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..6).prop_map(Value::Map),
        ]
    })
}

/// Strategy for generating primary values such as host names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,11}").expect("Invalid regex")
}

/// Strategy for generating group lists.
pub fn groups_strategy() -> impl Strategy<Value = Value> {
    prop::collection::vec("[a-z]{1,6}", 0..4)
        .prop_map(|groups| Value::Array(groups.into_iter().map(Value::Text).collect()))
}

/// Strategy for generating host vars maps.
pub fn vars_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-z_]{1,8}", scalar_strategy(), 0..4)
        .prop_map(|vars: BTreeMap<String, Value>| Value::Map(vars))
}

/// A store operation against hosts named from a small pool.
#[derive(Debug, Clone)]
pub enum HostOperation {
    /// Add a host
    Add {
        /// Host name
        name: String,
        /// Group list
        groups: Value,
    },
    /// Edit a host's groups
    Edit {
        /// Host name
        name: String,
        /// New group list
        groups: Value,
    },
    /// Delete a host
    Delete {
        /// Host name
        name: String,
    },
}

/// Strategy for generating host operations over a pool of `pool` names.
///
/// A small pool makes collisions (duplicate adds, edits of deleted hosts)
/// likely.
pub fn host_operation_strategy(pool: usize) -> impl Strategy<Value = HostOperation> {
    let name = (0..pool.max(1)).prop_map(|i| format!("host{i}"));
    prop_oneof![
        3 => (name.clone(), groups_strategy())
            .prop_map(|(name, groups)| HostOperation::Add { name, groups }),
        2 => (name.clone(), groups_strategy())
            .prop_map(|(name, groups)| HostOperation::Edit { name, groups }),
        1 => name.prop_map(|name| HostOperation::Delete { name }),
    ]
}

/// Strategy for generating a sequence of host operations.
pub fn operation_sequence_strategy(
    pool: usize,
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<HostOperation>> {
    prop::collection::vec(host_operation_strategy(pool), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
