//! Derived-field callbacks run after writes.

use crate::error::StoreResult;
use crate::record::Record;
use crate::store::EntityStore;
use acom_codec::Value;

/// Computes fields derived from an entity after it is written.
///
/// Both methods default to doing nothing. Implementations usually write
/// their results back with an internal edit that skips hooks, so the
/// callback does not recurse:
///
/// ```rust,ignore
/// impl DerivedFields for HostVarsRollup {
///     fn on_edit(&self, store: &EntityStore, name: &Value, record: &Record) -> StoreResult<()> {
///         let merged = self.merge(record);
///         store.edit(name, Properties::from([("_merged".into(), merged)]), Visibility::Internal, true)?;
///         Ok(())
///     }
/// }
/// ```
pub trait DerivedFields: Send + Sync {
    /// Called after `add` with the freshly stored entity.
    fn on_add(&self, store: &EntityStore, name: &Value, record: &Record) -> StoreResult<()> {
        let _ = (store, name, record);
        Ok(())
    }

    /// Called after `edit` with the entity's internal projection.
    fn on_edit(&self, store: &EntityStore, name: &Value, record: &Record) -> StoreResult<()> {
        let _ = (store, name, record);
        Ok(())
    }
}

/// Hook set that derives nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDerivedFields;

impl DerivedFields for NoDerivedFields {}
