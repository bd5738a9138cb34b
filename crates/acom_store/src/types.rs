//! Core type definitions for the entity store.

use std::fmt;

/// Surrogate identifier of a stored entity.
///
/// Assigned by the backing store on insert and never reused for another
/// entity while the row exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub i64);

impl EntityId {
    /// Creates a new entity ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which fields a projection exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Default view: private and hidden fields are left out.
    #[default]
    Public,
    /// Trusted internal view: every stored field is shown, and protected
    /// fields may be written.
    Internal,
}

impl Visibility {
    /// Whether this is the internal view.
    #[must_use]
    pub const fn is_internal(self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Validation mode for [`crate::EntityStore::check_required_fields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Creating a new entity: primary and required fields are enforced and
    /// optional defaults filled in.
    Create,
    /// Editing an existing entity: only supplied fields are checked.
    Edit,
}
