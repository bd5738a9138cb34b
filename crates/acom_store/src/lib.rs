//! # acom store
//!
//! Generic entity/attribute storage for acom.
//!
//! Every entity type (hosts, groups, users, ...) shares two tables: one row
//! per entity, one row per attribute. A [`Schema`] declares what a type
//! accepts and which of its fields are shown to whom, and an
//! [`EntityStore`] enforces it on every write and projection.
//!
//! This crate provides:
//! - [`ConnectionManager`]: the one shared handle, with an isolated test mode
//! - [`Schema`]: field classification, built with [`SchemaBuilder`]
//! - [`EntityStore`]: validation, create/edit/delete and lookups
//! - [`Projector`]: attribute rows to [`Record`]s
//! - [`DerivedFields`]: per-type hooks run after writes
//!
//! Values are stored in canonical text form via [`acom_codec`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connection;
mod error;
mod hooks;
mod projector;
mod record;
mod schema;
mod store;
mod types;

pub use acom_codec::Value;
pub use config::Config;
pub use connection::{ConnectionManager, SharedConnection};
pub use error::{StoreError, StoreResult};
pub use hooks::{DerivedFields, NoDerivedFields};
pub use projector::{AttributeRow, Projector};
pub use record::{Properties, Record};
pub use schema::{Schema, SchemaBuilder, HREF_FIELD, ID_FIELD, SALT_FIELD, TEST_MODE_FIELD};
pub use store::EntityStore;
pub use types::{EntityId, Mode, Visibility};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
