//! # acom testkit
//!
//! Test utilities for acom.
//!
//! This crate provides:
//! - Test fixtures: throwaway stores and ready-made schemas
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use acom_testkit::prelude::*;
//!
//! #[test]
//! fn adds_a_host() {
//!     with_temp_store(|connections| {
//!         let hosts = EntityStore::new(connections, schemas::host());
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use acom_codec::Value;
    pub use acom_store::{EntityStore, Properties, Visibility};
}

pub use fixtures::*;
pub use generators::*;
