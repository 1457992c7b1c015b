//! # jsonstore testkit
//!
//! Test utilities for jsonstore.
//!
//! This crate provides:
//! - Store fixtures over memory and temporary files
//! - Sample record types with matching constraints
//! - Property-based test generators using proptest
//! - A logging helper for tests
//!
//! ## Usage
//!
//! ```rust
//! use jsonstore_testkit::prelude::*;
//!
//! with_memory_store(|store| {
//!     let mut users = store.get_collection::<User>().unwrap();
//!     users.insert(User::new(1, "alice")).unwrap();
//!     assert_eq!(users.count().unwrap(), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
