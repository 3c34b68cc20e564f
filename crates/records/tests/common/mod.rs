//! Test infrastructure for the record services.
//!
//! Provides service factories over in-memory SQLite, event sinks that record
//! or reject what they receive, and a small schema-checking validator.

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
