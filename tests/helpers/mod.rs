//! Test helpers module
//!
//! In-memory fixtures for the scheduling services and an optional Postgres
//! database for store-level tests.

#![allow(dead_code)]

pub mod database_helper;
pub mod fixtures;

pub use database_helper::*;
pub use fixtures::*;
