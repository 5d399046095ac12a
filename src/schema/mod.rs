//! Tabular input schema
//!
//! This module defines the row type shared by screen and battery tables and
//! the adapter that reads them from JSON or NDJSON.

mod raw_record;
mod adapter;

pub use raw_record::*;
pub use adapter::*;
