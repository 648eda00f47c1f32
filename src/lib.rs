//! Tenant spreadsheet reconciliation for recruiting and insurance dashboards.
//!
//! Each tenant's Google Sheet is mirrored into local SQLite tables keyed by a
//! positional row id, with an analytics cache that survives sheet outages.

pub mod analytics;
pub mod classify;
pub mod cmd;
pub mod config;
pub mod error;
pub mod export;
pub mod records;
pub mod schema;
pub mod sheets;
pub mod store;
pub mod sync;
pub mod types;

pub use error::{Error, Result};
