//! Core types and shared functionality for litmark.
//!
//! This crate provides:
//! - The highlight data model and the shared validation boundary
//! - Static limits consumed by every other layer
//! - Summary cache fingerprinting
//! - Unified error types
//! - Layered configuration (env, TOML, persisted settings, key file)
//! - The SQLite-backed key-value store

pub mod config;
pub mod error;
pub mod hash;
pub mod limits;
pub mod model;
pub mod store;

pub use config::AppConfig;
pub use error::Error;
pub use model::{ExportPayload, Highlight, ImportReport, SummaryEntry, TextPosition};
pub use store::StoreDb;
