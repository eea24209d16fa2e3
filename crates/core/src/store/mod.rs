//! SQLite-backed persistent store for highlights and summaries.
//!
//! This module provides the single local store behind the storage
//! coordinator, using SQLite with async access via tokio-rusqlite.
//! It supports:
//!
//! - JSON document values under stable top-level keys
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - A best-effort version marker checked at startup
//!
//! The store itself does not serialize read-modify-write sequences;
//! that is the coordinator's job. It only guarantees that each single
//! read or write is atomic.

pub mod connection;
pub mod kv;
pub mod migrations;

pub use crate::Error;

pub use connection::StoreDb;
pub use kv::{KEY_HIGHLIGHTS, KEY_SETTINGS, KEY_SUMMARY_CACHE, KEY_VERSION, STORE_VERSION};
