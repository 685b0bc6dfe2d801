//! Local SQLite cache of fetched activity logs.
//!
//! This module provides:
//! - Database initialization and migrations
//! - Repository layer for cached events and sync coverage

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{Repository, SyncState};
