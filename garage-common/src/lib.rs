//! # Garage Common Library
//!
//! Shared code for the garage dashboard services:
//! - Error type used across crates
//! - TOML configuration loading and root folder resolution
//! - SQLite database initialization and schema migrations
//! - Timestamp helpers for stored values

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
