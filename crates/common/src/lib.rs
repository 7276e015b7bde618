//! Shared utilities, configuration, and error handling for Warden
//!
//! This crate provides common functionality used across the Warden workspace:
//! - Configuration management following 12-factor principles
//! - Error types and their HTTP mapping
//! - Storage error types shared by entity stores

pub mod config;
pub mod db;
pub mod error;

pub use config::{env_parse, env_string, Config};
pub use db::RepositoryError;
pub use error::{Error, Result};
