//! # AMD Admin Common Library
//!
//! Shared code for the AMD administrative service:
//! - Domain model structs (users, tariffs, recognition rows)
//! - Error type
//! - Configuration loading
//! - Password hashing and token generation
//! - Database initialization and seeding

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};
