//! Database access layer: initialization, schema, and seeding

pub mod init;

pub use init::{create_schema, init_database, seed_default_admin, seed_default_roles};
