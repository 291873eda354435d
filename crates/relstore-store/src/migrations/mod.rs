//! Migration framework
//!
//! - Embedded SQL migrations
//! - Idempotent application, one transaction per migration
//! - Checksum verification of already-applied migrations

mod checksums;
mod embedded;
mod runner;

pub use runner::{applied_revision, apply_migrations};
