//! Migration framework
//!
//! - Embedded SQL migrations applied in order
//! - Idempotent application, one transaction per migration
//! - Checksums recorded and verified against the embedded SQL

mod checksums;
mod embedded;
mod runner;

pub use embedded::{get_migrations, Migration};
pub use runner::{apply_migrations, current_schema_version};
