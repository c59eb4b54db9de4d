//! Restore execution: apply an artifact's restore plan to a target database
//! inside one transaction.

pub mod compat;
pub mod error;
pub mod executor;
pub mod postgres;
pub mod target;

pub use compat::check_target_compatibility;
pub use error::RestoreError;
pub use executor::{PreparedRestore, RestoreReport, TableLoad, execute_restore, prepare_restore};
pub use postgres::PgRestoreTransaction;
pub use target::RestoreTransaction;
