//! Restore planning and script generation.
//!
//! The planner turns table descriptors into a [`RestorePlan`]: typed
//! statements grouped by [`Phase`], each phase covering every table before
//! the next one starts. The script module renders a plan as a psql script.

pub mod export;
pub mod phase;
pub mod planner;
pub mod script;
pub mod statement;

pub use export::{copy_out_statement, count_statement, export_query, render_export_script};
pub use phase::Phase;
pub use planner::{PhaseSteps, RestorePlan, plan_restore};
pub use script::{RestoreScript, generate_restore_script, render_readme, render_restore_script};
pub use statement::{LoadStatement, Statement};
