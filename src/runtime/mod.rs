//! Running queries through `psql`
//!
//! - [`command`] builds the argument vector and environment
//! - [`runner`] owns a single subprocess
//! - [`work`] splits an invocation into units
//! - [`coordinator`] runs a batch of units concurrently

pub mod command;
pub mod coordinator;
pub mod runner;
pub mod work;

pub use command::{password_required, CommandBuilder, PsqlCommand, DEFAULT_PSQL_PATH};
pub use coordinator::{
    BatchReport, ExecutionCoordinator, PsqlExecutor, QueryExecutor, UnitReport,
};
pub use runner::{ExitClass, QueryInput, QueryRunner, RunResult, RunnerState};
pub use work::{plan, plan_files, plan_queries, WorkUnit};
