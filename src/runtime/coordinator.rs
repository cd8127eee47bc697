//! Running a batch of queries concurrently
//!
//! Every unit gets its own task and its own `psql` process. A unit appends
//! its output to the shared sink as soon as it finishes; appends from
//! different units are serialised by one lock but their order is whatever
//! order the processes finish in. The coordinator reports each unit as it
//! completes and returns once all of them have.

use crate::editor::{OutputSink, StatusNotifier};
use crate::runtime::command::PsqlCommand;
use crate::runtime::runner::{ExitClass, QueryRunner, RunResult};
use crate::runtime::work::WorkUnit;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Runs the query of a single unit
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, unit: &WorkUnit) -> RunResult;
}

/// Executes units with a real `psql` process
#[derive(Debug, Clone)]
pub struct PsqlExecutor {
    command: PsqlCommand,
    timeout: Option<Duration>,
}

impl PsqlExecutor {
    pub fn new(command: PsqlCommand) -> Self {
        Self {
            command,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl QueryExecutor for PsqlExecutor {
    async fn execute(&self, unit: &WorkUnit) -> RunResult {
        QueryRunner::new(self.command.clone(), unit.input.clone())
            .with_timeout(self.timeout)
            .run()
            .await
    }
}

/// Completion record of one unit
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub label: String,
    pub index: usize,
    pub exit_code: Option<i32>,
    pub class: Option<ExitClass>,
    /// From launch until the output was appended
    pub elapsed_ms: u128,
    pub failed: bool,
}

/// Completion record of a whole batch, in completion order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub units: Vec<UnitReport>,
    pub elapsed_ms: u128,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.units
            .iter()
            .all(|unit| unit.class.is_some_and(|class| class.is_success()))
    }

    pub fn failures(&self) -> usize {
        self.units.iter().filter(|unit| unit.failed).count()
    }
}

/// Fans a batch of units out over concurrent tasks
pub struct ExecutionCoordinator {
    sink: Arc<dyn OutputSink>,
    notifier: Arc<dyn StatusNotifier>,
    output_lock: Arc<Mutex<()>>,
}

impl ExecutionCoordinator {
    pub fn new(sink: Arc<dyn OutputSink>, notifier: Arc<dyn StatusNotifier>) -> Self {
        Self {
            sink,
            notifier,
            output_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Clear the sink, run every unit concurrently and wait for all of them
    pub async fn run_batch(
        &self,
        units: Vec<WorkUnit>,
        executor: Arc<dyn QueryExecutor>,
    ) -> BatchReport {
        let batch_started = Instant::now();
        let total = units.len();

        self.sink.clear();
        self.notifier.notify("PostgreSQL query executing...");

        let mut tasks = JoinSet::new();
        for unit in units {
            let executor = Arc::clone(&executor);
            let sink = Arc::clone(&self.sink);
            let lock = Arc::clone(&self.output_lock);
            let started = Instant::now();

            tasks.spawn(async move {
                let result = executor.execute(&unit).await;
                {
                    let _guard = lock.lock();
                    sink.append(&result.output);
                    sink.show();
                }
                (unit, started, result)
            });
        }
        debug!("Started {} queries", total);

        let mut report = BatchReport::default();
        while let Some(joined) = tasks.join_next().await {
            let (unit, started, result) = match joined {
                Ok(finished) => finished,
                Err(e) => {
                    warn!("Query task did not complete: {}", e);
                    self.notifier.notify("PostgreSQL query errored.");
                    continue;
                }
            };

            let elapsed_ms = started.elapsed().as_millis();
            let label = unit.label();
            if result.error.is_some() {
                self.notifier.notify("PostgreSQL query errored.");
            }
            self.notifier.notify(&format!(
                "PostgreSQL {} completed in {} ms.",
                label, elapsed_ms
            ));

            report.units.push(UnitReport {
                label,
                index: unit.index,
                exit_code: result.exit_code,
                class: result.class,
                elapsed_ms,
                failed: result.error.is_some(),
            });
        }

        report.elapsed_ms = batch_started.elapsed().as_millis();
        if total > 1 {
            self.notifier.notify(&format!(
                "PostgreSQL {} queries completed in {} ms.",
                total, report.elapsed_ms
            ));
        }
        report
    }
}
