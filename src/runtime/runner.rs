//! One `psql` subprocess per query
//!
//! A [`QueryRunner`] feeds its input to the client, captures stdout and
//! stderr through a single pipe so they stay interleaved the way a terminal
//! would show them, and waits for the process to exit. Failures to launch or
//! talk to the process never escape: they become the output text of the run.

use crate::core::encoding::TextEncoding;
use crate::core::error::{Error, Result};
use crate::runtime::command::PsqlCommand;
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

/// What a runner sends to the client's standard input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryInput {
    Text(String),
    File(PathBuf),
}

/// Meaning of a `psql` exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitClass {
    Success,
    /// Out of memory, file not found and other client-side problems
    FatalClient,
    /// Connection to the server went bad
    FatalServer,
    /// A statement failed while `ON_ERROR_STOP` was set
    ScriptError,
    Unclassified(i32),
    /// Killed by a signal, no exit code
    Terminated,
}

impl ExitClass {
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Self::Success,
            Some(1) => Self::FatalClient,
            Some(2) => Self::FatalServer,
            Some(3) => Self::ScriptError,
            Some(other) => Self::Unclassified(other),
            None => Self::Terminated,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Success => "Script success",
            Self::FatalClient => "Script fatal client error",
            Self::FatalServer => "Script fatal server error",
            Self::ScriptError => "Script error",
            Self::Unclassified(_) => "Script finished",
            Self::Terminated => "Script terminated",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Outcome of one runner
#[derive(Debug)]
pub struct RunResult {
    pub exit_code: Option<i32>,
    /// `None` when the process never completed
    pub class: Option<ExitClass>,
    /// Decoded client output, or a description of what went wrong
    pub output: String,
    pub elapsed: Duration,
    pub error: Option<Error>,
}

impl RunResult {
    pub fn completed(exit_code: Option<i32>, output: String, elapsed: Duration) -> Self {
        Self {
            exit_code,
            class: Some(ExitClass::from_code(exit_code)),
            output,
            elapsed,
            error: None,
        }
    }

    pub fn failed(error: Error, elapsed: Duration) -> Self {
        Self {
            exit_code: None,
            class: None,
            output: format_failure(&error),
            elapsed,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.class.is_some_and(|class| class.is_success())
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

/// Lifecycle of a runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Created,
    Running,
    /// The process ran to completion, whatever its exit code
    Succeeded,
    /// The process could not be launched or talked to
    Failed,
}

/// Runs a single query through `psql`
#[derive(Debug)]
pub struct QueryRunner {
    command: PsqlCommand,
    input: QueryInput,
    timeout: Option<Duration>,
    state: RunnerState,
}

impl QueryRunner {
    pub fn new(command: PsqlCommand, input: QueryInput) -> Self {
        Self {
            command,
            input,
            timeout: None,
            state: RunnerState::Created,
        }
    }

    /// Kill the client if it has not exited after `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Run the query. Never fails: problems are reported in the result.
    #[instrument(skip(self), fields(program = %self.command.program))]
    pub async fn run(&mut self) -> RunResult {
        self.state = RunnerState::Running;
        let started = Instant::now();

        match self.execute().await {
            Ok((exit_code, output)) => {
                let elapsed = started.elapsed();
                self.state = RunnerState::Succeeded;
                let class = ExitClass::from_code(exit_code);
                info!(
                    "{} Return code: {}",
                    class.description(),
                    exit_code.map_or_else(|| "none".to_string(), |c| c.to_string())
                );
                RunResult::completed(exit_code, output, elapsed)
            }
            Err(error) => {
                let elapsed = started.elapsed();
                self.state = RunnerState::Failed;
                warn!("Query failed: {}", error);
                RunResult::failed(error, elapsed)
            }
        }
    }

    async fn execute(&self) -> Result<(Option<i32>, String)> {
        let encoding = TextEncoding::from_name(&self.command.encoding)?;
        let stdin_bytes = match &self.input {
            QueryInput::Text(text) => Some(encoding.encode(text)?),
            QueryInput::File(_) => None,
        };

        // stdout and stderr share one pipe
        let (mut reader, writer) = std::io::pipe().map_err(Error::Communication)?;

        let mut child = {
            let mut cmd = self.command.to_command();
            let stderr_writer = writer.try_clone().map_err(Error::Communication)?;
            cmd.stdout(writer).stderr(stderr_writer).kill_on_drop(true);

            match &self.input {
                QueryInput::File(path) => {
                    let file = std::fs::File::open(path).map_err(Error::Communication)?;
                    cmd.stdin(file);
                }
                QueryInput::Text(_) => {
                    cmd.stdin(Stdio::piped());
                }
            }

            cmd.spawn().map_err(|source| Error::Launch {
                program: self.command.program.clone(),
                source,
            })?
            // `cmd` holds the parent's copies of the pipe writer; dropping it
            // here lets the reader see EOF once the child exits
        };

        let writer_task = match (child.stdin.take(), stdin_bytes) {
            (Some(mut stdin), Some(bytes)) => Some(tokio::spawn(async move {
                let result = stdin.write_all(&bytes).await;
                drop(stdin);
                result
            })),
            _ => None,
        };

        let reader_task = tokio::task::spawn_blocking(move || {
            let mut captured = Vec::new();
            reader.read_to_end(&mut captured).map(|_| captured)
        });

        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    let _ = child.kill().await;
                    return Err(Error::Timeout(limit.as_secs()));
                }
            },
            None => child.wait().await,
        }
        .map_err(Error::Communication)?;

        if let Some(task) = writer_task {
            match task.await? {
                // The client may exit without reading all of its input
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    return Err(Error::Communication(e));
                }
                _ => {}
            }
        }

        let captured = reader_task.await?.map_err(Error::Communication)?;
        let output = encoding.decode(&captured)?;

        Ok((status.code(), output))
    }
}

/// Render an error and its causes as the text shown in the output panel
pub fn format_failure(error: &Error) -> String {
    let mut text = format!("psql-execute: query could not be run\n\nError: {}\n", error);
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        text.push_str(&format!("Caused by: {}\n", cause));
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePsql;
    use std::collections::BTreeMap;

    fn command_for(program: &str, encoding: &str) -> PsqlCommand {
        PsqlCommand {
            program: program.to_string(),
            args: vec!["--no-password".to_string()],
            env: BTreeMap::new(),
            encoding: encoding.to_string(),
        }
    }

    #[test]
    fn test_exit_code_classification() {
        assert_eq!(ExitClass::from_code(Some(0)), ExitClass::Success);
        assert_eq!(ExitClass::from_code(Some(1)), ExitClass::FatalClient);
        assert_eq!(ExitClass::from_code(Some(2)), ExitClass::FatalServer);
        assert_eq!(ExitClass::from_code(Some(3)), ExitClass::ScriptError);
        assert_eq!(ExitClass::from_code(Some(42)), ExitClass::Unclassified(42));
        assert_eq!(ExitClass::from_code(None), ExitClass::Terminated);
    }

    #[tokio::test]
    async fn test_text_input_is_piped_and_output_merged() {
        let psql = FakePsql::echoing(0);
        let mut runner = QueryRunner::new(
            command_for(psql.path_str(), "UTF-8"),
            QueryInput::Text("select 1;".to_string()),
        );
        assert_eq!(runner.state(), RunnerState::Created);

        let result = runner.run().await;

        assert_eq!(runner.state(), RunnerState::Succeeded);
        assert!(result.error.is_none());
        assert_eq!(result.exit_code, Some(0));
        assert!(result.is_success());
        assert!(result.output.contains("select 1;"));
        assert!(result.output.contains("args: --no-password"));
        assert!(result.output.contains("NOTICE: from stderr"));
    }

    #[tokio::test]
    async fn test_file_input_is_used_as_stdin() {
        let psql = FakePsql::echoing(0);
        let sql = psql.dir().join("query.sql");
        std::fs::write(&sql, "select 'from file';\n").unwrap();

        let mut runner = QueryRunner::new(
            command_for(psql.path_str(), "UTF-8"),
            QueryInput::File(sql),
        );
        let result = runner.run().await;
        assert!(result.output.contains("select 'from file';"));
    }

    #[tokio::test]
    async fn test_unclassified_exit_codes_still_return_output() {
        for code in [1, 2, 3, 7] {
            let psql = FakePsql::echoing(code);
            let mut runner = QueryRunner::new(
                command_for(psql.path_str(), "UTF-8"),
                QueryInput::Text("select 2;".to_string()),
            );
            let result = runner.run().await;
            assert_eq!(result.exit_code, Some(code));
            assert_eq!(result.class, Some(ExitClass::from_code(Some(code))));
            assert!(!result.is_success());
            assert!(result.error.is_none());
            assert!(result.output.contains("select 2;"));
            assert_eq!(runner.state(), RunnerState::Succeeded);
        }
    }

    #[tokio::test]
    async fn test_missing_executable_becomes_output() {
        let mut runner = QueryRunner::new(
            command_for("/definitely/not/here/psql", "UTF-8"),
            QueryInput::Text("select 1;".to_string()),
        );
        let result = runner.run().await;

        assert_eq!(runner.state(), RunnerState::Failed);
        assert!(result.error.as_ref().unwrap().is_launch_failure());
        assert!(result.output.contains("/definitely/not/here/psql"));
        assert!(result.output.contains("Caused by:"));
        assert_eq!(result.class, None);
    }

    #[tokio::test]
    async fn test_missing_input_file_is_a_communication_failure() {
        let psql = FakePsql::echoing(0);
        let mut runner = QueryRunner::new(
            command_for(psql.path_str(), "UTF-8"),
            QueryInput::File(psql.dir().join("absent.sql")),
        );
        let result = runner.run().await;
        assert!(result.error.as_ref().unwrap().is_communication_failure());
        assert_eq!(runner.state(), RunnerState::Failed);
    }

    #[tokio::test]
    async fn test_latin1_round_trip() {
        let psql = FakePsql::echoing(0);
        let mut runner = QueryRunner::new(
            command_for(psql.path_str(), "ISO-8859-1"),
            QueryInput::Text("select 'café';".to_string()),
        );
        let result = runner.run().await;
        assert!(result.error.is_none());
        assert!(result.output.contains("select 'café';"));
    }

    #[tokio::test]
    async fn test_unsupported_encoding_is_reported() {
        let psql = FakePsql::echoing(0);
        let mut runner = QueryRunner::new(
            command_for(psql.path_str(), "EBCDIC"),
            QueryInput::Text("select 1;".to_string()),
        );
        let result = runner.run().await;
        assert!(matches!(
            result.error,
            Some(Error::UnsupportedEncoding(ref name)) if name == "EBCDIC"
        ));
        assert!(result.output.contains("EBCDIC"));
    }

    #[tokio::test]
    async fn test_client_exiting_early_is_not_an_error() {
        let psql = FakePsql::script("exit 2");
        let big_query = "select 1;\n".repeat(100_000);
        let mut runner = QueryRunner::new(
            command_for(psql.path_str(), "UTF-8"),
            QueryInput::Text(big_query),
        );
        let result = runner.run().await;
        assert!(result.error.is_none(), "{:?}", result.error);
        assert_eq!(result.class, Some(ExitClass::FatalServer));
    }

    #[tokio::test]
    async fn test_timeout_kills_the_client() {
        let psql = FakePsql::script("exec sleep 5");
        let mut runner = QueryRunner::new(
            command_for(psql.path_str(), "UTF-8"),
            QueryInput::Text(String::new()),
        )
        .with_timeout(Some(Duration::from_millis(200)));

        let result = runner.run().await;
        assert!(matches!(result.error, Some(Error::Timeout(_))));
        assert!(result.elapsed < Duration::from_secs(5));
    }
}
