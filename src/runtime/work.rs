//! Splitting an invocation into units of work
//!
//! Each non-empty selection becomes one unit; with no selection the whole
//! buffer is one unit. When `files` is configured, each existing file is a
//! unit instead and the buffer is ignored.

use crate::core::parameter::ParameterKey;
use crate::core::store::ResolvedParameters;
use crate::editor::TextSource;
use crate::runtime::runner::QueryInput;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One selection, buffer or file run as a single `psql` process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub input: QueryInput,
    /// 1-based position in the batch
    pub index: usize,
    pub total: usize,
}

impl WorkUnit {
    /// Human-readable name used in status messages
    pub fn label(&self) -> String {
        match &self.input {
            QueryInput::File(path) => {
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                format!("file {}", name)
            }
            QueryInput::Text(_) if self.total == 1 => "query".to_string(),
            QueryInput::Text(_) => format!("query {}/{}", self.index, self.total),
        }
    }
}

fn number(inputs: Vec<QueryInput>) -> Vec<WorkUnit> {
    let total = inputs.len();
    inputs
        .into_iter()
        .enumerate()
        .map(|(i, input)| WorkUnit {
            input,
            index: i + 1,
            total,
        })
        .collect()
}

/// One unit per non-empty selection, or the whole buffer when nothing is
/// selected
pub fn plan_queries(source: &dyn TextSource) -> Vec<WorkUnit> {
    let mut inputs: Vec<QueryInput> = source
        .selections()
        .into_iter()
        .filter(|region| !region.is_empty())
        .map(|region| QueryInput::Text(source.text(Some(region))))
        .collect();

    if inputs.is_empty() {
        inputs.push(QueryInput::Text(source.text(None)));
    }

    number(inputs)
}

/// One unit per existing file; missing paths are skipped
pub fn plan_files<P: AsRef<Path>>(paths: &[P]) -> Vec<WorkUnit> {
    let inputs = paths
        .iter()
        .map(|path| path.as_ref())
        .filter(|path| {
            let exists = path.is_file();
            if !exists {
                debug!("Skipping missing file {}", path.display());
            }
            exists
        })
        .map(|path| QueryInput::File(PathBuf::from(path)))
        .collect();

    number(inputs)
}

/// Units for one invocation: files when configured, otherwise the buffer
pub fn plan(params: &ResolvedParameters, source: &dyn TextSource) -> Vec<WorkUnit> {
    match params.get(ParameterKey::Files) {
        Some(files) if files.is_truthy() => plan_files(&files.as_list()),
        _ => plan_queries(source),
    }
}
