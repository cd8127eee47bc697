//! Test doubles shared by the unit tests
//!
//! - [`FakePsql`] writes a shell script that stands in for `psql`
//! - [`RecordingSink`] records appends and detects overlapping ones
//! - [`RecordingNotifier`] collects status messages
//! - [`ScriptedPrompt`] answers prompts from a queue

use crate::editor::{OutputSink, Prompt, StatusNotifier};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// An executable shell script used as `psql_path`
pub struct FakePsql {
    dir: TempDir,
    path: PathBuf,
}

impl FakePsql {
    /// Echo the arguments and stdin to stdout, write a notice to stderr and
    /// exit with `code`
    pub fn echoing(code: i32) -> Self {
        Self::script(&format!(
            "echo \"args: $*\"\ncat\necho \"NOTICE: from stderr\" >&2\nexit {}",
            code
        ))
    }

    /// Run `body` under `/bin/sh`
    pub fn script(body: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("psql");
        let content = format!("#!/bin/sh\nPATH=/usr/local/bin:/usr/bin:/bin\n{}\n", body);
        std::fs::write(&path, content).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir, path }
    }

    pub fn path_str(&self) -> &str {
        self.path.to_str().unwrap()
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Output sink that records every append and fails loudly if two appends
/// ever overlap
#[derive(Default)]
pub struct RecordingSink {
    appends: Mutex<Vec<String>>,
    in_append: AtomicBool,
    overlaps: AtomicUsize,
    clears: AtomicUsize,
    shows: AtomicUsize,
    append_delay: Duration,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make each append take `delay`, widening the window for overlaps
    pub fn with_append_delay(delay: Duration) -> Self {
        Self {
            append_delay: delay,
            ..Self::default()
        }
    }

    pub fn appends(&self) -> Vec<String> {
        self.appends.lock().clone()
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn shows(&self) -> usize {
        self.shows.load(Ordering::SeqCst)
    }
}

impl OutputSink for RecordingSink {
    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn append(&self, text: &str) {
        if self.in_append.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if !self.append_delay.is_zero() {
            std::thread::sleep(self.append_delay);
        }
        self.appends.lock().push(text.to_string());
        self.in_append.store(false, Ordering::SeqCst);
    }

    fn show(&self) {
        self.shows.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.lock().iter().any(|m| m.contains(needle))
    }
}

impl StatusNotifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

/// Prompt answering from queued responses; an empty queue means cancel
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<Option<String>>>,
    confirmations: Mutex<VecDeque<bool>>,
    labels: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, answer: Option<&str>) -> Self {
        self.answers.lock().push_back(answer.map(str::to_string));
        self
    }

    pub fn confirm_with(self, ok: bool) -> Self {
        self.confirmations.lock().push_back(ok);
        self
    }

    /// Every label or message shown so far
    pub fn labels(&self) -> Vec<String> {
        self.labels.lock().clone()
    }
}

impl Prompt for ScriptedPrompt {
    fn input(&self, label: &str, _default: &str) -> Option<String> {
        self.labels.lock().push(label.to_string());
        self.answers.lock().pop_front().flatten()
    }

    fn confirm(&self, message: &str, _ok_label: &str) -> bool {
        self.labels.lock().push(message.to_string());
        self.confirmations.lock().pop_front().unwrap_or(false)
    }
}
