//! What the host editor provides
//!
//! The plugin never touches editor UI directly. It reads text through a
//! [`TextSource`], writes results to an [`OutputSink`], asks questions through
//! a [`Prompt`] and reports progress through a [`StatusNotifier`]. Simple
//! in-memory implementations are included for hosts that have nothing better
//! and for tests.

use crate::core::encoding::{normalize_encoding_name, DEFAULT_ENCODING};
use parking_lot::Mutex;

/// A region of the buffer, in character offsets. `start` may be greater
/// than `end` when the selection was made backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn begin(&self) -> usize {
        self.start.min(self.end)
    }

    pub fn finish(&self) -> usize {
        self.start.max(self.end)
    }
}

/// The buffer queries are taken from
pub trait TextSource: Send + Sync {
    /// Current selections, possibly empty ones
    fn selections(&self) -> Vec<Region>;

    /// Text covered by `region`, or the whole buffer for `None`
    fn text(&self, region: Option<Region>) -> String;

    /// Encoding name detected for the buffer, possibly "Undefined"
    fn encoding(&self) -> String;
}

/// Append-only panel receiving query output
pub trait OutputSink: Send + Sync {
    fn clear(&self);
    fn append(&self, text: &str);
    /// Bring the panel to the front
    fn show(&self);
}

/// Interactive questions to the user. `None`/`false` means cancelled.
pub trait Prompt: Send + Sync {
    fn input(&self, label: &str, default: &str) -> Option<String>;

    /// Like [`input`](Self::input), without echoing what is typed
    fn secret(&self, label: &str) -> Option<String> {
        self.input(label, "")
    }

    fn confirm(&self, message: &str, ok_label: &str) -> bool;
}

/// Short fire-and-forget status messages
pub trait StatusNotifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// An in-memory buffer with selections
#[derive(Debug, Clone)]
pub struct BufferText {
    text: String,
    selections: Vec<Region>,
    encoding: String,
}

impl BufferText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            selections: Vec::new(),
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }

    pub fn with_selection(mut self, region: Region) -> Self {
        self.selections.push(region);
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }
}

impl TextSource for BufferText {
    fn selections(&self) -> Vec<Region> {
        self.selections.clone()
    }

    fn text(&self, region: Option<Region>) -> String {
        match region {
            None => self.text.clone(),
            Some(region) => self
                .text
                .chars()
                .skip(region.begin())
                .take(region.finish() - region.begin())
                .collect(),
        }
    }

    fn encoding(&self) -> String {
        normalize_encoding_name(&self.encoding).to_string()
    }
}

/// Output panel kept in memory
#[derive(Debug, Default)]
pub struct BufferSink {
    content: Mutex<String>,
    shown: Mutex<bool>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.content.lock().clone()
    }

    pub fn is_shown(&self) -> bool {
        *self.shown.lock()
    }
}

impl OutputSink for BufferSink {
    fn clear(&self) {
        self.content.lock().clear();
    }

    fn append(&self, text: &str) {
        self.content.lock().push_str(text);
    }

    fn show(&self) {
        *self.shown.lock() = true;
    }
}

/// Sends status messages to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl StatusNotifier for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::info!("{}", message);
    }
}

/// Cancels every question; for hosts that cannot prompt
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclinePrompt;

impl Prompt for DeclinePrompt {
    fn input(&self, _label: &str, _default: &str) -> Option<String> {
        None
    }

    fn confirm(&self, _message: &str, _ok_label: &str) -> bool {
        false
    }
}
