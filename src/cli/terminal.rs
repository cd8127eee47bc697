//! Terminal implementations of the editor collaborators
//!
//! Query output goes to stdout, status messages to stderr, prompts are read
//! from the controlling terminal.

use crate::editor::{OutputSink, Prompt, StatusNotifier};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password};
use std::io::Write;
use tracing::debug;

/// Writes query output straight to stdout
#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        Self
    }
}

impl OutputSink for StdoutSink {
    fn clear(&self) {}

    fn append(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(text.as_bytes()) {
            debug!("Failed to write query output: {}", e);
        }
    }

    fn show(&self) {
        let _ = std::io::stdout().flush();
    }
}

/// Prints status messages to stderr
#[derive(Debug, Clone, Copy)]
pub struct TerminalNotifier {
    quiet: bool,
    color: bool,
}

impl TerminalNotifier {
    pub fn new(quiet: bool, color: bool) -> Self {
        Self { quiet, color }
    }

    fn styled(&self, message: &str) -> String {
        if !self.color {
            return message.to_string();
        }
        if message.contains("errored") || message.contains("cancelled") {
            message.red().to_string()
        } else if message.contains("completed in") || message.contains("saved") {
            message.green().to_string()
        } else {
            message.dimmed().to_string()
        }
    }
}

impl StatusNotifier for TerminalNotifier {
    fn notify(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", self.styled(message));
        }
    }
}

/// Interactive prompts; a failed or interrupted prompt counts as cancelled
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn input(&self, label: &str, default: &str) -> Option<String> {
        let theme = ColorfulTheme::default();
        let mut input = Input::<String>::with_theme(&theme)
            .with_prompt(label)
            .allow_empty(true);
        if !default.is_empty() {
            input = input.default(default.to_string());
        }
        input.interact_text().ok()
    }

    fn secret(&self, label: &str) -> Option<String> {
        Password::with_theme(&ColorfulTheme::default())
            .with_prompt(label)
            .allow_empty_password(true)
            .interact()
            .ok()
    }

    fn confirm(&self, message: &str, ok_label: &str) -> bool {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("{} ({})", message, ok_label))
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_notifier_leaves_messages_alone() {
        let notifier = TerminalNotifier::new(false, false);
        assert_eq!(
            notifier.styled("PostgreSQL query errored."),
            "PostgreSQL query errored."
        );
    }

    #[test]
    fn test_coloured_notifier_keeps_text() {
        let notifier = TerminalNotifier::new(false, true);
        assert!(notifier
            .styled("PostgreSQL query completed in 3 ms.")
            .contains("PostgreSQL query completed in 3 ms."));
    }
}
