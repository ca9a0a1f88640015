//! User-facing notifications raised by library operations.
//!
//! The knowledge store and chat surface report outcomes ("document added",
//! "extraction unreliable") through a [`Notifier`]. Library code never
//! assumes one is present: the default [`NoopNotifier`] drops everything.

use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Success,
    Warning,
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotifyLevel, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _level: NotifyLevel, _message: &str) {}
}

/// Prints notifications to stderr; used by the CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        let marker = match level {
            NotifyLevel::Info => "ℹ",
            NotifyLevel::Success => "✓",
            NotifyLevel::Warning => "!",
            NotifyLevel::Error => "✗",
        };
        eprintln!("{} {}", marker, message);
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(NotifyLevel, String)>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<(NotifyLevel, String)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push((level, message.to_string()));
        }
    }
}
