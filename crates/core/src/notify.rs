//! User-facing failure notifications.
//!
//! Repositories report every failure twice: once to the log for operators, and once through a
//! [`Notifier`] for whoever is driving the session (a terminal, an HTTP client, a UI). The
//! default notifier only logs; surfaces install their own.

use std::sync::Mutex;

pub trait Notifier: Send + Sync {
    fn notify_error(&self, message: &str);
}

/// Emits notifications as `tracing` warnings on the `ward::notify` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_error(&self, message: &str) {
        tracing::warn!(target: "ward::notify", "{}", message);
    }
}

/// Keeps every notification in memory, oldest first.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    messages: Mutex<Vec<String>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything collected so far.
    pub fn take(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Notifier for CollectingNotifier {
    fn notify_error(&self, message: &str) {
        match self.messages.lock() {
            Ok(mut guard) => guard.push(message.to_owned()),
            Err(poisoned) => poisoned.into_inner().push(message.to_owned()),
        }
    }
}
