//! The handle every repository is built from.
//!
//! A [`RecordClient`] pairs a [`RecordStore`] with the [`Notifier`] that failures are reported
//! to. It is cheap to clone; construct one at startup and hand clones to the repositories.

use crate::notify::{Notifier, TracingNotifier};
use crate::store::RecordStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct RecordClient {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
}

impl RecordClient {
    pub fn new(store: Arc<dyn RecordStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// A client whose notifications go to the log only.
    pub fn with_tracing(store: Arc<dyn RecordStore>) -> Self {
        Self::new(store, Arc::new(TracingNotifier))
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }
}

impl std::fmt::Debug for RecordClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordClient").finish_non_exhaustive()
    }
}
