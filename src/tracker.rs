//! Loading-state bookkeeping for concurrent actions.
//!
//! Every running action holds a [`LoadingGuard`]. While any guard is alive the tracker is
//! active; observers subscribe to the list of running actions through a watch channel.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use crate::model::Action;

/// Label used by the text area's suggestion request.
pub const TEXTAREA_SUGGEST: &str = "textarea-suggest";
/// Label used by the text area's rewrite request.
pub const TEXTAREA_REWRITE: &str = "textarea-rewrite";

/// Label for an action run on page content.
pub fn vivify_label(action: Action) -> String {
    format!("vivify-{action}")
}

/// Label for an intercepted click option.
pub fn intercept_label(option: &str) -> String {
    format!("intercept-{option}")
}

/// One running action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadingEntry {
    pub id: Uuid,
    pub label: String,
    pub started_at: DateTime<Utc>,
}

/// Shared registry of running actions.
pub struct ActionTracker {
    tx: watch::Sender<Vec<LoadingEntry>>,
}

impl ActionTracker {
    pub fn new() -> Arc<Self> {
        let (tx, _rx) = watch::channel(Vec::new());
        Arc::new(Self { tx })
    }

    /// Mark `label` as loading until the returned guard is dropped.
    ///
    /// The same label may be loading several times at once; each guard removes only its
    /// own entry.
    pub fn begin(self: &Arc<Self>, label: impl Into<String>) -> LoadingGuard {
        let entry = LoadingEntry {
            id: Uuid::new_v4(),
            label: label.into(),
            started_at: Utc::now(),
        };
        debug!(label = %entry.label, id = %entry.id, "Action loading");

        let guard = LoadingGuard {
            tracker: Arc::clone(self),
            id: entry.id,
            label: entry.label.clone(),
            started_at: entry.started_at,
        };
        self.tx.send_modify(|entries| entries.push(entry));
        guard
    }

    /// Snapshot of running actions, oldest first.
    pub fn loading(&self) -> Vec<LoadingEntry> {
        self.tx.borrow().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.tx.borrow().iter().map(|e| e.label.clone()).collect()
    }

    pub fn is_loading(&self, label: &str) -> bool {
        self.tx.borrow().iter().any(|e| e.label == label)
    }

    /// Whether any action is running.
    pub fn is_active(&self) -> bool {
        !self.tx.borrow().is_empty()
    }

    /// Receive the running list on every change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<LoadingEntry>> {
        self.tx.subscribe()
    }

    fn finish(&self, id: Uuid) {
        self.tx.send_modify(|entries| entries.retain(|e| e.id != id));
    }
}

/// Keeps an action marked as loading.
pub struct LoadingGuard {
    tracker: Arc<ActionTracker>,
    id: Uuid,
    label: String,
    started_at: DateTime<Utc>,
}

impl LoadingGuard {
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let elapsed_ms = (Utc::now() - self.started_at).num_milliseconds();
        debug!(label = %self.label, id = %self.id, elapsed_ms, "Action finished");
        self.tracker.finish(self.id);
    }
}
