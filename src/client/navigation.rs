//! Navigation signals emitted by the session layer

use std::sync::{Arc, RwLock};

/// Kind of navigation requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum NavigationKind {
    /// Add a history entry
    #[display("push")]
    Push,
    /// Replace the current history entry
    #[display("replace")]
    Replace,
}

/// Receiver of navigation requests (a router in a UI, a log in headless use)
pub trait Navigator: Send + Sync {
    fn push(&self, path: &str);
    fn replace(&self, path: &str);
}

/// Navigator that records every request in order
#[derive(Debug, Clone, Default)]
pub struct NavigationLog {
    entries: Arc<RwLock<Vec<(NavigationKind, String)>>>,
}

impl NavigationLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, kind: NavigationKind, path: &str) {
        tracing::debug!("navigate ({}) -> {}", kind, path);
        if let Ok(mut entries) = self.entries.write() {
            entries.push((kind, path.to_string()));
        }
    }

    /// All recorded navigations, oldest first
    pub fn entries(&self) -> Vec<(NavigationKind, String)> {
        self.entries
            .read()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Path of the most recent navigation
    pub fn current(&self) -> Option<String> {
        self.entries().last().map(|(_, path)| path.clone())
    }
}

impl Navigator for NavigationLog {
    fn push(&self, path: &str) {
        self.record(NavigationKind::Push, path);
    }

    fn replace(&self, path: &str) {
        self.record(NavigationKind::Replace, path);
    }
}
