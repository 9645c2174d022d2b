use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifies one asynchronous load started for a particular focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

/// Tracks what the reviewer is currently looking at so responses for an
/// earlier selection can be dropped instead of overwriting newer state.
///
/// Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct FocusTracker {
    current: Arc<AtomicU64>,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move focus and return the token for work started on its behalf.
    pub fn focus(&self) -> RequestToken {
        RequestToken(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.current.load(Ordering::SeqCst) == token.0
    }
}
