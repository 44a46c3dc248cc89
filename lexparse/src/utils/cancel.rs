//! Cooperative cancellation shared between the lexing task and the parser.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Signal {
    cancelled: AtomicBool,
    parent: Option<Arc<Signal>>,
}

impl Signal {
    fn is_set(&self) -> bool {
        if self.cancelled.load(Ordering::Acquire) {
            return true;
        }
        match &self.parent {
            Some(parent) => parent.is_set(),
            None => false,
        }
    }
}

/// A cloneable cancellation flag.
///
/// Clones share the same flag. A token made with [`CancellationToken::child_token`]
/// is cancelled whenever any of its ancestors is, but cancelling the child leaves
/// the ancestors untouched.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    signal: Arc<Signal>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.signal.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.is_set()
    }

    pub fn child_token(&self) -> CancellationToken {
        CancellationToken {
            signal: Arc::new(Signal {
                cancelled: AtomicBool::new(false),
                parent: Some(Arc::clone(&self.signal)),
            }),
        }
    }
}
