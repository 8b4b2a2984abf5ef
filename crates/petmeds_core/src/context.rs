//! Per-call context: who is calling and whether the call was abandoned.

use crate::model::ids::UserId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Authenticated caller plus the cancellation handle of its request.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub caller: UserId,
    pub cancellation: Cancellation,
}

impl CallContext {
    pub fn new(caller: UserId) -> Self {
        Self {
            caller,
            cancellation: Cancellation::new(),
        }
    }

    pub fn with_cancellation(caller: UserId, cancellation: Cancellation) -> Self {
        Self {
            caller,
            cancellation,
        }
    }
}
