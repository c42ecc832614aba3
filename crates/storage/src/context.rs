//! Execution-context affinity
//!
//! A cache has a home execution context. Operations that touch the cache
//! acquire affinity to it first with [`ExecutionContext::enter`], which
//! returns a scoped guard. The guard is tied to the current thread and
//! restores the previous context when dropped.

use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_CONTEXT_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static CURRENT_CONTEXT: Cell<usize> = const { Cell::new(0) };
}

/// An execution context that operations can be pinned to
#[derive(Debug)]
pub struct ExecutionContext {
    id: usize,
    name: String,
}

impl ExecutionContext {
    /// Create a new, distinct context
    pub fn new(name: impl Into<String>) -> Self {
        ExecutionContext {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
        }
    }

    /// Context name (for logs)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the calling thread currently has affinity to this context
    pub fn is_current(&self) -> bool {
        CURRENT_CONTEXT.with(|c| c.get()) == self.id
    }

    /// Acquire affinity to this context for the guard's lifetime
    ///
    /// Re-entering the context already held is a no-op apart from the guard.
    pub fn enter(&self) -> ContextGuard {
        let previous = CURRENT_CONTEXT.with(|c| c.replace(self.id));
        if previous != self.id {
            tracing::trace!(context = %self.name, "entering home context");
        }
        ContextGuard {
            previous,
            _not_send: PhantomData,
        }
    }
}

/// Scoped affinity to an [`ExecutionContext`]
///
/// Not `Send`: affinity belongs to the thread that acquired it.
#[must_use = "affinity is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ContextGuard {
    previous: usize,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|c| c.set(self.previous));
    }
}
