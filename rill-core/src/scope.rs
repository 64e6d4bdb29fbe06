// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Scoped task ownership: every background task a combinator forks is
//! attached to a scope that aborts it on every exit path.

use parking_lot::Mutex;
use tokio::task::{AbortHandle, JoinHandle};

/// Owner of a set of forked tasks.
///
/// Combinators create one scope per run, fork their producer/driver tasks
/// through it, and keep it alive inside the output stream. Dropping the
/// output stream (early termination, downstream error, external
/// cancellation) drops the scope, which aborts every outstanding task so
/// nothing outlives the run that created it.
pub struct Scope {
    handles: Mutex<Vec<AbortHandle>>,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Forks `future` as a task whose lifetime is attached to this scope.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: std::future::Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = tokio::spawn(future);
        self.handles.lock().push(handle.abort_handle());
        handle
    }

    /// Aborts every task forked through this scope. Idempotent; called
    /// automatically on drop.
    pub fn abort_all(&self) {
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn drop_aborts_forked_tasks() {
        let finished = Arc::new(AtomicBool::new(false));
        let handle = {
            let scope = Scope::new();
            let finished = Arc::clone(&finished);
            let handle = scope.spawn(async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                finished.store(true, Ordering::SeqCst);
            });
            drop(scope);
            handle
        };

        assert!(handle.await.unwrap_err().is_cancelled());
        assert!(!finished.load(Ordering::SeqCst));
    }
}
