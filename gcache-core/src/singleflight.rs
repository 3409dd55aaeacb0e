//! # Single-Flight Group
//!
//! Coalesces concurrent calls keyed by a string so a given key's loader
//! runs at most once per in-flight cohort. A waiter awaits a
//! [`tokio::sync::Notify`] rather than parking a thread, so the cohort
//! can be awaited from async code without blocking an executor worker.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

struct Call<T, E> {
    notify: Notify,
    result: Mutex<Option<Result<T, E>>>,
    duplicate_count: AtomicUsize,
}

/// Duplicate-call suppressor keyed by string. One instance per [`crate::Group`].
pub struct SingleFlight<T, E> {
    inflight: Mutex<HashMap<String, Arc<Call<T, E>>>>,
}

impl<T, E> Default for SingleFlight<T, E> {
    fn default() -> Self {
        SingleFlight {
            inflight: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone, E: Clone> SingleFlight<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` for `key`, or waits for an already in-flight call for the
    /// same key to complete. Returns the shared `(result, was_shared)`
    /// pair; `was_shared` is true iff at least one other caller joined
    /// this cohort. The key is removed from the in-flight table before
    /// the elected leader returns, so the next call for `key` starts a
    /// fresh execution.
    pub async fn do_call<F, Fut>(&self, key: &str, f: F) -> (Result<T, E>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let joined = {
            let mut inflight = self.inflight.lock();
            match inflight.get(key) {
                Some(call) => {
                    call.duplicate_count.fetch_add(1, Ordering::SeqCst);
                    Some(call.clone())
                }
                None => {
                    inflight.insert(
                        key.to_string(),
                        Arc::new(Call {
                            notify: Notify::new(),
                            result: Mutex::new(None),
                            duplicate_count: AtomicUsize::new(0),
                        }),
                    );
                    None
                }
            }
        };

        if let Some(call) = joined {
            // Enable the `Notified` future before re-checking the result.
            // A `Notified` only joins the waiter list once enabled, so
            // constructing it alone would not close the race against the
            // leader's `notify_waiters` call below.
            let notified = call.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if call.result.lock().is_none() {
                notified.await;
            }
            let result = call
                .result
                .lock()
                .clone()
                .expect("leader populates result before notifying");
            return (result, true);
        }

        let call = {
            let inflight = self.inflight.lock();
            inflight.get(key).expect("just inserted above").clone()
        };

        let result = f().await;
        *call.result.lock() = Some(result.clone());
        call.notify.notify_waiters();

        self.inflight.lock().remove(key);

        let was_shared = call.duplicate_count.load(Ordering::SeqCst) > 0;
        (result, was_shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_calls_coalesce_to_one_execution() {
        let group: Arc<SingleFlight<u32, ()>> = Arc::new(SingleFlight::new());
        let call_count = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..100 {
            let group = group.clone();
            let call_count = call_count.clone();
            handles.push(tokio::spawn(async move {
                group
                    .do_call("k", || async {
                        call_count.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok::<u32, ()>(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            let (value, _was_shared) = handle.await.unwrap();
            assert_eq!(value, Ok(42));
        }
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_solo_call_is_not_marked_shared() {
        let group: SingleFlight<u32, ()> = SingleFlight::new();
        let (value, was_shared) = group.do_call("k", || async { Ok(7) }).await;
        assert_eq!(value, Ok(7));
        assert!(!was_shared);
    }

    #[tokio::test]
    async fn errors_are_shared_verbatim() {
        let group: Arc<SingleFlight<u32, String>> = Arc::new(SingleFlight::new());
        let a = {
            let group = group.clone();
            tokio::spawn(async move {
                group
                    .do_call("k", || async {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Err::<u32, String>("boom".to_string())
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        let b = group.do_call("k", || async { Ok(1) }).await;

        let (result_a, _) = a.await.unwrap();
        assert_eq!(result_a, Err("boom".to_string()));
        assert_eq!(b.0, Err("boom".to_string()));
    }

    #[tokio::test]
    async fn key_is_free_for_a_fresh_execution_after_completion() {
        let group: SingleFlight<u32, ()> = SingleFlight::new();
        let (first, _) = group.do_call("k", || async { Ok(1) }).await;
        let (second, _) = group.do_call("k", || async { Ok(2) }).await;
        assert_eq!(first, Ok(1));
        assert_eq!(second, Ok(2));
    }
}
