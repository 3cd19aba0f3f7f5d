//! Bounded task-level parallelism.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

/// Run `f` over every item with at most `parallelism` futures in flight.
///
/// Each future is spawned on the runtime; results come back in input order.
/// A panicking task surfaces as a `JoinError` in its slot and does not affect the others.
pub async fn run_bounded<I, O, F, Fut>(
    items: Vec<I>,
    parallelism: usize,
    f: F,
) -> Vec<Result<O, JoinError>>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = O> + Send + 'static,
    O: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let mut handles = Vec::with_capacity(items.len());

    for item in items {
        let sem = semaphore.clone();
        let fut = f(item);
        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await;
            fut.await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await);
    }
    results
}
