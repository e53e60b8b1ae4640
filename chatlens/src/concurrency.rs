//! Bounded fan-out over an arbitrary list of asynchronous tasks.
//!
//! A [`ConcurrencyLimiter`] owns a semaphore with `limit` permits. Each task
//! producer is only invoked once a permit is held, and the permit is released
//! when its future settles, so at most `limit` tasks are ever in flight.
//! Cloned limiters share the same permits.

use std::future::Future;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, Stream, StreamExt};
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ConcurrencyLimiter {
    /// A limit of zero is treated as one.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of tasks currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.limit - self.semaphore.available_permits()
    }

    /// Start every task (at most `limit` at a time) and yield
    /// `(input_index, outcome)` pairs in completion order.
    ///
    /// Tasks are admitted in input order. An outcome is whatever the task's
    /// future resolves to; failures are ordinary outcomes and never stop the
    /// remaining tasks.
    pub fn stream<'a, I, F, Fut>(
        &'a self,
        tasks: I,
    ) -> impl Stream<Item = (usize, Fut::Output)> + 'a
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Fut + 'a,
        Fut: Future + 'a,
    {
        tasks
            .into_iter()
            .enumerate()
            .map(|(index, task)| {
                let semaphore = &self.semaphore;
                async move {
                    // The semaphore is never closed, so acquire cannot fail.
                    let _permit = semaphore.acquire().await.ok();
                    (index, task().await)
                }
            })
            .collect::<FuturesUnordered<_>>()
    }

    /// Run every task and return the outcomes in input order.
    pub async fn run<I, F, Fut>(&self, tasks: I) -> Vec<Fut::Output>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let tasks: Vec<F> = tasks.into_iter().collect();
        let mut slots: Vec<Option<Fut::Output>> = (0..tasks.len()).map(|_| None).collect();

        let mut settled = std::pin::pin!(self.stream(tasks));
        while let Some((index, outcome)) = settled.next().await {
            slots[index] = Some(outcome);
        }

        slots.into_iter().flatten().collect()
    }
}
