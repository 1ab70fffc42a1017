//! Pending crawl work
//!
//! The frontier is a FIFO of [`Target`]s shared by the dispatch loop and all
//! workers. Every target passes through the [`VisitedSet`] on the way in, so
//! a URL is queued at most once per run no matter how many pages link to it.

use crate::crawler::Target;
use crate::url::visit_key;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};
use url::Url;

/// URLs already placed on the frontier
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the URL; true if it was not present before
    ///
    /// Check and insert happen under one lock.
    pub fn insert(&self, url: &Url) -> bool {
        let key = visit_key(url);
        match self.seen.lock() {
            Ok(mut seen) => seen.insert(key),
            Err(poisoned) => poisoned.into_inner().insert(key),
        }
    }

    pub fn contains(&self, url: &Url) -> bool {
        let key = visit_key(url);
        match self.seen.lock() {
            Ok(seen) => seen.contains(&key),
            Err(poisoned) => poisoned.into_inner().contains(&key),
        }
    }

    pub fn len(&self) -> usize {
        match self.seen.lock() {
            Ok(seen) => seen.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Blocking typed work queue with built-in deduplication
#[derive(Debug, Default)]
pub struct Frontier {
    queue: Mutex<VecDeque<Target>>,
    visited: VisitedSet,
    notify: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the target unless its URL was queued before
    ///
    /// The visited insert happens before the target becomes visible to
    /// [`Frontier::take`]. Returns true if the target was queued.
    pub fn offer(&self, target: Target) -> bool {
        if !self.visited.insert(target.url()) {
            tracing::trace!("Already queued: {}", target.url());
            return false;
        }

        self.lock_queue().push_back(target);
        self.notify.notify_one();
        true
    }

    /// Removes the oldest target without waiting
    pub fn pop(&self) -> Option<Target> {
        self.lock_queue().pop_front()
    }

    /// Waits up to `idle` for a target
    ///
    /// Returns None when nothing arrived in time. Dropping the future before it
    /// completes loses no target.
    pub async fn take(&self, idle: Duration) -> Option<Target> {
        self.take_within(Some(idle)).await
    }

    /// Like [`Frontier::take`], but `None` waits until a target arrives
    pub async fn take_within(&self, idle: Option<Duration>) -> Option<Target> {
        let deadline = idle.map(|idle| Instant::now() + idle);

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking, so an offer in between is not missed
            notified.as_mut().enable();

            if let Some(target) = self.pop() {
                return Some(target);
            }

            match deadline {
                Some(deadline) => {
                    if timeout_at(deadline, notified).await.is_err() {
                        return self.pop();
                    }
                }
                None => notified.await,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock_queue().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_queue().is_empty()
    }

    /// Number of distinct URLs ever queued
    pub fn queued_total(&self) -> usize {
        self.visited.len()
    }

    pub fn was_queued(&self, url: &Url) -> bool {
        self.visited.contains(url)
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Target>> {
        match self.queue.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
