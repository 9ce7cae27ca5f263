use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// What to do when a frame is offered to a full queue.
///
/// The policy is an explicit parameter so producers can swap it without the
/// orchestrator knowing which one is in effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Discard the offered item; the queue keeps what it already holds.
    #[default]
    DropNewest,
    /// Evict the head of the queue to make room for the offered item.
    DropOldest,
}

/// Result of a `push` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Enqueued,
    DroppedNewest,
    DroppedOldest,
}

/// Bounded handoff buffer between the capture thread and the run loop.
///
/// `push` is synchronous and never blocks, so the capture thread is never
/// held up by a slow consumer; overflow is resolved by the configured
/// `OverflowPolicy`. `pop` waits up to a timeout so the consumer can recheck
/// its stop condition. Items come out in FIFO order.
pub struct FrameQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    policy: OverflowPolicy,
    notify: Notify,
}

impl<T> FrameQueue<T> {
    /// Create a queue with a fixed capacity (minimum 1). The capacity never
    /// changes after construction.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            capacity: capacity.max(1),
            policy,
            notify: Notify::new(),
        }
    }

    /// Offer an item without blocking.
    pub fn push(&self, item: T) -> PushOutcome {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());

        let outcome = if items.len() >= self.capacity {
            match self.policy {
                OverflowPolicy::DropNewest => return PushOutcome::DroppedNewest,
                OverflowPolicy::DropOldest => {
                    items.pop_front();
                    items.push_back(item);
                    PushOutcome::DroppedOldest
                }
            }
        } else {
            items.push_back(item);
            PushOutcome::Enqueued
        };

        drop(items);
        self.notify.notify_one();
        outcome
    }

    /// Wait up to `timeout` for the next item; `None` on timeout.
    pub async fn pop(&self, timeout: Duration) -> Option<T> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(item) = self.take() {
                return Some(item);
            }

            // A push between the check above and this await leaves a stored
            // permit in the Notify, so the wakeup cannot be missed.
            let notified = self.notify.notified();
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.take();
            }
        }
    }

    fn take(&self) -> Option<T> {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }
}
