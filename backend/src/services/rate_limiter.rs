use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::debug;

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limiter shut down while waiting for a permit")]
    Closed,
}

/// Priority-aware token bucket in front of the quote provider.
///
/// Two budgets apply at once: a reservoir of `requests_per_minute` permits
/// that refills every refill interval, and a cap of `max_concurrent`
/// outstanding requests. Waiters are served by ascending priority number
/// (1 is most urgent), first come first served within a priority.
pub struct RateLimiter {
    state: Arc<Mutex<LimiterState>>,
}

struct LimiterState {
    max_concurrent: usize,
    reservoir_size: u32,
    refill_interval: Duration,
    active: usize,
    reservoir: u32,
    last_refill: Instant,
    refill_scheduled: bool,
    next_seq: u64,
    queue: BinaryHeap<Waiter>,
}

struct Waiter {
    priority: u8,
    seq: u64,
    tx: oneshot::Sender<RateLimitGuard>,
}

impl PartialEq for Waiter {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Waiter {}

impl PartialOrd for Waiter {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Waiter {
    // BinaryHeap pops the greatest element: lowest priority number, then oldest
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl LimiterState {
    fn refill_if_due(&mut self, now: Instant) {
        if now.duration_since(self.last_refill) >= self.refill_interval {
            self.reservoir = self.reservoir_size;
            self.last_refill = now;
        }
    }

    fn can_start(&self) -> bool {
        self.active < self.max_concurrent && self.reservoir > 0
    }

    fn take_slot(&mut self) {
        self.active += 1;
        self.reservoir -= 1;
    }
}

impl RateLimiter {
    /// `requests_per_minute` permits per minute, at most `max_concurrent` in flight.
    pub fn new(max_concurrent: usize, requests_per_minute: u32) -> Self {
        Self::with_refill_interval(max_concurrent, requests_per_minute, Duration::from_secs(60))
    }

    pub fn with_refill_interval(max_concurrent: usize, reservoir_size: u32, refill_interval: Duration) -> Self {
        let state = LimiterState {
            max_concurrent: max_concurrent.max(1),
            reservoir_size: reservoir_size.max(1),
            refill_interval,
            active: 0,
            reservoir: reservoir_size.max(1),
            last_refill: Instant::now(),
            refill_scheduled: false,
            next_seq: 0,
            queue: BinaryHeap::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Waits for a permit. The permit is released when the guard is dropped.
    pub async fn acquire(&self, priority: u8) -> Result<RateLimitGuard, RateLimitError> {
        let rx = {
            let mut state = self.state.lock();
            state.refill_if_due(Instant::now());

            if state.queue.is_empty() && state.can_start() {
                state.take_slot();
                return Ok(RateLimitGuard {
                    state: Some(Arc::clone(&self.state)),
                });
            }

            let (tx, rx) = oneshot::channel();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.queue.push(Waiter { priority, seq, tx });
            debug!("Rate limiter queued request (priority {}, queue length {})", priority, state.queue.len());

            schedule_refill(&self.state, &mut state);
            rx
        };

        rx.await.map_err(|_| RateLimitError::Closed)
    }

    pub fn active(&self) -> usize {
        self.state.lock().active
    }

    pub fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }
}

/// Hands free slots to queued waiters in priority order.
fn dispatch(shared: &Arc<Mutex<LimiterState>>, state: &mut LimiterState) {
    state.refill_if_due(Instant::now());

    while state.can_start() {
        let Some(waiter) = state.queue.pop() else {
            break;
        };
        state.take_slot();
        let guard = RateLimitGuard {
            state: Some(Arc::clone(shared)),
        };
        if let Err(mut unclaimed) = waiter.tx.send(guard) {
            // Waiter was cancelled; return the slot without re-locking
            unclaimed.state = None;
            state.active -= 1;
            state.reservoir += 1;
        }
    }

    schedule_refill(shared, state);
}

/// Wakes the queue once the reservoir refills, if it is currently starved.
fn schedule_refill(shared: &Arc<Mutex<LimiterState>>, state: &mut LimiterState) {
    if state.queue.is_empty() || state.reservoir > 0 || state.refill_scheduled {
        return;
    }
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        return;
    };

    state.refill_scheduled = true;
    let deadline = state.last_refill + state.refill_interval;
    let shared = Arc::clone(shared);
    handle.spawn(async move {
        sleep_until(deadline).await;
        let mut state = shared.lock();
        state.refill_scheduled = false;
        dispatch(&shared, &mut state);
    });
}

/// Holds one rate-limit permit; dropping it frees the concurrency slot.
pub struct RateLimitGuard {
    state: Option<Arc<Mutex<LimiterState>>>,
}

impl Drop for RateLimitGuard {
    fn drop(&mut self) {
        if let Some(shared) = self.state.take() {
            let mut state = shared.lock();
            state.active -= 1;
            dispatch(&shared, &mut state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_first_requests_are_immediate() {
        let limiter = RateLimiter::new(2, 60);
        let _a = limiter.acquire(5).await.unwrap();
        let _b = limiter.acquire(5).await.unwrap();
        assert_eq!(limiter.active(), 2);
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_limit() {
        let limiter = Arc::new(RateLimiter::new(2, 1000));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..8 {
            let limiter = limiter.clone();
            let running = running.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _guard = limiter.acquire((i % 3) as u8 + 1).await.unwrap();
                let now = running.fetch_add(1, AtomicOrdering::SeqCst) + 1;
                peak.fetch_max(now, AtomicOrdering::SeqCst);
                sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, AtomicOrdering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(AtomicOrdering::SeqCst) <= 2);
        assert_eq!(limiter.active(), 0);
    }

    #[tokio::test]
    async fn test_lower_priority_number_served_first() {
        let limiter = Arc::new(RateLimiter::new(1, 1000));
        let order = Arc::new(Mutex::new(Vec::new()));

        let holder = limiter.acquire(1).await.unwrap();

        let mut handles = Vec::new();
        for priority in [9u8, 7, 1] {
            let limiter = limiter.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let _guard = limiter.acquire(priority).await.unwrap();
                order.lock().push(priority);
            }));
            // enqueue in a known order
            sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(limiter.queued(), 3);

        drop(holder);
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock(), vec![1, 7, 9]);
    }

    #[tokio::test]
    async fn test_reservoir_refills_after_interval() {
        let limiter = RateLimiter::with_refill_interval(5, 2, Duration::from_millis(200));
        let start = std::time::Instant::now();

        drop(limiter.acquire(5).await.unwrap());
        drop(limiter.acquire(5).await.unwrap());
        assert!(start.elapsed() < Duration::from_millis(100));

        // Reservoir is empty until the next refill
        drop(limiter.acquire(5).await.unwrap());
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_cancelled_waiter_does_not_leak_slot() {
        let limiter = Arc::new(RateLimiter::new(1, 1000));
        let holder = limiter.acquire(1).await.unwrap();

        let waiting = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                let _guard = limiter.acquire(5).await;
            })
        };
        sleep(Duration::from_millis(10)).await;
        waiting.abort();
        let _ = waiting.await;

        drop(holder);
        assert_eq!(limiter.active(), 0);
        let _again = tokio::time::timeout(Duration::from_millis(200), limiter.acquire(1))
            .await
            .expect("slot should be free")
            .unwrap();
    }
}
