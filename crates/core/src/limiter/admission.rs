//! FIFO admission limiter with runtime-adjustable capacity.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, info};

use super::LimiterError;

/// Point-in-time view of the limiter counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterStats {
    pub capacity: usize,
    pub active_count: usize,
    pub queued_count: usize,
    pub available_slots: usize,
}

impl LimiterStats {
    /// True when a new task would have to wait.
    pub fn is_saturated(&self) -> bool {
        self.available_slots == 0 || self.queued_count > 0
    }
}

struct LimiterState {
    capacity: usize,
    active: usize,
    /// Waiting tasks, oldest first. Sending on a waiter hands it a slot
    /// that has already been counted in `active`.
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl LimiterState {
    fn live_waiters(&self) -> usize {
        self.waiters.iter().filter(|tx| !tx.is_closed()).count()
    }

    fn can_admit_directly(&self) -> bool {
        self.active < self.capacity && self.live_waiters() == 0
    }

    /// Hand free slots to waiters in arrival order. Returns how many were admitted.
    fn promote(&mut self) -> usize {
        let mut admitted = 0;
        while self.active < self.capacity {
            let Some(tx) = self.waiters.pop_front() else {
                break;
            };
            // A closed waiter gave up while queued; skip it.
            if tx.send(()).is_ok() {
                self.active += 1;
                admitted += 1;
            }
        }
        admitted
    }
}

/// Process-wide admission limiter.
///
/// Cheap to clone; all clones share the same counters. Counters live behind
/// a single mutex that is never held across an `.await`, so the limiter is
/// consistent under true parallelism as well as task interleaving.
#[derive(Clone)]
pub struct AdmissionLimiter {
    state: Arc<Mutex<LimiterState>>,
}

impl std::fmt::Debug for AdmissionLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionLimiter")
            .field("stats", &self.stats())
            .finish()
    }
}

impl AdmissionLimiter {
    /// Create a limiter allowing `capacity` concurrent tasks.
    pub fn new(capacity: usize) -> Result<Self, LimiterError> {
        if capacity < 1 {
            return Err(LimiterError::InvalidCapacity(capacity));
        }
        info!(capacity, "Admission limiter initialized");
        Ok(Self {
            state: Arc::new(Mutex::new(LimiterState {
                capacity,
                active: 0,
                waiters: VecDeque::new(),
            })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        // The state is only mutated through short non-panicking sections.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current counters. Never blocks on running tasks and never mutates.
    pub fn stats(&self) -> LimiterStats {
        let state = self.lock();
        LimiterStats {
            capacity: state.capacity,
            active_count: state.active,
            queued_count: state.live_waiters(),
            available_slots: state.capacity.saturating_sub(state.active),
        }
    }

    /// Change the capacity.
    ///
    /// Growing admits queued tasks immediately, oldest first. Shrinking never
    /// preempts running tasks; new admissions wait until enough of them finish.
    pub fn set_capacity(&self, capacity: usize) -> Result<(), LimiterError> {
        if capacity < 1 {
            return Err(LimiterError::InvalidCapacity(capacity));
        }

        let mut state = self.lock();
        let previous = state.capacity;
        state.capacity = capacity;
        let admitted = state.promote();
        info!(
            previous,
            capacity,
            admitted,
            active = state.active,
            queued = state.live_waiters(),
            "Admission limiter capacity updated"
        );
        Ok(())
    }

    /// Take a slot if one is free and nobody is waiting ahead of us.
    pub fn try_acquire(&self) -> Option<AdmissionSlot> {
        let mut state = self.lock();
        if !state.can_admit_directly() {
            return None;
        }
        state.active += 1;
        debug!(
            "Task admitted immediately. Active: {}/{}, Queue: {}",
            state.active,
            state.capacity,
            state.live_waiters()
        );
        Some(AdmissionSlot::new(self.clone()))
    }

    /// Take a slot now, or a place at the back of the queue.
    ///
    /// The place in line is fixed when this returns, so callers that reserve
    /// in order are admitted in that order however their tasks get scheduled.
    pub fn reserve(&self) -> Admission {
        let mut state = self.lock();
        state.waiters.retain(|tx| !tx.is_closed());
        if state.can_admit_directly() {
            state.active += 1;
            debug!(
                "Task admitted immediately. Active: {}/{}, Queue: {}",
                state.active,
                state.capacity,
                state.live_waiters()
            );
            return Admission::Ready(AdmissionSlot::new(self.clone()));
        }

        let (tx, rx) = oneshot::channel();
        state.waiters.push_back(tx);
        debug!(
            "Task queued. Active: {}/{}, Queue: {}",
            state.active,
            state.capacity,
            state.live_waiters()
        );
        Admission::Queued(PendingAdmission {
            limiter: self.clone(),
            rx: Some(rx),
        })
    }

    /// Wait for a slot, queueing behind earlier callers when saturated.
    ///
    /// Dropping the returned future while queued gives up the place in line
    /// without consuming a slot.
    pub async fn acquire(&self) -> AdmissionSlot {
        self.reserve().into_slot().await
    }

    /// Run `task` under the limiter and return its own outcome.
    ///
    /// The slot is released when the task settles, whether it succeeded,
    /// failed, or panicked, and the next queued task is admitted.
    pub async fn run<F, Fut, T>(&self, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _slot = self.acquire().await;
        task().await
    }

    fn release(&self) {
        let mut state = self.lock();
        state.active = state.active.saturating_sub(1);
        let admitted = state.promote();
        debug!(
            "Task completed. Active: {}/{}, Queue: {}, promoted: {}",
            state.active,
            state.capacity,
            state.live_waiters(),
            admitted
        );
    }
}

/// Outcome of [`AdmissionLimiter::reserve`].
#[derive(Debug)]
pub enum Admission {
    /// A slot was free and is now held.
    Ready(AdmissionSlot),
    /// Waiting in line for a slot.
    Queued(PendingAdmission),
}

impl Admission {
    pub fn is_queued(&self) -> bool {
        matches!(self, Admission::Queued(_))
    }

    /// Wait until the slot is held.
    pub async fn into_slot(self) -> AdmissionSlot {
        let mut pending = match self {
            Admission::Ready(slot) => return slot,
            Admission::Queued(pending) => pending,
        };

        loop {
            if pending.wait().await {
                debug!("Task admitted from queue");
                return AdmissionSlot::new(pending.limiter.clone());
            }
            // The sender went away without a grant; line up again.
            match pending.limiter.reserve() {
                Admission::Ready(slot) => return slot,
                Admission::Queued(next) => pending = next,
            }
        }
    }
}

/// A place in the limiter queue. Dropping it leaves the queue.
pub struct PendingAdmission {
    limiter: AdmissionLimiter,
    rx: Option<oneshot::Receiver<()>>,
}

impl PendingAdmission {
    /// Returns true once a slot has been handed over.
    async fn wait(&mut self) -> bool {
        let Some(rx) = self.rx.as_mut() else {
            return false;
        };
        let admitted = rx.await.is_ok();
        self.rx = None;
        admitted
    }
}

impl std::fmt::Debug for PendingAdmission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAdmission").finish_non_exhaustive()
    }
}

impl Drop for PendingAdmission {
    fn drop(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            // Admitted between the last poll and the drop: give the slot back.
            if rx.try_recv().is_ok() {
                self.limiter.release();
            }
        }
    }
}

/// A held concurrency slot. Dropping it frees the slot.
#[must_use = "the slot is released as soon as it is dropped"]
pub struct AdmissionSlot {
    limiter: AdmissionLimiter,
}

impl AdmissionSlot {
    fn new(limiter: AdmissionLimiter) -> Self {
        Self { limiter }
    }
}

impl std::fmt::Debug for AdmissionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionSlot").finish_non_exhaustive()
    }
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
