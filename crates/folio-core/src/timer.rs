#![forbid(unsafe_code)]

//! Host-driven timers.
//!
//! Browsers offer `setTimeout`; a deterministic core cannot. Instead every
//! component that needs to run later records a deadline, and the host arms a
//! single real timer for the earliest one (see `next_deadline` on the
//! owning component). When the host timer fires it calls back with the
//! current time and every due entry runs.
//!
//! - [`TimerQueue`] holds one-shot timers carrying a payload.
//! - [`ScheduledTask`] is the single pending deadline of a self-rescheduling
//!   loop. Cancelling or dropping the owner cancels the loop.

use core::time::Duration;
use std::collections::{BTreeMap, HashMap};

/// Handle to a timer scheduled on a [`TimerQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// One-shot timers ordered by deadline, then by scheduling order.
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    next_seq: u64,
    entries: BTreeMap<(Duration, u64), T>,
    deadlines: HashMap<u64, Duration>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_seq: 0,
            entries: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Schedule `payload` to fire at `deadline`.
    pub fn schedule_at(&mut self, deadline: Duration, payload: T) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((deadline, seq), payload);
        self.deadlines.insert(seq, deadline);
        TimerId(seq)
    }

    /// Schedule `payload` to fire `delay` after `now`.
    pub fn schedule_after(&mut self, now: Duration, delay: Duration, payload: T) -> TimerId {
        self.schedule_at(now.saturating_add(delay), payload)
    }

    /// Cancel a pending timer, returning its payload if it had not fired.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let deadline = self.deadlines.remove(&id.0)?;
        self.entries.remove(&(deadline, id.0))
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Remove and return the earliest timer due at `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, T)> {
        let &(deadline, seq) = self.entries.keys().next()?;
        if deadline > now {
            return None;
        }
        self.deadlines.remove(&seq);
        let payload = self.entries.remove(&(deadline, seq))?;
        Some((TimerId(seq), payload))
    }

    /// Remove and return every timer due at `now`, in firing order.
    pub fn drain_due(&mut self, now: Duration) -> Vec<(TimerId, T)> {
        let mut due = Vec::new();
        while let Some(entry) = self.pop_due(now) {
            due.push(entry);
        }
        due
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every pending timer.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.deadlines.clear();
    }
}

/// The pending deadline of a self-rescheduling loop.
///
/// Each run reschedules the next one itself. There is at most one pending
/// deadline, so cancelling is a single store.
#[derive(Debug, Clone, Default)]
pub struct ScheduledTask {
    deadline: Option<Duration>,
    runs: u64,
}

impl ScheduledTask {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            deadline: None,
            runs: 0,
        }
    }

    /// Replace the pending deadline.
    pub fn schedule_at(&mut self, deadline: Duration) {
        self.deadline = Some(deadline);
    }

    /// Cancel the pending run. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    #[must_use]
    pub const fn is_scheduled(&self) -> bool {
        self.deadline.is_some()
    }

    /// Number of runs taken so far.
    #[must_use]
    pub const fn runs(&self) -> u64 {
        self.runs
    }

    /// Consume the pending run if it is due at `now`.
    ///
    /// Returns the deadline that was due, so the caller can reschedule
    /// relative to it instead of to a late host callback.
    pub fn take_due(&mut self, now: Duration) -> Option<Duration> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.runs += 1;
                Some(deadline)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn fires_in_deadline_then_schedule_order() {
        let mut q = TimerQueue::new();
        q.schedule_at(ms(30), "c");
        q.schedule_at(ms(10), "a");
        q.schedule_at(ms(10), "b");
        let fired: Vec<_> = q.drain_due(ms(30)).into_iter().map(|(_, p)| p).collect();
        assert_eq!(fired, vec!["a", "b", "c"]);
        assert!(q.is_empty());
    }

    #[test]
    fn not_due_stays_pending() {
        let mut q = TimerQueue::new();
        q.schedule_after(ms(100), ms(5000), ());
        assert!(q.pop_due(ms(5099)).is_none());
        assert_eq!(q.next_deadline(), Some(ms(5100)));
        assert!(q.pop_due(ms(5100)).is_some());
    }

    #[test]
    fn cancel_removes_timer() {
        let mut q = TimerQueue::new();
        let id = q.schedule_at(ms(10), 1);
        q.schedule_at(ms(20), 2);
        assert_eq!(q.cancel(id), Some(1));
        assert_eq!(q.cancel(id), None);
        assert_eq!(q.next_deadline(), Some(ms(20)));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn scheduled_task_runs_once_per_deadline() {
        let mut task = ScheduledTask::new();
        task.schedule_at(ms(100));
        assert_eq!(task.take_due(ms(99)), None);
        assert_eq!(task.take_due(ms(120)), Some(ms(100)));
        assert_eq!(task.take_due(ms(200)), None);
        assert_eq!(task.runs(), 1);
    }

    #[test]
    fn scheduled_task_cancel() {
        let mut task = ScheduledTask::new();
        task.schedule_at(ms(5));
        assert!(task.cancel());
        assert!(!task.cancel());
        assert_eq!(task.take_due(ms(10)), None);
    }
}
