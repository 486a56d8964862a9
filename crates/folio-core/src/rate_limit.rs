#![forbid(unsafe_code)]

//! Throttle and debounce for high-frequency host events.
//!
//! Browsers deliver `scroll` and `resize` at whatever rate the user produces
//! them. Running layout-reading handlers on every one of them is wasteful, so
//! handlers are wrapped in one of two rate limiters:
//!
//! - [`Throttle`] / [`Throttled`]: leading-edge, at most one call per
//!   interval, no trailing call.
//! - [`Debounce`] / [`Debounced`]: trailing-edge, exactly one call per quiet
//!   burst, carrying the arguments of the last call.
//!
//! Time is host-driven: every method takes `now`, a monotonic timestamp the
//! host reads from its own clock. Nothing here sleeps or spawns.
//!
//! # Usage
//!
//! ```
//! use core::time::Duration;
//! use folio_core::rate_limit::{debounce, throttle};
//!
//! let ms = Duration::from_millis;
//!
//! let mut hits = Vec::new();
//! let mut on_scroll = throttle(|t: u64| hits.push(t), ms(16));
//! for t in [0, 5, 10, 20] {
//!     on_scroll.call_at(ms(t), t);
//! }
//! drop(on_scroll);
//! assert_eq!(hits, vec![0, 20]);
//!
//! let mut on_resize = debounce(|w: u32| w, ms(250));
//! on_resize.call_at(ms(0), 640);
//! on_resize.call_at(ms(100), 800);
//! assert_eq!(on_resize.poll_at(ms(349)), None);
//! assert_eq!(on_resize.poll_at(ms(350)), Some(800));
//! ```

use core::time::Duration;

/// Fixed-window leading-edge gate.
///
/// The first call opens a window of `interval` and passes; calls inside the
/// window are rejected; the first call at or after the window end passes and
/// opens a new window.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    window_start: Option<Duration>,
}

impl Throttle {
    /// Create a gate with the given window length.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            window_start: None,
        }
    }

    /// Window length.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a call at `now` would pass.
    #[must_use]
    pub fn is_open_at(&self, now: Duration) -> bool {
        match self.window_start {
            Some(start) => now.saturating_sub(start) >= self.interval,
            None => true,
        }
    }

    /// Attempt to pass the gate at `now`. Opens a new window on success.
    pub fn try_acquire_at(&mut self, now: Duration) -> bool {
        if !self.is_open_at(now) {
            return false;
        }
        self.window_start = Some(now);
        true
    }

    /// Forget the current window so the next call passes.
    pub fn reset(&mut self) {
        self.window_start = None;
    }
}

/// A callback wrapped in a [`Throttle`].
pub struct Throttled<F> {
    gate: Throttle,
    f: F,
}

impl<F> Throttled<F> {
    /// Wrap `f` so it runs at most once per `interval`.
    pub fn new(f: F, interval: Duration) -> Self {
        Self {
            gate: Throttle::new(interval),
            f,
        }
    }

    /// Invoke the callback if the window is open.
    ///
    /// Returns `None` when the call was dropped by the throttle.
    pub fn call_at<A, R>(&mut self, now: Duration, args: A) -> Option<R>
    where
        F: FnMut(A) -> R,
    {
        if self.gate.try_acquire_at(now) {
            Some((self.f)(args))
        } else {
            crate::trace!(?now, "throttled call dropped");
            None
        }
    }

    /// Access the underlying gate.
    #[must_use]
    pub const fn gate(&self) -> &Throttle {
        &self.gate
    }
}

impl<F> core::fmt::Debug for Throttled<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Throttled").field("gate", &self.gate).finish()
    }
}

/// Wrap `f` in a leading-edge throttle.
pub fn throttle<F>(f: F, interval: Duration) -> Throttled<F> {
    Throttled::new(f, interval)
}

/// Trailing-edge deferral with latest-wins arguments.
#[derive(Debug, Clone)]
pub struct Debounce<A> {
    wait: Duration,
    pending: Option<(A, Duration)>,
}

impl<A> Debounce<A> {
    /// Create a debouncer that waits `wait` after the last call.
    #[must_use]
    pub const fn new(wait: Duration) -> Self {
        Self {
            wait,
            pending: None,
        }
    }

    /// Quiet period required before firing.
    #[must_use]
    pub const fn wait(&self) -> Duration {
        self.wait
    }

    /// Record a call. Replaces any pending arguments and restarts the timer.
    pub fn call_at(&mut self, now: Duration, args: A) {
        self.pending = Some((args, now.saturating_add(self.wait)));
    }

    /// When the pending call fires, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending arguments if the quiet period has elapsed by `now`.
    pub fn poll_at(&mut self, now: Duration) -> Option<A> {
        match self.pending {
            Some((_, deadline)) if now >= deadline => self.pending.take().map(|(args, _)| args),
            _ => None,
        }
    }

    /// Drop the pending call, returning its arguments.
    pub fn cancel(&mut self) -> Option<A> {
        self.pending.take().map(|(args, _)| args)
    }
}

/// A callback wrapped in a [`Debounce`].
pub struct Debounced<A, F> {
    inner: Debounce<A>,
    f: F,
}

impl<A, F> Debounced<A, F> {
    /// Wrap `f` so it runs once, `wait` after the last call of a burst.
    pub fn new(f: F, wait: Duration) -> Self {
        Self {
            inner: Debounce::new(wait),
            f,
        }
    }

    /// Record a call; the callback does not run yet.
    pub fn call_at(&mut self, now: Duration, args: A) {
        self.inner.call_at(now, args);
    }

    /// Run the callback if its deadline has passed.
    pub fn poll_at<R>(&mut self, now: Duration) -> Option<R>
    where
        F: FnMut(A) -> R,
    {
        let args = self.inner.poll_at(now)?;
        Some((self.f)(args))
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.inner.deadline()
    }

    /// Discard the pending call without running the callback.
    pub fn cancel(&mut self) {
        self.inner.cancel();
    }
}

impl<A, F> core::fmt::Debug for Debounced<A, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Debounced")
            .field("wait", &self.inner.wait)
            .field("deadline", &self.inner.deadline())
            .finish()
    }
}

/// Wrap `f` in a trailing-edge debounce.
pub fn debounce<A, F>(f: F, wait: Duration) -> Debounced<A, F> {
    Debounced::new(f, wait)
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn throttle_passes_first_call_and_after_window() {
        let mut gate = Throttle::new(ms(16));
        let passed: Vec<u64> = [0, 5, 10, 20]
            .into_iter()
            .filter(|&t| gate.try_acquire_at(ms(t)))
            .collect();
        assert_eq!(passed, vec![0, 20]);
    }

    #[test]
    fn throttle_window_restarts_from_passing_call() {
        let mut gate = Throttle::new(ms(16));
        assert!(gate.try_acquire_at(ms(20)));
        // 30 is inside [20, 36).
        assert!(!gate.try_acquire_at(ms(30)));
        assert!(gate.try_acquire_at(ms(36)));
    }

    #[test]
    fn throttle_boundary_is_inclusive() {
        let mut gate = Throttle::new(ms(16));
        assert!(gate.try_acquire_at(ms(0)));
        assert!(!gate.try_acquire_at(ms(15)));
        assert!(gate.try_acquire_at(ms(16)));
    }

    #[test]
    fn throttle_reset_reopens() {
        let mut gate = Throttle::new(ms(100));
        assert!(gate.try_acquire_at(ms(0)));
        gate.reset();
        assert!(gate.try_acquire_at(ms(1)));
    }

    #[test]
    fn throttled_returns_callback_result() {
        let mut t = throttle(|x: i32| x * 2, ms(16));
        assert_eq!(t.call_at(ms(0), 4), Some(8));
        assert_eq!(t.call_at(ms(1), 5), None);
    }

    #[test]
    fn debounce_fires_once_with_last_args() {
        let mut fired = Vec::new();
        let mut d = debounce(|args: (u64, char)| fired.push(args), ms(250));
        d.call_at(ms(0), (0, 'a'));
        d.call_at(ms(50), (50, 'b'));
        d.call_at(ms(100), (100, 'c'));
        assert_eq!(d.deadline(), Some(ms(350)));

        for t in (0..350).step_by(10) {
            assert!(d.poll_at(ms(t)).is_none(), "fired early at {t}");
        }
        assert!(d.poll_at(ms(350)).is_some());
        assert!(d.poll_at(ms(400)).is_none());
        drop(d);
        assert_eq!(fired, vec![(100, 'c')]);
    }

    #[test]
    fn debounce_cancel_discards_pending() {
        let mut d: Debounce<u8> = Debounce::new(ms(10));
        d.call_at(ms(0), 1);
        assert_eq!(d.cancel(), Some(1));
        assert!(!d.has_pending());
        assert_eq!(d.poll_at(ms(100)), None);
    }

    #[test]
    fn separate_bursts_fire_separately() {
        let mut d: Debounce<u32> = Debounce::new(ms(250));
        d.call_at(ms(0), 1);
        assert_eq!(d.poll_at(ms(250)), Some(1));
        d.call_at(ms(1000), 2);
        assert_eq!(d.poll_at(ms(1249)), None);
        assert_eq!(d.poll_at(ms(1250)), Some(2));
    }
}
