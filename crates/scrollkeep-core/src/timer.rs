#![forbid(unsafe_code)]

//! Revocable one-shot timers.
//!
//! [`TimerScheduler`] is the host capability behind delayed restoration. The
//! browser implementation wraps `setTimeout`; [`DeterministicScheduler`] is a
//! host-driven scheduler whose clock only moves when [`DeterministicScheduler::advance`]
//! is called, which makes the delayed-restore race reproducible in tests.

use core::time::Duration;
use std::cell::{Cell, RefCell};

/// Work run once when a timer fires.
pub type TimerTask = Box<dyn FnOnce()>;

/// Handle for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Wrap a raw host timer id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// One-shot timer capability.
pub trait TimerScheduler {
    /// Run `task` once after `delay`.
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerId;

    /// Revoke a timer. A revoked task is dropped without running; revoking a
    /// timer that already fired (or never existed) does nothing.
    fn cancel(&self, id: TimerId);
}

struct PendingTimer {
    id: TimerId,
    due: Duration,
    task: TimerTask,
}

/// Deterministic timer scheduler driven by an explicit clock.
///
/// Timers with equal deadlines fire in scheduling order. Tasks run with no
/// internal borrow held, so a task may schedule or cancel further timers.
#[derive(Default)]
pub struct DeterministicScheduler {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    pending: RefCell<Vec<PendingTimer>>,
}

impl DeterministicScheduler {
    /// Create a scheduler whose clock starts at `0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time on the scheduler clock.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Number of timers that have neither fired nor been cancelled.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Advance the clock by `dt`, firing every timer that comes due.
    ///
    /// Returns the number of tasks run. The clock is set to each timer's
    /// deadline while its task runs.
    pub fn advance(&self, dt: Duration) -> usize {
        let target = self.now.get().saturating_add(dt);
        let mut fired = 0;
        while let Some(timer) = self.pop_due(target) {
            self.now.set(timer.due);
            (timer.task)();
            fired += 1;
        }
        self.now.set(target);
        fired
    }

    fn pop_due(&self, target: Duration) -> Option<PendingTimer> {
        let mut pending = self.pending.borrow_mut();
        let index = pending
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= target)
            .min_by_key(|(_, timer)| (timer.due, timer.id))
            .map(|(index, _)| index)?;
        Some(pending.remove(index))
    }
}

impl TimerScheduler for DeterministicScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerId {
        let id = TimerId(self.next_id.get().wrapping_add(1));
        self.next_id.set(id.0);
        let due = self.now.get().saturating_add(delay);
        self.pending.borrow_mut().push(PendingTimer { id, due, task });
        id
    }

    fn cancel(&self, id: TimerId) {
        // Drop the task outside the borrow: it may own values with drop glue
        // that reaches back into this scheduler.
        let removed = {
            let mut pending = self.pending.borrow_mut();
            pending
                .iter()
                .position(|timer| timer.id == id)
                .map(|index| pending.remove(index))
        };
        drop(removed);
    }
}

impl core::fmt::Debug for DeterministicScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeterministicScheduler")
            .field("now", &self.now.get())
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    fn recorder() -> Rc<RefCell<Vec<&'static str>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn push(log: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> TimerTask {
        let log = Rc::clone(log);
        Box::new(move || log.borrow_mut().push(label))
    }

    #[test]
    fn timers_fire_in_deadline_order() {
        let sched = DeterministicScheduler::new();
        let log = recorder();
        sched.schedule(Duration::from_millis(30), push(&log, "late"));
        sched.schedule(Duration::from_millis(10), push(&log, "early"));
        sched.schedule(Duration::from_millis(10), push(&log, "early-2"));

        assert_eq!(sched.advance(Duration::from_millis(9)), 0);
        assert_eq!(sched.advance(Duration::from_millis(1)), 2);
        assert_eq!(*log.borrow(), vec!["early", "early-2"]);
        assert_eq!(sched.advance(Duration::from_millis(100)), 1);
        assert_eq!(*log.borrow(), vec!["early", "early-2", "late"]);
        assert_eq!(sched.now(), Duration::from_millis(110));
    }

    #[test]
    fn cancelled_timer_never_runs() {
        let sched = DeterministicScheduler::new();
        let log = recorder();
        let id = sched.schedule(Duration::from_millis(5), push(&log, "cancelled"));
        sched.cancel(id);
        sched.cancel(id);
        assert_eq!(sched.pending_count(), 0);
        assert_eq!(sched.advance(Duration::from_secs(1)), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn zero_delay_fires_on_next_advance() {
        let sched = DeterministicScheduler::new();
        let log = recorder();
        sched.schedule(Duration::ZERO, push(&log, "now"));
        assert_eq!(sched.pending_count(), 1);
        assert_eq!(sched.advance(Duration::ZERO), 1);
        assert_eq!(*log.borrow(), vec!["now"]);
    }

    #[test]
    fn task_sees_its_own_deadline_and_may_reschedule() {
        let sched = Rc::new(DeterministicScheduler::new());
        let seen = Rc::new(Cell::new(Duration::ZERO));
        let log = recorder();
        {
            let sched_inner = Rc::clone(&sched);
            let seen = Rc::clone(&seen);
            let log = Rc::clone(&log);
            sched.schedule(
                Duration::from_millis(20),
                Box::new(move || {
                    seen.set(sched_inner.now());
                    sched_inner.schedule(Duration::from_millis(5), push(&log, "chained"));
                }),
            );
        }
        sched.advance(Duration::from_millis(100));
        assert_eq!(seen.get(), Duration::from_millis(20));
        assert_eq!(*log.borrow(), vec!["chained"]);
    }

    #[test]
    fn clock_saturates() {
        let sched = DeterministicScheduler::new();
        sched.advance(Duration::MAX);
        sched.advance(Duration::from_secs(1));
        assert_eq!(sched.now(), Duration::MAX);
    }
}
