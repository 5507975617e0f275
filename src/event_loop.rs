//! Single-threaded cooperative timer queue
//!
//! Popup load events and auto-close timers are delivered as tasks on an
//! [`EventLoop`]. The loop keeps its own clock: tests move it with
//! [`EventLoop::advance`] or drain it with [`EventLoop::run_until_idle`],
//! while [`EventLoop::run_realtime`] sleeps between timers for interactive use.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// A unit of work scheduled on the loop. It may schedule further tasks.
pub type Task = Box<dyn FnOnce(&mut dyn Scheduler)>;

/// Identifier returned by [`Scheduler::set_timeout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// The "schedule callback" capability
pub trait Scheduler {
    /// Time elapsed on the loop's clock
    fn now(&self) -> Duration;

    /// Run `task` once `delay` has elapsed
    fn set_timeout(&mut self, delay: Duration, task: Task) -> TimerId;

    /// Cancel a pending timer. Returns false if it already ran or never existed.
    fn clear_timeout(&mut self, id: TimerId) -> bool;
}

/// Read-only handle on an [`EventLoop`]'s clock, shareable with popups
#[derive(Debug, Clone, Default)]
pub struct LoopClock(Rc<Cell<Duration>>);

impl LoopClock {
    pub fn now(&self) -> Duration {
        self.0.get()
    }
}

struct Timer {
    id: TimerId,
    due: Duration,
    task: Task,
}

/// Timer queue ordered by due time, then by scheduling order
#[derive(Default)]
pub struct EventLoop {
    clock: LoopClock,
    next_id: u64,
    timers: Vec<Timer>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clock(&self) -> LoopClock {
        self.clock.clone()
    }

    /// Number of timers waiting to run
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Due time of the earliest pending timer
    pub fn next_due(&self) -> Option<Duration> {
        self.timers.iter().map(|t| t.due).min()
    }

    fn pop_due(&mut self, limit: Duration) -> Option<Timer> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= limit)
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(i, _)| i)?;
        Some(self.timers.remove(idx))
    }

    fn run_timer(&mut self, timer: Timer) {
        if timer.due > self.clock.now() {
            self.clock.0.set(timer.due);
        }
        log::trace!("event loop: run timer {:?} at {:?}", timer.id, timer.due);
        let scheduler: &mut dyn Scheduler = self;
        (timer.task)(scheduler);
    }

    /// Run every timer already due, including zero-delay tasks they schedule
    pub fn run_due(&mut self) -> usize {
        let mut ran = 0;
        while let Some(timer) = self.pop_due(self.clock.now()) {
            self.run_timer(timer);
            ran += 1;
        }
        ran
    }

    /// Move the clock forward by `by`, running timers in due order
    pub fn advance(&mut self, by: Duration) -> usize {
        let target = self.clock.now() + by;
        let mut ran = 0;
        while let Some(timer) = self.pop_due(target) {
            self.run_timer(timer);
            ran += 1;
        }
        self.clock.0.set(target);
        ran
    }

    /// Jump from timer to timer until the queue is empty
    pub fn run_until_idle(&mut self) -> usize {
        let mut ran = 0;
        while let Some(due) = self.next_due() {
            ran += self.advance(due.saturating_sub(self.clock.now()));
        }
        ran
    }

    /// Like [`run_until_idle`](Self::run_until_idle) but sleeps for real
    /// between timers
    pub fn run_realtime(&mut self) -> usize {
        let mut ran = 0;
        while let Some(due) = self.next_due() {
            let wait = due.saturating_sub(self.clock.now());
            if !wait.is_zero() {
                std::thread::sleep(wait);
            }
            ran += self.advance(wait);
        }
        ran
    }
}

impl Scheduler for EventLoop {
    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn set_timeout(&mut self, delay: Duration, task: Task) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let due = self.clock.now() + delay;
        log::trace!("event loop: schedule timer {:?} due {:?}", id, due);
        self.timers.push(Timer { id, due, task });
        id
    }

    fn clear_timeout(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }
}
