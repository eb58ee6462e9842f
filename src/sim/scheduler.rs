//! Discrete-event scheduler: simulated clock plus a cancellable event queue.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::Duration;

/// Handle to a scheduled event, used to cancel it before it fires.
///
/// Cancellation is lazy: the handle flips a shared flag and the queue
/// skips the entry when it reaches the front. Cancelling is idempotent
/// and cheap, so callers may cancel handles that have already fired.
#[derive(Debug, Clone)]
pub struct EventHandle {
    alive: Rc<Cell<bool>>,
}

impl EventHandle {
    /// Marks the event as cancelled. Safe to call more than once.
    pub fn cancel(&self) {
        self.alive.set(false);
    }

    /// Returns `true` when the event has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        !self.alive.get()
    }
}

/// One queued callback. Ordered by (timestamp, insertion sequence) so that
/// events scheduled for the same instant fire in insertion order.
struct Entry {
    at: Duration,
    seq: u64,
    alive: Rc<Cell<bool>>,
    callback: Box<dyn FnOnce()>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed so the std max-heap pops the earliest event first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A single-threaded discrete-event scheduler.
///
/// Simulated time is a `Duration` since simulation start. Callbacks run
/// cooperatively from [`Scheduler::run`]; they may schedule and cancel
/// further events freely while the queue is being drained.
///
/// # Examples
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use std::time::Duration;
/// use cell_sim::sim::scheduler::Scheduler;
///
/// let scheduler = Scheduler::new(Duration::from_secs(10));
/// let fired = Rc::new(RefCell::new(Vec::new()));
///
/// let log = Rc::clone(&fired);
/// scheduler.schedule_after(Duration::from_secs(2), move || log.borrow_mut().push(2));
/// let log = Rc::clone(&fired);
/// scheduler.schedule_after(Duration::from_secs(1), move || log.borrow_mut().push(1));
///
/// scheduler.run();
/// assert_eq!(*fired.borrow(), vec![1, 2]);
/// ```
pub struct Scheduler {
    now: Cell<Duration>,
    horizon: Duration,
    finished: Cell<bool>,
    next_seq: Cell<u64>,
    queue: RefCell<BinaryHeap<Entry>>,
}

impl Scheduler {
    /// Creates a scheduler that runs until `horizon` (inclusive).
    pub fn new(horizon: Duration) -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            horizon,
            finished: Cell::new(false),
            next_seq: Cell::new(0),
            queue: RefCell::new(BinaryHeap::new()),
        }
    }

    /// Current simulated instant.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// The simulation end time this scheduler runs to.
    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    /// Returns `true` once [`Scheduler::run`] has completed.
    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }

    /// Enqueues `callback` to fire `delay` after the current instant.
    ///
    /// Scheduling after the run has finished is a benign no-op: the
    /// returned handle is already cancelled and nothing is enqueued.
    pub fn schedule_after(&self, delay: Duration, callback: impl FnOnce() + 'static) -> EventHandle {
        let alive = Rc::new(Cell::new(!self.finished.get()));
        if self.finished.get() {
            return EventHandle { alive };
        }

        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.queue.borrow_mut().push(Entry {
            at: self.now.get() + delay,
            seq,
            alive: Rc::clone(&alive),
            callback: Box::new(callback),
        });
        EventHandle { alive }
    }

    /// Drains the queue in timestamp order, advancing the clock to each
    /// event as it fires, until the queue empties or an event falls past
    /// the horizon. Events scheduled exactly at the horizon still fire.
    pub fn run(&self) {
        loop {
            let entry = self.queue.borrow_mut().pop();
            let Some(entry) = entry else {
                break;
            };
            if entry.at > self.horizon {
                break;
            }
            if !entry.alive.get() {
                continue;
            }
            self.now.set(entry.at);
            (entry.callback)();
        }
        self.finished.set(true);
        // Unfired callbacks can close over resources (or the scheduler
        // itself); drop them so a finished run holds nothing alive.
        self.queue.borrow_mut().clear();
    }
}
