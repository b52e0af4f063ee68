//! Transitions - frame-driven animation units.
//!
//! A [`Transition`] maps elapsed time onto progress in `[0, 1]` and calls
//! its step function with it. It may depend on other transitions; it does
//! not advance until all of them finished, and its clock starts no earlier
//! than the latest dependency end time.
//!
//! A [`TransitionList`] sequences transitions on a shared, list-local
//! clock that can be paused, resumed and sped up.
//!
//! Cancellation is cooperative: `stop()` sets a flag that the frame loop
//! checks on its next frame. `start()` cancels any frame still pending from
//! an earlier run, so a transition is driven by one frame chain at a time.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_signals::{signal, Signal};

use crate::frames::{cancel_animation_frame, request_animation_frame, FrameHandle};

// =============================================================================
// Transition
// =============================================================================

#[derive(Debug, Default)]
struct Clock {
    start_time: Option<f64>,
    paused_at: Option<f64>,
    stopped: bool,
    finished: bool,
    frame: Option<FrameHandle>,
}

struct TransitionInner {
    duration: f64,
    step: Box<dyn Fn(f64)>,
    dependencies: RefCell<Vec<Transition>>,
    clock: RefCell<Clock>,
    progress: Signal<f64>,
}

/// Shared handle to a transition.
#[derive(Clone)]
pub struct Transition {
    inner: Rc<TransitionInner>,
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("duration", &self.inner.duration)
            .field("clock", &self.inner.clock.borrow())
            .finish()
    }
}

impl PartialEq for Transition {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Transition {
    /// `step` receives progress in `[0, 1]` on every advancing frame.
    pub fn new(duration_ms: f64, step: impl Fn(f64) + 'static) -> Self {
        Self {
            inner: Rc::new(TransitionInner {
                duration: duration_ms.max(0.0),
                step: Box::new(step),
                dependencies: RefCell::new(Vec::new()),
                clock: RefCell::new(Clock::default()),
                progress: signal(0.0),
            }),
        }
    }

    pub fn duration(&self) -> f64 {
        self.inner.duration
    }

    /// Do not advance before `other` has finished.
    pub fn add_dependency(&self, other: &Transition) {
        if other == self {
            tracing::warn!("a transition cannot depend on itself");
            return;
        }
        self.inner.dependencies.borrow_mut().push(other.clone());
    }

    pub fn dependencies_finished(&self) -> bool {
        self.inner.dependencies.borrow().iter().all(Transition::is_finished)
    }

    /// Reset the clock to `now` and step manually with [`next_step`](Self::next_step).
    pub fn reset(&self, now: f64) {
        let mut clock = self.inner.clock.borrow_mut();
        clock.start_time = Some(now);
        clock.paused_at = None;
        clock.stopped = false;
        clock.finished = false;
        drop(clock);
        self.inner.progress.set(0.0);
    }

    /// Reset the clock and drive the transition from animation frames.
    pub fn start(&self, now: f64) {
        let pending = self.inner.clock.borrow_mut().frame.take();
        if let Some(handle) = pending {
            cancel_animation_frame(handle);
        }
        self.reset(now);
        self.schedule();
    }

    fn schedule(&self) {
        let this = self.clone();
        let handle = request_animation_frame(move |now| this.on_frame(now));
        self.inner.clock.borrow_mut().frame = Some(handle);
    }

    fn on_frame(&self, now: f64) {
        {
            let mut clock = self.inner.clock.borrow_mut();
            clock.frame = None;
            if clock.stopped {
                return;
            }
        }
        if !self.next_step(now) {
            self.schedule();
        }
    }

    /// Ask the frame loop to stop at its next frame.
    pub fn stop(&self) {
        self.inner.clock.borrow_mut().stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.clock.borrow().stopped
    }

    /// Whether a frame is scheduled for this transition.
    pub fn is_running(&self) -> bool {
        self.inner.clock.borrow().frame.is_some()
    }

    pub fn pause(&self, now: f64) {
        let mut clock = self.inner.clock.borrow_mut();
        if clock.paused_at.is_none() {
            clock.paused_at = Some(now);
        }
    }

    /// Resume; the paused interval is not counted as elapsed time.
    pub fn resume(&self, now: f64) {
        let mut clock = self.inner.clock.borrow_mut();
        if let Some(paused_at) = clock.paused_at.take() {
            if let Some(start) = clock.start_time.as_mut() {
                *start += now - paused_at;
            }
        }
    }

    pub fn is_paused(&self) -> bool {
        self.inner.clock.borrow().paused_at.is_some()
    }

    /// Advance to `now`. Returns whether the transition has finished.
    pub fn next_step(&self, now: f64) -> bool {
        let progress = {
            let mut clock = self.inner.clock.borrow_mut();
            if clock.finished {
                return true;
            }
            if clock.paused_at.is_some() {
                return false;
            }
            let mut start = *clock.start_time.get_or_insert(now);
            drop(clock);

            if !self.dependencies_finished() {
                return false;
            }
            // The clock starts where the last dependency ended.
            let dependencies_end = self
                .inner
                .dependencies
                .borrow()
                .iter()
                .filter_map(Transition::end_time)
                .fold(f64::NEG_INFINITY, f64::max);
            if dependencies_end > start {
                start = dependencies_end;
                self.inner.clock.borrow_mut().start_time = Some(start);
            }
            if self.inner.duration <= 0.0 {
                1.0
            } else {
                ((now - start) / self.inner.duration).clamp(0.0, 1.0)
            }
        };

        (self.inner.step)(progress);
        self.inner.progress.set(progress);
        if progress >= 1.0 {
            self.inner.clock.borrow_mut().finished = true;
            return true;
        }
        false
    }

    /// When the transition ends, if its clock is running.
    pub fn end_time(&self) -> Option<f64> {
        self.inner.clock.borrow().start_time.map(|start| start + self.inner.duration)
    }

    pub fn is_finished(&self) -> bool {
        self.inner.clock.borrow().finished
    }

    pub fn progress(&self) -> f64 {
        self.inner.progress.get()
    }

    /// Progress signal for reactive tracking.
    pub fn progress_signal(&self) -> Signal<f64> {
        self.inner.progress.clone()
    }
}

// =============================================================================
// Transition List
// =============================================================================

#[derive(Debug)]
struct ListClock {
    /// Host time at which list time was last anchored.
    anchor: f64,
    /// List time at the anchor.
    local_at_anchor: f64,
    speed_factor: f64,
    paused: bool,
    stopped: bool,
}

impl ListClock {
    fn local_time(&self, now: f64) -> f64 {
        if self.paused {
            self.local_at_anchor
        } else {
            self.local_at_anchor + (now - self.anchor) * self.speed_factor
        }
    }

    fn reanchor(&mut self, now: f64) {
        self.local_at_anchor = self.local_time(now);
        self.anchor = now;
    }
}

/// Ordered transitions sharing a list-local clock.
#[derive(Clone)]
pub struct TransitionList {
    transitions: Rc<RefCell<Vec<Transition>>>,
    clock: Rc<RefCell<ListClock>>,
    frame: Rc<Cell<Option<FrameHandle>>>,
}

impl Default for TransitionList {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionList {
    pub fn new() -> Self {
        Self {
            transitions: Rc::new(RefCell::new(Vec::new())),
            clock: Rc::new(RefCell::new(ListClock {
                anchor: 0.0,
                local_at_anchor: 0.0,
                speed_factor: 1.0,
                paused: false,
                stopped: false,
            })),
            frame: Rc::new(Cell::new(None)),
        }
    }

    /// Add a transition that runs alongside the others.
    pub fn push(&self, transition: Transition) {
        self.transitions.borrow_mut().push(transition);
    }

    /// Add a transition that waits for the current last one.
    pub fn push_after_last(&self, transition: Transition) {
        let last = self.transitions.borrow().last().cloned();
        if let Some(last) = last {
            transition.add_dependency(&last);
        }
        self.push(transition);
    }

    pub fn length(&self) -> usize {
        self.transitions.borrow().len()
    }

    pub fn speed_factor(&self) -> f64 {
        self.clock.borrow().speed_factor
    }

    /// Change playback speed from `now` on.
    pub fn set_speed_factor(&self, now: f64, speed_factor: f64) {
        let mut clock = self.clock.borrow_mut();
        clock.reanchor(now);
        clock.speed_factor = speed_factor.max(0.0);
    }

    /// List-local time at host time `now`.
    pub fn local_time(&self, now: f64) -> f64 {
        self.clock.borrow().local_time(now)
    }

    /// Reset the list clock to zero at `now` and drive it from animation frames.
    pub fn start(&self, now: f64) {
        if let Some(handle) = self.frame.take() {
            cancel_animation_frame(handle);
        }
        {
            let mut clock = self.clock.borrow_mut();
            clock.anchor = now;
            clock.local_at_anchor = 0.0;
            clock.paused = false;
            clock.stopped = false;
        }
        for transition in self.transitions.borrow().iter() {
            transition.reset(0.0);
        }
        self.schedule();
    }

    fn schedule(&self) {
        let this = self.clone();
        let handle = request_animation_frame(move |now| {
            this.frame.set(None);
            if this.clock.borrow().stopped {
                return;
            }
            if !this.next_step(now) {
                this.schedule();
            }
        });
        self.frame.set(Some(handle));
    }

    pub fn stop(&self) {
        self.clock.borrow_mut().stopped = true;
    }

    pub fn pause(&self, now: f64) {
        let mut clock = self.clock.borrow_mut();
        if !clock.paused {
            clock.reanchor(now);
            clock.paused = true;
        }
    }

    pub fn resume(&self, now: f64) {
        let mut clock = self.clock.borrow_mut();
        if clock.paused {
            clock.paused = false;
            clock.anchor = now;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.clock.borrow().paused
    }

    /// Whether a frame is scheduled for this list.
    pub fn is_running(&self) -> bool {
        self.frame.get().is_some()
    }

    /// Advance every transition to list time at `now`. Returns whether all finished.
    pub fn next_step(&self, now: f64) -> bool {
        let (local, paused) = {
            let clock = self.clock.borrow();
            (clock.local_time(now), clock.paused)
        };
        let transitions = self.transitions.borrow().clone();
        if paused {
            return transitions.iter().all(Transition::is_finished);
        }
        let mut all_finished = true;
        for transition in &transitions {
            all_finished &= transition.next_step(local);
        }
        all_finished
    }

    pub fn is_finished(&self) -> bool {
        self.transitions.borrow().iter().all(Transition::is_finished)
    }
}

// =============================================================================
// Tests
// =============================================================================
