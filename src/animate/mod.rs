//! Transition Animator
//!
//! At most one task per [`AnimationKind`]. Time is passed in by the caller,
//! so the animator itself never sleeps; the display actor drives it from a
//! frame interval.
//!
//! # Completion Semantics
//!
//! - A task completes exactly once, on the first tick at or past its end.
//! - Starting a task for a busy kind supersedes the old one: the old
//!   `Transition` resolves to `Superseded` and its callback is dropped
//!   without being called.
//! - Completions within one tick fire in the order their tasks started.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::route::StopId;

/// Animated property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationKind {
    /// Progress bar translation
    Shift,
    /// Current-stop label fade-in
    Highlight,
}

impl AnimationKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Shift => "shift",
            Self::Highlight => "highlight",
        }
    }
}

/// How a transition ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionOutcome {
    Completed,
    Superseded,
    Cancelled,
}

type Callback = Box<dyn FnOnce() + Send + Sync>;

/// Parameters of one transition
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub kind: AnimationKind,
    pub target: Option<StopId>,
    pub from: f64,
    pub to: f64,
    pub duration: Duration,
}

impl Animation {
    pub fn new(kind: AnimationKind, from: f64, to: f64, duration: Duration) -> Self {
        Self {
            kind,
            target: None,
            from,
            to,
            duration,
        }
    }

    pub fn with_target(mut self, target: StopId) -> Self {
        self.target = Some(target);
        self
    }

    /// Linear interpolation at `elapsed`, clamped to `[from, to]`
    pub fn value_at(&self, elapsed: Duration) -> f64 {
        interpolate(self.from, self.to, self.progress(elapsed))
    }

    fn progress(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }
}

/// `from + (to - from) * progress`, exact at both ends
pub fn interpolate(from: f64, to: f64, progress: f64) -> f64 {
    if progress >= 1.0 {
        to
    } else if progress <= 0.0 {
        from
    } else {
        from + (to - from) * progress
    }
}

/// Handle to a started transition. Awaiting it yields how it ended.
///
/// Dropping the handle does not cancel the transition.
#[derive(Debug)]
pub struct Transition {
    kind: AnimationKind,
    rx: oneshot::Receiver<TransitionOutcome>,
}

impl Transition {
    pub fn kind(&self) -> AnimationKind {
        self.kind
    }

    /// Outcome if the transition has already ended
    pub fn try_outcome(&mut self) -> Option<TransitionOutcome> {
        self.rx.try_recv().ok()
    }
}

impl Future for Transition {
    type Output = TransitionOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the animator itself went away
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or(TransitionOutcome::Cancelled))
    }
}

/// One frame of an active task
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: AnimationKind,
    pub target: Option<StopId>,
    pub value: f64,
}

/// Output of one tick
#[derive(Debug, Default)]
pub struct Tick {
    /// Current value of every task, in start order
    pub frames: Vec<Frame>,
    /// Tasks that completed on this tick, in start order
    pub completed: Vec<Frame>,
}

struct Task {
    seq: u64,
    animation: Animation,
    start: Instant,
    on_complete: Option<Callback>,
    done: oneshot::Sender<TransitionOutcome>,
}

impl Task {
    fn finish(self, outcome: TransitionOutcome) {
        if outcome == TransitionOutcome::Completed
            && let Some(callback) = self.on_complete
        {
            callback();
        }
        let _ = self.done.send(outcome);
    }
}

#[derive(Default)]
pub struct Animator {
    tasks: FxHashMap<AnimationKind, Task>,
    seq: u64,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transition, superseding any task of the same kind.
    pub fn animate(&mut self, animation: Animation, now: Instant) -> Transition {
        self.start(animation, now, None)
    }

    /// Like [`animate`](Self::animate), with a callback that runs only if
    /// the transition completes.
    pub fn animate_then(
        &mut self,
        animation: Animation,
        now: Instant,
        on_complete: impl FnOnce() + Send + Sync + 'static,
    ) -> Transition {
        self.start(animation, now, Some(Box::new(on_complete)))
    }

    fn start(&mut self, animation: Animation, now: Instant, on_complete: Option<Callback>) -> Transition {
        let kind = animation.kind;
        let (done, rx) = oneshot::channel();
        self.seq += 1;
        let task = Task {
            seq: self.seq,
            animation,
            start: now,
            on_complete,
            done,
        };
        if let Some(old) = self.tasks.insert(kind, task) {
            crate::debug!("anim"; "{} superseded", kind.label());
            old.finish(TransitionOutcome::Superseded);
        }
        Transition { kind, rx }
    }

    /// Cancel the task of `kind`. Returns false when nothing was running.
    pub fn cancel(&mut self, kind: AnimationKind) -> bool {
        match self.tasks.remove(&kind) {
            Some(task) => {
                task.finish(TransitionOutcome::Cancelled);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for task in self.sorted_drain() {
            task.finish(TransitionOutcome::Cancelled);
        }
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Parameters of the running task of `kind`
    pub fn active(&self, kind: AnimationKind) -> Option<&Animation> {
        self.tasks.get(&kind).map(|task| &task.animation)
    }

    /// Advance all tasks to `now`.
    pub fn tick(&mut self, now: Instant) -> Tick {
        let mut tick = Tick::default();
        let mut order: Vec<(u64, AnimationKind)> =
            self.tasks.iter().map(|(kind, task)| (task.seq, *kind)).collect();
        order.sort_unstable_by_key(|(seq, _)| *seq);

        for (_, kind) in order {
            let Some(task) = self.tasks.get(&kind) else {
                continue;
            };
            let elapsed = now.saturating_duration_since(task.start);
            let frame = Frame {
                kind,
                target: task.animation.target.clone(),
                value: task.animation.value_at(elapsed),
            };
            let finished = task.animation.progress(elapsed) >= 1.0;
            tick.frames.push(frame.clone());

            if finished && let Some(task) = self.tasks.remove(&kind) {
                task.finish(TransitionOutcome::Completed);
                tick.completed.push(frame);
            }
        }
        tick
    }

    fn sorted_drain(&mut self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.drain().map(|(_, task)| task).collect();
        tasks.sort_unstable_by_key(|task| task.seq);
        tasks
    }
}
