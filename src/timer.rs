// src/timer.rs

use crate::config::SessionConfig;
use std::num::NonZeroU64;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::{thread, time::Duration};

/// One timer tick.
pub const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Work,
    Break,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Work => "Work",
            Phase::Break => "Break",
        }
    }
}

/**
 * Countdown state for the work and break intervals of a session,
 * at one-second resolution.
 */
#[derive(Debug, Clone)]
pub struct SessionTimer {
    work: NonZeroU64,
    brk: NonZeroU64,
    phase: Phase,
    remaining: u64,
}

impl SessionTimer {
    /// Creates a timer positioned at the start of a work interval.
    pub fn new(work_seconds: NonZeroU64, break_seconds: NonZeroU64) -> Self {
        Self {
            work: work_seconds,
            brk: break_seconds,
            phase: Phase::Work,
            remaining: work_seconds.get(),
        }
    }

    pub fn from_session(session: &SessionConfig) -> Self {
        Self::new(session.work_seconds(), session.break_seconds())
    }

    /// Rewinds the timer to the full length of `phase`.
    pub fn start(&mut self, phase: Phase) {
        self.phase = phase;
        self.remaining = self.duration(phase);
    }

    /// Consumes one second. Returns `true` only on the tick that reaches zero.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }

    pub fn duration(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Work => self.work.get(),
            Phase::Break => self.brk.get(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

pub fn format_mmss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Cancellation flag shared between the controller and a running countdown.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownOutcome {
    Elapsed,
    Cancelled,
}

/// Runs `phase` to completion, reporting the remaining seconds before each tick.
/// Cancellation is observed at every tick boundary.
pub fn countdown<S, F>(
    timer: &mut SessionTimer,
    phase: Phase,
    sleeper: &S,
    cancel: &CancelToken,
    mut on_tick: F,
) -> CountdownOutcome
where
    S: Sleeper + ?Sized,
    F: FnMut(u64),
{
    timer.start(phase);
    loop {
        if cancel.is_cancelled() {
            log::debug!("{} countdown cancelled at {}s", timer.phase().label(), timer.remaining());
            return CountdownOutcome::Cancelled;
        }
        on_tick(timer.remaining());
        sleeper.sleep(TICK);
        if cancel.is_cancelled() {
            log::debug!("{} countdown cancelled at {}s", timer.phase().label(), timer.remaining());
            return CountdownOutcome::Cancelled;
        }
        if timer.tick() {
            return CountdownOutcome::Elapsed;
        }
    }
}
