// src/session.rs

use crate::config::SessionConfig;
use crate::dispatch::{Dispatcher, Presenter};
use crate::messages::{BreakType, Category};
use crate::recorder::{PromptKind, SessionRecorder};
use crate::timer::{
    CancelToken, CountdownOutcome, Phase, SessionTimer, Sleeper, ThreadSleeper, countdown,
};
use rand::Rng;

/// The only answer treated as "yes".
pub const AFFIRMATIVE: &str = "y";
const TAKE_BREAK_QUESTION: &str = "Take a break?";
const RESTART_QUESTION: &str = "Start another session?";

pub fn is_affirmative(answer: &str) -> bool {
    answer == AFFIRMATIVE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Working,
    AwaitingBreakDecision,
    OnBreak,
    SkippingBreak,
    AwaitingContinueDecision,
    Terminated,
}

/**
 * Interactive work / break cycle: count down, ask, record, repeat until
 * the user declines another session or the run is cancelled.
 */
pub struct ControlLoop<R: Rng, P: Presenter, S: Sleeper = ThreadSleeper> {
    timer: SessionTimer,
    dispatcher: Dispatcher<R>,
    presenter: P,
    sleeper: S,
    recorder: SessionRecorder,
    cancel: CancelToken,
    break_types: Vec<BreakType>,
    state: SessionState,
    cycles: u32,
}

impl<R: Rng, P: Presenter> ControlLoop<R, P> {
    pub fn new(
        session: &SessionConfig,
        dispatcher: Dispatcher<R>,
        presenter: P,
        recorder: SessionRecorder,
        cancel: CancelToken,
    ) -> Self {
        Self::with_sleeper(session, dispatcher, presenter, recorder, cancel, ThreadSleeper)
    }
}

impl<R: Rng, P: Presenter, S: Sleeper> ControlLoop<R, P, S> {
    pub fn with_sleeper(
        session: &SessionConfig,
        dispatcher: Dispatcher<R>,
        presenter: P,
        recorder: SessionRecorder,
        cancel: CancelToken,
        sleeper: S,
    ) -> Self {
        Self {
            timer: SessionTimer::from_session(session),
            dispatcher,
            presenter,
            sleeper,
            recorder,
            cancel,
            break_types: Vec::new(),
            state: SessionState::Working,
            cycles: 0,
        }
    }

    /// Break types to suggest at the start of each break.
    pub fn with_break_types(mut self, break_types: Vec<BreakType>) -> Self {
        self.break_types = break_types;
        self
    }

    /// Performs the current state's action and moves to the next state.
    pub fn step(&mut self) -> SessionState {
        let next: SessionState = match self.state {
            SessionState::Working => self.work(),
            SessionState::AwaitingBreakDecision => self.ask_for_break(),
            SessionState::OnBreak => self.take_break(),
            SessionState::SkippingBreak => SessionState::AwaitingContinueDecision,
            SessionState::AwaitingContinueDecision => self.ask_to_continue(),
            SessionState::Terminated => SessionState::Terminated,
        };
        log::debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
        next
    }

    /// Runs until terminated and returns the number of completed work intervals.
    pub fn run(&mut self) -> u32 {
        while self.step() != SessionState::Terminated {}
        self.cycles
    }

    fn run_phase(&mut self, phase: Phase) -> CountdownOutcome {
        let presenter: &mut P = &mut self.presenter;
        let outcome: CountdownOutcome = countdown(
            &mut self.timer,
            phase,
            &self.sleeper,
            &self.cancel,
            |remaining: u64| presenter.countdown(phase.label(), remaining),
        );
        if outcome == CountdownOutcome::Elapsed {
            presenter.finish_countdown(phase.label());
        }
        outcome
    }

    fn work(&mut self) -> SessionState {
        match self.run_phase(Phase::Work) {
            CountdownOutcome::Elapsed => {
                self.cycles += 1;
                SessionState::AwaitingBreakDecision
            }
            CountdownOutcome::Cancelled => SessionState::Terminated,
        }
    }

    fn ask_for_break(&mut self) -> SessionState {
        self.dispatcher.dispatch(Category::Work, &mut self.presenter);
        let answer: String = self.presenter.confirm(TAKE_BREAK_QUESTION);
        self.recorder.record(PromptKind::TakeBreak, &answer);
        if is_affirmative(&answer) {
            SessionState::OnBreak
        } else {
            SessionState::SkippingBreak
        }
    }

    fn take_break(&mut self) -> SessionState {
        self.dispatcher.dispatch(Category::Break, &mut self.presenter);
        // The tip is optional: with no break types the presenter gets a warning
        // and the break still runs on the plain message.
        if let Err(e) = self
            .dispatcher
            .dispatch_break_type(&self.break_types, &mut self.presenter)
        {
            log::debug!("no break-type tip for this break: {}", e);
        }
        match self.run_phase(Phase::Break) {
            CountdownOutcome::Elapsed => SessionState::AwaitingContinueDecision,
            CountdownOutcome::Cancelled => SessionState::Terminated,
        }
    }

    fn ask_to_continue(&mut self) -> SessionState {
        self.dispatcher.dispatch(Category::Return, &mut self.presenter);
        let answer: String = self.presenter.confirm(RESTART_QUESTION);
        self.recorder.record(PromptKind::Restart, &answer);
        if is_affirmative(&answer) {
            SessionState::Working
        } else {
            SessionState::Terminated
        }
    }
}

#[cfg(test)]
impl<R: Rng, P: Presenter, S: Sleeper> ControlLoop<R, P, S> {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }
}
