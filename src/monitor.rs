// src/monitor.rs

use crate::config::SessionConfig;
use crate::dispatch::{Dispatcher, Presenter};
use crate::messages::BreakType;
use crate::recorder::{PromptKind, SessionRecorder};
use crate::session::is_affirmative;
use crate::timer::{CancelToken, CountdownOutcome, Phase, SessionTimer, Sleeper, TICK, countdown};
use rand::Rng;
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};

const NEXT_REMINDER_LABEL: &str = "Next reminder in";
const BREAK_LABEL: &str = "Break";

/// Sent from the worker to the main thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    Tick { remaining: u64 },
    Due,
    BreakTick { remaining: u64 },
    BreakOver,
    Stopped,
}

/// The main thread's answer to a `Due` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorCommand {
    StartBreak,
    Resume,
}

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub notifications_enabled: bool,
    pub break_types: Vec<BreakType>,
    /// Stop after this many reminders.
    pub max_reminders: Option<u32>,
}

/**
 * Background countdown for the monitor mode. The worker owns the timer;
 * the main thread only sees events and answers with commands.
 */
pub struct Monitor {
    worker: JoinHandle<()>,
    events: Receiver<MonitorEvent>,
    commands: Sender<MonitorCommand>,
}

impl Monitor {
    pub fn spawn<S>(
        session: &SessionConfig,
        max_reminders: Option<u32>,
        sleeper: S,
        cancel: CancelToken,
    ) -> io::Result<Self>
    where
        S: Sleeper + Send + 'static,
    {
        let (event_tx, events) = mpsc::channel::<MonitorEvent>();
        let (commands, command_rx) = mpsc::channel::<MonitorCommand>();
        let timer: SessionTimer = SessionTimer::from_session(session);
        let worker: JoinHandle<()> = thread::Builder::new()
            .name("break-monitor".to_string())
            .spawn(move || {
                run_worker(timer, max_reminders, &sleeper, &cancel, &event_tx, &command_rx);
                let _ = event_tx.send(MonitorEvent::Stopped);
            })?;
        Ok(Self {
            worker,
            events,
            commands,
        })
    }

    /// Blocks until the worker sends something. `None` once it is gone.
    pub fn next_event(&self) -> Option<MonitorEvent> {
        self.events.recv().ok()
    }

    pub fn send(&self, command: MonitorCommand) {
        if self.commands.send(command).is_err() {
            log::debug!("monitor worker already stopped, dropping {:?}", command);
        }
    }

    pub fn join(self) {
        drop(self.commands);
        if self.worker.join().is_err() {
            log::error!("monitor worker panicked");
        }
    }
}

fn run_worker<S: Sleeper + ?Sized>(
    mut timer: SessionTimer,
    max_reminders: Option<u32>,
    sleeper: &S,
    cancel: &CancelToken,
    events: &Sender<MonitorEvent>,
    commands: &Receiver<MonitorCommand>,
) {
    let mut reminders: u32 = 0;
    loop {
        let outcome: CountdownOutcome = countdown(&mut timer, Phase::Work, sleeper, cancel, |remaining| {
            let _ = events.send(MonitorEvent::Tick { remaining });
        });
        if outcome == CountdownOutcome::Cancelled || events.send(MonitorEvent::Due).is_err() {
            return;
        }
        reminders += 1;

        match wait_for_command(commands, cancel) {
            Some(MonitorCommand::StartBreak) => {
                let outcome: CountdownOutcome =
                    countdown(&mut timer, Phase::Break, sleeper, cancel, |remaining| {
                        let _ = events.send(MonitorEvent::BreakTick { remaining });
                    });
                if outcome == CountdownOutcome::Cancelled {
                    return;
                }
                let _ = events.send(MonitorEvent::BreakOver);
            }
            Some(MonitorCommand::Resume) => {}
            None => return,
        }

        if max_reminders.is_some_and(|limit: u32| reminders >= limit) {
            log::info!("reached {} reminders, stopping", reminders);
            return;
        }
    }
}

fn wait_for_command(commands: &Receiver<MonitorCommand>, cancel: &CancelToken) -> Option<MonitorCommand> {
    loop {
        if cancel.is_cancelled() {
            return None;
        }
        match commands.recv_timeout(TICK) {
            Ok(command) => return Some(command),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

/// Shows a break type and asks whether to start the break timer.
fn offer_break<R, P>(
    session: &SessionConfig,
    break_types: &[BreakType],
    dispatcher: &mut Dispatcher<R>,
    presenter: &mut P,
    recorder: &SessionRecorder,
) -> MonitorCommand
where
    R: Rng,
    P: Presenter + ?Sized,
{
    if dispatcher.dispatch_break_type(break_types, presenter).is_err() {
        return MonitorCommand::Resume;
    }
    let question: String = format!(
        "Suggested break: {} minutes. Start the break timer?",
        session.break_minutes()
    );
    let answer: String = presenter.confirm(&question);
    recorder.record(PromptKind::TakeBreak, &answer);
    if is_affirmative(&answer) {
        MonitorCommand::StartBreak
    } else {
        MonitorCommand::Resume
    }
}

/// Runs the monitor until it stops or is cancelled. Returns the number of reminders that came due.
pub fn run_monitor<R, P, S>(
    session: &SessionConfig,
    options: &MonitorOptions,
    dispatcher: &mut Dispatcher<R>,
    presenter: &mut P,
    recorder: &SessionRecorder,
    cancel: CancelToken,
    sleeper: S,
) -> io::Result<u32>
where
    R: Rng,
    P: Presenter + ?Sized,
    S: Sleeper + Send + 'static,
{
    if options.break_types.is_empty() {
        presenter.warn("No Break Types", "Please enable at least one break type!");
    }
    let monitor: Monitor = Monitor::spawn(session, options.max_reminders, sleeper, cancel)?;
    log::info!(
        "monitoring: reminder every {} min, {} break types",
        session.work_minutes(),
        options.break_types.len()
    );

    let mut reminders: u32 = 0;
    while let Some(event) = monitor.next_event() {
        match event {
            MonitorEvent::Tick { remaining } => presenter.countdown(NEXT_REMINDER_LABEL, remaining),
            MonitorEvent::Due => {
                reminders += 1;
                let command: MonitorCommand = if options.notifications_enabled {
                    offer_break(session, &options.break_types, dispatcher, presenter, recorder)
                } else {
                    log::info!("notifications disabled, skipping reminder");
                    MonitorCommand::Resume
                };
                monitor.send(command);
            }
            MonitorEvent::BreakTick { remaining } => presenter.countdown(BREAK_LABEL, remaining),
            MonitorEvent::BreakOver => presenter.finish_countdown(BREAK_LABEL),
            MonitorEvent::Stopped => break,
        }
    }
    monitor.join();
    Ok(reminders)
}

/// Fires one break notification right away, like pressing "Test Notification".
/// Returns whether anything was shown.
pub fn test_notification<R, P, S>(
    session: &SessionConfig,
    options: &MonitorOptions,
    dispatcher: &mut Dispatcher<R>,
    presenter: &mut P,
    recorder: &SessionRecorder,
    cancel: &CancelToken,
    sleeper: &S,
) -> bool
where
    R: Rng,
    P: Presenter + ?Sized,
    S: Sleeper + ?Sized,
{
    if !options.notifications_enabled {
        presenter.warn(
            "Notifications Disabled",
            "Please enable notifications in settings first!",
        );
        return false;
    }
    if options.break_types.is_empty() {
        presenter.warn("No Break Types", "Please enable at least one break type!");
        return false;
    }
    if offer_break(session, &options.break_types, dispatcher, presenter, recorder)
        == MonitorCommand::StartBreak
    {
        let mut timer: SessionTimer = SessionTimer::from_session(session);
        let outcome: CountdownOutcome = countdown(&mut timer, Phase::Break, sleeper, cancel, |remaining| {
            presenter.countdown(BREAK_LABEL, remaining)
        });
        if outcome == CountdownOutcome::Elapsed {
            presenter.finish_countdown(BREAK_LABEL);
        }
    }
    true
}
