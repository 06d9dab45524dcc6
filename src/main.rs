// src/main.rs

mod config;
mod dispatch;
mod messages;
mod monitor;
mod recorder;
mod session;
mod timer;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{DEMO_SECONDS_PER_MINUTE, ReminderConfig, SECONDS_PER_MINUTE, SessionConfig};
use dispatch::{ConsolePresenter, DesktopPresenter, Dispatcher};
use env_logger::Env;
use messages::MessageBank;
use monitor::MonitorOptions;
use rand::SeedableRng;
use rand::rngs::StdRng;
use recorder::{DEFAULT_LOG_FILE, SessionRecorder, Setup};
use session::ControlLoop;
use std::path::{Path, PathBuf};
use timer::{CancelToken, ThreadSleeper};

/// Exit status after Ctrl-C or SIGTERM, as shells report SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration string or file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Reminder interval in minutes
    #[arg(short, long, global = true)]
    interval: Option<u64>,

    /// Break duration in minutes
    #[arg(short, long, global = true)]
    break_duration: Option<u64>,

    /// Enable or disable desktop notifications
    #[arg(long, global = true)]
    notifications: Option<bool>,

    /// Run six seconds per minute so you don't have to wait half an hour
    #[arg(long, global = true)]
    demo: bool,

    /// Seed for message selection
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Where to write the session log
    #[arg(short, long, global = true, default_value = DEFAULT_LOG_FILE)]
    log: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive work/break loop in the terminal (default)
    Console,
    /// Watch in the background and pop up a notification every interval
    Monitor {
        /// Stop after this many reminders
        #[arg(long)]
        cycles: Option<u32>,
    },
    /// Show one break notification right now
    TestNotification,
}

/// `test-notification` is a one-off and leaves the session log alone.
fn session_recorder(command: &Commands, setup: Setup, log: &Path) -> SessionRecorder {
    match command {
        Commands::TestNotification => SessionRecorder::in_memory(setup),
        Commands::Console | Commands::Monitor { .. } => SessionRecorder::new(setup, log),
    }
}

/// Stops any running countdown and saves the log.
fn shutdown(recorder: &SessionRecorder, cancel: &CancelToken) {
    cancel.cancel();
    recorder.finalize();
}

/// Runs `body` once the signal handler is in place. The log is finalized
/// whichever way this ends.
fn run_recorded<F>(recorder: &SessionRecorder, installed: Result<()>, body: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let outcome: Result<()> = installed.and_then(|()| body());
    recorder.finalize();
    outcome
}

fn build_dispatcher(seed: Option<u64>) -> Dispatcher<StdRng> {
    let rng: StdRng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    Dispatcher::new(MessageBank::default(), rng)
}

fn run_command(
    command: Commands,
    session: &SessionConfig,
    notifications_enabled: bool,
    options: MonitorOptions,
    mut dispatcher: Dispatcher<StdRng>,
    recorder: &SessionRecorder,
    cancel: CancelToken,
) -> Result<()> {
    match command {
        Commands::Console => {
            println!(
                "Working for {} minutes, breaks of {} minutes. Ctrl+C to quit.",
                session.work_minutes(),
                session.break_minutes()
            );
            let presenter = ConsolePresenter::stdio(notifications_enabled);
            let cycles: u32 = ControlLoop::new(session, dispatcher, presenter, recorder.clone(), cancel)
                .with_break_types(options.break_types)
                .run();
            println!("\nCompleted {} work sessions.", cycles);
            Ok(())
        }
        Commands::Monitor { cycles } => {
            let options: MonitorOptions = MonitorOptions {
                max_reminders: cycles,
                ..options
            };
            println!(
                "Monitoring: next reminder in {} minutes. Ctrl+C to stop.",
                session.work_minutes()
            );
            monitor::run_monitor(
                session,
                &options,
                &mut dispatcher,
                &mut DesktopPresenter,
                recorder,
                cancel,
                ThreadSleeper,
            )
            .map(|reminders: u32| println!("\nStopped after {} reminders.", reminders))
            .context("Failed to start the monitor")
        }
        Commands::TestNotification => {
            monitor::test_notification(
                session,
                &options,
                &mut dispatcher,
                &mut DesktopPresenter,
                recorder,
                &cancel,
                &ThreadSleeper,
            );
            Ok(())
        }
    }
}

fn run() -> Result<()> {
    let cli: Cli = Cli::parse();

    let mut config: ReminderConfig = ReminderConfig::load_or_default(cli.config.as_deref());
    config.apply_overrides(cli.interval, cli.break_duration, cli.notifications);
    let session: SessionConfig = config.session(if cli.demo {
        DEMO_SECONDS_PER_MINUTE
    } else {
        SECONDS_PER_MINUTE
    });
    let options: MonitorOptions = MonitorOptions {
        notifications_enabled: config.notifications_enabled,
        break_types: config.break_types.enabled(),
        max_reminders: None,
    };
    log::debug!("session: {:?}, options: {:?}", session, options);

    let command: Commands = cli.command.unwrap_or(Commands::Console);
    let recorder: SessionRecorder = session_recorder(&command, Setup::from(&session), &cli.log);
    let cancel: CancelToken = CancelToken::new();
    let dispatcher: Dispatcher<StdRng> = build_dispatcher(cli.seed);

    let handler_recorder: SessionRecorder = recorder.clone();
    let handler_cancel: CancelToken = cancel.clone();
    let installed: Result<()> = ctrlc::set_handler(move || {
        println!("\nInterrupted!");
        shutdown(&handler_recorder, &handler_cancel);
        std::process::exit(INTERRUPTED_EXIT_CODE);
    })
    .context("Error setting Ctrl-C handler");

    run_recorded(&recorder, installed, || {
        run_command(
            command,
            &session,
            config.notifications_enabled,
            options,
            dispatcher,
            &recorder,
            cancel,
        )
    })
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    if let Err(error) = run() {
        eprintln!("Error: {:#}", error);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recorder::{PromptKind, SessionLog};
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> Setup {
        Setup { work: 1, brk: 1 }
    }

    #[test]
    fn test_test_notification_leaves_existing_log_alone() {
        let dir: TempDir = TempDir::new().unwrap();
        let path: PathBuf = dir.path().join("session_log.json");
        fs::write(&path, "{\"previous\": true}").unwrap();
        let recorder: SessionRecorder = session_recorder(&Commands::TestNotification, setup(), &path);
        recorder.record(PromptKind::TakeBreak, "y");
        assert!(!recorder.finalize());
        shutdown(&recorder, &CancelToken::new());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"previous\": true}");
    }

    #[test]
    fn test_console_recorder_writes_log() {
        let dir: TempDir = TempDir::new().unwrap();
        let path: PathBuf = dir.path().join("session_log.json");
        let recorder: SessionRecorder = session_recorder(&Commands::Console, setup(), &path);
        assert!(recorder.finalize());
        assert!(path.exists());
    }

    #[test]
    fn test_shutdown_cancels_and_saves() {
        let dir: TempDir = TempDir::new().unwrap();
        let path: PathBuf = dir.path().join("session_log.json");
        let recorder: SessionRecorder =
            session_recorder(&Commands::Monitor { cycles: None }, setup(), &path);
        let cancel: CancelToken = CancelToken::new();
        recorder.record(PromptKind::TakeBreak, "n");
        shutdown(&recorder, &cancel);
        assert!(cancel.is_cancelled());
        let saved: SessionLog = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.responses.len(), 1);
        assert!(!recorder.finalize());
    }

    #[test]
    fn test_handler_failure_still_saves_log() {
        let dir: TempDir = TempDir::new().unwrap();
        let path: PathBuf = dir.path().join("session_log.json");
        let recorder: SessionRecorder = session_recorder(&Commands::Console, setup(), &path);
        let mut ran: bool = false;
        let outcome: Result<()> = run_recorded(&recorder, Err(anyhow::anyhow!("no handler")), || {
            ran = true;
            Ok(())
        });
        assert!(outcome.is_err());
        assert!(!ran);
        assert!(path.exists());
    }

    #[test]
    fn test_command_error_still_saves_log() {
        let dir: TempDir = TempDir::new().unwrap();
        let path: PathBuf = dir.path().join("session_log.json");
        let recorder: SessionRecorder = session_recorder(&Commands::Console, setup(), &path);
        recorder.record(PromptKind::Restart, "y");
        let outcome: Result<()> = run_recorded(&recorder, Ok(()), || Err(anyhow::anyhow!("failed")));
        assert!(outcome.is_err());
        let saved: SessionLog = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.responses.len(), 1);
    }

    #[test]
    fn test_parse_monitor_cycles() {
        let cli: Cli = Cli::try_parse_from(["break-reminder", "monitor", "--cycles", "2", "--demo"]).unwrap();
        assert!(cli.demo);
        assert!(matches!(cli.command, Some(Commands::Monitor { cycles: Some(2) })));
    }
}
