// src/dispatch.rs

use crate::messages::{BreakType, Category, MessageBank};
use crate::timer::format_mmss;
use notify_rust::Notification;
use rand::Rng;
use rand::seq::IndexedRandom;
use rfd::{MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
use std::io::{self, BufRead, Stdin, StdinLock, Stdout, Write};
use thiserror::Error;

pub const APP_NAME: &str = "Break Reminder";
const START_LABEL: &str = "Start Timer";
const DISMISS_LABEL: &str = "Dismiss";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no break types configured")]
    NoBreakTypes,
}

/// Where reminders end up: a terminal, or desktop notifications and dialogs.
pub trait Presenter {
    fn show(&mut self, title: &str, body: &str);
    /// Asks a yes/no question and returns the raw (trimmed, lowercased) answer.
    fn confirm(&mut self, question: &str) -> String;
    fn countdown(&mut self, label: &str, remaining: u64);
    fn finish_countdown(&mut self, label: &str);
    fn warn(&mut self, title: &str, message: &str);
}

fn beep() {
    print!("\x07");
    io::stdout().flush().ok();
}

fn notify(title: &str, body: &str) {
    if let Err(e) = Notification::new()
        .appname(APP_NAME)
        .summary(title)
        .body(body)
        .show()
    {
        log::debug!("desktop notification failed: {}", e);
        beep();
    }
}

/**
 * Text prompts on a reader/writer pair, normally stdin and stdout.
 */
pub struct ConsolePresenter<R: BufRead, W: Write> {
    input: R,
    output: W,
    notifications: bool,
}

impl ConsolePresenter<StdinLock<'static>, Stdout> {
    pub fn stdio(notifications: bool) -> Self {
        let stdin: Stdin = io::stdin();
        Self::new(stdin.lock(), io::stdout(), notifications)
    }
}

impl<R: BufRead, W: Write> ConsolePresenter<R, W> {
    pub fn new(input: R, output: W, notifications: bool) -> Self {
        Self {
            input,
            output,
            notifications,
        }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Presenter for ConsolePresenter<R, W> {
    fn show(&mut self, title: &str, body: &str) {
        writeln!(self.output, "\n{}", body).ok();
        if self.notifications {
            notify(title, body);
        }
    }

    fn confirm(&mut self, question: &str) -> String {
        write!(self.output, "{} (y/n): ", question).ok();
        self.output.flush().ok();
        let mut answer: String = String::new();
        match self.input.read_line(&mut answer) {
            Ok(0) => log::debug!("stdin closed, treating answer as no"),
            Ok(_) => {}
            Err(e) => log::warn!("failed to read answer: {}", e),
        }
        answer.trim().to_lowercase()
    }

    fn countdown(&mut self, label: &str, remaining: u64) {
        write!(self.output, "\r{}: {} remaining...", label, format_mmss(remaining)).ok();
        self.output.flush().ok();
    }

    fn finish_countdown(&mut self, label: &str) {
        writeln!(self.output, "\r{} done!                ", label).ok();
    }

    fn warn(&mut self, title: &str, message: &str) {
        writeln!(self.output, "\n{}: {}", title, message).ok();
    }
}

/**
 * Desktop notifications plus native dialogs for decisions and warnings.
 * Must only be driven from the main thread.
 */
#[derive(Debug, Default)]
pub struct DesktopPresenter;

impl Presenter for DesktopPresenter {
    fn show(&mut self, title: &str, body: &str) {
        println!("\n{}: {}", title, body);
        notify(title, body);
    }

    fn confirm(&mut self, question: &str) -> String {
        let result: MessageDialogResult = MessageDialog::new()
            .set_title(APP_NAME)
            .set_description(question)
            .set_buttons(MessageButtons::OkCancelCustom(
                START_LABEL.to_string(),
                DISMISS_LABEL.to_string(),
            ))
            .show();
        match result {
            MessageDialogResult::Ok | MessageDialogResult::Yes => "y".to_string(),
            MessageDialogResult::Custom(label) if label == START_LABEL => "y".to_string(),
            _ => "n".to_string(),
        }
    }

    fn countdown(&mut self, label: &str, remaining: u64) {
        print!("\r{}: {}   ", label, format_mmss(remaining));
        io::stdout().flush().ok();
    }

    fn finish_countdown(&mut self, label: &str) {
        println!("\r{} done!                ", label);
        notify(label, "Break finished. Ready to get back to work?");
    }

    fn warn(&mut self, title: &str, message: &str) {
        eprintln!("\n{}: {}", title, message);
        MessageDialog::new()
            .set_level(MessageLevel::Warning)
            .set_title(title)
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }
}

/**
 * Picks reminder texts and break types with an injected RNG and hands them
 * to a presenter.
 */
pub struct Dispatcher<R: Rng> {
    bank: MessageBank,
    rng: R,
}

impl<R: Rng> Dispatcher<R> {
    pub fn new(bank: MessageBank, rng: R) -> Self {
        Self { bank, rng }
    }

    pub fn select(&mut self, category: Category) -> &'static str {
        self.bank.pick(category, &mut self.rng)
    }

    pub fn dispatch<P: Presenter + ?Sized>(&mut self, category: Category, presenter: &mut P) -> &'static str {
        let message: &'static str = self.select(category);
        log::info!("dispatching {:?} message", category);
        presenter.show(category.title(), message);
        message
    }

    /// Uniformly picks one of `enabled`.
    pub fn pick_break_type(&mut self, enabled: &[BreakType]) -> Result<BreakType, DispatchError> {
        enabled
            .choose(&mut self.rng)
            .copied()
            .ok_or(DispatchError::NoBreakTypes)
    }

    /// Picks and shows a break type. With nothing enabled the presenter gets a
    /// warning instead and nothing is shown.
    pub fn dispatch_break_type<P: Presenter + ?Sized>(
        &mut self,
        enabled: &[BreakType],
        presenter: &mut P,
    ) -> Result<BreakType, DispatchError> {
        match self.pick_break_type(enabled) {
            Ok(break_type) => {
                log::info!("dispatching {} break", break_type.key());
                presenter.show(break_type.title(), break_type.message());
                Ok(break_type)
            }
            Err(e) => {
                log::warn!("{}", e);
                presenter.warn("No Break Types", "Please enable at least one break type!");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Presenter;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Shown {
        Message { title: String, body: String },
        Question(String),
        Countdown { label: String, remaining: u64 },
        Finished(String),
        Warning { title: String, message: String },
    }

    /// Presenter that answers from a script and records everything it is asked to show.
    #[derive(Debug, Default)]
    pub struct ScriptedPresenter {
        answers: VecDeque<String>,
        pub shown: Vec<Shown>,
    }

    impl ScriptedPresenter {
        pub fn new(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|a| a.to_string()).collect(),
                shown: Vec::new(),
            }
        }

        pub fn messages(&self) -> Vec<&str> {
            self.shown
                .iter()
                .filter_map(|s| match s {
                    Shown::Message { body, .. } => Some(body.as_str()),
                    _ => None,
                })
                .collect()
        }

        pub fn warnings(&self) -> usize {
            self.shown
                .iter()
                .filter(|s| matches!(s, Shown::Warning { .. }))
                .count()
        }

        pub fn countdowns(&self, label: &str) -> Vec<u64> {
            self.shown
                .iter()
                .filter_map(|s| match s {
                    Shown::Countdown { label: l, remaining } if l == label => Some(*remaining),
                    _ => None,
                })
                .collect()
        }
    }

    impl Presenter for ScriptedPresenter {
        fn show(&mut self, title: &str, body: &str) {
            self.shown.push(Shown::Message {
                title: title.to_string(),
                body: body.to_string(),
            });
        }

        fn confirm(&mut self, question: &str) -> String {
            self.shown.push(Shown::Question(question.to_string()));
            self.answers.pop_front().unwrap_or_default()
        }

        fn countdown(&mut self, label: &str, remaining: u64) {
            self.shown.push(Shown::Countdown {
                label: label.to_string(),
                remaining,
            });
        }

        fn finish_countdown(&mut self, label: &str) {
            self.shown.push(Shown::Finished(label.to_string()));
        }

        fn warn(&mut self, title: &str, message: &str) {
            self.shown.push(Shown::Warning {
                title: title.to_string(),
                message: message.to_string(),
            });
        }
    }
}
