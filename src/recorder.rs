// src/recorder.rs

use crate::config::SessionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

pub const DEFAULT_LOG_FILE: &str = "session_log.json";

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("failed to serialize session log: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write session log to {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    TakeBreak,
    Restart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub prompt: PromptKind,
    pub answer: String,
}

/// Durations the session was started with, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setup {
    pub work: u64,
    #[serde(rename = "break")]
    pub brk: u64,
}

impl From<&SessionConfig> for Setup {
    fn from(session: &SessionConfig) -> Self {
        Self {
            work: session.work_minutes(),
            brk: session.break_minutes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLog {
    pub setup: Setup,
    #[serde(rename = "session responses")]
    pub responses: Vec<SessionResponse>,
}

impl SessionLog {
    pub fn new(setup: Setup) -> Self {
        Self {
            setup,
            responses: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug)]
struct RecorderState {
    log: SessionLog,
    path: Option<PathBuf>,
    persisted: bool,
}

/**
 * Collects the answers of one session and writes them out when it ends.
 * Clones share the same log, so a signal handler can finalize it too.
 */
#[derive(Debug, Clone)]
pub struct SessionRecorder {
    state: Arc<Mutex<RecorderState>>,
}

impl SessionRecorder {
    pub fn new(setup: Setup, path: impl Into<PathBuf>) -> Self {
        Self::with_path(setup, Some(path.into()))
    }

    /// A recorder that keeps answers in memory and never touches the disk.
    pub fn in_memory(setup: Setup) -> Self {
        Self::with_path(setup, None)
    }

    fn with_path(setup: Setup, path: Option<PathBuf>) -> Self {
        Self {
            state: Arc::new(Mutex::new(RecorderState {
                log: SessionLog::new(setup),
                path,
                persisted: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, prompt: PromptKind, answer: &str) {
        let mut state: MutexGuard<'_, RecorderState> = self.lock();
        if state.persisted {
            log::warn!("session already saved, dropping {:?} answer {:?}", prompt, answer);
            return;
        }
        log::debug!("recording {:?} -> {:?}", prompt, answer);
        state.log.responses.push(SessionResponse {
            prompt,
            answer: answer.to_string(),
        });
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> SessionLog {
        self.lock().log.clone()
    }

    /// Writes the log, replacing whatever is at the log path.
    pub fn persist(&self) -> Result<(), RecorderError> {
        let state: MutexGuard<'_, RecorderState> = self.lock();
        match &state.path {
            Some(path) => write_log(&state.log, path),
            None => {
                log::debug!("in-memory session, nothing to write");
                Ok(())
            }
        }
    }

    /// Persists the log once. Later calls, and in-memory recorders, do nothing
    /// and return `false`. Write failures are reported here and not returned.
    pub fn finalize(&self) -> bool {
        let (path, responses): (PathBuf, usize) = {
            let mut state: MutexGuard<'_, RecorderState> = self.lock();
            let Some(path) = state.path.clone() else {
                return false;
            };
            if state.persisted {
                return false;
            }
            state.persisted = true;
            (path, state.log.responses.len())
        };
        match self.persist() {
            Ok(()) => {
                log::info!("saved {} responses to {}", responses, path.display());
                println!("Session log saved to {}", path.display());
            }
            Err(e) => {
                log::error!("{}", e);
                eprintln!("Error: {}", e);
            }
        }
        true
    }
}

fn write_log(log: &SessionLog, path: &Path) -> Result<(), RecorderError> {
    let json: String = log.to_json()?;
    fs::write(path, json).map_err(|e| RecorderError::Write {
        path: path.display().to_string(),
        source: e,
    })
}
