// ─── Install Orchestration ───
//
// Wraps provider installs in a retry loop: transient network failures
// back off exponentially and try again, anything else fails the run on
// the spot. Callers learn the outcome from the returned bool; the log
// callback carries the narrative.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

use crate::config::EngineConfig;
use crate::provider::{InstallEvent, VersionProvider};
use crate::store::ManagedStore;

/// Where an orchestrated install currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    NotStarted,
    /// Attempt number, starting at 1.
    Attempting(u32),
    Installed,
    Failed,
}

/// Presentation hint attached to every log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogColor {
    Plain,
    Accent,
    Dim,
    Notice,
    Success,
    Error,
}

impl LogColor {
    pub fn as_hex(self) -> &'static str {
        match self {
            LogColor::Plain => "#ffffff",
            LogColor::Accent => "#00aaff",
            LogColor::Dim => "#555555",
            LogColor::Notice => "#ffaa00",
            LogColor::Success => "#00ff00",
            LogColor::Error => "#ff4444",
        }
    }
}

/// A 40-character lowercase hex payload is a content digest rather than
/// a phase description.
pub fn is_asset_digest(text: &str) -> bool {
    text.len() == 40 && text.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

pub struct InstallOrchestrator {
    provider: Arc<dyn VersionProvider>,
    store: ManagedStore,
    max_attempts: u32,
    backoff_base: Duration,
    state: Mutex<InstallState>,
}

impl InstallOrchestrator {
    pub fn new(
        provider: Arc<dyn VersionProvider>,
        store: ManagedStore,
        config: &EngineConfig,
    ) -> Self {
        Self {
            provider,
            store,
            max_attempts: config.max_install_attempts.max(1),
            backoff_base: config.backoff_base,
            state: Mutex::new(InstallState::NotStarted),
        }
    }

    pub async fn state(&self) -> InstallState {
        *self.state.lock().await
    }

    async fn set_state(&self, state: InstallState) {
        *self.state.lock().await = state;
    }

    /// Run an install to completion. Progress and log callbacks fire on
    /// the calling task; the returned bool is the only failure signal.
    pub async fn install(
        &self,
        version: &str,
        on_progress: impl Fn(u64) + Send + Sync,
        on_log: impl Fn(&str, LogColor) + Send + Sync,
    ) -> bool {
        if version.is_empty() {
            on_log("[install] no version selected", LogColor::Error);
            self.set_state(InstallState::Failed).await;
            return false;
        }

        let sink = |event: InstallEvent| match event {
            InstallEvent::Status(text) => {
                if is_asset_digest(&text) {
                    on_log(&format!("[asset] {}...", &text[..8]), LogColor::Dim);
                } else {
                    on_log(&format!("[status] {text}"), LogColor::Accent);
                }
            }
            InstallEvent::TaskSize(count) => {
                on_log(&format!("[task] {count} files queued"), LogColor::Notice);
            }
            InstallEvent::Progress(done) => on_progress(done),
        };

        for attempt in 1..=self.max_attempts {
            self.set_state(InstallState::Attempting(attempt)).await;
            on_log(
                &format!(
                    "[install] attempt {attempt}/{}: installing {version}",
                    self.max_attempts
                ),
                LogColor::Plain,
            );

            match self.provider.install(version, &self.store, &sink).await {
                Ok(()) => {
                    on_log(&format!("[install] {version} installed"), LogColor::Success);
                    self.set_state(InstallState::Installed).await;
                    return true;
                }
                Err(e) if e.is_transient() => {
                    debug!("Attempt {} failed transiently: {}", attempt, e);
                    if attempt == self.max_attempts {
                        on_log(
                            &format!("[install] giving up after {} attempts", self.max_attempts),
                            LogColor::Error,
                        );
                        break;
                    }

                    let wait = self.backoff_base * 2u32.pow(attempt - 1);
                    on_log("[network] connection error detected", LogColor::Error);
                    on_log(
                        &format!(
                            "[retry] waiting {}s before attempt {}/{}",
                            wait.as_secs(),
                            attempt + 1,
                            self.max_attempts
                        ),
                        LogColor::Notice,
                    );
                    sleep(wait).await;
                }
                Err(e) => {
                    on_log(&format!("[install] failed: {e}"), LogColor::Error);
                    self.set_state(InstallState::Failed).await;
                    return false;
                }
            }
        }

        self.set_state(InstallState::Failed).await;
        false
    }
}
