// ─── Launch Sessions ───

use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::LaunchIdentity;
use crate::provider::VersionProvider;
use crate::store::ManagedStore;

const MIN_USERNAME_CHARS: usize = 3;

/// Starts installed versions as detached offline sessions.
pub struct LaunchSession {
    provider: Arc<dyn VersionProvider>,
    store: ManagedStore,
}

impl LaunchSession {
    pub fn new(provider: Arc<dyn VersionProvider>, store: ManagedStore) -> Self {
        Self { provider, store }
    }

    /// Validate, plan and spawn the game process. `true` means the
    /// process started; it is not tracked afterwards.
    pub async fn launch(&self, version: &str, username: &str) -> bool {
        if version.is_empty() || username.is_empty() {
            warn!("Launch rejected: missing version or username");
            return false;
        }

        let version = version.trim();
        let username = username.trim();
        if username.chars().count() < MIN_USERNAME_CHARS {
            warn!("Launch rejected: username {:?} is too short", username);
            return false;
        }

        let identity = LaunchIdentity::offline(username);
        let plan = match self
            .provider
            .launch_plan(version, &self.store, &identity)
            .await
        {
            Ok(plan) => plan,
            Err(e) => {
                warn!("No launch plan for {}: {}", version, e);
                return false;
            }
        };

        match Command::new(&plan.program)
            .args(&plan.args)
            .current_dir(&plan.current_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                info!("Launched {} as {} (pid {})", version, username, child.id());
                true
            }
            Err(e) => {
                warn!("Could not spawn {}: {}", plan.program, e);
                false
            }
        }
    }
}
