use std::{sync::Arc, time::Duration};

use shared::protocol::{Command, ServerFrame};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::registry::Registry;

pub const DEFAULT_RELEASE_DELAY: Duration = Duration::from_millis(50);

/// Turns a single press notification into press + delayed release.
///
/// Releases are detached and cannot be cancelled. Two quick presses of the
/// same key schedule two independent releases.
#[derive(Debug, Clone)]
pub struct PressHoldEmulator {
    registry: Arc<Registry>,
    delay: Duration,
}

impl PressHoldEmulator {
    pub fn new(registry: Arc<Registry>, delay: Duration) -> Self {
        Self { registry, delay }
    }

    /// Schedules the `keyUp` for `command`. The release goes to whichever
    /// actuators are registered when the timer fires.
    pub fn on_press(&self, command: &Command) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let release = command.released();
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let key = release.key.clone();
            match registry.broadcast(&ServerFrame::Control(release)) {
                Ok(recipients) => debug!(%key, recipients, "synthesized release sent"),
                Err(err) => warn!(code = err.code().as_str(), %key, "release dropped: {err}"),
            }
        })
    }
}
