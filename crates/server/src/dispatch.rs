use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::ConnectionId,
    error::RelayError,
    protocol::{ClientFrame, Command, InputEvent, RoleHint, ServerFrame},
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    emulator::PressHoldEmulator,
    keymap::KeyMap,
    registry::{PeerHandle, Registry, RoleOutcome, UnregisterOutcome},
};

/// Result of relaying one control event.
#[derive(Debug)]
pub struct Delivery {
    pub command: Command,
    /// Zero when no actuator was connected; the event still counts as
    /// handled.
    pub recipients: usize,
    /// Timer for the synthesized release of a `KEY_PRESS`.
    pub release: Option<JoinHandle<()>>,
}

/// Routes inbound frames: registration goes to the registry, control events
/// from controllers are translated and fanned out to actuators.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    keymap: KeyMap,
    emulator: PressHoldEmulator,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, keymap: KeyMap, emulator: PressHoldEmulator) -> Self {
        Self {
            registry,
            keymap,
            emulator,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn on_connect(&self, handle: PeerHandle) {
        info!(connection_id = %handle.connection_id(), "client connected");
        self.registry.connect(handle);
    }

    pub fn on_register(&self, connection_id: ConnectionId, hint: &RoleHint) -> RoleOutcome {
        self.registry.register(connection_id, hint)
    }

    pub fn on_disconnect(&self, connection_id: ConnectionId) -> UnregisterOutcome {
        self.registry.unregister(connection_id)
    }

    /// Decodes one text frame and handles it. Bad frames are logged and
    /// dropped.
    pub fn on_text(&self, connection_id: ConnectionId, text: &str) {
        match ClientFrame::decode(text) {
            Ok(frame) => self.on_frame(connection_id, frame),
            Err(err) => log_drop(connection_id, &err, None),
        }
    }

    pub fn on_frame(&self, connection_id: ConnectionId, frame: ClientFrame) {
        match frame {
            ClientFrame::Register(hint) => {
                self.on_register(connection_id, &hint);
            }
            ClientFrame::AndroidControl(payload) => {
                self.on_inbound_event(connection_id, &payload).ok();
            }
        }
    }

    /// Relays one `androidControl` payload. Every failure is logged here;
    /// the returned error is informational only.
    pub fn on_inbound_event(
        &self,
        connection_id: ConnectionId,
        payload: &Value,
    ) -> Result<Delivery, RelayError> {
        self.dispatch(connection_id, payload).map_err(|err| {
            log_drop(connection_id, &err, Some(payload));
            err
        })
    }

    fn dispatch(&self, connection_id: ConnectionId, payload: &Value) -> Result<Delivery, RelayError> {
        if !self.registry.is_controller(connection_id) {
            return Err(RelayError::UnregisteredSender {
                connection_id,
                role: self.registry.role_of(connection_id),
            });
        }

        let event = InputEvent::from_payload(payload)?;
        let translation = self
            .keymap
            .translate(&event)
            .ok_or_else(|| RelayError::UnknownPhase {
                phase: event.phase.clone(),
            })?;
        let command = translation.command;

        let recipients = match self.registry.broadcast(&ServerFrame::Control(command.clone())) {
            Ok(recipients) => {
                debug!(
                    %connection_id,
                    key = %command.key,
                    action = ?command.action,
                    recipients,
                    "command relayed"
                );
                recipients
            }
            Err(err) => {
                log_drop(connection_id, &err, Some(payload));
                0
            }
        };

        let release = translation
            .schedule_release
            .then(|| self.emulator.on_press(&command));

        Ok(Delivery {
            command,
            recipients,
            release,
        })
    }
}

fn log_drop(connection_id: ConnectionId, err: &RelayError, payload: Option<&Value>) {
    let code = err.code().as_str();
    match payload {
        Some(payload) => warn!(%connection_id, code, %payload, "dropped: {err}"),
        None => warn!(%connection_id, code, "dropped: {err}"),
    }
}

#[cfg(test)]
#[path = "tests/dispatch_tests.rs"]
mod tests;
