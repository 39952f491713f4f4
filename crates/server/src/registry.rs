use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use shared::{
    domain::{ConnectionId, Role, RoleCounts},
    error::RelayError,
    protocol::{RoleHint, ServerFrame},
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Outbound side of a live connection. Frames are queued to the
/// connection's writer task.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    connection_id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerFrame>,
}

impl PeerHandle {
    pub fn new(connection_id: ConnectionId, tx: mpsc::UnboundedSender<ServerFrame>) -> Self {
        Self { connection_id, tx }
    }

    pub fn channel(connection_id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<ServerFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(connection_id, tx), rx)
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Returns false once the writer side has gone away.
    pub fn send(&self, frame: ServerFrame) -> bool {
        self.tx.send(frame).is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleOutcome {
    Assigned(Role),
    /// Last write wins: the connection switched roles mid-session.
    Reassigned { from: Role, to: Role },
    Unchanged(Role),
    /// Not stored; the connection keeps whatever role it had.
    Unknown(String),
    NotConnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnregisterOutcome {
    Removed(Role),
    Unclassified,
    NotConnected,
}

/// Maps a role hint to the role it requests, if any.
pub fn classify(hint: &RoleHint) -> Option<Role> {
    match hint.as_str()? {
        "pc" | "exe" => Some(Role::Actuator),
        "android_controller" => Some(Role::Controller),
        _ => None,
    }
}

#[derive(Debug)]
struct Connection {
    handle: PeerHandle,
    role: Role,
}

/// Live connections and their roles.
///
/// One lock guards every read and write; it is never held while a frame is
/// handed to a peer.
#[derive(Debug, Default)]
pub struct Registry {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Connection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connect(&self, handle: PeerHandle) {
        let connection_id = handle.connection_id();
        let previous = self.lock().insert(
            connection_id,
            Connection {
                handle,
                role: Role::Unassigned,
            },
        );
        if previous.is_some() {
            warn!(%connection_id, "connection id reused while live; role reset");
        }
        debug!(%connection_id, "connection tracked");
    }

    pub fn register(&self, connection_id: ConnectionId, hint: &RoleHint) -> RoleOutcome {
        let Some(role) = classify(hint) else {
            let err = RelayError::UnknownRole {
                connection_id,
                hint: hint.describe(),
            };
            warn!(code = err.code().as_str(), %connection_id, "{err}");
            return RoleOutcome::Unknown(hint.describe());
        };

        let mut connections = self.lock();
        let Some(connection) = connections.get_mut(&connection_id) else {
            drop(connections);
            warn!(%connection_id, %role, "register from a connection that is not live");
            return RoleOutcome::NotConnected;
        };

        let previous = std::mem::replace(&mut connection.role, role);
        drop(connections);

        let outcome = match previous {
            Role::Unassigned => RoleOutcome::Assigned(role),
            from if from == role => RoleOutcome::Unchanged(role),
            from => RoleOutcome::Reassigned { from, to: role },
        };
        match &outcome {
            RoleOutcome::Reassigned { from, to } => {
                warn!(%connection_id, %from, %to, hint = %hint.describe(), "connection switched role")
            }
            _ => info!(%connection_id, %role, hint = %hint.describe(), "connection registered"),
        }
        outcome
    }

    pub fn unregister(&self, connection_id: ConnectionId) -> UnregisterOutcome {
        let removed = self.lock().remove(&connection_id);
        let outcome = match removed {
            Some(Connection {
                role: Role::Unassigned,
                ..
            }) => UnregisterOutcome::Unclassified,
            Some(Connection { role, .. }) => UnregisterOutcome::Removed(role),
            None => UnregisterOutcome::NotConnected,
        };
        match outcome {
            UnregisterOutcome::Removed(role) => info!(%connection_id, %role, "connection removed"),
            UnregisterOutcome::Unclassified => {
                info!(%connection_id, "unregistered connection closed")
            }
            UnregisterOutcome::NotConnected => {
                debug!(%connection_id, "unregister for unknown connection")
            }
        }
        outcome
    }

    /// Snapshot of the actuators live right now. Unordered.
    pub fn actuators(&self) -> Vec<PeerHandle> {
        self.lock()
            .values()
            .filter(|c| c.role == Role::Actuator)
            .map(|c| c.handle.clone())
            .collect()
    }

    pub fn is_controller(&self, connection_id: ConnectionId) -> bool {
        self.role_of(connection_id) == Some(Role::Controller)
    }

    pub fn role_of(&self, connection_id: ConnectionId) -> Option<Role> {
        self.lock().get(&connection_id).map(|c| c.role)
    }

    pub fn counts(&self) -> RoleCounts {
        let mut counts = RoleCounts::default();
        for connection in self.lock().values() {
            match connection.role {
                Role::Controller => counts.controllers += 1,
                Role::Actuator => counts.actuators += 1,
                Role::Unassigned => counts.unassigned += 1,
            }
        }
        counts
    }

    /// Hands `frame` to every actuator in the current snapshot and returns
    /// how many accepted it.
    pub fn broadcast(&self, frame: &ServerFrame) -> Result<usize, RelayError> {
        let recipients = self.actuators();
        if recipients.is_empty() {
            return Err(RelayError::NoRecipients);
        }

        let mut delivered = 0;
        for peer in recipients {
            if peer.send(frame.clone()) {
                delivered += 1;
            } else {
                debug!(connection_id = %peer.connection_id(), "actuator writer closed mid-broadcast");
            }
        }
        Ok(delivered)
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
