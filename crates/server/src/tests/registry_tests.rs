use super::*;
use serde_json::json;
use shared::protocol::{Action, Command};
use tokio::sync::mpsc::UnboundedReceiver;

fn connected(registry: &Registry, id: u64) -> UnboundedReceiver<ServerFrame> {
    let (handle, rx) = PeerHandle::channel(ConnectionId(id));
    registry.connect(handle);
    rx
}

fn command() -> ServerFrame {
    ServerFrame::Control(Command {
        action: Action::KeyDown,
        key: "a".into(),
        mode: "game".into(),
    })
}

#[test]
fn classifies_role_hints() {
    assert_eq!(classify(&RoleHint::Legacy("pc".into())), Some(Role::Actuator));
    assert_eq!(classify(&RoleHint::structured("exe")), Some(Role::Actuator));
    assert_eq!(
        classify(&RoleHint::structured("android_controller")),
        Some(Role::Controller)
    );
    assert_eq!(classify(&RoleHint::Legacy("PC".into())), None);
    assert_eq!(classify(&RoleHint::from(json!({ "kind": "pc" }))), None);
}

#[test]
fn legacy_exe_is_equivalent_to_structured_exe() {
    let registry = Registry::new();
    let _a = connected(&registry, 1);
    let _b = connected(&registry, 2);

    assert_eq!(
        registry.register(ConnectionId(1), &RoleHint::Legacy("exe".into())),
        RoleOutcome::Assigned(Role::Actuator)
    );
    assert_eq!(
        registry.register(ConnectionId(2), &RoleHint::from(json!({ "type": "exe" }))),
        RoleOutcome::Assigned(Role::Actuator)
    );
    assert_eq!(registry.role_of(ConnectionId(1)), registry.role_of(ConnectionId(2)));
    assert_eq!(registry.actuators().len(), 2);
}

#[test]
fn unknown_hint_leaves_connection_unassigned_and_retryable() {
    let registry = Registry::new();
    let _rx = connected(&registry, 1);

    let outcome = registry.register(ConnectionId(1), &RoleHint::Legacy("tablet".into()));
    assert_eq!(outcome, RoleOutcome::Unknown("tablet".into()));
    assert_eq!(registry.role_of(ConnectionId(1)), Some(Role::Unassigned));

    let outcome = registry.register(ConnectionId(1), &RoleHint::structured("android_controller"));
    assert_eq!(outcome, RoleOutcome::Assigned(Role::Controller));
    assert!(registry.is_controller(ConnectionId(1)));
}

#[test]
fn re_registration_is_last_write_wins() {
    let registry = Registry::new();
    let _rx = connected(&registry, 1);

    registry.register(ConnectionId(1), &RoleHint::Legacy("android_controller".into()));
    assert_eq!(
        registry.register(ConnectionId(1), &RoleHint::Legacy("android_controller".into())),
        RoleOutcome::Unchanged(Role::Controller)
    );
    assert_eq!(
        registry.register(ConnectionId(1), &RoleHint::Legacy("pc".into())),
        RoleOutcome::Reassigned {
            from: Role::Controller,
            to: Role::Actuator
        }
    );
    assert!(!registry.is_controller(ConnectionId(1)));
    assert_eq!(registry.actuators().len(), 1);
}

#[test]
fn register_requires_a_live_connection() {
    let registry = Registry::new();
    assert_eq!(
        registry.register(ConnectionId(9), &RoleHint::Legacy("pc".into())),
        RoleOutcome::NotConnected
    );
    assert!(registry.actuators().is_empty());
}

#[test]
fn unregister_reports_what_was_removed() {
    let registry = Registry::new();
    let _a = connected(&registry, 1);
    let _b = connected(&registry, 2);
    registry.register(ConnectionId(1), &RoleHint::Legacy("pc".into()));

    assert_eq!(
        registry.unregister(ConnectionId(1)),
        UnregisterOutcome::Removed(Role::Actuator)
    );
    assert_eq!(registry.unregister(ConnectionId(2)), UnregisterOutcome::Unclassified);
    assert_eq!(registry.unregister(ConnectionId(1)), UnregisterOutcome::NotConnected);
    assert!(registry.actuators().is_empty());
    assert_eq!(registry.role_of(ConnectionId(1)), None);
}

#[test]
fn counts_track_each_role() {
    let registry = Registry::new();
    let _a = connected(&registry, 1);
    let _b = connected(&registry, 2);
    let _c = connected(&registry, 3);
    registry.register(ConnectionId(1), &RoleHint::Legacy("android_controller".into()));
    registry.register(ConnectionId(2), &RoleHint::Legacy("exe".into()));

    assert_eq!(
        registry.counts(),
        RoleCounts {
            controllers: 1,
            actuators: 1,
            unassigned: 1,
        }
    );
}

#[test]
fn broadcast_reaches_actuators_only() {
    let registry = Registry::new();
    let mut controller = connected(&registry, 1);
    let mut first = connected(&registry, 2);
    let mut second = connected(&registry, 3);
    let mut idle = connected(&registry, 4);
    registry.register(ConnectionId(1), &RoleHint::Legacy("android_controller".into()));
    registry.register(ConnectionId(2), &RoleHint::Legacy("pc".into()));
    registry.register(ConnectionId(3), &RoleHint::structured("exe"));

    assert_eq!(registry.broadcast(&command()), Ok(2));
    assert_eq!(first.try_recv().expect("first"), command());
    assert_eq!(second.try_recv().expect("second"), command());
    assert!(first.try_recv().is_err());
    assert!(controller.try_recv().is_err());
    assert!(idle.try_recv().is_err());
}

#[test]
fn broadcast_without_actuators_reports_no_recipients() {
    let registry = Registry::new();
    let _rx = connected(&registry, 1);
    registry.register(ConnectionId(1), &RoleHint::Legacy("android_controller".into()));
    assert_eq!(registry.broadcast(&command()), Err(RelayError::NoRecipients));
}

#[test]
fn broadcast_skips_actuators_whose_writer_is_gone() {
    let registry = Registry::new();
    let closed = connected(&registry, 1);
    let mut open = connected(&registry, 2);
    registry.register(ConnectionId(1), &RoleHint::Legacy("pc".into()));
    registry.register(ConnectionId(2), &RoleHint::Legacy("pc".into()));
    drop(closed);

    assert_eq!(registry.broadcast(&command()), Ok(1));
    assert!(open.try_recv().is_ok());
}
