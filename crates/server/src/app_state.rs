use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::domain::ConnectionId;

use crate::{
    config::Settings, dispatch::Dispatcher, emulator::PressHoldEmulator, keymap::KeyMap,
    registry::Registry,
};

pub(crate) struct AppState {
    pub(crate) dispatcher: Dispatcher,
    pub(crate) max_frame_bytes: usize,
    next_connection_id: AtomicU64,
}

impl AppState {
    pub(crate) fn new(settings: &Settings) -> Self {
        let registry = Arc::new(Registry::new());
        let emulator = PressHoldEmulator::new(Arc::clone(&registry), settings.press_release_delay());
        let keymap = KeyMap::new(settings.default_mode.clone(), settings.key_aliases.clone());
        Self {
            dispatcher: Dispatcher::new(registry, keymap, emulator),
            max_frame_bytes: settings.max_frame_bytes,
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Ids are never reused within a process.
    pub(crate) fn allocate_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_connection_id.fetch_add(1, Ordering::Relaxed))
    }
}
