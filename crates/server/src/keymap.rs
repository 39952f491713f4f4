use std::collections::HashMap;

use shared::protocol::{Action, Command, InputEvent, KeyPhase, DEFAULT_MODE};

/// Controller key names and the tokens actuators understand.
const BUILTIN_KEYS: &[(&str, &str)] = &[
    ("ARROW_UP", "up"),
    ("ARROW_DOWN", "down"),
    ("ARROW_LEFT", "left"),
    ("ARROW_RIGHT", "right"),
    ("ACTION_A", "a"),
    ("↑", "up"),
    ("↓", "down"),
    ("←", "left"),
    ("→", "right"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub command: Command,
    /// Set for `KEY_PRESS`: the caller owes the actuators a delayed release.
    pub schedule_release: bool,
}

#[derive(Debug, Clone)]
pub struct KeyMap {
    table: HashMap<String, String>,
    default_mode: String,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new(DEFAULT_MODE, HashMap::new())
    }
}

impl KeyMap {
    /// `aliases` take precedence over the built-in table.
    pub fn new(default_mode: impl Into<String>, aliases: HashMap<String, String>) -> Self {
        let mut table: HashMap<String, String> = BUILTIN_KEYS
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        table.extend(aliases);
        Self {
            table,
            default_mode: default_mode.into(),
        }
    }

    /// Canonical token for a controller key. Unmapped keys fall back to
    /// their lower-cased form.
    pub fn normalize(&self, key: &str) -> String {
        self.table
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_lowercase())
    }

    /// `None` when the phase is not one of the three known phases.
    pub fn translate(&self, event: &InputEvent) -> Option<Translation> {
        let phase = KeyPhase::parse(&event.phase)?;
        let action = match phase {
            KeyPhase::KeyDown | KeyPhase::KeyPress => Action::KeyDown,
            KeyPhase::KeyUp => Action::KeyUp,
        };

        Some(Translation {
            command: Command {
                action,
                key: self.normalize(&event.key),
                mode: event
                    .mode
                    .clone()
                    .filter(|mode| !mode.is_empty())
                    .unwrap_or_else(|| self.default_mode.clone()),
            },
            schedule_release: phase == KeyPhase::KeyPress,
        })
    }
}

#[cfg(test)]
#[path = "tests/keymap_tests.rs"]
mod tests;
