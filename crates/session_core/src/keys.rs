//! Interprets one `key_control` tick into camera motion.

use std::collections::BTreeMap;

use shared::domain::{KeySymbol, MotionCommand};

/// At most this many pressed keys contribute to one tick.
pub const MAX_COMBINED_KEYS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum KeyIntent {
    NearestImages,
    Motion(Vec<MotionCommand>),
}

pub fn is_space_bar(keys: &BTreeMap<KeySymbol, bool>) -> bool {
    keys.iter().any(|(key, pressed)| *pressed && key.is_space_bar())
}

/// Pressed symbols in lexicographic order, capped at [`MAX_COMBINED_KEYS`].
pub fn pressed_sequence(keys: &BTreeMap<KeySymbol, bool>) -> Vec<KeySymbol> {
    let mut pressed: Vec<KeySymbol> = keys
        .iter()
        .filter(|(_, pressed)| **pressed)
        .map(|(key, _)| key.clone())
        .collect();
    pressed.sort();
    pressed.truncate(MAX_COMBINED_KEYS);
    pressed
}

pub fn to_motion_commands(sequence: &[KeySymbol], step: f64) -> Vec<MotionCommand> {
    sequence
        .iter()
        .map(|key| MotionCommand {
            key: key.clone(),
            step,
        })
        .collect()
}

pub fn interpret(keys: &BTreeMap<KeySymbol, bool>, step: f64) -> KeyIntent {
    if is_space_bar(keys) {
        return KeyIntent::NearestImages;
    }
    KeyIntent::Motion(to_motion_commands(&pressed_sequence(keys), step))
}

#[cfg(test)]
#[path = "tests/keys_tests.rs"]
mod tests;
