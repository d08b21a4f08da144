use std::collections::HashSet;

use super::types::Key;

/// Key transitions since the last `clear`.
///
/// `InputState` holds what is down; `InputFrame` what went down during one
/// pump, for edge-triggered toggles.
#[derive(Debug, Default)]
pub struct InputFrame {
    pub keys_pressed: HashSet<Key>,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.keys_pressed.clear();
    }

    /// Whether `key` went down since the last `clear`. Held keys and repeats count once.
    pub fn pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }
}
