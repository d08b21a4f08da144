use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{InputEvent, Key, KeyState, MouseButton};

/// Current input state.
///
/// Holds "is down" information, the pointer position and the accumulated wheel.
/// Key-down transitions are recorded into an `InputFrame`.
#[derive(Debug, Default)]
pub struct InputState {
    /// Whether the window is focused.
    pub focused: bool,

    /// Pointer position in physical pixels.
    pub pointer_pos: Option<(f32, f32)>,

    /// Wheel lines accumulated since start.
    pub wheel: f32,

    pub keys_down: HashSet<Key>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    /// Applies an event to the current state and records new key presses in `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Avoid stuck keys when focus changes mid-press.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved { x, y } => {
                self.pointer_pos = Some((*x, *y));
            }

            InputEvent::PointerLeft => {
                self.pointer_pos = None;
            }

            InputEvent::Key { key, state, .. } => match state {
                KeyState::Pressed => {
                    if self.keys_down.insert(*key) {
                        frame.keys_pressed.insert(*key);
                    }
                }
                KeyState::Released => {
                    self.keys_down.remove(key);
                }
            },

            InputEvent::PointerButton { button, state } => match state {
                KeyState::Pressed => {
                    self.buttons_down.insert(*button);
                }
                KeyState::Released => {
                    self.buttons_down.remove(button);
                }
            },

            InputEvent::Wheel { lines } => {
                self.wheel += *lines;
            }
        }
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }

    /// Pointer x, pointer y, button mask, wheel; as packed into the scene constants.
    pub fn mouse_vector(&self) -> [f32; 4] {
        let (x, y) = self.pointer_pos.unwrap_or((0.0, 0.0));
        let mask = self.buttons_down.iter().fold(0u32, |m, b| m | b.mask_bit());
        [x, y, mask as f32, self.wheel]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, state: KeyState) -> InputEvent {
        InputEvent::Key { key, state, repeat: false }
    }

    #[test]
    fn press_and_release_are_recorded_once() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::W, KeyState::Pressed));
        state.apply_event(&mut frame, key(Key::W, KeyState::Pressed));
        assert!(state.key_down(Key::W));
        assert_eq!(frame.keys_pressed.len(), 1);
        assert!(frame.pressed(Key::W));

        state.apply_event(&mut frame, key(Key::W, KeyState::Released));
        assert!(!state.key_down(Key::W));
    }

    #[test]
    fn held_key_is_not_pressed_again_after_clear() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::Space, KeyState::Pressed));
        frame.clear();
        state.apply_event(
            &mut frame,
            InputEvent::Key { key: Key::Space, state: KeyState::Pressed, repeat: true },
        );
        assert!(state.key_down(Key::Space));
        assert!(!frame.pressed(Key::Space));

        state.apply_event(&mut frame, key(Key::Space, KeyState::Released));
        state.apply_event(&mut frame, key(Key::Space, KeyState::Pressed));
        assert!(frame.pressed(Key::Space));
    }

    #[test]
    fn focus_loss_clears_held_keys() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, key(Key::A, KeyState::Pressed));
        state.apply_event(&mut frame, InputEvent::Focused(false));
        assert!(state.keys_down.is_empty());
    }

    #[test]
    fn mouse_vector_packs_position_buttons_and_wheel() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, InputEvent::PointerMoved { x: 10.0, y: 20.0 });
        state.apply_event(
            &mut frame,
            InputEvent::PointerButton { button: MouseButton::Right, state: KeyState::Pressed },
        );
        state.apply_event(&mut frame, InputEvent::Wheel { lines: 2.0 });
        assert_eq!(state.mouse_vector(), [10.0, 20.0, 2.0, 2.0]);
    }
}
