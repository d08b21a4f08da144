/// Keys the demo reacts to.
///
/// Everything else arrives as `Key::Other` with the platform key code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Space,

    W,
    A,
    S,
    D,
    Q,
    E,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    Other(u32),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Mouse button identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

impl MouseButton {
    /// Bit used in the packed button mask of the scene constants.
    pub fn mask_bit(self) -> u32 {
        match self {
            MouseButton::Left => 1,
            MouseButton::Right => 2,
            MouseButton::Middle => 4,
            MouseButton::Other(_) => 8,
        }
    }
}

/// Platform-agnostic input events.
///
/// The window shim translates window-system events into these; pointer
/// coordinates are physical pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key { key: Key, state: KeyState, repeat: bool },
    PointerMoved { x: f32, y: f32 },
    PointerButton { button: MouseButton, state: KeyState },
    /// Wheel motion in lines (pixel deltas are converted).
    Wheel { lines: f32 },
    PointerLeft,
    Focused(bool),
}
