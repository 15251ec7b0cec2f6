//! Input surface decoupled from any window system. The platform layer
//! samples its keyboard/pointer state once per update call and fills an
//! `InputState`; discrete toggles arrive as edge-triggered `InputEvent`s so
//! a held key cannot retrigger every frame.

/// Raw movement state sampled once per camera update.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputState {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    /// Pointer motion since the previous sample, in surface pixels.
    pub pointer_dx: f64,
    pub pointer_dy: f64,
    pub left_button: bool,
    pub right_button: bool,
}

/// A discrete action fired once per key press edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Step the renderer's lighting mode to its successor.
    CycleLightingMode,
    /// Flip shadow casting on or off.
    ToggleShadows,
    /// Write the current framebuffer to the fixed snapshot file.
    SaveScreenshot,
}
