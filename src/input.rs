//! Keyboard and mouse state collected from winit events.

use std::collections::HashSet;

use winit::event::ElementState;
use winit::keyboard::KeyCode;

/// Pressed/just-pressed key sets plus a mouse delta accumulator. Per-frame
/// state is cleared by `end_frame`, which callers run once per update.
#[derive(Debug, Default)]
pub struct InputState {
    pressed: HashSet<KeyCode>,
    just_pressed: HashSet<KeyCode>,
    mouse_delta: (f32, f32),
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_key(&mut self, code: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.pressed.insert(code) {
                    self.just_pressed.insert(code);
                }
            }
            ElementState::Released => {
                self.pressed.remove(&code);
            }
        }
    }

    pub fn accumulate_mouse_delta(&mut self, dx: f32, dy: f32) {
        self.mouse_delta.0 += dx;
        self.mouse_delta.1 += dy;
    }

    pub fn key_down(&self, code: KeyCode) -> bool {
        self.pressed.contains(&code)
    }

    /// True only on the frame the key went down; held keys do not retrigger.
    pub fn just_pressed(&self, code: KeyCode) -> bool {
        self.just_pressed.contains(&code)
    }

    pub fn mouse_delta(&self) -> (f32, f32) {
        self.mouse_delta
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.mouse_delta = (0.0, 0.0);
    }
}
