//! Input handling for the input-owning participant.
//!
//! Raw keyboard and mouse events are folded into [`InputState`] every render
//! frame. Once per simulation tick the state is drained into a single
//! [`InputSample`], which carries everything the authority needs and resets
//! the accumulated look delta and the latched button edges.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One tick worth of input, consumed exactly once by the simulating authority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSample {
    /// Planar movement, x = strafe right, y = forward. Length is at most 1.
    pub movement: Vec2,
    /// Pointer delta accumulated since the previous sample.
    pub look_delta: Vec2,
    /// Absolute facing yaw in degrees, derived on the input-owning side.
    pub aim_yaw_deg: f32,
    pub sprint: bool,
    /// Jump was pressed at least once since the previous sample.
    pub jump: bool,
    /// Recover was pressed at least once since the previous sample.
    pub recover: bool,
    pub left_grab: bool,
    pub right_grab: bool,
}

impl InputSample {
    /// Whether there is any planar movement intent.
    pub fn has_movement(&self) -> bool {
        self.movement.length_squared() > 1e-6
    }
}

/// Manages input state between simulation ticks.
#[derive(Debug)]
pub struct InputState {
    /// Keys currently held down.
    keys_held: HashSet<KeyCode>,
    /// Keys pressed this frame.
    keys_pressed: HashSet<KeyCode>,

    /// Mouse buttons currently held.
    mouse_held: HashSet<MouseButton>,

    /// Pointer delta accumulated until the next drain.
    accumulated_delta: Vec2,
    /// Yaw in degrees integrated from horizontal pointer motion.
    aim_yaw_deg: f32,
    yaw_sensitivity: f32,

    /// Edges latched until the next drain so a short press is never lost.
    jump_latched: bool,
    recover_latched: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            keys_held: HashSet::new(),
            keys_pressed: HashSet::new(),
            mouse_held: HashSet::new(),
            accumulated_delta: Vec2::ZERO,
            aim_yaw_deg: 0.0,
            yaw_sensitivity: 2.5,
            jump_latched: false,
            recover_latched: false,
        }
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input state whose aim yaw integrates pointer motion at `sensitivity` degrees per unit.
    pub fn with_yaw_sensitivity(sensitivity: f32) -> Self {
        Self {
            yaw_sensitivity: sensitivity,
            ..Self::default()
        }
    }

    /// Clear per-frame state. Call at the start of each render frame.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
    }

    /// Process a keyboard event.
    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.keys_held.contains(&key) {
                    self.keys_pressed.insert(key);
                    if key == KeyCode::Space {
                        // Space both jumps and, while ragdolled, asks to get up.
                        self.jump_latched = true;
                        self.recover_latched = true;
                    }
                }
                self.keys_held.insert(key);
            }
            ElementState::Released => {
                self.keys_held.remove(&key);
            }
        }
    }

    /// Process a mouse button event.
    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.mouse_held.insert(button);
            }
            ElementState::Released => {
                self.mouse_held.remove(&button);
            }
        }
    }

    /// Process mouse movement.
    pub fn process_mouse_motion(&mut self, delta: (f64, f64)) {
        let delta = Vec2::new(delta.0 as f32, delta.1 as f32);
        self.accumulated_delta += delta;
        self.aim_yaw_deg = (self.aim_yaw_deg - delta.x * self.yaw_sensitivity).rem_euclid(360.0);
    }

    /// Check if a key is currently held.
    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// Check if a key was pressed this frame.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Check if a mouse button is held.
    pub fn is_mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_held.contains(&button)
    }

    /// Pointer delta accumulated since the last drain.
    pub fn pending_look_delta(&self) -> Vec2 {
        self.accumulated_delta
    }

    pub fn aim_yaw_deg(&self) -> f32 {
        self.aim_yaw_deg
    }

    /// Get movement input as a normalized vector (WASD).
    pub fn get_movement_input(&self) -> Vec2 {
        let mut movement = Vec2::ZERO;

        if self.is_key_held(KeyCode::KeyW) {
            movement.y += 1.0;
        }
        if self.is_key_held(KeyCode::KeyS) {
            movement.y -= 1.0;
        }
        if self.is_key_held(KeyCode::KeyA) {
            movement.x -= 1.0;
        }
        if self.is_key_held(KeyCode::KeyD) {
            movement.x += 1.0;
        }

        if movement.length_squared() > 0.0 {
            movement = movement.normalize();
        }

        movement
    }

    /// Check if sprint is held (Shift).
    pub fn is_sprinting(&self) -> bool {
        self.is_key_held(KeyCode::ShiftLeft) || self.is_key_held(KeyCode::ShiftRight)
    }

    /// Left hand grab (Left mouse button).
    pub fn is_left_grab_held(&self) -> bool {
        self.is_mouse_held(MouseButton::Left)
    }

    /// Right hand grab (Right mouse button).
    pub fn is_right_grab_held(&self) -> bool {
        self.is_mouse_held(MouseButton::Right)
    }

    /// Build this tick's sample and reset everything that must be consumed once.
    pub fn drain_sample(&mut self) -> InputSample {
        let sample = InputSample {
            movement: self.get_movement_input(),
            look_delta: self.accumulated_delta,
            aim_yaw_deg: self.aim_yaw_deg,
            sprint: self.is_sprinting(),
            jump: self.jump_latched,
            recover: self.recover_latched,
            left_grab: self.is_left_grab_held(),
            right_grab: self.is_right_grab_held(),
        };

        self.accumulated_delta = Vec2::ZERO;
        self.jump_latched = false;
        self.recover_latched = false;

        log::trace!("drained input sample {:?}", sample);
        sample
    }
}

// Re-export for convenience
pub use winit::event::{ElementState, MouseButton};
pub use winit::keyboard::KeyCode;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_delta_accumulates_across_frames_until_drained() {
        let mut input = InputState::new();
        input.process_mouse_motion((3.0, -1.0));
        input.begin_frame();
        input.process_mouse_motion((2.0, 4.0));
        input.begin_frame();
        assert_eq!(input.pending_look_delta(), Vec2::new(5.0, 3.0));

        let sample = input.drain_sample();
        assert_eq!(sample.look_delta, Vec2::new(5.0, 3.0));

        let next = input.drain_sample();
        assert_eq!(next.look_delta, Vec2::ZERO);
    }

    #[test]
    fn jump_edge_survives_frames_and_is_consumed_once() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::Space, ElementState::Pressed);
        input.process_keyboard(KeyCode::Space, ElementState::Released);
        assert!(input.is_key_pressed(KeyCode::Space));
        input.begin_frame();
        assert!(!input.is_key_pressed(KeyCode::Space));
        input.begin_frame();

        let sample = input.drain_sample();
        assert!(sample.jump);
        assert!(sample.recover);
        assert!(!input.drain_sample().jump);
    }

    #[test]
    fn held_key_does_not_repeat_jump() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::Space, ElementState::Pressed);
        assert!(input.drain_sample().jump);
        // OS key repeat sends more presses while held.
        input.process_keyboard(KeyCode::Space, ElementState::Pressed);
        assert!(!input.drain_sample().jump);
    }

    #[test]
    fn diagonal_movement_is_normalized() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        input.process_keyboard(KeyCode::KeyD, ElementState::Pressed);
        input.process_keyboard(KeyCode::ShiftLeft, ElementState::Pressed);
        input.process_mouse_button(MouseButton::Right, ElementState::Pressed);

        let sample = input.drain_sample();
        assert!((sample.movement.length() - 1.0).abs() < 1e-5);
        assert!(sample.sprint);
        assert!(sample.right_grab);
        assert!(!sample.left_grab);
        assert!(sample.has_movement());
    }

    #[test]
    fn aim_yaw_wraps_into_range() {
        let mut input = InputState::with_yaw_sensitivity(1.0);
        input.process_mouse_motion((10.0, 0.0));
        assert!((input.aim_yaw_deg() - 350.0).abs() < 1e-4);
    }
}
