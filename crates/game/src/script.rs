//! Scripted timeline for the headless host.
//!
//! Device actions go through the same [`InputState`] a windowed client
//! feeds from winit, so the demo exercises the real sampling path. Host
//! actions are handed back to the caller.

use input::{ElementState, InputState, KeyCode, MouseButton};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Press(KeyCode),
    Release(KeyCode),
    Grab(MouseButton),
    Let(MouseButton),
    /// Pointer motion in device units.
    Look(f64, f64),
    /// Knock the local character over.
    Stagger,
    /// Light the campfire.
    Ignite,
}

#[derive(Debug, Clone, Copy)]
pub struct Cue {
    pub tick: u64,
    pub action: Action,
}

const fn cue(tick: u64, action: Action) -> Cue {
    Cue { tick, action }
}

/// Walk to the crate, carry it while turning and sprinting, throw it, then
/// get knocked over and stand back up.
pub fn demo_timeline() -> Vec<Cue> {
    vec![
        cue(30, Action::Press(KeyCode::KeyW)),
        cue(60, Action::Grab(MouseButton::Right)),
        cue(120, Action::Look(-12.0, 0.0)),
        cue(150, Action::Press(KeyCode::Space)),
        cue(151, Action::Release(KeyCode::Space)),
        cue(180, Action::Press(KeyCode::ShiftLeft)),
        cue(300, Action::Release(KeyCode::ShiftLeft)),
        cue(300, Action::Release(KeyCode::KeyW)),
        cue(320, Action::Let(MouseButton::Right)),
        cue(360, Action::Ignite),
        cue(420, Action::Stagger),
        cue(650, Action::Press(KeyCode::Space)),
        cue(651, Action::Release(KeyCode::Space)),
    ]
}

pub struct Script {
    cues: Vec<Cue>,
    next: usize,
}

impl Script {
    pub fn new(mut cues: Vec<Cue>) -> Self {
        cues.sort_by_key(|c| c.tick);
        Self { cues, next: 0 }
    }

    /// Apply every cue due at or before `tick`. Returns the host actions.
    pub fn apply(&mut self, tick: u64, input: &mut InputState) -> Vec<Action> {
        let mut host = Vec::new();
        while let Some(cue) = self.cues.get(self.next).copied().filter(|c| c.tick <= tick) {
            self.next += 1;
            match cue.action {
                Action::Press(key) => input.process_keyboard(key, ElementState::Pressed),
                Action::Release(key) => input.process_keyboard(key, ElementState::Released),
                Action::Grab(button) => input.process_mouse_button(button, ElementState::Pressed),
                Action::Let(button) => input.process_mouse_button(button, ElementState::Released),
                Action::Look(dx, dy) => input.process_mouse_motion((dx, dy)),
                action @ (Action::Stagger | Action::Ignite) => host.push(action),
            }
        }
        host
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.cues.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cues_fire_once_in_tick_order() {
        let mut script = Script::new(vec![
            cue(5, Action::Stagger),
            cue(2, Action::Press(KeyCode::KeyW)),
        ]);
        let mut input = InputState::new();

        assert!(script.apply(1, &mut input).is_empty());
        assert!(script.apply(3, &mut input).is_empty());
        assert!(input.is_key_held(KeyCode::KeyW));
        assert_eq!(script.apply(5, &mut input), vec![Action::Stagger]);
        assert!(script.apply(6, &mut input).is_empty());
        assert!(script.is_finished());
    }

    #[test]
    fn space_press_reaches_the_sample_once() {
        let mut script = Script::new(demo_timeline());
        let mut input = InputState::new();
        script.apply(150, &mut input);
        assert!(input.drain_sample().jump);
        script.apply(151, &mut input);
        assert!(!input.drain_sample().jump);
    }
}
