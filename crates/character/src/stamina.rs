//! Stamina economy: sprint latch, hang and sprint drain, passive regen.

use crate::config::StaminaConfig;

/// What the stamina update needs to know about the current tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaminaTick {
    pub now: f64,
    pub dt: f32,
    pub grounded: bool,
    /// Sprint input is held.
    pub sprint_held: bool,
    /// Planar movement input is non-zero.
    pub moving: bool,
    /// Airborne with a hand latched to a kinematic or fixed body.
    pub hanging: bool,
}

/// Stamina state embedded in each character.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamina {
    current: f32,
    max: f32,
    /// Passive regen may resume from this time on.
    regen_allowed_at: f64,
    sprinting: bool,
    /// End of the post-ground window in which a sprint may still start.
    sprint_allowed_until: f64,
}

impl Stamina {
    pub fn new(config: &StaminaConfig) -> Self {
        Self {
            current: config.max,
            max: config.max,
            regen_allowed_at: f64::NEG_INFINITY,
            sprinting: false,
            sprint_allowed_until: f64::NEG_INFINITY,
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    /// Overwrite the current value, clamped to `0..=max`.
    pub fn set_current(&mut self, value: f32) {
        self.current = value.clamp(0.0, self.max);
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            self.current / self.max
        }
    }

    pub fn is_sprinting(&self) -> bool {
        self.sprinting
    }

    pub fn is_empty(&self) -> bool {
        self.current <= 0.0
    }

    /// Refill and drop the sprint latch.
    pub fn reset(&mut self) {
        self.current = self.max;
        self.sprinting = false;
        self.regen_allowed_at = f64::NEG_INFINITY;
    }

    /// Advance one tick. Returns `true` when hanging just ran the pool dry,
    /// in which case both hands must let go.
    pub fn update(&mut self, config: &StaminaConfig, tick: StaminaTick) -> bool {
        if tick.grounded {
            self.sprint_allowed_until = tick.now + config.sprint_grace as f64;
        }

        let wants_sprint = tick.sprint_held && tick.moving;
        self.sprinting = if !wants_sprint {
            false
        } else if self.sprinting {
            self.current > 0.0
        } else {
            // A sprint cannot newly start mid-air once the grace window closes.
            let may_start = tick.grounded || tick.now <= self.sprint_allowed_until;
            may_start && self.current >= config.sprint_start_threshold
        };

        let mut exhausted = false;
        if tick.hanging {
            self.current -= config.hang_drain * tick.dt;
            self.regen_allowed_at = tick.now + config.regen_delay as f64;
            exhausted = self.current <= 0.0;
        } else if self.sprinting && tick.grounded && tick.moving {
            self.current -= config.sprint_drain * tick.dt;
            self.regen_allowed_at = tick.now + config.regen_delay as f64;
        } else if tick.grounded && tick.now >= self.regen_allowed_at {
            self.current += config.regen * tick.dt;
        }

        self.current = self.current.clamp(0.0, self.max);
        exhausted
    }
}
