//! Common gameplay components.

use serde::{Deserialize, Serialize};

/// Integer hit points. Never negative, never above `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn new(max: i32) -> Self {
        let max = max.max(0);
        Self { current: max, max }
    }

    /// Subtract damage, flooring at zero. Returns the amount actually removed.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.current = (self.current - amount.max(0)).max(0);
        before - self.current
    }

    /// Set health to an absolute value, clamped to `0..=max`.
    pub fn set(&mut self, value: i32) {
        self.current = value.clamp(0, self.max);
    }

    pub fn reset(&mut self) {
        self.current = self.max;
    }

    pub fn is_depleted(&self) -> bool {
        self.current == 0
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0 {
            0.0
        } else {
            self.current as f32 / self.max as f32
        }
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_floors_at_zero() {
        let mut hp = Health::new(100);
        assert_eq!(hp.take_damage(30), 30);
        assert_eq!(hp.take_damage(500), 70);
        assert!(hp.is_depleted());
        assert_eq!(hp.fraction(), 0.0);
    }

    #[test]
    fn negative_damage_does_not_heal() {
        let mut hp = Health::new(10);
        hp.take_damage(-5);
        assert_eq!(hp.current, 10);
    }
}
