//! Transform and utilities for spatial positioning of rigid bodies.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A rigid pose: position and rotation. Bodies are never scaled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a new transform with position and rotation.
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Get the forward direction (negative Z in right-handed coordinates).
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Get the right direction (positive X).
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Get the up direction (positive Y).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Translate the transform by a delta.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Map a point from this transform's local space into world space.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Map a world-space point into this transform's local space.
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * (world - self.position)
    }

    /// Rotation of `self` expressed relative to `parent`.
    pub fn local_rotation_in(&self, parent: &Transform) -> Quat {
        (parent.rotation.inverse() * self.rotation).normalize()
    }
}

/// Horizontal (XZ-plane) component of a vector.
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Rotate `from` toward `to` by at most `max_radians`, never overshooting.
pub fn rotate_towards(from: Quat, to: Quat, max_radians: f32) -> Quat {
    let angle = from.angle_between(to);
    if angle <= max_radians || angle <= f32::EPSILON {
        to
    } else {
        from.slerp(to, max_radians / angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_round_trip_through_local_space() {
        let t = Transform::from_position_rotation(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(0.7),
        );
        let world = Vec3::new(-4.0, 0.5, 9.0);
        let back = t.transform_point(t.inverse_transform_point(world));
        assert!((back - world).length() < 1e-4);
    }

    #[test]
    fn rotate_towards_is_rate_limited() {
        let from = Quat::IDENTITY;
        let to = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let step = rotate_towards(from, to, 0.1);
        assert!((from.angle_between(step) - 0.1).abs() < 1e-3);
        assert_eq!(rotate_towards(from, to, 10.0), to);
    }

    #[test]
    fn forward_is_negative_z() {
        let t = Transform::default();
        assert_eq!(t.forward(), -Vec3::Z);
        assert_eq!(horizontal(Vec3::new(1.0, 5.0, 2.0)), Vec3::new(1.0, 0.0, 2.0));
    }
}
