//! Active ragdoll rig.
//!
//! A rig is a hierarchy of rigid body parts held upright by orientation
//! drives. The rig records which bodies and drives belong to one character
//! and the spring strengths it was built with, so the character can go fully
//! limp and later stand back up with the same muscle tone.

use crate::backend::PhysicsBackend;
use engine_core::{BodyId, JointId, Quat, Transform, Vec3};
use thiserror::Error;

/// Errors raised while capturing a rig from the physics world.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RigError {
    #[error("rig part `{name}` refers to missing body {body}")]
    MissingBody { name: String, body: BodyId },
    #[error("rig is missing its `{0}` orientation drive")]
    MissingDrive(&'static str),
}

/// A single body of the rig.
#[derive(Debug, Clone, PartialEq)]
pub struct RigPart {
    pub name: String,
    pub body: BodyId,
    /// Parent body in the hierarchy, `None` for the root.
    pub parent: Option<BodyId>,
    /// Drive keeping this part oriented relative to its parent.
    pub drive: Option<JointId>,
}

/// Bodies and drives that make up one character, as built by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct RigDesc {
    pub root: BodyId,
    /// Drive that yaws the whole body toward the facing direction.
    pub main_drive: JointId,
    /// Drive that pitches the head.
    pub head_drive: Option<JointId>,
    pub left_hand: BodyId,
    pub right_hand: BodyId,
    /// Every part, including root and hands.
    pub parts: Vec<RigPart>,
}

/// A captured rig with the spring strengths to restore after a limp phase.
#[derive(Debug, Clone)]
pub struct RagdollRig {
    desc: RigDesc,
    rest_springs: Vec<(JointId, f32)>,
    head_rest: Quat,
}

impl RagdollRig {
    /// Validate `desc` against the world and capture the current drive springs.
    pub fn capture(physics: &dyn PhysicsBackend, desc: RigDesc) -> Result<Self, RigError> {
        for (name, body) in [
            ("root", desc.root),
            ("left_hand", desc.left_hand),
            ("right_hand", desc.right_hand),
        ] {
            if !physics.body_exists(body) {
                return Err(RigError::MissingBody {
                    name: name.to_string(),
                    body,
                });
            }
        }
        for part in &desc.parts {
            if !physics.body_exists(part.body) {
                return Err(RigError::MissingBody {
                    name: part.name.clone(),
                    body: part.body,
                });
            }
        }
        if !physics.has_drive(desc.main_drive) {
            return Err(RigError::MissingDrive("main"));
        }
        if let Some(head) = desc.head_drive {
            if !physics.has_drive(head) {
                return Err(RigError::MissingDrive("head"));
            }
        }

        let mut rest_springs = Vec::new();
        for joint in desc.drives() {
            if let Some(spring) = physics.drive_spring(joint) {
                if !rest_springs.iter().any(|(j, _)| *j == joint) {
                    rest_springs.push((joint, spring));
                }
            }
        }
        let head_rest = desc
            .head_drive
            .and_then(|j| physics.drive_target(j))
            .unwrap_or(Quat::IDENTITY);

        log::debug!(
            "captured rig rooted at {} with {} parts and {} drives",
            desc.root,
            desc.parts.len(),
            rest_springs.len()
        );

        Ok(Self {
            desc,
            rest_springs,
            head_rest,
        })
    }

    pub fn desc(&self) -> &RigDesc {
        &self.desc
    }

    pub fn root(&self) -> BodyId {
        self.desc.root
    }

    pub fn main_drive(&self) -> JointId {
        self.desc.main_drive
    }

    pub fn head_drive(&self) -> Option<JointId> {
        self.desc.head_drive
    }

    /// Head drive target when looking straight ahead.
    pub fn head_rest(&self) -> Quat {
        self.head_rest
    }

    pub fn parts(&self) -> &[RigPart] {
        &self.desc.parts
    }

    /// Whether `body` is one of this rig's parts.
    pub fn contains(&self, body: BodyId) -> bool {
        body == self.desc.root
            || body == self.desc.left_hand
            || body == self.desc.right_hand
            || self.desc.parts.iter().any(|p| p.body == body)
    }

    /// Zero every drive spring so the body collapses under physics alone.
    pub fn go_limp(&self, physics: &mut dyn PhysicsBackend) {
        for (joint, _) in &self.rest_springs {
            physics.set_drive_spring(*joint, 0.0);
        }
    }

    /// Restore every drive spring captured at setup.
    pub fn restore_drives(&self, physics: &mut dyn PhysicsBackend) {
        for (joint, spring) in &self.rest_springs {
            physics.set_drive_spring(*joint, *spring);
        }
    }

    /// Local rotation of every part relative to its parent, in part order.
    ///
    /// The root reports its world rotation.
    pub fn sample_local_rotations(&self, physics: &dyn PhysicsBackend) -> Vec<Quat> {
        self.desc
            .parts
            .iter()
            .map(|part| {
                let Some(pose) = physics.pose(part.body) else {
                    return Quat::IDENTITY;
                };
                match part.parent.and_then(|p| physics.pose(p)) {
                    Some(parent) => pose.local_rotation_in(&parent),
                    None => pose.rotation,
                }
            })
            .collect()
    }

    /// Move every part by `offset` and stop it.
    pub fn translate(&self, physics: &mut dyn PhysicsBackend, offset: Vec3) {
        for body in self.bodies() {
            if let Some(pose) = physics.pose(body) {
                physics.set_pose(
                    body,
                    Transform::from_position_rotation(pose.position + offset, pose.rotation),
                );
                physics.set_linear_velocity(body, Vec3::ZERO);
            }
        }
    }

    /// Every distinct body of the rig, root first.
    pub fn bodies(&self) -> Vec<BodyId> {
        let mut bodies = vec![self.desc.root];
        for body in self
            .desc
            .parts
            .iter()
            .map(|p| p.body)
            .chain([self.desc.left_hand, self.desc.right_hand])
        {
            if !bodies.contains(&body) {
                bodies.push(body);
            }
        }
        bodies
    }
}

impl RigDesc {
    fn drives(&self) -> impl Iterator<Item = JointId> + '_ {
        std::iter::once(self.main_drive)
            .chain(self.head_drive)
            .chain(self.parts.iter().filter_map(|p| p.drive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BodyKind;
    use crate::headless::HeadlessWorld;

    fn build(world: &mut HeadlessWorld) -> RigDesc {
        let root = world.add_body(BodyKind::Dynamic, 40.0, 0.3, Vec3::new(0.0, 1.0, 0.0));
        let left = world.add_body(BodyKind::Dynamic, 1.0, 0.1, Vec3::new(-0.4, 1.2, -0.3));
        let right = world.add_body(BodyKind::Dynamic, 1.0, 0.1, Vec3::new(0.4, 1.2, -0.3));
        let main = world.add_drive(800.0);
        let head = world.add_drive(200.0);
        RigDesc {
            root,
            main_drive: main,
            head_drive: Some(head),
            left_hand: left,
            right_hand: right,
            parts: vec![
                RigPart {
                    name: "torso".into(),
                    body: root,
                    parent: None,
                    drive: Some(main),
                },
                RigPart {
                    name: "left_hand".into(),
                    body: left,
                    parent: Some(root),
                    drive: None,
                },
                RigPart {
                    name: "right_hand".into(),
                    body: right,
                    parent: Some(root),
                    drive: None,
                },
            ],
        }
    }

    #[test]
    fn limp_and_restore_round_trip_springs() {
        let mut world = HeadlessWorld::default();
        let desc = build(&mut world);
        let main = desc.main_drive;
        let head = desc.head_drive.unwrap();
        let rig = RagdollRig::capture(&world, desc).unwrap();

        rig.go_limp(&mut world);
        assert_eq!(world.drive_spring(main), Some(0.0));
        assert_eq!(world.drive_spring(head), Some(0.0));

        rig.restore_drives(&mut world);
        assert_eq!(world.drive_spring(main), Some(800.0));
        assert_eq!(world.drive_spring(head), Some(200.0));
    }

    #[test]
    fn capture_rejects_missing_body() {
        let mut world = HeadlessWorld::default();
        let mut desc = build(&mut world);
        desc.right_hand = BodyId(999);
        assert!(matches!(
            RagdollRig::capture(&world, desc),
            Err(RigError::MissingBody { .. })
        ));
    }

    #[test]
    fn capture_rejects_missing_drive() {
        let mut world = HeadlessWorld::default();
        let mut desc = build(&mut world);
        desc.main_drive = JointId(77);
        assert_eq!(
            RagdollRig::capture(&world, desc).unwrap_err(),
            RigError::MissingDrive("main")
        );
    }

    #[test]
    fn translate_moves_all_parts_together() {
        let mut world = HeadlessWorld::default();
        let desc = build(&mut world);
        let rig = RagdollRig::capture(&world, desc).unwrap();
        let before: Vec<Vec3> = rig
            .bodies()
            .iter()
            .map(|b| world.pose(*b).unwrap().position)
            .collect();

        rig.translate(&mut world, Vec3::new(0.0, 5.0, 2.0));

        for (body, old) in rig.bodies().iter().zip(before) {
            let new = world.pose(*body).unwrap().position;
            assert!((new - old - Vec3::new(0.0, 5.0, 2.0)).length() < 1e-5);
        }
    }
}
