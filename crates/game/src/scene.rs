//! Demo scene on the Rapier world: ground, a wall, a crate to carry and a
//! campfire with kindling next to it.

use engine_core::BodyId;
use glam::Vec3;
use physics::{CollisionGroup, PhysicsWorld, RigDesc, RigPart};

const TORSO_HALF: Vec3 = Vec3::new(0.25, 0.35, 0.15);
const HEAD_OFFSET: Vec3 = Vec3::new(0.0, 0.55, 0.0);
const HAND_OFFSET: Vec3 = Vec3::new(0.35, 0.2, -0.3);

pub struct Scene {
    pub physics: PhysicsWorld,
    pub rig: RigDesc,
    pub crate_body: BodyId,
    pub wall: BodyId,
    pub campfire: BodyId,
    pub kindling: BodyId,
}

impl Scene {
    pub fn build() -> Self {
        let mut physics = PhysicsWorld::new();
        physics.add_ground_plane();

        let rig = spawn_rig(&mut physics, Vec3::new(0.0, TORSO_HALF.y + 0.01, 0.0));

        let crate_body = physics.add_dynamic_body(Vec3::new(HAND_OFFSET.x, 0.3, -1.5));
        physics.add_box_collider(crate_body, Vec3::splat(0.3), 60.0, CollisionGroup::prop());

        // Climbable: kinematic so the hands can hang from it.
        let wall = physics.add_kinematic_body(Vec3::new(0.0, 1.0, -4.0));
        physics.add_box_collider(
            wall,
            Vec3::new(2.0, 1.0, 0.1),
            1.0,
            CollisionGroup::environment(),
        );

        let campfire = physics.add_static_body(Vec3::new(2.0, 0.15, -1.0));
        physics.add_sphere_collider(campfire, 0.15, 1.0, CollisionGroup::environment());

        let kindling = physics.add_dynamic_body(Vec3::new(2.45, 0.1, -1.0));
        physics.add_box_collider(kindling, Vec3::splat(0.1), 200.0, CollisionGroup::prop());

        Self {
            physics,
            rig,
            crate_body,
            wall,
            campfire,
            kindling,
        }
    }
}

/// Torso, head and two hands, ball-jointed to the torso, with an upright
/// drive on the torso and a neck drive on the head.
pub fn spawn_rig(physics: &mut PhysicsWorld, at: Vec3) -> RigDesc {
    let group = CollisionGroup::character_part();

    // Orientation reference for the upright drive; no collider.
    let anchor = physics.add_static_body(at);

    let torso = physics.add_dynamic_body(at);
    physics.add_box_collider(torso, TORSO_HALF, 400.0, group);

    let head = physics.add_dynamic_body(at + HEAD_OFFSET);
    physics.add_sphere_collider(head, 0.12, 1000.0, group);

    let left_offset = HAND_OFFSET * Vec3::new(-1.0, 1.0, 1.0);
    let left = physics.add_dynamic_body(at + left_offset);
    physics.add_sphere_collider(left, 0.06, 1000.0, group);
    let right = physics.add_dynamic_body(at + HAND_OFFSET);
    physics.add_sphere_collider(right, 0.06, 1000.0, group);

    for part in [torso, head, left, right] {
        physics.set_root(part, torso);
    }

    physics.add_limb_joint(torso, head, HEAD_OFFSET - Vec3::new(0.0, 0.1, 0.0), Vec3::new(0.0, -0.1, 0.0));
    physics.add_limb_joint(torso, left, left_offset, Vec3::ZERO);
    physics.add_limb_joint(torso, right, HAND_OFFSET, Vec3::ZERO);

    let main_drive = physics.add_orientation_drive(anchor, torso, 800.0, 60.0);
    let neck = physics.add_orientation_drive(torso, head, 200.0, 20.0);

    let part = |name: &str, body, parent, drive| RigPart {
        name: name.to_string(),
        body,
        parent,
        drive,
    };
    RigDesc {
        root: torso,
        main_drive,
        head_drive: Some(neck),
        left_hand: left,
        right_hand: right,
        parts: vec![
            part("torso", torso, None, Some(main_drive)),
            part("head", head, Some(torso), Some(neck)),
            part("left_hand", left, Some(torso), None),
            part("right_hand", right, Some(torso), None),
        ],
    }
}
