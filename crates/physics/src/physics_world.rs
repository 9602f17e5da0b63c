//! Physics world management with Rapier3D.

use std::collections::HashMap;

use crate::backend::{BodyKind, PhysicsBackend, PointConstraint};
use crate::collision::CollisionGroup;
use engine_core::{
    pack_arena_index, unpack_arena_index, BodyId, ConstraintId, EulerRot, JointId, Quat,
    Transform, Vec3,
};
use rapier3d::na::{Isometry3, Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;

/// A grab latch: a fixed joint plus the thresholds that break it.
#[derive(Debug, Clone, Copy)]
struct Latch {
    handle: ImpulseJointHandle,
    break_force: f32,
    break_torque: f32,
}

/// An orientation drive: angular motors on a joint with free linear axes.
#[derive(Debug, Clone, Copy)]
struct Drive {
    target: Quat,
    spring: f32,
    damping: f32,
}

/// Collider densities of a body from before its mass was first overridden.
#[derive(Debug, Clone)]
struct MassOverride {
    mass: f32,
    densities: Vec<(ColliderHandle, f32)>,
}

/// Main physics world containing all simulation state.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,
    latches: HashMap<ConstraintId, Latch>,
    next_constraint: u64,
    broken: Vec<ConstraintId>,
    drives: HashMap<JointId, Drive>,
    mass_overrides: HashMap<BodyId, MassOverride>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn to_vec3(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub(crate) fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

pub(crate) fn to_point(v: Vec3) -> Point<Real> {
    point![v.x, v.y, v.z]
}

fn to_rotation(q: Quat) -> UnitQuaternion<Real> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

fn to_quat(r: &UnitQuaternion<Real>) -> Quat {
    Quat::from_xyzw(r.i, r.j, r.k, r.w)
}

pub(crate) fn body_id(handle: RigidBodyHandle) -> BodyId {
    let (index, generation) = handle.into_raw_parts();
    BodyId(pack_arena_index(index, generation))
}

pub(crate) fn body_handle(body: BodyId) -> RigidBodyHandle {
    let (index, generation) = unpack_arena_index(body.0);
    RigidBodyHandle::from_raw_parts(index, generation)
}

fn joint_id(handle: ImpulseJointHandle) -> JointId {
    let (index, generation) = handle.into_raw_parts();
    JointId(pack_arena_index(index, generation))
}

fn joint_handle(joint: JointId) -> ImpulseJointHandle {
    let (index, generation) = unpack_arena_index(joint.0);
    ImpulseJointHandle::from_raw_parts(index, generation)
}

impl PhysicsWorld {
    /// Create a new physics world with default gravity.
    pub fn new() -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            gravity: vector![0.0, -9.81, 0.0],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            latches: HashMap::new(),
            next_constraint: 1,
            broken: Vec::new(),
            drives: HashMap::new(),
            mass_overrides: HashMap::new(),
        }
    }

    /// Step the physics simulation, then detect broken latches and clear per-step forces.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        self.detect_broken_latches();

        for (_, body) in self.rigid_body_set.iter_mut() {
            body.reset_forces(false);
        }
    }

    fn detect_broken_latches(&mut self) {
        let dt = self.integration_parameters.dt.max(f32::EPSILON);
        let mut snapped = Vec::new();

        for (id, latch) in &self.latches {
            match self.impulse_joint_set.get(latch.handle) {
                None => snapped.push(*id),
                Some(joint) => {
                    let impulses = &joint.impulses;
                    let force = Vec3::new(impulses[0], impulses[1], impulses[2]).length() / dt;
                    let torque = Vec3::new(impulses[3], impulses[4], impulses[5]).length() / dt;
                    if force > latch.break_force || torque > latch.break_torque {
                        snapped.push(*id);
                    }
                }
            }
        }

        // HashMap order is arbitrary; keep the report deterministic.
        snapped.sort();
        for id in snapped {
            if let Some(latch) = self.latches.remove(&id) {
                self.impulse_joint_set.remove(latch.handle, true);
            }
            log::debug!("latch {:?} broke", id);
            self.broken.push(id);
        }
    }

    /// Add a dynamic rigid body and return its id.
    pub fn add_dynamic_body(&mut self, position: Vec3) -> BodyId {
        let rigid_body = RigidBodyBuilder::dynamic()
            .translation(to_vector(position))
            .build();
        body_id(self.rigid_body_set.insert(rigid_body))
    }

    /// Add a kinematic rigid body (moving platforms, climbable walls).
    pub fn add_kinematic_body(&mut self, position: Vec3) -> BodyId {
        let rigid_body = RigidBodyBuilder::kinematic_position_based()
            .translation(to_vector(position))
            .build();
        body_id(self.rigid_body_set.insert(rigid_body))
    }

    /// Add a static rigid body (for terrain, walls).
    pub fn add_static_body(&mut self, position: Vec3) -> BodyId {
        let rigid_body = RigidBodyBuilder::fixed()
            .translation(to_vector(position))
            .build();
        body_id(self.rigid_body_set.insert(rigid_body))
    }

    /// Add a box collider to a rigid body.
    pub fn add_box_collider(
        &mut self,
        body: BodyId,
        half_extents: Vec3,
        density: f32,
        groups: (Group, Group),
    ) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .density(density)
            .collision_groups(CollisionGroup::interaction(groups))
            .build();
        self.collider_set
            .insert_with_parent(collider, body_handle(body), &mut self.rigid_body_set)
    }

    /// Add a sphere collider to a rigid body.
    pub fn add_sphere_collider(
        &mut self,
        body: BodyId,
        radius: f32,
        density: f32,
        groups: (Group, Group),
    ) -> ColliderHandle {
        let collider = ColliderBuilder::ball(radius)
            .density(density)
            .collision_groups(CollisionGroup::interaction(groups))
            .build();
        self.collider_set
            .insert_with_parent(collider, body_handle(body), &mut self.rigid_body_set)
    }

    /// Add a ground plane collider (flat Y=0 half-space).
    pub fn add_ground_plane(&mut self) -> ColliderHandle {
        let collider = ColliderBuilder::halfspace(Vector::y_axis())
            .collision_groups(CollisionGroup::interaction(CollisionGroup::environment()))
            .build();
        self.collider_set.insert(collider)
    }

    /// Record `root` as the hierarchy root of `body` (ragdoll parts of one character).
    pub fn set_root(&mut self, body: BodyId, root: BodyId) {
        if let Some(rb) = self.rigid_body_set.get_mut(body_handle(body)) {
            rb.user_data = u128::from(root.0) + 1;
        }
    }

    /// Join `child` to `parent` with a ball joint at the given local anchors.
    pub fn add_limb_joint(
        &mut self,
        parent: BodyId,
        child: BodyId,
        parent_anchor: Vec3,
        child_anchor: Vec3,
    ) -> JointId {
        let joint = SphericalJointBuilder::new()
            .local_anchor1(to_point(parent_anchor))
            .local_anchor2(to_point(child_anchor))
            .build();
        joint_id(self.impulse_joint_set.insert(
            body_handle(parent),
            body_handle(child),
            joint,
            true,
        ))
    }

    /// Add an orientation drive keeping `body` pointed at a target rotation
    /// relative to `anchor`, with all linear axes free.
    pub fn add_orientation_drive(
        &mut self,
        anchor: BodyId,
        body: BodyId,
        spring: f32,
        damping: f32,
    ) -> JointId {
        let joint = GenericJointBuilder::new(JointAxesMask::empty())
            .motor_position(JointAxis::AngX, 0.0, spring, damping)
            .motor_position(JointAxis::AngY, 0.0, spring, damping)
            .motor_position(JointAxis::AngZ, 0.0, spring, damping)
            .build();
        let id = joint_id(self.impulse_joint_set.insert(
            body_handle(anchor),
            body_handle(body),
            joint,
            true,
        ));
        self.drives.insert(
            id,
            Drive {
                target: Quat::IDENTITY,
                spring,
                damping,
            },
        );
        id
    }

    fn write_drive(&mut self, joint: JointId) {
        let Some(drive) = self.drives.get(&joint).copied() else {
            return;
        };
        let handle = joint_handle(joint);
        let (x, y, z) = drive.target.to_euler(EulerRot::XYZ);

        let mut attached = None;
        for (h, j) in self.impulse_joint_set.iter_mut() {
            if h == handle {
                j.data
                    .set_motor_position(JointAxis::AngX, x, drive.spring, drive.damping)
                    .set_motor_position(JointAxis::AngY, y, drive.spring, drive.damping)
                    .set_motor_position(JointAxis::AngZ, z, drive.spring, drive.damping);
                attached = Some((j.body1, j.body2));
                break;
            }
        }

        if let Some((a, b)) = attached {
            for h in [a, b] {
                if let Some(rb) = self.rigid_body_set.get_mut(h) {
                    rb.wake_up(true);
                }
            }
        }
    }
}

impl PhysicsBackend for PhysicsWorld {
    fn body_exists(&self, body: BodyId) -> bool {
        self.rigid_body_set.contains(body_handle(body))
    }

    fn body_kind(&self, body: BodyId) -> Option<BodyKind> {
        self.rigid_body_set.get(body_handle(body)).map(|rb| {
            if rb.is_dynamic() {
                BodyKind::Dynamic
            } else if rb.is_kinematic() {
                BodyKind::Kinematic
            } else {
                BodyKind::Fixed
            }
        })
    }

    fn root_of(&self, body: BodyId) -> Option<BodyId> {
        self.root_of_body(body)
    }

    fn mass(&self, body: BodyId) -> Option<f32> {
        self.rigid_body_set.get(body_handle(body)).map(|rb| rb.mass())
    }

    fn set_mass(&mut self, body: BodyId, mass: f32) {
        let handle = body_handle(body);
        let Some(rb) = self.rigid_body_set.get(handle) else {
            return;
        };
        if mass <= 0.0 {
            return;
        }
        let original = match self.mass_overrides.get(&body) {
            Some(original) => original.clone(),
            None if rb.mass() > 0.0 => MassOverride {
                mass: rb.mass(),
                densities: rb
                    .colliders()
                    .iter()
                    .filter_map(|&h| self.collider_set.get(h).map(|c| (h, c.density())))
                    .collect(),
            },
            None => return,
        };

        // Going back to the recorded mass restores the densities verbatim so
        // the body ends up with exactly its original mass.
        let restoring = mass == original.mass;
        let scale = mass / original.mass;
        for &(collider, density) in &original.densities {
            if let Some(collider) = self.collider_set.get_mut(collider) {
                collider.set_density(if restoring { density } else { density * scale });
            }
        }
        if restoring {
            self.mass_overrides.remove(&body);
        } else {
            self.mass_overrides.insert(body, original);
        }
        if let Some(rb) = self.rigid_body_set.get_mut(handle) {
            rb.recompute_mass_properties_from_colliders(&self.collider_set);
        }
    }

    fn pose(&self, body: BodyId) -> Option<Transform> {
        self.rigid_body_set.get(body_handle(body)).map(|rb| {
            Transform::from_position_rotation(to_vec3(rb.translation()), to_quat(rb.rotation()))
        })
    }

    fn set_pose(&mut self, body: BodyId, pose: Transform) {
        if let Some(rb) = self.rigid_body_set.get_mut(body_handle(body)) {
            let p = pose.position;
            let isometry = Isometry3::from_parts(
                Translation3::new(p.x, p.y, p.z),
                to_rotation(pose.rotation),
            );
            rb.set_position(isometry, true);
        }
    }

    fn linear_velocity(&self, body: BodyId) -> Vec3 {
        self.rigid_body_set
            .get(body_handle(body))
            .map(|rb| to_vec3(rb.linvel()))
            .unwrap_or(Vec3::ZERO)
    }

    fn set_linear_velocity(&mut self, body: BodyId, velocity: Vec3) {
        if let Some(rb) = self.rigid_body_set.get_mut(body_handle(body)) {
            rb.set_linvel(to_vector(velocity), true);
        }
    }

    fn apply_impulse(&mut self, body: BodyId, impulse: Vec3) {
        if let Some(rb) = self.rigid_body_set.get_mut(body_handle(body)) {
            rb.apply_impulse(to_vector(impulse), true);
        }
    }

    fn apply_force(&mut self, body: BodyId, force: Vec3) {
        if let Some(rb) = self.rigid_body_set.get_mut(body_handle(body)) {
            rb.add_force(to_vector(force), true);
        }
    }

    fn shape_cast(&self, cast: &crate::ShapeCast) -> Vec<crate::ShapeHit> {
        self.sweep_sphere(cast)
    }

    fn contacts(&self, body: BodyId) -> Vec<crate::Contact> {
        self.touching(body)
    }

    fn create_point_constraint(&mut self, c: &PointConstraint) -> Option<ConstraintId> {
        let hand = self.rigid_body_set.get(body_handle(c.hand))?;
        let target = self.rigid_body_set.get(body_handle(c.target))?;

        // Keep the current relative orientation so the latch does not snap.
        let relative = target.rotation().inverse() * hand.rotation();
        let frame1 = Isometry3::from_parts(
            Translation3::new(c.hand_anchor.x, c.hand_anchor.y, c.hand_anchor.z),
            UnitQuaternion::identity(),
        );
        let frame2 = Isometry3::from_parts(
            Translation3::new(c.target_anchor.x, c.target_anchor.y, c.target_anchor.z),
            relative,
        );
        let joint = FixedJointBuilder::new()
            .local_frame1(frame1)
            .local_frame2(frame2)
            .build();
        let handle = self.impulse_joint_set.insert(
            body_handle(c.hand),
            body_handle(c.target),
            joint,
            true,
        );

        let id = ConstraintId(self.next_constraint);
        self.next_constraint += 1;
        self.latches.insert(
            id,
            Latch {
                handle,
                break_force: c.break_force,
                break_torque: c.break_torque,
            },
        );
        Some(id)
    }

    fn destroy_constraint(&mut self, id: ConstraintId) {
        if let Some(latch) = self.latches.remove(&id) {
            self.impulse_joint_set.remove(latch.handle, true);
        }
    }

    fn drain_broken_constraints(&mut self) -> Vec<ConstraintId> {
        std::mem::take(&mut self.broken)
    }

    fn drive_target(&self, joint: JointId) -> Option<Quat> {
        self.drives.get(&joint).map(|d| d.target)
    }

    fn set_drive_target(&mut self, joint: JointId, target: Quat) {
        if let Some(drive) = self.drives.get_mut(&joint) {
            drive.target = target;
            self.write_drive(joint);
        }
    }

    fn drive_spring(&self, joint: JointId) -> Option<f32> {
        self.drives.get(&joint).map(|d| d.spring)
    }

    fn set_drive_spring(&mut self, joint: JointId, spring: f32) {
        if let Some(drive) = self.drives.get_mut(&joint) {
            drive.spring = spring.max(0.0);
            self.write_drive(joint);
        }
    }

    fn remove_body(&mut self, body: BodyId) {
        self.rigid_body_set.remove(
            body_handle(body),
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        self.mass_overrides.remove(&body);
        // Latches on the removed body are reported as broken after the next step.
    }

    fn fixed_timestep(&self) -> f32 {
        self.integration_parameters.dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overridden_mass_comes_back_exactly() {
        let mut world = PhysicsWorld::new();
        let body = world.add_dynamic_body(Vec3::new(0.0, 1.0, 0.0));
        world.add_box_collider(body, Vec3::splat(0.3), 37.0, CollisionGroup::prop());
        let original = world.mass(body).unwrap();
        assert!(original > 0.0);

        world.set_mass(body, original * 0.1);
        assert!((world.mass(body).unwrap() - original * 0.1).abs() < 1e-4);
        world.set_mass(body, 0.5);
        assert!((world.mass(body).unwrap() - 0.5).abs() < 1e-4);

        world.set_mass(body, original);
        assert_eq!(world.mass(body), Some(original));
    }
}
