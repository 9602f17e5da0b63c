//! A small deterministic physics backend without a constraint solver.
//!
//! Bodies are spheres. Dynamic bodies integrate gravity, forces and impulses
//! with explicit Euler and rest on an optional ground plane. Followers copy a
//! parent's pose at a fixed offset, which is enough to carry hands and heads
//! along with a character root. Latched targets are dragged to their hand
//! anchor every step. Contacts come from sphere overlaps plus anything a test
//! scripts in. Constraint breaks only happen when scripted.

use std::collections::BTreeMap;

use crate::backend::{BodyKind, Contact, PhysicsBackend, PointConstraint, ShapeCast, ShapeHit};
use engine_core::{BodyId, ConstraintId, JointId, Quat, Transform, Vec3};

/// Overlap tolerance used when reporting touching contacts.
const CONTACT_SKIN: f32 = 0.02;

#[derive(Debug, Clone)]
struct HeadlessBody {
    kind: BodyKind,
    mass: f32,
    radius: f32,
    pose: Transform,
    velocity: Vec3,
    force: Vec3,
    root: Option<BodyId>,
    follow: Option<(BodyId, Transform)>,
}

#[derive(Debug, Clone, Copy)]
struct HeadlessDrive {
    target: Quat,
    spring: f32,
}

/// In-memory physics world used by tests and tools.
#[derive(Debug, Clone)]
pub struct HeadlessWorld {
    bodies: BTreeMap<BodyId, HeadlessBody>,
    next_body: u64,
    constraints: BTreeMap<ConstraintId, PointConstraint>,
    next_constraint: u64,
    broken: Vec<ConstraintId>,
    drives: BTreeMap<JointId, HeadlessDrive>,
    next_joint: u64,
    scripted_contacts: Vec<(BodyId, Contact)>,
    impulse_log: Vec<(BodyId, Vec3)>,
    pub gravity: Vec3,
    pub ground_height: Option<f32>,
    dt: f32,
}

impl Default for HeadlessWorld {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}

impl HeadlessWorld {
    /// Create an empty world with standard gravity and a ground plane at y = 0.
    pub fn new(dt: f32) -> Self {
        Self {
            bodies: BTreeMap::new(),
            next_body: 1,
            constraints: BTreeMap::new(),
            next_constraint: 1,
            broken: Vec::new(),
            drives: BTreeMap::new(),
            next_joint: 1,
            scripted_contacts: Vec::new(),
            impulse_log: Vec::new(),
            gravity: Vec3::new(0.0, -9.81, 0.0),
            ground_height: Some(0.0),
            dt,
        }
    }

    /// Add a spherical body.
    pub fn add_body(&mut self, kind: BodyKind, mass: f32, radius: f32, position: Vec3) -> BodyId {
        let id = BodyId(self.next_body);
        self.next_body += 1;
        self.bodies.insert(
            id,
            HeadlessBody {
                kind,
                mass: mass.max(f32::EPSILON),
                radius,
                pose: Transform::from_position(position),
                velocity: Vec3::ZERO,
                force: Vec3::ZERO,
                root: None,
                follow: None,
            },
        );
        id
    }

    /// Record `root` as the hierarchy root of `body`.
    pub fn set_root(&mut self, body: BodyId, root: BodyId) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.root = Some(root);
        }
    }

    /// Make `child` follow `parent` rigidly at their current relative pose.
    pub fn attach(&mut self, child: BodyId, parent: BodyId) {
        let Some(parent_pose) = self.bodies.get(&parent).map(|b| b.pose) else {
            return;
        };
        if let Some(c) = self.bodies.get_mut(&child) {
            let offset = Transform::from_position_rotation(
                parent_pose.inverse_transform_point(c.pose.position),
                c.pose.local_rotation_in(&parent_pose),
            );
            c.follow = Some((parent, offset));
        }
    }

    /// Add an orientation drive with the given spring strength.
    pub fn add_drive(&mut self, spring: f32) -> JointId {
        let id = JointId(self.next_joint);
        self.next_joint += 1;
        self.drives.insert(
            id,
            HeadlessDrive {
                target: Quat::IDENTITY,
                spring,
            },
        );
        id
    }

    /// Report an extra contact on `body` until the next step.
    pub fn script_contact(&mut self, body: BodyId, contact: Contact) {
        self.scripted_contacts.push((body, contact));
    }

    /// Snap a constraint as if it exceeded its break thresholds.
    pub fn break_constraint(&mut self, id: ConstraintId) {
        if self.constraints.remove(&id).is_some() {
            self.broken.push(id);
        }
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&PointConstraint> {
        self.constraints.get(&id)
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Every impulse applied to `body` since the log was last cleared.
    pub fn impulses_on(&self, body: BodyId) -> Vec<Vec3> {
        self.impulse_log
            .iter()
            .filter(|(b, _)| *b == body)
            .map(|(_, i)| *i)
            .collect()
    }

    pub fn clear_impulse_log(&mut self) {
        self.impulse_log.clear();
    }

    /// Advance the world by one fixed step.
    pub fn step(&mut self) {
        let dt = self.dt;
        let gravity = self.gravity;
        let ground = self.ground_height;

        for body in self.bodies.values_mut() {
            if body.kind != BodyKind::Dynamic || body.follow.is_some() {
                body.force = Vec3::ZERO;
                continue;
            }
            body.velocity += (gravity + body.force / body.mass) * dt;
            body.pose.position += body.velocity * dt;
            body.force = Vec3::ZERO;

            if let Some(ground) = ground {
                let floor = ground + body.radius;
                if body.pose.position.y < floor {
                    body.pose.position.y = floor;
                    body.velocity.y = body.velocity.y.max(0.0);
                }
            }
        }

        // Followers in id order; parents are created before children in practice.
        let ids: Vec<BodyId> = self.bodies.keys().copied().collect();
        for id in &ids {
            let Some((parent, offset)) = self.bodies.get(id).and_then(|b| b.follow) else {
                continue;
            };
            let Some((parent_pose, parent_velocity)) =
                self.bodies.get(&parent).map(|p| (p.pose, p.velocity))
            else {
                continue;
            };
            if let Some(b) = self.bodies.get_mut(id) {
                b.pose = Transform::from_position_rotation(
                    parent_pose.transform_point(offset.position),
                    parent_pose.rotation * offset.rotation,
                );
                b.velocity = parent_velocity;
            }
        }

        let latches: Vec<PointConstraint> = self.constraints.values().copied().collect();
        for latch in latches {
            let Some((hand_pose, hand_velocity)) =
                self.bodies.get(&latch.hand).map(|h| (h.pose, h.velocity))
            else {
                continue;
            };
            if let Some(target) = self.bodies.get_mut(&latch.target) {
                if target.kind == BodyKind::Dynamic {
                    let anchor = hand_pose.transform_point(latch.hand_anchor);
                    target.pose.position = anchor - target.pose.rotation * latch.target_anchor;
                    target.velocity = hand_velocity;
                }
            }
        }

        self.scripted_contacts.clear();
    }

    fn root_or_self(&self, body: BodyId) -> Option<BodyId> {
        self.bodies.get(&body).map(|b| b.root.unwrap_or(body))
    }
}

impl PhysicsBackend for HeadlessWorld {
    fn body_exists(&self, body: BodyId) -> bool {
        self.bodies.contains_key(&body)
    }

    fn body_kind(&self, body: BodyId) -> Option<BodyKind> {
        self.bodies.get(&body).map(|b| b.kind)
    }

    fn root_of(&self, body: BodyId) -> Option<BodyId> {
        self.root_or_self(body)
    }

    fn mass(&self, body: BodyId) -> Option<f32> {
        self.bodies.get(&body).map(|b| b.mass)
    }

    fn set_mass(&mut self, body: BodyId, mass: f32) {
        if let Some(b) = self.bodies.get_mut(&body) {
            if mass > 0.0 {
                b.mass = mass;
            }
        }
    }

    fn pose(&self, body: BodyId) -> Option<Transform> {
        self.bodies.get(&body).map(|b| b.pose)
    }

    fn set_pose(&mut self, body: BodyId, pose: Transform) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.pose = pose;
        }
    }

    fn linear_velocity(&self, body: BodyId) -> Vec3 {
        self.bodies.get(&body).map(|b| b.velocity).unwrap_or(Vec3::ZERO)
    }

    fn set_linear_velocity(&mut self, body: BodyId, velocity: Vec3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            if b.kind == BodyKind::Dynamic {
                b.velocity = velocity;
            }
        }
    }

    fn apply_impulse(&mut self, body: BodyId, impulse: Vec3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            if b.kind == BodyKind::Dynamic && b.follow.is_none() {
                b.velocity += impulse / b.mass;
            }
            self.impulse_log.push((body, impulse));
        }
    }

    fn apply_force(&mut self, body: BodyId, force: Vec3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.force += force;
        }
    }

    fn shape_cast(&self, cast: &ShapeCast) -> Vec<ShapeHit> {
        let direction = cast.direction.normalize_or_zero();
        let mut hits = Vec::new();

        if let Some(ground) = self.ground_height {
            let clearance = cast.origin.y - cast.radius - ground;
            let distance = if clearance <= 0.0 {
                Some(0.0)
            } else if direction.y < 0.0 {
                Some(clearance / -direction.y).filter(|d| *d <= cast.max_distance)
            } else {
                None
            };
            if let Some(distance) = distance {
                let at = cast.origin + direction * distance;
                hits.push(ShapeHit {
                    body: None,
                    root: None,
                    point: Vec3::new(at.x, ground, at.z),
                    distance,
                });
            }
        }

        for (id, body) in &self.bodies {
            let center = body.pose.position;
            let along = (center - cast.origin)
                .dot(direction)
                .clamp(0.0, cast.max_distance);
            let closest = cast.origin + direction * along;
            if (center - closest).length() <= cast.radius + body.radius {
                hits.push(ShapeHit {
                    body: Some(*id),
                    root: self.root_or_self(*id),
                    point: center + (closest - center).normalize_or_zero() * body.radius,
                    distance: along,
                });
            }
        }

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(cast.max_hits);
        hits
    }

    fn contacts(&self, body: BodyId) -> Vec<Contact> {
        let Some(own) = self.bodies.get(&body) else {
            return Vec::new();
        };
        let mut contacts = Vec::new();

        if let Some(ground) = self.ground_height {
            if own.pose.position.y - own.radius <= ground + CONTACT_SKIN {
                let p = own.pose.position;
                contacts.push(Contact {
                    other: None,
                    other_root: None,
                    point: Vec3::new(p.x, ground, p.z),
                    impulse: Vec3::ZERO,
                });
            }
        }

        for (id, other) in &self.bodies {
            if *id == body {
                continue;
            }
            let offset = other.pose.position - own.pose.position;
            if offset.length() <= own.radius + other.radius + CONTACT_SKIN {
                contacts.push(Contact {
                    other: Some(*id),
                    other_root: self.root_or_self(*id),
                    point: own.pose.position + offset.normalize_or_zero() * own.radius,
                    impulse: Vec3::ZERO,
                });
            }
        }

        contacts.extend(
            self.scripted_contacts
                .iter()
                .filter(|(b, _)| *b == body)
                .map(|(_, c)| *c),
        );
        contacts
    }

    fn create_point_constraint(&mut self, constraint: &PointConstraint) -> Option<ConstraintId> {
        if !self.body_exists(constraint.hand) || !self.body_exists(constraint.target) {
            return None;
        }
        let id = ConstraintId(self.next_constraint);
        self.next_constraint += 1;
        self.constraints.insert(id, *constraint);
        Some(id)
    }

    fn destroy_constraint(&mut self, id: ConstraintId) {
        self.constraints.remove(&id);
    }

    fn drain_broken_constraints(&mut self) -> Vec<ConstraintId> {
        std::mem::take(&mut self.broken)
    }

    fn drive_target(&self, joint: JointId) -> Option<Quat> {
        self.drives.get(&joint).map(|d| d.target)
    }

    fn set_drive_target(&mut self, joint: JointId, target: Quat) {
        if let Some(d) = self.drives.get_mut(&joint) {
            d.target = target;
        }
    }

    fn drive_spring(&self, joint: JointId) -> Option<f32> {
        self.drives.get(&joint).map(|d| d.spring)
    }

    fn set_drive_spring(&mut self, joint: JointId, spring: f32) {
        if let Some(d) = self.drives.get_mut(&joint) {
            d.spring = spring.max(0.0);
        }
    }

    fn remove_body(&mut self, body: BodyId) {
        if self.bodies.remove(&body).is_none() {
            return;
        }
        let attached: Vec<ConstraintId> = self
            .constraints
            .iter()
            .filter(|(_, c)| c.hand == body || c.target == body)
            .map(|(id, _)| *id)
            .collect();
        for id in attached {
            self.constraints.remove(&id);
            self.broken.push(id);
        }
    }

    fn fixed_timestep(&self) -> f32 {
        self.dt
    }
}
