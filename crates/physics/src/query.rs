//! Shape and contact queries against the Rapier world.

use crate::backend::{Contact, ShapeCast, ShapeHit};
use crate::physics_world::{body_handle, body_id, to_point, to_vec3, PhysicsWorld};
use engine_core::{BodyId, Vec3};
use rapier3d::parry::query::PointQuery;
use rapier3d::prelude::*;

impl PhysicsWorld {
    /// Sweep a sphere along a segment.
    ///
    /// The swept volume of a sphere moving along a straight line is a capsule,
    /// so a single capsule overlap finds every collider the sweep would touch.
    pub fn sweep_sphere(&self, cast: &ShapeCast) -> Vec<ShapeHit> {
        let direction = cast.direction.normalize_or_zero();
        let end = cast.origin + direction * cast.max_distance;
        let shape = Capsule::new(to_point(cast.origin), to_point(end), cast.radius);
        let origin = to_point(cast.origin);
        let filter = QueryFilter::default();

        let mut hits = Vec::new();
        self.query_pipeline.intersections_with_shape(
            &self.rigid_body_set,
            &self.collider_set,
            &Isometry::identity(),
            &shape,
            filter,
            |handle| {
                if let Some(collider) = self.collider_set.get(handle) {
                    let projection = collider
                        .shape()
                        .project_point(collider.position(), &origin, true);
                    let point = to_vec3(&projection.point.coords);
                    let body = collider.parent().map(body_id);
                    hits.push(ShapeHit {
                        body,
                        root: body.and_then(|b| self.root_of_body(b)),
                        point,
                        distance: (point - cast.origin).dot(direction).max(0.0),
                    });
                }
                true // Continue searching
            },
        );

        // Sort by distance (use unwrap_or to avoid panic on NaN)
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(cast.max_hits);
        hits
    }

    /// Every active contact pair touching any collider of `body`.
    pub fn touching(&self, body: BodyId) -> Vec<Contact> {
        let Some(rb) = self.rigid_body_set.get(body_handle(body)) else {
            return Vec::new();
        };

        let mut contacts = Vec::new();
        for &own in rb.colliders() {
            for pair in self.narrow_phase.contact_pairs_with(own) {
                if !pair.has_any_active_contact {
                    continue;
                }
                let (other, own_is_first) = if pair.collider1 == own {
                    (pair.collider2, true)
                } else {
                    (pair.collider1, false)
                };

                let mut impulse = Vec3::ZERO;
                let mut point = None;
                for manifold in &pair.manifolds {
                    let magnitude: Real = manifold.points.iter().map(|p| p.data.impulse).sum();
                    impulse += to_vec3(&manifold.data.normal) * magnitude;
                    if point.is_none() {
                        point = manifold
                            .data
                            .solver_contacts
                            .first()
                            .map(|c| to_vec3(&c.point.coords));
                    }
                }
                // The manifold normal points from collider1 toward collider2.
                if own_is_first {
                    impulse = -impulse;
                }

                let other_collider = self.collider_set.get(other);
                let other_body = other_collider.and_then(|c| c.parent()).map(body_id);
                let point = point
                    .or_else(|| other_collider.map(|c| to_vec3(&c.position().translation.vector)))
                    .unwrap_or(Vec3::ZERO);

                contacts.push(Contact {
                    other: other_body,
                    other_root: other_body.and_then(|b| self.root_of_body(b)),
                    point,
                    impulse,
                });
            }
        }
        contacts
    }

    pub(crate) fn root_of_body(&self, body: BodyId) -> Option<BodyId> {
        self.rigid_body_set
            .get(body_handle(body))
            .map(|rb| match rb.user_data {
                0 => body,
                raw => BodyId((raw - 1) as u64),
            })
    }
}
