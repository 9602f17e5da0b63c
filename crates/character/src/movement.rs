//! Ground probe, planar movement, air control, jump, look and fall-out recovery.

use crate::config::ControllerConfig;
use crate::controller::{Character, TickContext};
use crate::events::{CharacterEvent, ReleaseReason};
use engine_core::{horizontal, rotate_towards, Quat, Vec3};
use input::InputSample;
use physics::{PhysicsBackend, ShapeCast};

impl Character {
    /// Downward sphere sweep from the root. Anything that is not part of this
    /// character counts as ground.
    pub(crate) fn probe_ground(&self, physics: &dyn PhysicsBackend, config: &ControllerConfig) -> bool {
        let root = self.root();
        let Some(pose) = physics.pose(root) else {
            return false;
        };
        let movement = &config.movement;
        physics
            .shape_cast(&ShapeCast {
                origin: pose.position,
                direction: Vec3::NEG_Y,
                radius: movement.ground_probe_radius,
                max_distance: movement.ground_probe_length,
                max_hits: movement.ground_probe_max_hits,
            })
            .iter()
            .any(|hit| hit.root != Some(root) && hit.body != Some(root))
    }

    /// Planar direction of the movement input in world space.
    pub(crate) fn move_direction(&self, input: &InputSample) -> Vec3 {
        let local = Vec3::new(input.movement.x, 0.0, -input.movement.y);
        Quat::from_rotation_y(self.aim_yaw_deg.to_radians()) * local
    }

    pub(crate) fn apply_movement(&mut self, ctx: &mut TickContext<'_>, input: &InputSample) {
        let root = self.root();
        let config = &ctx.config.movement;
        let dt = ctx.tick.dt;
        let mass = ctx.physics.mass(root).unwrap_or(1.0);
        let planar = horizontal(ctx.physics.linear_velocity(root));
        let direction = self.move_direction(input);
        let has_input = input.has_movement();

        if self.grounded {
            if has_input {
                let speed = if self.stamina.is_sprinting() {
                    config.base_speed * config.sprint_multiplier
                } else {
                    config.base_speed
                };
                let delta = (direction * speed - planar).clamp_length_max(config.ground_accel * dt);
                ctx.physics.apply_impulse(root, delta * mass);
            } else {
                ctx.physics
                    .apply_force(root, -planar * config.ground_brake * mass);
            }
            return;
        }

        if has_input {
            // Braking against the current velocity is stronger than steering with it.
            let rate = if planar.dot(direction) >= 0.0 {
                config.air_accel
            } else {
                config.air_brake
            };
            let limit = config.air_max_speed.max(self.takeoff_speed);
            let delta = (direction * limit - planar).clamp_length_max(rate * dt);
            let next = (planar + delta).clamp_length_max(limit.max(planar.length()));
            ctx.physics.apply_impulse(root, (next - planar) * mass);
        }
        ctx.physics.apply_force(root, Vec3::NEG_Y * config.fall_force);
    }

    /// Jump if grounded, within coyote time, or hanging from immovable bodies with both hands.
    pub(crate) fn try_jump(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let now = ctx.tick.now;
        let wall_jump = self.left.is_latched_to_immovable(&*ctx.physics)
            && self.right.is_latched_to_immovable(&*ctx.physics);
        let in_coyote = now - self.last_grounded_at <= ctx.config.movement.coyote_time as f64;

        if wall_jump {
            self.release_hands(ctx, ReleaseReason::WallJump);
        } else if !self.grounded && !in_coyote {
            return false;
        }

        let root = self.root();
        ctx.physics
            .apply_impulse(root, Vec3::Y * ctx.config.movement.jump_impulse);
        // No second jump from the same ground contact.
        self.last_grounded_at = f64::NEG_INFINITY;

        log::debug!("{} jumped (wall jump: {})", self.participant, wall_jump);
        ctx.events.push(CharacterEvent::Jumped {
            participant: self.participant,
            wall_jump,
        });
        true
    }

    /// Accumulate look input and drive the body and head toward it.
    pub(crate) fn update_look(&mut self, ctx: &mut TickContext<'_>, input: &InputSample) {
        let look = &ctx.config.look;
        self.yaw_deg = (self.yaw_deg - input.look_delta.x * look.yaw_sensitivity).rem_euclid(360.0);
        self.pitch_deg = (self.pitch_deg - input.look_delta.y * look.pitch_sensitivity)
            .clamp(look.min_pitch_deg, look.max_pitch_deg);

        let main = self.rig.main_drive();
        let target = Quat::from_rotation_y(self.yaw_deg.to_radians());
        let current = ctx.physics.drive_target(main).unwrap_or(Quat::IDENTITY);
        let max_step = look.max_turn_rate_deg.to_radians() * ctx.tick.dt;
        ctx.physics
            .set_drive_target(main, rotate_towards(current, target, max_step));

        if let Some(head) = self.rig.head_drive() {
            let pitch = Quat::from_rotation_x(self.pitch_deg.to_radians());
            ctx.physics.set_drive_target(head, self.rig.head_rest() * pitch);
        }
    }

    /// Put the whole rig back at the respawn point once the root drops below the kill plane.
    pub(crate) fn check_fall_out(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let movement = &ctx.config.movement;
        let Some(pose) = ctx.physics.pose(self.root()) else {
            return false;
        };
        if pose.position.y >= movement.kill_plane_y {
            return false;
        }

        let offset = movement.respawn_point - pose.position;
        self.rig.translate(ctx.physics, offset);
        self.takeoff_speed = 0.0;

        log::info!("{} fell out of the world, respawning", self.participant);
        ctx.events.push(CharacterEvent::Respawned {
            participant: self.participant,
            position: movement.respawn_point,
        });
        true
    }
}
