//! Controller tuning. Loaded from a RON file at startup.

use crate::error::ConfigError;
use engine_core::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Every tunable of the character controller, grouped by subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Simulation rate in Hz.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: f64,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub look: LookConfig,
    #[serde(default)]
    pub stamina: StaminaConfig,
    #[serde(default)]
    pub grab: GrabConfig,
    #[serde(default)]
    pub ragdoll: RagdollConfig,
    #[serde(default)]
    pub impact: ImpactConfig,
    #[serde(default)]
    pub fire: FireConfig,
}

fn default_tick_rate() -> f64 {
    60.0
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_rate: default_tick_rate(),
            health: HealthConfig::default(),
            movement: MovementConfig::default(),
            look: LookConfig::default(),
            stamina: StaminaConfig::default(),
            grab: GrabConfig::default(),
            ragdoll: RagdollConfig::default(),
            impact: ImpactConfig::default(),
            fire: FireConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub max: i32,
    /// Fraction of `max` restored when a dead character stands back up.
    pub revive_fraction: f32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max: 100,
            revive_fraction: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Target ground speed in m/s.
    pub base_speed: f32,
    pub sprint_multiplier: f32,
    /// Largest change of ground velocity per second.
    pub ground_accel: f32,
    /// Braking force per kg per m/s of sliding, applied without input.
    pub ground_brake: f32,
    pub air_accel: f32,
    pub air_brake: f32,
    /// Speed the character may build up in the air.
    pub air_max_speed: f32,
    /// Extra downward force while airborne.
    pub fall_force: f32,
    pub ground_probe_radius: f32,
    pub ground_probe_length: f32,
    pub ground_probe_max_hits: usize,
    pub jump_impulse: f32,
    /// Seconds after leaving the ground during which a jump is still allowed.
    pub coyote_time: f32,
    /// Root height below which the character is put back at `respawn_point`.
    pub kill_plane_y: f32,
    pub respawn_point: Vec3,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            base_speed: 3.0,
            sprint_multiplier: 1.6,
            ground_accel: 30.0,
            ground_brake: 8.0,
            air_accel: 6.0,
            air_brake: 14.0,
            air_max_speed: 4.0,
            fall_force: 10.0,
            ground_probe_radius: 0.1,
            ground_probe_length: 0.5,
            ground_probe_max_hits: 10,
            jump_impulse: 20.0,
            coyote_time: 0.15,
            kill_plane_y: -10.0,
            respawn_point: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookConfig {
    /// Degrees of yaw per unit of horizontal pointer delta.
    pub yaw_sensitivity: f32,
    /// Degrees of pitch per unit of vertical pointer delta.
    pub pitch_sensitivity: f32,
    pub min_pitch_deg: f32,
    pub max_pitch_deg: f32,
    /// Fastest the body may turn toward the look yaw, in degrees per second.
    pub max_turn_rate_deg: f32,
}

impl Default for LookConfig {
    fn default() -> Self {
        Self {
            yaw_sensitivity: 2.5,
            pitch_sensitivity: 2.0,
            min_pitch_deg: -60.0,
            max_pitch_deg: 70.0,
            max_turn_rate_deg: 720.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaminaConfig {
    pub max: f32,
    pub sprint_drain: f32,
    pub hang_drain: f32,
    pub regen: f32,
    /// Seconds after the last drain before regen resumes.
    pub regen_delay: f32,
    /// Stamina needed to start sprinting. Continuing only needs more than zero.
    pub sprint_start_threshold: f32,
    /// Seconds after leaving the ground during which a sprint may still start.
    pub sprint_grace: f32,
}

impl Default for StaminaConfig {
    fn default() -> Self {
        Self {
            max: 100.0,
            sprint_drain: 20.0,
            hang_drain: 10.0,
            regen: 15.0,
            regen_delay: 1.0,
            sprint_start_threshold: 15.0,
            sprint_grace: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabConfig {
    /// Seconds a hand must wait after releasing before it may grab again.
    pub regrab_cooldown: f32,
    pub break_force: f32,
    pub break_torque: f32,
    pub toss_impulse: f32,
    /// Toss impulse used when the held body belongs to a ragdolled character.
    pub ragdoll_toss_impulse: f32,
    pub toss_up_bias: f32,
    /// Live mass of a held body as a fraction of its original mass.
    pub mass_scale: f32,
    pub mass_floor: f32,
    /// Bodies at or above this mass are held without being made lighter.
    pub liftable_mass: f32,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            regrab_cooldown: 0.3,
            break_force: 500.0,
            break_torque: 500.0,
            toss_impulse: 10.0,
            ragdoll_toss_impulse: 15.0,
            toss_up_bias: 0.25,
            mass_scale: 0.1,
            mass_floor: 0.5,
            liftable_mass: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagdollConfig {
    /// Seconds after going limp before a recover input is honoured.
    pub stand_up_cooldown: f32,
}

impl Default for RagdollConfig {
    fn default() -> Self {
        Self {
            stand_up_cooldown: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    /// Contact impulse per second below which hazards deal no damage.
    pub threshold: f32,
    /// Contact impulse per second at which damage reaches `max_damage`.
    pub saturation: f32,
    pub min_damage: f32,
    pub max_damage: f32,
    pub max_knockback: f32,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            threshold: 15.0,
            saturation: 60.0,
            min_damage: 10.0,
            max_damage: 40.0,
            max_knockback: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireConfig {
    pub spread_distance: f32,
    pub smoke_seconds_per_kg: f32,
    pub smoke_min: f32,
    pub smoke_max: f32,
    pub fire_seconds_per_kg: f32,
    pub fire_min: f32,
    pub fire_max: f32,
    /// Heaviest body that burns away completely.
    pub dissolvable_mass: f32,
    pub damage: i32,
    pub damage_interval: f32,
    pub damage_radius: f32,
}

impl Default for FireConfig {
    fn default() -> Self {
        Self {
            spread_distance: 0.6,
            smoke_seconds_per_kg: 0.5,
            smoke_min: 0.3,
            smoke_max: 5.0,
            fire_seconds_per_kg: 2.0,
            fire_min: 3.0,
            fire_max: 30.0,
            dissolvable_mass: 40.0,
            damage: 5,
            damage_interval: 0.5,
            damage_radius: 1.0,
        }
    }
}

impl ControllerConfig {
    /// Load config from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = ron::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot drive a simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_rate.is_finite() && self.tick_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tick_rate must be a positive number of Hz, got {}",
                self.tick_rate
            )));
        }
        Ok(())
    }

    /// Load config from a RON file. If the file is missing or invalid, returns default config.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save config as pretty RON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(ConfigError::Serialize)?;
        std::fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
