//! Collision groups and filtering.

use rapier3d::prelude::*;

/// Collision groups for the different kinds of colliders in a session.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionGroup {
    /// Static environment (floors, walls)
    Environment = 1 << 0,
    /// Ragdoll body parts of a character
    CharacterPart = 1 << 1,
    /// Loose props that can be grabbed and carried
    Prop = 1 << 2,
    /// Bodies that deal impact damage
    Hazard = 1 << 3,
    /// Triggers and sensors
    Trigger = 1 << 4,
}

impl CollisionGroup {
    /// Create a collision group that collides with everything.
    pub fn all() -> Group {
        Group::ALL
    }

    /// Static environment collides with everything.
    pub fn environment() -> (Group, Group) {
        let membership = Group::from_bits_retain(Self::Environment as u32);
        (membership, Group::ALL)
    }

    /// Character parts collide with everything except triggers.
    pub fn character_part() -> (Group, Group) {
        let membership = Group::from_bits_retain(Self::CharacterPart as u32);
        let filter = Group::from_bits_retain(
            Self::Environment as u32
                | Self::CharacterPart as u32
                | Self::Prop as u32
                | Self::Hazard as u32,
        );
        (membership, filter)
    }

    /// Props collide with the world, characters, other props and hazards.
    pub fn prop() -> (Group, Group) {
        let membership = Group::from_bits_retain(Self::Prop as u32);
        let filter = Group::from_bits_retain(
            Self::Environment as u32
                | Self::CharacterPart as u32
                | Self::Prop as u32
                | Self::Hazard as u32,
        );
        (membership, filter)
    }

    /// Hazards hit characters and props.
    pub fn hazard() -> (Group, Group) {
        let membership = Group::from_bits_retain(Self::Hazard as u32);
        let filter = Group::from_bits_retain(
            Self::Environment as u32 | Self::CharacterPart as u32 | Self::Prop as u32,
        );
        (membership, filter)
    }

    /// Interaction groups ready to hand to a collider builder.
    pub fn interaction(pair: (Group, Group)) -> InteractionGroups {
        InteractionGroups::new(pair.0, pair.1)
    }
}
