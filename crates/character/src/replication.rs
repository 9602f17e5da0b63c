//! Replicated character state and observer-side interpolation.
//!
//! The authority writes one [`ReplicatedState`] per character at the end of
//! every tick. Observers keep the two most recent samples in a
//! [`RemoteView`] and blend between them while rendering.

use engine_core::{ParticipantId, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Size of one packed rotation sample.
const QUAT_BYTES: usize = std::mem::size_of::<Quat>();

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicatedState {
    pub participant: ParticipantId,
    /// Simulation tick that produced this sample.
    pub tick: u64,
    pub health: i32,
    pub dead: bool,
    pub stamina: f32,
    pub left_grab: bool,
    pub right_grab: bool,
    /// World position of each hand's held contact point.
    pub left_indicator: Option<Vec3>,
    pub right_indicator: Option<Vec3>,
    pub look_enabled: bool,
    pub active: bool,
    /// Local rotation of each tracked part, in rig order.
    pub rotations: Vec<Quat>,
}

impl ReplicatedState {
    /// Pack the rotation samples into raw bytes.
    pub fn pose_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.rotations).to_vec()
    }

    /// Unpack rotations produced by [`ReplicatedState::pose_bytes`].
    ///
    /// Returns `None` if the length is not a whole number of rotations.
    pub fn rotations_from_bytes(bytes: &[u8]) -> Option<Vec<Quat>> {
        if bytes.len() % QUAT_BYTES != 0 {
            return None;
        }
        Some(
            bytes
                .chunks_exact(QUAT_BYTES)
                .map(bytemuck::pod_read_unaligned::<Quat>)
                .collect(),
        )
    }
}

/// Observer's view of one remote character.
#[derive(Debug, Clone, Default)]
pub struct RemoteView {
    previous: Option<ReplicatedState>,
    latest: Option<ReplicatedState>,
}

impl RemoteView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a sample if it is newer than the last one. Returns whether it was applied.
    pub fn receive(&mut self, state: ReplicatedState) -> bool {
        if let Some(latest) = &self.latest {
            if state.tick <= latest.tick {
                log::trace!(
                    "dropping stale sample {} for {} (have {})",
                    state.tick,
                    state.participant,
                    latest.tick
                );
                return false;
            }
        }
        self.previous = self.latest.take();
        self.latest = Some(state);
        true
    }

    pub fn latest(&self) -> Option<&ReplicatedState> {
        self.latest.as_ref()
    }

    pub fn last_tick(&self) -> Option<u64> {
        self.latest.as_ref().map(|s| s.tick)
    }

    /// Rotations blended from the previous toward the latest sample.
    ///
    /// `alpha` is the render interpolation factor in `[0, 1]`.
    pub fn interpolated_rotations(&self, alpha: f32) -> Vec<Quat> {
        let Some(latest) = &self.latest else {
            return Vec::new();
        };
        match &self.previous {
            Some(previous) if previous.rotations.len() == latest.rotations.len() => previous
                .rotations
                .iter()
                .zip(&latest.rotations)
                .map(|(from, to)| from.slerp(*to, alpha.clamp(0.0, 1.0)))
                .collect(),
            _ => latest.rotations.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tick: u64, yaw: f32) -> ReplicatedState {
        ReplicatedState {
            participant: ParticipantId(2),
            tick,
            health: 100,
            dead: false,
            stamina: 100.0,
            left_grab: false,
            right_grab: false,
            left_indicator: None,
            right_indicator: None,
            look_enabled: true,
            active: true,
            rotations: vec![Quat::from_rotation_y(yaw), Quat::IDENTITY],
        }
    }

    #[test]
    fn stale_samples_are_ignored() {
        let mut view = RemoteView::new();
        assert!(view.receive(sample(5, 0.0)));
        assert!(!view.receive(sample(5, 1.0)));
        assert!(!view.receive(sample(3, 1.0)));
        assert!(view.receive(sample(6, 1.0)));
        assert_eq!(view.last_tick(), Some(6));
    }

    #[test]
    fn interpolation_blends_between_last_two_samples() {
        let mut view = RemoteView::new();
        view.receive(sample(1, 0.0));
        assert_eq!(view.interpolated_rotations(0.5)[0], Quat::from_rotation_y(0.0));

        view.receive(sample(2, 1.0));
        let half = view.interpolated_rotations(0.5)[0];
        assert!(half.angle_between(Quat::from_rotation_y(0.5)) < 1e-4);
        let end = view.interpolated_rotations(1.0)[0];
        assert!(end.angle_between(Quat::from_rotation_y(1.0)) < 1e-4);
    }

    #[test]
    fn pose_bytes_unpack_to_the_same_rotations() {
        let state = sample(1, 0.3);
        let bytes = state.pose_bytes();
        assert_eq!(bytes.len(), 2 * QUAT_BYTES);
        assert_eq!(
            ReplicatedState::rotations_from_bytes(&bytes),
            Some(state.rotations.clone())
        );
        assert_eq!(ReplicatedState::rotations_from_bytes(&bytes[1..]), None);
    }

    #[test]
    fn state_survives_ron() {
        let state = sample(9, 0.3);
        let text = ron::to_string(&state).unwrap();
        let back: ReplicatedState = ron::from_str(&text).unwrap();
        assert_eq!(back.tick, 9);
        assert_eq!(back.participant, ParticipantId(2));
    }
}
