/*!
World-level configuration.

`WorldSettings` gathers the knobs `PhysicsWorld::new` needs. Defaults come from
`crate::constants`; hosts that load tuning from level data build the struct
themselves and override individual fields.
*/

use nalgebra::Vector3;

use crate::constants::{FIXED_TIMESTEP, GRAVITY_MPS2, MAX_FRAME_DT, MAX_SUBSTEPS};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldSettings {
    /// Initial gravity vector (can be changed later with `set_gravity`).
    pub gravity: Vector3<f32>,
    /// Internal fixed step (seconds).
    pub fixed_timestep: f32,
    /// Upper bound on fixed steps per frame.
    pub max_substeps: u32,
    /// Frames with `dt >= max_frame_dt` are skipped.
    pub max_frame_dt: f32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            gravity: Vector3::new(0.0, -GRAVITY_MPS2, 0.0),
            fixed_timestep: FIXED_TIMESTEP,
            max_substeps: MAX_SUBSTEPS,
            max_frame_dt: MAX_FRAME_DT,
        }
    }
}

impl WorldSettings {
    /// Apply the hitch guard to a frame delta: large or negative deltas become zero.
    #[inline]
    pub fn clamp_frame_dt(&self, dt: f32) -> f32 {
        if !(dt > 0.0) || dt >= self.max_frame_dt {
            0.0
        } else {
            dt
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hitch_frames_are_dropped() {
        let s = WorldSettings::default();
        assert_eq!(s.clamp_frame_dt(0.5), 0.0);
        assert_eq!(s.clamp_frame_dt(0.1), 0.0);
        assert_eq!(s.clamp_frame_dt(-0.01), 0.0);
        assert_eq!(s.clamp_frame_dt(f32::NAN), 0.0);
        assert_eq!(s.clamp_frame_dt(0.03), 0.03);
    }
}
