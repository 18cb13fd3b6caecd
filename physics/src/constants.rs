//! Tuning constants for the collision layer.
//!
//! Distances are in meters, time in seconds, angles in radians, masses in kilograms.
//! [`crate::settings::WorldSettings`] takes its defaults from here; per-level or
//! per-entity data may override them.

use std::f32::consts::FRAC_PI_2;

/// Gravity along -Y (m/s^2, positive magnitude).
pub const GRAVITY_MPS2: f32 = 9.81;

/// Internal fixed step of the dynamics backend.
pub const FIXED_TIMESTEP: f32 = 1.0 / 60.0;

/// Maximum number of fixed steps consumed per `step_simulation` call.
pub const MAX_SUBSTEPS: u32 = 4;

/// Frame deltas at or above this are treated as zero (hitch: skip the step entirely).
pub const MAX_FRAME_DT: f32 = 0.1;

/// Restitution and friction given to every body the factory builds.
pub const DEFAULT_RESTITUTION: f32 = 1.0;
pub const DEFAULT_FRICTION: f32 = 1.0;

/// Shapes with an extent below this on any axis are treated as degenerate.
pub const MIN_SHAPE_EXTENT: f32 = 1.0e-4;

/// The node arena grows in blocks of this many nodes.
pub const NODE_BLOCK_SIZE: usize = 4;

/// Shape held by a detached ghost's collider; never queried.
pub const DETACHED_GHOST_RADIUS: f32 = 0.01;

/// Root ragdoll bodies get CCD; the soft-CCD prediction distance is this
/// fraction of the bone's bounding-sphere radius.
pub const CCD_SWEEP_RADIUS_FACTOR: f32 = 0.2;

/// Sleep thresholds applied to activated ragdoll bodies.
pub const RAGDOLL_SLEEP_LINEAR: f32 = 0.8;
pub const RAGDOLL_SLEEP_ANGULAR: f32 = 1.0;

/// Extra solver iterations for the hair body attached to the scalp.
pub const HAIR_ANCHOR_SOLVER_ITERATIONS: usize = 16;

/// Scalp joint cone (X, Y, Z axes). Intentionally asymmetric on X so hair
/// cannot swing up through the head.
pub const HAIR_ANCHOR_ANGULAR_LOWER: [f32; 3] = [-FRAC_PI_2, 0.0, -FRAC_PI_2 * 0.4];
pub const HAIR_ANCHOR_ANGULAR_UPPER: [f32; 3] = [-FRAC_PI_2 * 0.3, 0.0, FRAC_PI_2 * 0.4];

/// Cone between consecutive hair segments.
pub const HAIR_CHAIN_ANGULAR_LIMIT: [f32; 3] = [FRAC_PI_2 * 0.5, 0.0, FRAC_PI_2 * 0.5];
