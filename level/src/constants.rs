/// Size of one square sector in world units (meters).
pub const SECTOR_SIZE: f32 = 1.0;

/// Inverse of [`SECTOR_SIZE`], used by the world-to-sector mapping.
pub const INV_SECTOR_SIZE: f32 = 1.0 / SECTOR_SIZE;

/// Upper bound on how many "sector above/below" hops are followed when resolving
/// vertical room links. Real levels never stack more than a handful of rooms; the
/// bound only protects against malformed, cyclic sector data.
pub const MAX_SECTOR_CHAIN: usize = 16;

/// Two corner heights closer than this are considered equal when classifying tweens.
pub const HEIGHT_EPS: f32 = 1.0e-4;
