use nalgebra::Point3;

use crate::room::RoomId;

/// How a sector's floor or ceiling surface takes part in collision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PenetrationConfig {
    /// Both triangles of the quad are solid.
    #[default]
    Solid,
    /// The cell is a wall column; the surface contributes no geometry.
    Wall,
    /// The surface is passable (e.g. a portal into the room above/below).
    Ghost,
    /// Vertical door, first triangle open.
    DoorVerticalA,
    /// Vertical door, second triangle open.
    DoorVerticalB,
}

impl PenetrationConfig {
    /// Does this surface produce any triangles at all?
    #[inline]
    pub fn is_solid_surface(self) -> bool {
        !matches!(self, PenetrationConfig::Wall | PenetrationConfig::Ghost)
    }
}

/// Which diagonal splits a sector's surface quad into two triangles.
///
/// `None` and `NorthWest` split along corners 0-2, `NorthEast` along corners 1-3.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DiagonalType {
    #[default]
    None,
    NorthWest,
    NorthEast,
}

/// Reference to a sector of some room: (room, linear sector index).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SectorRef {
    pub room: RoomId,
    pub index: usize,
}

/// One grid cell of a room.
///
/// Corner layout (top-down, +X right, +Z up):
///
/// ```text
/// 3 ---- 2
/// |      |
/// 0 ---- 1
/// ```
///
/// Each corner is a full world-space point; `y` carries the surface height.
#[derive(Clone, Debug, PartialEq)]
pub struct Sector {
    pub room: RoomId,
    pub index_x: u16,
    pub index_z: u16,

    pub floor_corners: [Point3<f32>; 4],
    pub ceiling_corners: [Point3<f32>; 4],

    pub floor_penetration: PenetrationConfig,
    pub ceiling_penetration: PenetrationConfig,
    pub floor_diagonal: DiagonalType,
    pub ceiling_diagonal: DiagonalType,

    /// Doorway: this cell is actually occupied by another room.
    pub portal_to_room: Option<RoomId>,
    /// Sector directly below (through a floor opening).
    pub sector_below: Option<SectorRef>,
    /// Sector directly above (through a ceiling opening).
    pub sector_above: Option<SectorRef>,
}

impl Sector {
    /// Flat sector with the given floor and ceiling heights.
    pub fn flat(room: RoomId, index_x: u16, index_z: u16, min_xz: (f32, f32), size: f32, floor: f32, ceiling: f32) -> Self {
        let (x0, z0) = min_xz;
        let (x1, z1) = (x0 + size, z0 + size);
        let corners = |y: f32| {
            [
                Point3::new(x0, y, z0),
                Point3::new(x1, y, z0),
                Point3::new(x1, y, z1),
                Point3::new(x0, y, z1),
            ]
        };
        Self {
            room,
            index_x,
            index_z,
            floor_corners: corners(floor),
            ceiling_corners: corners(ceiling),
            floor_penetration: PenetrationConfig::Solid,
            ceiling_penetration: PenetrationConfig::Solid,
            floor_diagonal: DiagonalType::None,
            ceiling_diagonal: DiagonalType::None,
            portal_to_room: None,
            sector_below: None,
            sector_above: None,
        }
    }

    /// Set individual floor corner heights (corner order 0..4, see type docs).
    pub fn with_floor_heights(mut self, heights: [f32; 4]) -> Self {
        for (corner, h) in self.floor_corners.iter_mut().zip(heights) {
            corner.y = h;
        }
        self
    }

    /// Set individual ceiling corner heights (corner order 0..4, see type docs).
    pub fn with_ceiling_heights(mut self, heights: [f32; 4]) -> Self {
        for (corner, h) in self.ceiling_corners.iter_mut().zip(heights) {
            corner.y = h;
        }
        self
    }

    /// Lowest floor corner height.
    pub fn floor_min(&self) -> f32 {
        self.floor_corners.iter().map(|c| c.y).fold(f32::INFINITY, f32::min)
    }

    /// Highest ceiling corner height.
    pub fn ceiling_max(&self) -> f32 {
        self.ceiling_corners
            .iter()
            .map(|c| c.y)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// World-space center of the cell at floor level.
    pub fn floor_center(&self) -> Point3<f32> {
        let sum = self
            .floor_corners
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, c| acc + c.coords);
        Point3::from(sum / 4.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_sector_corners_follow_layout() {
        let s = Sector::flat(RoomId(0), 1, 2, (1.0, 2.0), 1.0, 0.5, 3.0);
        assert_eq!(s.floor_corners[0], Point3::new(1.0, 0.5, 2.0));
        assert_eq!(s.floor_corners[1], Point3::new(2.0, 0.5, 2.0));
        assert_eq!(s.floor_corners[2], Point3::new(2.0, 0.5, 3.0));
        assert_eq!(s.floor_corners[3], Point3::new(1.0, 0.5, 3.0));
        assert!(s.ceiling_corners.iter().all(|c| c.y == 3.0));
    }

    #[test]
    fn heights_override_only_y() {
        let s = Sector::flat(RoomId(0), 0, 0, (0.0, 0.0), 1.0, 0.0, 2.0)
            .with_floor_heights([0.0, 0.25, 0.5, 0.75]);
        assert_eq!(s.floor_corners[2], Point3::new(1.0, 0.5, 1.0));
        assert_eq!(s.floor_min(), 0.0);
        assert_eq!(s.ceiling_max(), 2.0);
    }

    #[test]
    fn wall_and_ghost_have_no_surface() {
        assert!(PenetrationConfig::Solid.is_solid_surface());
        assert!(PenetrationConfig::DoorVerticalA.is_solid_surface());
        assert!(!PenetrationConfig::Wall.is_solid_surface());
        assert!(!PenetrationConfig::Ghost.is_solid_surface());
    }
}
