//! Room graph: the level's spatial partition as seen by the collision layer.
//!
//! Rooms are handed over by the level loader fully built. Near-room and
//! overlapped-room lists are precomputed and symmetric; nothing here searches
//! the graph transitively at runtime.

use std::sync::Arc;

use nalgebra::{Isometry3, Point3, Vector3};

use crate::{
    constants::{MAX_SECTOR_CHAIN, SECTOR_SIZE},
    grid::SectorGrid,
    mesh::MeshData,
    sector::{Sector, SectorRef},
};

/// Stable index of a room inside a [`RoomSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub u32);

/// A static mesh placed in a room (pillars, furniture, debris).
#[derive(Clone, Debug)]
pub struct StaticMeshInstance {
    pub mesh: Arc<MeshData>,
    pub pose: Isometry3<f32>,
    /// Some static meshes are purely decorative.
    pub has_collision: bool,
}

#[derive(Clone, Debug)]
pub struct Room {
    pub id: RoomId,
    pub grid: SectorGrid,
    /// Dense X-major sector grid, see [`SectorGrid`].
    pub sectors: Vec<Sector>,
    /// Rooms whose geometry may physically touch this one.
    pub near_rooms: Vec<RoomId>,
    /// Rooms sharing volume with this one without a real connection.
    pub overlapped_rooms: Vec<RoomId>,
    pub static_meshes: Vec<StaticMeshInstance>,
}

impl Room {
    /// Box-shaped room of `nx * nz` flat sectors; floor at `origin.y`, ceiling
    /// `height` above it. No near/overlap links.
    pub fn flat(id: RoomId, origin: Vector3<f32>, nx: u16, nz: u16, height: f32) -> Self {
        let grid = SectorGrid::new(origin, nx, nz);
        let mut sectors = Vec::with_capacity(grid.len());
        for gx in 0..nx {
            for gz in 0..nz {
                sectors.push(Sector::flat(
                    id,
                    gx,
                    gz,
                    grid.min_corner(gx, gz),
                    SECTOR_SIZE,
                    origin.y,
                    origin.y + height,
                ));
            }
        }
        Self {
            id,
            grid,
            sectors,
            near_rooms: Vec::new(),
            overlapped_rooms: Vec::new(),
            static_meshes: Vec::new(),
        }
    }

    /// Sector at grid coordinates.
    pub fn sector(&self, gx: u16, gz: u16) -> Option<&Sector> {
        self.sectors.get(self.grid.encode(gx, gz)?)
    }

    /// Sector containing the world position, ignoring height.
    pub fn sector_at(&self, pos: &Point3<f32>) -> Option<&Sector> {
        self.sectors.get(self.grid.index_at(pos)?)
    }

    /// Is `other` this room or one of its near rooms?
    #[inline]
    pub fn is_near(&self, other: RoomId) -> bool {
        self.id == other || self.near_rooms.contains(&other)
    }

    #[inline]
    pub fn is_overlapped(&self, other: RoomId) -> bool {
        self.overlapped_rooms.contains(&other)
    }
}

/// Read-only collection of all rooms of the loaded level.
#[derive(Clone, Debug, Default)]
pub struct RoomSet {
    rooms: Vec<Room>,
}

impl RoomSet {
    /// Build a room set. Rooms must be ordered by id (`rooms[i].id == RoomId(i)`).
    pub fn new(rooms: Vec<Room>) -> Self {
        for (i, room) in rooms.iter().enumerate() {
            if room.id.0 as usize != i {
                log::warn!("Room at slot {} carries id {:?}; lookups use slot order", i, room.id);
            }
        }
        Self { rooms }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    #[inline]
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter()
    }

    #[inline]
    pub fn sector(&self, r: SectorRef) -> Option<&Sector> {
        self.room(r.room)?.sectors.get(r.index)
    }

    /// Mutual "near" relation: each room lists the other (or they are the same room).
    pub fn are_near(&self, a: RoomId, b: RoomId) -> bool {
        if a == b {
            return true;
        }
        match (self.room(a), self.room(b)) {
            (Some(ra), Some(rb)) => ra.is_near(b) && rb.is_near(a),
            _ => false,
        }
    }

    /// Overlap relation: either room lists the other as overlapped.
    pub fn are_overlapped(&self, a: RoomId, b: RoomId) -> bool {
        if a == b {
            return false;
        }
        match (self.room(a), self.room(b)) {
            (Some(ra), Some(rb)) => ra.is_overlapped(b) || rb.is_overlapped(a),
            _ => false,
        }
    }

    /// Sector of `room` under the world position, with portal indirection resolved.
    pub fn sector_at(&self, room: RoomId, pos: &Point3<f32>) -> Option<&Sector> {
        let sector = self.room(room)?.sector_at(pos)?;
        Some(self.resolve_portal(sector, pos))
    }

    /// Follow a doorway sector into the room it actually belongs to.
    ///
    /// Only one hop is taken; doorway cells of the target room are not chased.
    pub fn resolve_portal<'a>(&'a self, sector: &'a Sector, pos: &Point3<f32>) -> &'a Sector {
        sector
            .portal_to_room
            .and_then(|dest| self.room(dest))
            .and_then(|dest| dest.sector_at(pos))
            .unwrap_or(sector)
    }

    /// Find the first room whose footprint contains the position and whose
    /// floor/ceiling span contains its height.
    pub fn find_room_at(&self, pos: &Point3<f32>) -> Option<RoomId> {
        self.rooms
            .iter()
            .find(|room| {
                room.sector_at(pos)
                    .is_some_and(|s| pos.y >= s.floor_min() && pos.y <= s.ceiling_max())
            })
            .map(|room| room.id)
    }

    /// Does walking the sector's below-chain or above-chain end up in `target`?
    pub fn vertical_chain_reaches(&self, sector: &Sector, target: RoomId) -> bool {
        self.chain_reaches(sector, target, |s| s.sector_below)
            || self.chain_reaches(sector, target, |s| s.sector_above)
    }

    fn chain_reaches(
        &self,
        start: &Sector,
        target: RoomId,
        next: impl Fn(&Sector) -> Option<SectorRef>,
    ) -> bool {
        let mut current = start;
        for _ in 0..MAX_SECTOR_CHAIN {
            let Some(link) = next(current) else {
                return false;
            };
            if link.room == target {
                return true;
            }
            let Some(s) = self.sector(link) else {
                return false;
            };
            current = s;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_room(id: u32, origin: Vector3<f32>, nx: u16, nz: u16) -> Room {
        Room::flat(RoomId(id), origin, nx, nz, 4.0)
    }

    fn two_rooms() -> RoomSet {
        let mut a = flat_room(0, Vector3::new(0.0, 0.0, 0.0), 4, 4);
        let mut b = flat_room(1, Vector3::new(4.0, 0.0, 0.0), 4, 4);
        a.near_rooms.push(RoomId(1));
        b.near_rooms.push(RoomId(0));
        RoomSet::new(vec![a, b])
    }

    #[test]
    fn near_relation_requires_both_lists() {
        let set = two_rooms();
        assert!(set.are_near(RoomId(0), RoomId(1)));
        assert!(set.are_near(RoomId(1), RoomId(1)));

        let mut a = flat_room(0, Vector3::zeros(), 1, 1);
        let b = flat_room(1, Vector3::new(1.0, 0.0, 0.0), 1, 1);
        a.near_rooms.push(RoomId(1));
        let one_sided = RoomSet::new(vec![a, b]);
        assert!(!one_sided.are_near(RoomId(0), RoomId(1)));
    }

    #[test]
    fn overlap_is_never_reflexive() {
        let mut set = two_rooms();
        set.rooms[0].overlapped_rooms.push(RoomId(1));
        assert!(set.are_overlapped(RoomId(0), RoomId(1)));
        assert!(set.are_overlapped(RoomId(1), RoomId(0)));
        assert!(!set.are_overlapped(RoomId(0), RoomId(0)));
    }

    #[test]
    fn portal_sector_resolves_into_destination_room() {
        let mut set = two_rooms();
        // Last column of room 0 is a doorway into room 1, which physically
        // covers the same spot in this test.
        set.rooms[1].grid.origin.x = 3.0;
        let idx = set.rooms[0].grid.encode(3, 1).unwrap();
        set.rooms[0].sectors[idx].portal_to_room = Some(RoomId(1));

        let pos = Point3::new(3.5, 0.0, 1.5);
        let resolved = set.sector_at(RoomId(0), &pos).unwrap();
        assert_eq!(resolved.room, RoomId(1));

        let plain = set.sector_at(RoomId(0), &Point3::new(0.5, 0.0, 0.5)).unwrap();
        assert_eq!(plain.room, RoomId(0));
    }

    #[test]
    fn vertical_chain_finds_room_two_floors_down() {
        let a = flat_room(0, Vector3::new(0.0, 8.0, 0.0), 1, 1);
        let b = flat_room(1, Vector3::new(0.0, 4.0, 0.0), 1, 1);
        let c = flat_room(2, Vector3::new(0.0, 0.0, 0.0), 1, 1);
        let mut set = RoomSet::new(vec![a, b, c]);
        set.rooms[0].sectors[0].sector_below = Some(SectorRef { room: RoomId(1), index: 0 });
        set.rooms[1].sectors[0].sector_below = Some(SectorRef { room: RoomId(2), index: 0 });

        let top = &set.rooms[0].sectors[0];
        assert!(set.vertical_chain_reaches(top, RoomId(2)));
        assert!(!set.vertical_chain_reaches(top, RoomId(0)));
    }

    #[test]
    fn cyclic_chain_terminates() {
        let a = flat_room(0, Vector3::zeros(), 1, 1);
        let b = flat_room(1, Vector3::zeros(), 1, 1);
        let mut set = RoomSet::new(vec![a, b]);
        set.rooms[0].sectors[0].sector_below = Some(SectorRef { room: RoomId(1), index: 0 });
        set.rooms[1].sectors[0].sector_below = Some(SectorRef { room: RoomId(0), index: 0 });
        let s = set.rooms[0].sectors[0].clone();
        assert!(!set.vertical_chain_reaches(&s, RoomId(7)));
    }

    #[test]
    fn find_room_uses_height_span() {
        let a = flat_room(0, Vector3::new(0.0, 0.0, 0.0), 2, 2);
        let b = flat_room(1, Vector3::new(0.0, 4.0, 0.0), 2, 2);
        let set = RoomSet::new(vec![a, b]);
        assert_eq!(set.find_room_at(&Point3::new(1.0, 1.0, 1.0)), Some(RoomId(0)));
        assert_eq!(set.find_room_at(&Point3::new(1.0, 6.0, 1.0)), Some(RoomId(1)));
        assert_eq!(set.find_room_at(&Point3::new(9.0, 1.0, 1.0)), None);
    }
}
