//! Room-aware collision filtering.
//!
//! One decision procedure serves both places the dynamics backend asks
//! "should these two touch?": contact pairs during a step (through
//! [`PhysicsHooks`]) and hits of ray/sweep/penetration queries (through a
//! query predicate). The rules, in order:
//!
//! 1. Ghost proxies never interact with each other.
//! 2. Two colliders of the same owner never interact when either one is
//!    static or kinematic. Dynamic parts of one owner (ragdoll bones) may.
//! 3. Hair never touches the entity it hangs from.
//! 4. Two triggers never interact, whatever their masks say.
//! 5. Category/mask: each side's categories must intersect the other side's mask.
//! 6. Rooms: when both sides are in a room, the rooms must be near each other
//!    and not overlapped. Overlapped rooms are let through only for a heavy
//!    object whose sector is connected to the other room through a portal or a
//!    vertical sector chain.
//!
//! Colliders with no owner tag (`user_data == 0`) skip rules 2..6. Colliders
//! whose owner was released are rejected outright; the world sweeps them.

use level::{RoomId, RoomSet};
use nalgebra::Point3;
use rapier3d::prelude::*;

use crate::{
    bitmask_flags::{CollisionGroup, CollisionMask},
    owner::{OwnerHandle, OwnerTable, OwnerTag, unpack_user_data},
};

/// What the filter knows about one side of a candidate pair.
#[derive(Clone, Copy, Debug)]
pub struct ProxyInfo<'a> {
    pub owner: Option<(OwnerHandle, &'a OwnerTag)>,
    pub is_ghost: bool,
    pub is_static_or_kinematic: bool,
    pub position: Point3<f32>,
}

/// The object a ray, sweep or penetration query is issued for.
#[derive(Clone, Copy, Debug)]
pub struct QueryOrigin<'a> {
    pub owner: Option<(OwnerHandle, &'a OwnerTag)>,
    /// Categories the query wants to hit.
    pub mask: CollisionMask,
    pub position: Point3<f32>,
}

impl<'a> QueryOrigin<'a> {
    /// Anonymous query: category mask only, no self or room exclusion.
    pub fn anonymous(mask: CollisionMask, position: Point3<f32>) -> Self {
        Self {
            owner: None,
            mask,
            position,
        }
    }
}

#[derive(Clone, Copy)]
pub struct CollisionFilter<'a> {
    pub rooms: &'a RoomSet,
    pub owners: &'a OwnerTable,
}

impl<'a> CollisionFilter<'a> {
    pub fn new(rooms: &'a RoomSet, owners: &'a OwnerTable) -> Self {
        Self { rooms, owners }
    }

    /// Describe a collider for filtering. `None` means the collider's owner
    /// was released (orphan).
    pub fn resolve(&self, collider: &Collider, bodies: &RigidBodySet) -> Option<ProxyInfo<'a>> {
        let owner = match unpack_user_data(collider.user_data) {
            Some(decoded) => Some((decoded.handle, self.owners.get(decoded.handle)?)),
            None => None,
        };
        let is_static_or_kinematic = collider
            .parent()
            .and_then(|h| bodies.get(h))
            .is_none_or(|b| !b.is_dynamic());
        Some(ProxyInfo {
            owner,
            is_ghost: collider.is_sensor(),
            is_static_or_kinematic,
            position: Point3::from(*collider.translation()),
        })
    }

    /// Should two proxies generate contacts?
    pub fn accept_pair(&self, a: &ProxyInfo, b: &ProxyInfo) -> bool {
        if a.is_ghost && b.is_ghost {
            return false;
        }
        let (Some((ha, ta)), Some((hb, tb))) = (a.owner, b.owner) else {
            return true;
        };
        if ha == hb && (a.is_static_or_kinematic || b.is_static_or_kinematic) {
            return false;
        }
        if ta.linked_owner == Some(hb) || tb.linked_owner == Some(ha) {
            return false;
        }
        if ta.group.has(CollisionGroup::Triggers) && tb.group.has(CollisionGroup::Triggers) {
            return false;
        }
        if !(ta.group.intersects(tb.mask) && tb.group.intersects(ta.mask)) {
            return false;
        }
        let heavy = ta.heavy != tb.heavy;
        self.rooms_allow(ta.room, &a.position, tb.room, &b.position, heavy)
    }

    /// Should a query report a hit on this proxy?
    pub fn accept_hit(&self, origin: &QueryOrigin, hit: &ProxyInfo) -> bool {
        if hit.is_ghost {
            return false;
        }
        let Some((hh, ht)) = hit.owner else {
            return true;
        };
        if !ht.group.intersects(origin.mask) {
            return false;
        }
        let Some((qh, qt)) = origin.owner else {
            return true;
        };
        if qh == hh || ht.linked_owner == Some(qh) || qt.linked_owner == Some(hh) {
            return false;
        }
        self.rooms_allow(qt.room, &origin.position, ht.room, &hit.position, qt.heavy)
    }

    /// Contact-pair test on two colliders of the world.
    pub fn accept_colliders(
        &self,
        bodies: &RigidBodySet,
        colliders: &ColliderSet,
        c1: ColliderHandle,
        c2: ColliderHandle,
    ) -> bool {
        let (Some(co1), Some(co2)) = (colliders.get(c1), colliders.get(c2)) else {
            return false;
        };
        match (self.resolve(co1, bodies), self.resolve(co2, bodies)) {
            (Some(a), Some(b)) => self.accept_pair(&a, &b),
            _ => false,
        }
    }

    fn rooms_allow(
        &self,
        ra: Option<RoomId>,
        pa: &Point3<f32>,
        rb: Option<RoomId>,
        pb: &Point3<f32>,
        heavy: bool,
    ) -> bool {
        let (Some(ra), Some(rb)) = (ra, rb) else {
            return true;
        };
        let overlapped = self.rooms.are_overlapped(ra, rb);
        if self.rooms.are_near(ra, rb) && !overlapped {
            return true;
        }
        heavy && overlapped && self.sectors_linked(ra, pa, rb, pb)
    }

    /// Is the sector under either object connected to the other object's room?
    fn sectors_linked(&self, ra: RoomId, pa: &Point3<f32>, rb: RoomId, pb: &Point3<f32>) -> bool {
        let rooms = self.rooms;
        let lookup = |room: RoomId, pos: &Point3<f32>| rooms.room(room).and_then(|r| r.sector_at(pos));
        let (Some(sa), Some(sb)) = (lookup(ra, pa), lookup(rb, pb)) else {
            return false;
        };
        if sa.portal_to_room == Some(rb) || sb.portal_to_room == Some(ra) {
            return true;
        }
        let sa = rooms.resolve_portal(sa, pa);
        let sb = rooms.resolve_portal(sb, pb);
        sa.room == rb
            || sb.room == ra
            || rooms.vertical_chain_reaches(sa, rb)
            || rooms.vertical_chain_reaches(sb, ra)
    }
}

impl PhysicsHooks for CollisionFilter<'_> {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        self.accept_colliders(context.bodies, context.colliders, context.collider1, context.collider2)
            .then_some(SolverFlags::COMPUTE_IMPULSES)
    }

    fn filter_intersection_pair(&self, context: &PairFilterContext) -> bool {
        self.accept_colliders(context.bodies, context.colliders, context.collider1, context.collider2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::owner::{ObjectKind, OwnerTag};
    use level::{Room, SectorRef};
    use nalgebra::Vector3;

    struct Fixture {
        rooms: RoomSet,
        owners: OwnerTable,
    }

    impl Fixture {
        /// Rooms 0 and 1 are near; room 2 overlaps room 0 (same footprint,
        /// no connection).
        fn new() -> Self {
            let mut r0 = Room::flat(RoomId(0), Vector3::zeros(), 4, 4, 4.0);
            let mut r1 = Room::flat(RoomId(1), Vector3::new(4.0, 0.0, 0.0), 4, 4, 4.0);
            let mut r2 = Room::flat(RoomId(2), Vector3::zeros(), 4, 4, 4.0);
            r0.near_rooms.push(RoomId(1));
            r1.near_rooms.push(RoomId(0));
            r0.overlapped_rooms.push(RoomId(2));
            r2.overlapped_rooms.push(RoomId(0));
            Self {
                rooms: RoomSet::new(vec![r0, r1, r2]),
                owners: OwnerTable::new(),
            }
        }

        fn tag(&mut self, room: Option<u32>, group: CollisionGroup) -> OwnerHandle {
            self.owners
                .insert(OwnerTag::new(ObjectKind::Entity, room.map(RoomId), group))
        }

        fn proxy(&self, h: OwnerHandle, static_or_kinematic: bool, pos: [f32; 3]) -> ProxyInfo<'_> {
            ProxyInfo {
                owner: Some((h, self.owners.get(h).unwrap())),
                is_ghost: false,
                is_static_or_kinematic: static_or_kinematic,
                position: Point3::new(pos[0], pos[1], pos[2]),
            }
        }

        fn filter(&self) -> CollisionFilter<'_> {
            CollisionFilter::new(&self.rooms, &self.owners)
        }
    }

    #[test]
    fn same_owner_rejected_only_with_static_or_kinematic_side() {
        let mut fx = Fixture::new();
        let e = fx.tag(Some(0), CollisionGroup::Characters);
        let f = fx.filter();
        let kin = fx.proxy(e, true, [1.0, 1.0, 1.0]);
        let dynamic = fx.proxy(e, false, [1.0, 1.0, 1.0]);
        assert!(!f.accept_pair(&kin, &dynamic));
        assert!(f.accept_pair(&dynamic, &dynamic));
    }

    #[test]
    fn ghosts_never_meet_ghosts() {
        let mut fx = Fixture::new();
        let a = fx.tag(Some(0), CollisionGroup::Characters);
        let b = fx.tag(Some(0), CollisionGroup::Characters);
        let f = fx.filter();
        let mut ga = fx.proxy(a, true, [1.0, 1.0, 1.0]);
        let mut gb = fx.proxy(b, true, [1.0, 1.0, 1.0]);
        assert!(f.accept_pair(&ga, &gb));
        ga.is_ghost = true;
        gb.is_ghost = true;
        assert!(!f.accept_pair(&ga, &gb));
    }

    #[test]
    fn triggers_ignore_triggers() {
        let mut fx = Fixture::new();
        let a = fx.tag(Some(0), CollisionGroup::Triggers);
        let b = fx.tag(Some(0), CollisionGroup::Triggers);
        let c = fx.tag(Some(0), CollisionGroup::Characters);
        let f = fx.filter();
        let pa = fx.proxy(a, true, [1.0, 1.0, 1.0]);
        let pb = fx.proxy(b, true, [1.0, 1.0, 1.0]);
        let pc = fx.proxy(c, true, [1.0, 1.0, 1.0]);
        assert!(!f.accept_pair(&pa, &pb));
        assert!(f.accept_pair(&pa, &pc));
    }

    #[test]
    fn triggers_ignore_triggers_even_with_full_masks() {
        let mut fx = Fixture::new();
        let trigger = || {
            OwnerTag::new(ObjectKind::Entity, Some(RoomId(0)), CollisionGroup::Triggers).with_mask(CollisionMask::all())
        };
        let a = fx.owners.insert(trigger());
        let b = fx.owners.insert(trigger());
        let f = fx.filter();
        let pa = fx.proxy(a, false, [1.0, 1.0, 1.0]);
        let pb = fx.proxy(b, false, [1.0, 1.0, 1.0]);
        assert!(!f.accept_pair(&pa, &pb));
        assert!(!f.accept_pair(&pb, &pa));
    }

    #[test]
    fn rooms_must_be_near_and_not_overlapped() {
        let mut fx = Fixture::new();
        let a = fx.tag(Some(0), CollisionGroup::Dynamics);
        let near = fx.tag(Some(1), CollisionGroup::Dynamics);
        let overlapped = fx.tag(Some(2), CollisionGroup::Dynamics);
        let roomless = fx.tag(None, CollisionGroup::Dynamics);
        let f = fx.filter();
        let pa = fx.proxy(a, false, [1.5, 1.0, 1.5]);
        assert!(f.accept_pair(&pa, &fx.proxy(near, false, [4.5, 1.0, 1.5])));
        assert!(!f.accept_pair(&pa, &fx.proxy(overlapped, false, [1.5, 1.0, 1.5])));
        assert!(f.accept_pair(&pa, &fx.proxy(roomless, false, [1.5, 1.0, 1.5])));
    }

    #[test]
    fn heavy_object_crosses_overlap_only_through_a_portal() {
        let mut fx = Fixture::new();
        let heavy = fx.tag(Some(0), CollisionGroup::Dynamics);
        fx.owners.get_mut(heavy).unwrap().heavy = true;
        let other = fx.tag(Some(2), CollisionGroup::Dynamics);

        {
            let f = fx.filter();
            let ph = fx.proxy(heavy, false, [1.5, 1.0, 1.5]);
            let po = fx.proxy(other, false, [1.5, 1.0, 1.5]);
            assert!(!f.accept_pair(&ph, &po));
        }

        let mut rooms: Vec<Room> = fx.rooms.iter().cloned().collect();
        let idx = rooms[0].grid.index_at(&Point3::new(1.5, 0.0, 1.5)).unwrap();
        rooms[0].sectors[idx].portal_to_room = Some(RoomId(2));
        fx.rooms = RoomSet::new(rooms);

        let f = fx.filter();
        let ph = fx.proxy(heavy, false, [1.5, 1.0, 1.5]);
        let po = fx.proxy(other, false, [1.5, 1.0, 1.5]);
        assert!(f.accept_pair(&ph, &po));
        assert!(f.accept_pair(&po, &ph));
    }

    #[test]
    fn heavy_override_follows_vertical_chain_and_needs_exactly_one_heavy() {
        let mut fx = Fixture::new();
        let mut rooms: Vec<Room> = fx.rooms.iter().cloned().collect();
        let idx = rooms[2].grid.index_at(&Point3::new(2.5, 0.0, 2.5)).unwrap();
        rooms[2].sectors[idx].sector_below = Some(SectorRef { room: RoomId(0), index: idx });
        fx.rooms = RoomSet::new(rooms);

        let heavy = fx.tag(Some(0), CollisionGroup::Dynamics);
        let other = fx.tag(Some(2), CollisionGroup::Dynamics);
        fx.owners.get_mut(heavy).unwrap().heavy = true;
        {
            let f = fx.filter();
            let ph = fx.proxy(heavy, false, [0.5, 1.0, 0.5]);
            let po = fx.proxy(other, false, [2.5, 1.0, 2.5]);
            assert!(f.accept_pair(&ph, &po));
        }

        fx.owners.get_mut(other).unwrap().heavy = true;
        let f = fx.filter();
        let ph = fx.proxy(heavy, false, [0.5, 1.0, 0.5]);
        let po = fx.proxy(other, false, [2.5, 1.0, 2.5]);
        assert!(!f.accept_pair(&ph, &po));
    }

    #[test]
    fn heavy_query_sees_overlapped_room_through_portal_or_chain() {
        let mut fx = Fixture::new();
        let mut rooms: Vec<Room> = fx.rooms.iter().cloned().collect();
        let portal = rooms[0].grid.index_at(&Point3::new(1.5, 0.0, 1.5)).unwrap();
        rooms[0].sectors[portal].portal_to_room = Some(RoomId(2));
        let below = rooms[0].grid.index_at(&Point3::new(3.5, 0.0, 3.5)).unwrap();
        rooms[0].sectors[below].sector_above = Some(SectorRef { room: RoomId(2), index: below });
        fx.rooms = RoomSet::new(rooms);

        let me = fx.tag(Some(0), CollisionGroup::Dynamics);
        let target = fx.tag(Some(2), CollisionGroup::Dynamics);
        fn hr<F: for<'a> Fn(&'a Fixture, [f32; 3]) -> QueryOrigin<'a>>(f: F) -> F {
            f
        }
        let origin_at = hr(|fx: &Fixture, pos: [f32; 3]| QueryOrigin {
            owner: Some((me, fx.owners.get(me).unwrap())),
            mask: CollisionMask::all(),
            position: Point3::new(pos[0], pos[1], pos[2]),
        });

        // Not heavy: the overlapped room stays invisible everywhere.
        {
            let f = fx.filter();
            let hit = fx.proxy(target, true, [1.5, 1.0, 1.5]);
            assert!(!f.accept_hit(&origin_at(&fx, [1.5, 1.0, 1.5]), &hit));
            assert!(!f.accept_hit(&origin_at(&fx, [3.5, 1.0, 3.5]), &hit));
        }

        fx.owners.get_mut(me).unwrap().heavy = true;
        let f = fx.filter();
        let hit = fx.proxy(target, true, [0.5, 1.0, 2.5]);
        assert!(f.accept_hit(&origin_at(&fx, [1.5, 1.0, 1.5]), &hit));
        assert!(f.accept_hit(&origin_at(&fx, [3.5, 1.0, 3.5]), &hit));
        // Heavy alone is not enough: the sector must link to the other room.
        assert!(!f.accept_hit(&origin_at(&fx, [0.5, 1.0, 0.5]), &hit));
    }

    #[test]
    fn hair_skips_its_own_entity() {
        let mut fx = Fixture::new();
        let entity = fx.tag(Some(0), CollisionGroup::Characters);
        let mut hair_tag = OwnerTag::new(ObjectKind::Hair, Some(RoomId(0)), CollisionGroup::DynamicsNoInteraction);
        hair_tag.linked_owner = Some(entity);
        let hair = fx.owners.insert(hair_tag.clone());
        let hair2 = fx.owners.insert(hair_tag);
        let stranger = fx.tag(Some(0), CollisionGroup::Characters);
        let f = fx.filter();
        let ph = fx.proxy(hair, false, [1.0, 1.0, 1.0]);
        assert!(!f.accept_pair(&ph, &fx.proxy(entity, true, [1.0, 1.0, 1.0])));
        assert!(f.accept_pair(&ph, &fx.proxy(stranger, true, [1.0, 1.0, 1.0])));
        assert!(!f.accept_pair(&ph, &fx.proxy(hair2, false, [1.0, 1.0, 1.0])));
    }

    #[test]
    fn query_hits_skip_self_masked_and_far_rooms() {
        let mut fx = Fixture::new();
        let me = fx.tag(Some(0), CollisionGroup::Characters);
        let wall = fx.tag(Some(0), CollisionGroup::StaticRoom);
        let far = fx.tag(Some(2), CollisionGroup::StaticRoom);
        let f = fx.filter();

        let origin = QueryOrigin {
            owner: Some((me, fx.owners.get(me).unwrap())),
            mask: CollisionGroup::StaticRoom.flags(),
            position: Point3::new(1.0, 1.0, 1.0),
        };
        assert!(!f.accept_hit(&origin, &fx.proxy(me, true, [1.0, 1.0, 1.0])));
        assert!(f.accept_hit(&origin, &fx.proxy(wall, true, [1.0, 1.0, 1.0])));
        assert!(!f.accept_hit(&origin, &fx.proxy(far, true, [1.0, 1.0, 1.0])));

        let chars_only = QueryOrigin {
            mask: CollisionGroup::Characters.flags(),
            ..origin
        };
        assert!(!f.accept_hit(&chars_only, &fx.proxy(wall, true, [1.0, 1.0, 1.0])));

        let untagged = ProxyInfo {
            owner: None,
            is_ghost: false,
            is_static_or_kinematic: true,
            position: Point3::origin(),
        };
        assert!(f.accept_hit(&chars_only, &untagged));
        assert!(f.accept_hit(&QueryOrigin::anonymous(CollisionMask::all(), Point3::origin()), &fx.proxy(far, true, [0.0; 3])));
    }
}
