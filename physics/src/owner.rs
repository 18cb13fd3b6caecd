//! Owner tags: which game object a collider belongs to.
//!
//! Every collider stores a packed `u128` in its `user_data`. The packed value
//! names a slot in the world's [`OwnerTable`] plus the slot's generation, so a
//! collider whose owner has been released resolves to nothing instead of to
//! whatever reused the slot.
//!
//! # Bit layout
//! Least-significant bit = bit 0:
//!
//! - bits 0..=31   : slot index (u32)
//! - bits 32..=63  : slot generation (u32)
//! - bits 64..=79  : part index (u16), bone or element number inside the owner
//! - bits 80..=87  : [`ObjectKind`] tag (u8)
//! - bits 88..=127 : reserved (must be zero)
//!
//! A `user_data` of zero never decodes (kind tag 0 is not a valid kind) and
//! marks colliders nobody claimed.

use level::RoomId;

use crate::bitmask_flags::{CollisionGroup, CollisionMask};

/// Discriminator for the kind of game object behind an owner tag.
///
/// The numeric values are part of the packed `user_data` format.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Entity = 1,
    RoomStatic = 2,
    StaticMesh = 3,
    Hair = 4,
    Misc = 5,
}

impl ObjectKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ObjectKind::Entity),
            2 => Some(ObjectKind::RoomStatic),
            3 => Some(ObjectKind::StaticMesh),
            4 => Some(ObjectKind::Hair),
            5 => Some(ObjectKind::Misc),
            _ => None,
        }
    }
}

/// Generational reference to an [`OwnerTag`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct OwnerHandle {
    pub slot: u32,
    pub generation: u32,
}

/// A collider's decoded `user_data`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ColliderOwner {
    pub handle: OwnerHandle,
    pub kind: ObjectKind,
    pub part: u16,
}

const SLOT_SHIFT: u32 = 0;
const GENERATION_SHIFT: u32 = 32;
const PART_SHIFT: u32 = 64;
const KIND_SHIFT: u32 = 80;
const RESERVED_MASK: u128 = !0u128 << 88;

/// Pack an owner reference into a collider `user_data` value.
pub fn pack_user_data(handle: OwnerHandle, kind: ObjectKind, part: u16) -> u128 {
    ((handle.slot as u128) << SLOT_SHIFT)
        | ((handle.generation as u128) << GENERATION_SHIFT)
        | ((part as u128) << PART_SHIFT)
        | ((kind as u128) << KIND_SHIFT)
}

/// Decode a collider `user_data` value.
///
/// Returns `None` for zero, unknown kind tags and non-zero reserved bits.
pub fn unpack_user_data(bits: u128) -> Option<ColliderOwner> {
    if bits & RESERVED_MASK != 0 {
        return None;
    }
    let kind = ObjectKind::from_tag(((bits >> KIND_SHIFT) & u8::MAX as u128) as u8)?;
    Some(ColliderOwner {
        handle: OwnerHandle {
            slot: ((bits >> SLOT_SHIFT) & u32::MAX as u128) as u32,
            generation: ((bits >> GENERATION_SHIFT) & u32::MAX as u128) as u32,
        },
        kind,
        part: ((bits >> PART_SHIFT) & u16::MAX as u128) as u16,
    })
}

/// Per-object collision identity shared by all colliders of one game object.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnerTag {
    pub kind: ObjectKind,
    /// Room the object currently sits in; `None` disables room filtering.
    pub room: Option<RoomId>,
    /// Categories the object belongs to.
    pub group: CollisionMask,
    /// Categories the object interacts with.
    pub mask: CollisionMask,
    /// Heavy objects may interact across overlapped rooms when a portal or
    /// vertical sector link connects them.
    pub heavy: bool,
    /// Hair chains never touch the entity they hang from.
    pub linked_owner: Option<OwnerHandle>,
}

impl OwnerTag {
    pub fn new(kind: ObjectKind, room: Option<RoomId>, group: CollisionGroup) -> Self {
        Self {
            kind,
            room,
            group: group.flags(),
            mask: group.default_mask(),
            heavy: false,
            linked_owner: None,
        }
    }

    pub fn with_mask(mut self, mask: CollisionMask) -> Self {
        self.mask = mask;
        self
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    tag: Option<OwnerTag>,
}

/// Generational slab of owner tags.
#[derive(Debug, Default)]
pub struct OwnerTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl OwnerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: OwnerTag) -> OwnerHandle {
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.tag = Some(tag);
            return OwnerHandle {
                slot,
                generation: entry.generation,
            };
        }
        let slot = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            tag: Some(tag),
        });
        OwnerHandle { slot, generation: 0 }
    }

    /// Release a tag. Colliders still pointing at it become orphans.
    pub fn release(&mut self, handle: OwnerHandle) -> Option<OwnerTag> {
        let entry = self.slots.get_mut(handle.slot as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        let tag = entry.tag.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(handle.slot);
        Some(tag)
    }

    pub fn get(&self, handle: OwnerHandle) -> Option<&OwnerTag> {
        let entry = self.slots.get(handle.slot as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        entry.tag.as_ref()
    }

    pub fn get_mut(&mut self, handle: OwnerHandle) -> Option<&mut OwnerTag> {
        let entry = self.slots.get_mut(handle.slot as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        entry.tag.as_mut()
    }

    #[inline]
    pub fn contains(&self, handle: OwnerHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of live tags.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live handles of one kind.
    pub fn handles_of_kind(&self, kind: ObjectKind) -> Vec<OwnerHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match &s.tag {
                Some(tag) if tag.kind == kind => Some(OwnerHandle {
                    slot: i as u32,
                    generation: s.generation,
                }),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpacks_every_field() {
        let kinds = [
            ObjectKind::Entity,
            ObjectKind::RoomStatic,
            ObjectKind::StaticMesh,
            ObjectKind::Hair,
            ObjectKind::Misc,
        ];
        let handles = [
            OwnerHandle { slot: 0, generation: 0 },
            OwnerHandle { slot: 42, generation: 7 },
            OwnerHandle { slot: u32::MAX, generation: u32::MAX },
        ];
        for &handle in &handles {
            for &kind in &kinds {
                for part in [0u16, 3, u16::MAX] {
                    let bits = pack_user_data(handle, kind, part);
                    assert_eq!(bits & RESERVED_MASK, 0);
                    let owner = unpack_user_data(bits).unwrap();
                    assert_eq!(owner, ColliderOwner { handle, kind, part });
                }
            }
        }
    }

    #[test]
    fn pack_places_kind_after_part() {
        let bits = pack_user_data(OwnerHandle { slot: 1, generation: 2 }, ObjectKind::Hair, 3);
        assert_eq!(bits, 1 | (2u128 << 32) | (3u128 << 64) | (4u128 << 80));
    }

    #[test]
    fn zero_unknown_and_reserved_bits_do_not_decode() {
        assert_eq!(unpack_user_data(0), None);
        assert_eq!(unpack_user_data(200u128 << KIND_SHIFT), None);
        let good = pack_user_data(OwnerHandle { slot: 1, generation: 0 }, ObjectKind::Entity, 0);
        assert_eq!(unpack_user_data(good | (1u128 << 100)), None);
    }

    #[test]
    fn released_tag_resolves_to_nothing_even_after_slot_reuse() {
        let mut table = OwnerTable::new();
        let a = table.insert(OwnerTag::new(ObjectKind::Entity, None, CollisionGroup::Kinematic));
        assert!(table.contains(a));
        assert!(table.release(a).is_some());
        assert!(table.get(a).is_none());
        assert!(table.release(a).is_none());

        let b = table.insert(OwnerTag::new(ObjectKind::Misc, None, CollisionGroup::Dynamics));
        assert_eq!(b.slot, a.slot);
        assert_ne!(b.generation, a.generation);
        assert!(table.get(a).is_none());
        assert_eq!(table.get(b).map(|t| t.kind), Some(ObjectKind::Misc));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn handles_of_kind_lists_live_tags_only() {
        let mut table = OwnerTable::new();
        let r0 = table.insert(OwnerTag::new(ObjectKind::RoomStatic, Some(RoomId(0)), CollisionGroup::StaticRoom));
        let _e = table.insert(OwnerTag::new(ObjectKind::Entity, None, CollisionGroup::Kinematic));
        let r1 = table.insert(OwnerTag::new(ObjectKind::RoomStatic, Some(RoomId(1)), CollisionGroup::StaticRoom));
        table.release(r0);
        assert_eq!(table.handles_of_kind(ObjectKind::RoomStatic), vec![r1]);
    }
}
