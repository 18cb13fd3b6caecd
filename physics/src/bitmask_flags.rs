use num_traits::{One, PrimInt};

/// Trait implemented by flag enums.
///
/// The enum's discriminant (via `#[repr(u8)]`) determines the bit index.
/// The backing integer type is chosen via the associated `Storage`.
pub trait FlagBitmask {
    type Storage: PrimInt;

    fn bit_index(&self) -> u8;

    fn mask(&self) -> Self::Storage {
        // NOTE: `bit_index()` must be < number of bits in `Storage`.
        Self::Storage::one() << (self.bit_index() as usize)
    }
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitmaskFlags<T: PrimInt> {
    pub bits: T,
}

impl<T: PrimInt> BitmaskFlags<T> {
    pub const fn new(bits: T) -> Self {
        Self { bits }
    }

    /// Every bit set.
    pub fn all() -> Self {
        Self { bits: !T::zero() }
    }

    pub fn from_tags<U: FlagBitmask<Storage = T> + Copy>(tags: &[U]) -> Self {
        let mut flags = Self::new(T::zero());
        flags.add_many(tags);
        flags
    }

    pub fn add<U: FlagBitmask<Storage = T>>(&mut self, tag: U) {
        self.bits = self.bits | tag.mask();
    }

    pub fn remove<U: FlagBitmask<Storage = T>>(&mut self, tag: U) {
        self.bits = self.bits & !tag.mask();
    }

    pub fn has<U: FlagBitmask<Storage = T>>(&self, tag: U) -> bool {
        (self.bits & tag.mask()) != T::zero()
    }

    pub fn add_many<U: FlagBitmask<Storage = T> + Copy>(&mut self, tags: &[U]) {
        for &tag in tags {
            self.add(tag);
        }
    }

    pub fn has_any<U: FlagBitmask<Storage = T> + Copy>(&self, tags: &[U]) -> bool {
        let combined = tags.iter().fold(T::zero(), |acc, t| acc | t.mask());
        (self.bits & combined) != T::zero()
    }

    /// Do the two bitmasks share at least one bit?
    #[inline]
    pub fn intersects(&self, other: Self) -> bool {
        (self.bits & other.bits) != T::zero()
    }

    pub fn is_empty(&self) -> bool {
        self.bits == T::zero()
    }
}

/// Declare a bitmask-backed enum and implement `FlagBitmask` for it.
#[macro_export]
macro_rules! define_bitmask_flags {
    ($(#[$meta:meta])* $name:ident, $storage:ty, { $($variant:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($variant),*
        }

        impl $crate::bitmask_flags::FlagBitmask for $name {
            type Storage = $storage;

            fn bit_index(&self) -> u8 {
                *self as u8
            }
        }
    };
}

define_bitmask_flags!(
    /// Collision categories. An object belongs to one or more categories and
    /// carries a mask of the categories it wants to touch.
    CollisionGroup, u16, {
    StaticRoom,
    StaticObject,
    Kinematic,
    Characters,
    Triggers,
    Dynamics,
    DynamicsNoInteraction,
    Camera,
});

/// Category set or interaction mask, see [`CollisionGroup`].
pub type CollisionMask = BitmaskFlags<u16>;

impl CollisionGroup {
    #[inline]
    pub fn flags(self) -> CollisionMask {
        CollisionMask::from_tags(&[self])
    }

    /// Interaction mask an object of this category gets unless told otherwise.
    pub fn default_mask(self) -> CollisionMask {
        match self {
            CollisionGroup::Triggers => {
                let mut m = CollisionMask::all();
                m.remove(CollisionGroup::Triggers);
                m
            }
            CollisionGroup::DynamicsNoInteraction => CollisionMask::from_tags(&[
                CollisionGroup::StaticRoom,
                CollisionGroup::StaticObject,
                CollisionGroup::Kinematic,
                CollisionGroup::Characters,
            ]),
            CollisionGroup::Camera => CollisionMask::from_tags(&[
                CollisionGroup::StaticRoom,
                CollisionGroup::StaticObject,
            ]),
            _ => CollisionMask::all(),
        }
    }
}

impl From<CollisionGroup> for CollisionMask {
    fn from(group: CollisionGroup) -> Self {
        group.flags()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_map_to_distinct_bits() {
        assert_eq!(CollisionGroup::StaticRoom.mask(), 1);
        assert_eq!(CollisionGroup::Characters.mask(), 1 << 3);
        assert_eq!(CollisionGroup::Camera.mask(), 1 << 7);
    }

    #[test]
    fn mask_operations() {
        let mut m = CollisionMask::from_tags(&[CollisionGroup::StaticRoom, CollisionGroup::Kinematic]);
        assert!(m.has(CollisionGroup::Kinematic));
        assert!(!m.has(CollisionGroup::Triggers));
        assert!(m.has_any(&[CollisionGroup::Triggers, CollisionGroup::StaticRoom]));

        m.remove(CollisionGroup::StaticRoom);
        assert!(!m.intersects(CollisionGroup::StaticRoom.flags()));
        assert!(m.intersects(CollisionMask::all()));

        m.remove(CollisionGroup::Kinematic);
        assert!(m.is_empty());
    }
}
