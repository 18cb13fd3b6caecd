//! Ghost proxies: non-simulated copies of an entity's bone volumes used to
//! measure how far the entity intrudes into the world.
//!
//! A ghost is a parentless sensor collider that never generates contacts on
//! its own. It follows its bone (or, while the bone is simulated, its body)
//! and is queried explicitly through [`EntityPhysics::query_penetrations`] and
//! [`EntityPhysics::penetration_fix`].

use nalgebra::{Isometry3, Point3, Translation3, Vector3};
use rapier3d::{
    parry::query::{ContactManifold as ParryManifold, DefaultQueryDispatcher, PersistentQueryDispatcher},
    prelude::*,
};

use crate::{
    bitmask_flags::CollisionMask,
    constants::DETACHED_GHOST_RADIUS,
    contact::{CollisionList, CollisionNode, NodeArena},
    entity::EntityPhysics,
    factory::{ProxyShape, RigidBodyFactory, ShapeSpec},
    filter::CollisionFilter,
    owner::{OwnerHandle, unpack_user_data},
    world::{PhysicsWorld, QuerySource},
};

#[derive(Clone, Debug)]
pub struct GhostProxy {
    pub bone: usize,
    pub collider: ColliderHandle,
    /// Bone origin to shape origin.
    pub offset: Vector3<f32>,
    /// Detached ghosts (shape `None`) are disabled and skipped by queries.
    pub attached: bool,
    /// The bone's own body collider; never reported as a hit.
    pub paired: Option<ColliderHandle>,
    /// Last bone pose the ghost was placed at.
    pub base: Isometry3<f32>,
}

impl GhostProxy {
    /// Build the ghost of one bone. Without a shape the ghost starts detached:
    /// its collider exists (so a later shape override reuses it) but stays
    /// disabled.
    pub(crate) fn create(
        world: &mut PhysicsWorld,
        user_data: u128,
        bone: usize,
        shape: Option<ProxyShape>,
        pose: Isometry3<f32>,
        paired: Option<ColliderHandle>,
        enabled: bool,
    ) -> Self {
        let attached = shape.is_some();
        let (shape, offset) = match shape {
            Some(proxy) => (proxy.shape, proxy.offset),
            None => (SharedShape::ball(DETACHED_GHOST_RADIUS), Vector3::zeros()),
        };
        let mut co = ColliderBuilder::new(shape)
            .sensor(true)
            .active_collision_types(ActiveCollisionTypes::empty())
            .density(0.0)
            .user_data(user_data)
            .build();
        co.set_position(pose * Translation3::from(offset));
        co.set_enabled(enabled && attached);
        let collider = world.insert_collider(co, None);
        Self {
            bone,
            collider,
            offset,
            attached,
            paired,
            base: pose,
        }
    }

    /// Place the ghost for a bone pose.
    pub(crate) fn set_pose(&mut self, world: &mut PhysicsWorld, pose: Isometry3<f32>) {
        self.base = pose;
        if let Some(co) = world.colliders.get_mut(self.collider) {
            co.set_position(pose * Translation3::from(self.offset));
        }
    }

    /// Swap the ghost's shape. `None` detaches the ghost; a shape re-attaches it.
    pub(crate) fn reshape(&mut self, world: &mut PhysicsWorld, shape: Option<ProxyShape>, collision_enabled: bool) -> bool {
        let Some(co) = world.colliders.get_mut(self.collider) else {
            return false;
        };
        match shape {
            None => {
                co.set_enabled(false);
                self.attached = false;
            }
            Some(shape) => {
                co.set_shape(shape.shape);
                self.offset = shape.offset;
                co.set_position(self.base * Translation3::from(self.offset));
                co.set_enabled(collision_enabled);
                self.attached = true;
            }
        }
        true
    }

    /// World pose of the ghost shape.
    pub fn pose(&self) -> Isometry3<f32> {
        self.base * Translation3::from(self.offset)
    }
}

/// Gather the penetrating contacts of one ghost, shifted by `shift`, into `arena`.
fn collect_ghost_contacts(
    world: &PhysicsWorld,
    owner: OwnerHandle,
    ghost: &GhostProxy,
    mask: CollisionMask,
    shift: Vector3<f32>,
    arena: &mut NodeArena,
) -> usize {
    let Some(co) = world.collider(ghost.collider) else {
        return 0;
    };
    let pos = Translation3::from(shift) * co.position();
    let origin = world.query_origin(
        QuerySource::owned(owner, mask),
        Point3::from(pos.translation.vector),
    );
    let filter = CollisionFilter::new(world.rooms(), world.owners());
    let bodies = &world.bodies;
    let predicate = |h: ColliderHandle, other: &Collider| {
        Some(h) != ghost.paired
            && filter
                .resolve(other, bodies)
                .is_some_and(|proxy| filter.accept_hit(&origin, &proxy))
    };
    let pipeline = world.as_query_pipeline(QueryFilter::default().exclude_sensors().predicate(&predicate));

    let dispatcher = DefaultQueryDispatcher;
    let mut manifolds: Vec<ParryManifold<(), ()>> = Vec::new();
    let mut found = 0;
    for (h, other) in pipeline.intersect_aabb_conservative(co.shape().compute_aabb(&pos)) {
        if other.is_sensor() || !predicate(h, other) {
            continue;
        }
        manifolds.clear();
        let pos12 = pos.inv_mul(other.position());
        if dispatcher
            .contact_manifolds(&pos12, co.shape(), other.shape(), 0.0, &mut manifolds, &mut None)
            .is_err()
        {
            log::debug!("Unsupported shape pair in ghost query");
            continue;
        }
        let other_owner = unpack_user_data(other.user_data);
        for manifold in &manifolds {
            let outward = pos * manifold.local_n1;
            for point in manifold.points.iter().filter(|p| p.dist < 0.0) {
                arena.push(CollisionNode {
                    other: other_owner,
                    self_part: ghost.bone as u16,
                    other_part: other_owner.map_or(0, |o| o.part),
                    point: pos * point.local_p1,
                    normal: -outward,
                    depth: -point.dist,
                });
                found += 1;
            }
        }
    }
    found
}

impl EntityPhysics {
    fn attached_ghosts(&self) -> Vec<ColliderHandle> {
        self.ghosts.iter().filter(|g| g.attached).map(|g| g.collider).collect()
    }

    /// Override one bone's ghost shape. `None` detaches the ghost.
    pub fn set_ghost_shape(&mut self, world: &mut PhysicsWorld, bone: usize, spec: Option<&ShapeSpec>) -> bool {
        let enabled = self.collision_enabled;
        let Some(ghost) = self.ghosts.get_mut(bone) else {
            log::warn!("set_ghost_shape: bone {} has no ghost", bone);
            return false;
        };
        let shape = match spec {
            Some(spec) => match RigidBodyFactory::shape_from_spec(spec, false) {
                Some(shape) => Some(shape),
                None => {
                    log::warn!("set_ghost_shape: degenerate shape for bone {}", bone);
                    return false;
                }
            },
            None => None,
        };
        ghost.reshape(world, shape, enabled)
    }

    /// All penetrating contacts of the entity's ghosts against the world.
    ///
    /// Hits are filtered like any query issued by this entity, restricted to
    /// `mask`. Each ghost skips its own body. The arena is reset first.
    pub fn query_penetrations<'a>(
        &self,
        world: &mut PhysicsWorld,
        mask: CollisionMask,
        arena: &'a mut NodeArena,
    ) -> CollisionList<'a> {
        arena.reset();
        if self.collision_enabled {
            world.refresh_colliders(&self.attached_ghosts());
            for ghost in self.ghosts.iter().filter(|g| g.attached) {
                collect_ghost_contacts(world, self.owner, ghost, mask, Vector3::zeros(), arena);
            }
        }
        arena.as_list()
    }

    /// Resolve the entity's penetrations ghost by ghost, in bone order.
    ///
    /// Each ghost is tested offset by the correction accumulated so far, so a
    /// push found for the pelvis is already applied when the legs are tested.
    /// Returns the number of contacts used and the total correction. Nothing is
    /// moved; the caller applies the correction to the entity.
    pub fn penetration_fix(
        &self,
        world: &mut PhysicsWorld,
        mask: CollisionMask,
        arena: &mut NodeArena,
    ) -> (usize, Vector3<f32>) {
        arena.reset();
        let mut correction = Vector3::zeros();
        let mut count = 0;
        if !self.collision_enabled {
            return (count, correction);
        }
        world.refresh_colliders(&self.attached_ghosts());
        for ghost in self.ghosts.iter().filter(|g| g.attached) {
            let start = arena.len();
            let found = collect_ghost_contacts(world, self.owner, ghost, mask, correction, arena);
            if found == 0 {
                continue;
            }
            let delta: Vector3<f32> = arena.since(start).iter().map(CollisionNode::correction).sum();
            correction += delta;
            count += found;
        }
        (count, correction)
    }
}
