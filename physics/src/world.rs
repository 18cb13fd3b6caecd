//! The collision world: owns the dynamics backend and the loaded level.
//!
//! There is exactly one `PhysicsWorld` per running game. It is passed
//! explicitly to every operation that touches bodies; entity-side state
//! ([`crate::EntityPhysics`]) only stores handles into it.
//!
//! Per-frame order expected from the host:
//! 1. write animated bone transforms into kinematic bodies and ghosts,
//! 2. [`PhysicsWorld::step_simulation`],
//! 3. read dynamic (ragdoll, hair) transforms back,
//! 4. run penetration queries and fixes.

use level::{RoomId, RoomSet};
use nalgebra::{Isometry3, Point3, Vector3};
use rapier3d::{
    parry::{query::ShapeCastOptions, shape::Ball},
    prelude::*,
};

use crate::{
    bitmask_flags::{CollisionGroup, CollisionMask},
    debug_draw::{COLOR_CONTACT, DebugDrawSink, SinkBackend},
    factory::RigidBodyFactory,
    filter::{CollisionFilter, QueryOrigin},
    owner::{ColliderOwner, ObjectKind, OwnerHandle, OwnerTable, OwnerTag, pack_user_data, unpack_user_data},
    settings::WorldSettings,
};

/// Who is asking a ray or sweep query, and what it wants to hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuerySource {
    pub owner: Option<OwnerHandle>,
    pub mask: CollisionMask,
}

impl QuerySource {
    /// Hit everything.
    pub fn any() -> Self {
        Self {
            owner: None,
            mask: CollisionMask::all(),
        }
    }

    pub fn owned(owner: OwnerHandle, mask: CollisionMask) -> Self {
        Self {
            owner: Some(owner),
            mask,
        }
    }
}

/// Closest hit of a ray or sphere sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryHit {
    pub collider: ColliderHandle,
    pub owner: Option<ColliderOwner>,
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
    /// Fraction of the segment travelled before the hit, in `[0, 1]`.
    pub fraction: f32,
}

#[cfg(test)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Removal {
    Joint(ImpulseJointHandle),
    Collider(ColliderHandle),
    Body(RigidBodyHandle),
}

pub struct PhysicsWorld {
    settings: WorldSettings,
    gravity: Vector3<f32>,
    accumulator: f32,

    pub(crate) bodies: RigidBodySet,
    pub(crate) colliders: ColliderSet,
    pub(crate) impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    islands: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    ccd_solver: CCDSolver,
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,

    pub(crate) owners: OwnerTable,
    rooms: RoomSet,
    /// Tags of room geometry and static meshes created by `load_level`.
    level_owners: Vec<OwnerHandle>,

    #[cfg(test)]
    pub(crate) removals: Vec<Removal>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(WorldSettings::default())
    }
}

impl PhysicsWorld {
    pub fn new(settings: WorldSettings) -> Self {
        log::info!(
            "Physics world created (gravity {:?}, fixed step {:.4}s)",
            settings.gravity,
            settings.fixed_timestep
        );
        Self {
            settings,
            gravity: settings.gravity,
            accumulator: 0.0,
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            pipeline: PhysicsPipeline::new(),
            integration_parameters: IntegrationParameters {
                dt: settings.fixed_timestep,
                ..IntegrationParameters::default()
            },
            owners: OwnerTable::new(),
            rooms: RoomSet::default(),
            level_owners: Vec::new(),
            #[cfg(test)]
            removals: Vec::new(),
        }
    }

    #[inline]
    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    #[inline]
    pub fn gravity(&self) -> Vector3<f32> {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vector3<f32>) {
        self.gravity = gravity;
        for (_, body) in self.bodies.iter_mut() {
            if body.is_dynamic() {
                body.wake_up(true);
            }
        }
    }

    #[inline]
    pub fn rooms(&self) -> &RoomSet {
        &self.rooms
    }

    #[inline]
    pub fn owners(&self) -> &OwnerTable {
        &self.owners
    }

    /// Register a game object that owns colliders outside of the entity API.
    pub fn register_owner(&mut self, tag: OwnerTag) -> OwnerHandle {
        self.owners.insert(tag)
    }

    /// Release an owner tag. Its colliders are rejected by the filter from now
    /// on and removed by the next [`PhysicsWorld::sweep_orphans`].
    pub fn release_owner(&mut self, owner: OwnerHandle) -> Option<OwnerTag> {
        self.owners.release(owner)
    }

    pub fn set_owner_room(&mut self, owner: OwnerHandle, room: Option<RoomId>) -> bool {
        match self.owners.get_mut(owner) {
            Some(tag) => {
                tag.room = room;
                true
            }
            None => false,
        }
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    pub fn joint_count(&self) -> usize {
        self.impulse_joints.len()
    }

    /// Advance the simulation by a frame delta.
    ///
    /// The delta is clamped (see [`WorldSettings::clamp_frame_dt`]) and consumed
    /// in fixed steps. Returns the number of fixed steps taken.
    pub fn step_simulation(&mut self, dt: f32) -> u32 {
        let dt = self.settings.clamp_frame_dt(dt);
        if dt == 0.0 {
            return 0;
        }
        self.accumulator += dt;

        let step = self.settings.fixed_timestep;
        let mut steps = 0;
        while self.accumulator >= step && steps < self.settings.max_substeps {
            self.step_once();
            self.accumulator -= step;
            steps += 1;
        }
        if steps == self.settings.max_substeps {
            // Drop backlog rather than spiral.
            self.accumulator = self.accumulator.min(step);
        }
        steps
    }

    fn step_once(&mut self) {
        let filter = CollisionFilter::new(&self.rooms, &self.owners);
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &filter,
            &(),
        );
    }

    pub fn as_query_pipeline<'a>(&'a self, filter: QueryFilter<'a>) -> QueryPipeline<'a> {
        self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        )
    }

    /// Push fresh bounds of colliders moved outside of a step (ghosts) into the
    /// broad phase so queries see them.
    pub(crate) fn refresh_colliders(&mut self, handles: &[ColliderHandle]) {
        if handles.is_empty() {
            return;
        }
        let mut events = Vec::new();
        self.broad_phase.update(
            &self.integration_parameters,
            &self.colliders,
            &self.bodies,
            handles,
            &[],
            &mut events,
        );
    }

    pub(crate) fn query_origin(&self, source: QuerySource, position: Point3<f32>) -> QueryOrigin<'_> {
        QueryOrigin {
            owner: source.owner.and_then(|h| self.owners.get(h).map(|tag| (h, tag))),
            mask: source.mask,
            position,
        }
    }

    /// Closest hit along the segment `from -> to`.
    pub fn ray_test(&self, from: Point3<f32>, to: Point3<f32>, source: QuerySource) -> Option<QueryHit> {
        let dir = to - from;
        if dir.norm_squared() <= f32::EPSILON {
            return None;
        }
        let origin = self.query_origin(source, from);
        let filter = CollisionFilter::new(&self.rooms, &self.owners);
        let bodies = &self.bodies;
        let predicate = |_: ColliderHandle, co: &Collider| {
            filter
                .resolve(co, bodies)
                .is_some_and(|proxy| filter.accept_hit(&origin, &proxy))
        };
        let pipeline = self.as_query_pipeline(QueryFilter::default().exclude_sensors().predicate(&predicate));

        let ray = Ray::new(from, dir);
        let (handle, hit) = pipeline.cast_ray_and_get_normal(&ray, 1.0, true)?;
        Some(QueryHit {
            collider: handle,
            owner: self.colliders.get(handle).and_then(|c| unpack_user_data(c.user_data)),
            point: ray.point_at(hit.time_of_impact),
            normal: hit.normal,
            fraction: hit.time_of_impact,
        })
    }

    /// Closest hit of a sphere of `radius` swept along `from -> to`.
    pub fn sphere_sweep_test(
        &self,
        from: Point3<f32>,
        to: Point3<f32>,
        radius: f32,
        source: QuerySource,
    ) -> Option<QueryHit> {
        let dir = to - from;
        if dir.norm_squared() <= f32::EPSILON || !(radius > 0.0) {
            return None;
        }
        let origin = self.query_origin(source, from);
        let filter = CollisionFilter::new(&self.rooms, &self.owners);
        let bodies = &self.bodies;
        let predicate = |_: ColliderHandle, co: &Collider| {
            filter
                .resolve(co, bodies)
                .is_some_and(|proxy| filter.accept_hit(&origin, &proxy))
        };
        let pipeline = self.as_query_pipeline(QueryFilter::default().exclude_sensors().predicate(&predicate));

        let ball = Ball::new(radius);
        let pos = Isometry3::translation(from.x, from.y, from.z);
        let options = ShapeCastOptions {
            max_time_of_impact: 1.0,
            target_distance: 0.0,
            stop_at_penetration: true,
            compute_impact_geometry_on_penetration: true,
        };
        let (handle, hit) = pipeline.cast_shape(&pos, &dir, &ball, options)?;
        Some(QueryHit {
            collider: handle,
            owner: self.colliders.get(handle).and_then(|c| unpack_user_data(c.user_data)),
            point: hit.witness1,
            normal: hit.normal1.into_inner(),
            fraction: hit.time_of_impact,
        })
    }

    pub(crate) fn insert_body(&mut self, body: RigidBody) -> RigidBodyHandle {
        self.bodies.insert(body)
    }

    pub(crate) fn insert_collider(&mut self, collider: Collider, parent: Option<RigidBodyHandle>) -> ColliderHandle {
        match parent {
            Some(parent) => self.colliders.insert_with_parent(collider, parent, &mut self.bodies),
            None => self.colliders.insert(collider),
        }
    }

    pub(crate) fn insert_joint(
        &mut self,
        parent: RigidBodyHandle,
        child: RigidBodyHandle,
        joint: impl Into<GenericJoint>,
    ) -> ImpulseJointHandle {
        self.impulse_joints.insert(parent, child, joint, true)
    }

    pub(crate) fn remove_joint(&mut self, handle: ImpulseJointHandle) {
        if self.impulse_joints.remove(handle, true).is_some() {
            #[cfg(test)]
            self.removals.push(Removal::Joint(handle));
        }
    }

    pub(crate) fn remove_collider(&mut self, handle: ColliderHandle) {
        if self
            .colliders
            .remove(handle, &mut self.islands, &mut self.bodies, true)
            .is_some()
        {
            #[cfg(test)]
            self.removals.push(Removal::Collider(handle));
        }
    }

    /// Detach and free the body's colliders, then free the body.
    pub(crate) fn remove_body(&mut self, handle: RigidBodyHandle) {
        let attached: Vec<ColliderHandle> = match self.bodies.get(handle) {
            Some(body) => body.colliders().to_vec(),
            None => return,
        };
        for co in attached {
            self.remove_collider(co);
        }
        if self
            .bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
        {
            #[cfg(test)]
            self.removals.push(Removal::Body(handle));
        }
    }

    /// Remove every body and collider whose owner tag was released.
    ///
    /// Returns the number of removed bodies plus free-standing colliders.
    pub fn sweep_orphans(&mut self) -> usize {
        let (bodies, colliders) = {
            let owners = &self.owners;
            let orphan = |bits: u128| unpack_user_data(bits).is_some_and(|o| !owners.contains(o.handle));
            let bodies: Vec<RigidBodyHandle> = self
                .bodies
                .iter()
                .filter(|(_, b)| orphan(b.user_data))
                .map(|(h, _)| h)
                .collect();
            let colliders: Vec<ColliderHandle> = self
                .colliders
                .iter()
                .filter(|(_, c)| orphan(c.user_data) && c.parent().is_none_or(|p| !bodies.contains(&p)))
                .map(|(h, _)| h)
                .collect();
            (bodies, colliders)
        };
        let removed = bodies.len() + colliders.len();
        for h in colliders {
            self.remove_collider(h);
        }
        for h in bodies {
            self.remove_body(h);
        }
        if removed > 0 {
            log::debug!("Swept {} orphaned collision objects", removed);
        }
        removed
    }

    /// Take ownership of a level and build its static collision.
    ///
    /// Every room gets one fixed body holding its heightmap; every colliding
    /// static mesh gets its own fixed body. The new colliders are pushed into
    /// the broad phase right away, so queries see the level before the first
    /// step. Returns the number of bodies built.
    pub fn load_level(&mut self, rooms: RoomSet) -> usize {
        self.clear_level();
        let mut inserted = Vec::new();
        for room in rooms.iter() {
            let owner = self.owners.insert(OwnerTag::new(
                ObjectKind::RoomStatic,
                Some(room.id),
                CollisionGroup::StaticRoom,
            ));
            self.level_owners.push(owner);
            match RigidBodyFactory::heightmap_shape(room) {
                Some(shape) => {
                    let bits = pack_user_data(owner, ObjectKind::RoomStatic, 0);
                    let body = self.insert_body(RigidBodyBuilder::fixed().user_data(bits).build());
                    let co = RigidBodyFactory::collider(shape, Vector3::zeros(), bits).build();
                    inserted.push(self.insert_collider(co, Some(body)));
                }
                None => log::warn!("Room {:?} has no collision geometry", room.id),
            }

            for (i, instance) in room.static_meshes.iter().enumerate() {
                if !instance.has_collision {
                    continue;
                }
                let Some(proxy) = RigidBodyFactory::mesh_shape(&instance.mesh, false, true) else {
                    log::warn!("Static mesh {} in room {:?} has no usable triangles", i, room.id);
                    continue;
                };
                let owner = self.owners.insert(OwnerTag::new(
                    ObjectKind::StaticMesh,
                    Some(room.id),
                    CollisionGroup::StaticObject,
                ));
                self.level_owners.push(owner);
                let bits = pack_user_data(owner, ObjectKind::StaticMesh, i as u16);
                let body = self.insert_body(RigidBodyBuilder::fixed().pose(instance.pose).user_data(bits).build());
                let co = RigidBodyFactory::collider(proxy.shape, proxy.offset, bits).build();
                inserted.push(self.insert_collider(co, Some(body)));
            }
        }
        self.refresh_colliders(&inserted);
        log::info!("Level loaded: {} rooms, {} static bodies", rooms.len(), inserted.len());
        self.rooms = rooms;
        inserted.len()
    }

    /// Drop the level's static collision and forget the rooms.
    pub fn clear_level(&mut self) {
        for owner in std::mem::take(&mut self.level_owners) {
            self.owners.release(owner);
        }
        self.sweep_orphans();
        self.rooms = RoomSet::default();
    }

    /// Walk the world and forward collider outlines, joints and contact
    /// points to `sink`.
    pub fn debug_draw(&self, sink: &mut dyn DebugDrawSink) {
        let mut pipeline = DebugRenderPipeline::new(
            DebugRenderStyle::default(),
            DebugRenderMode::COLLIDER_SHAPES | DebugRenderMode::IMPULSE_JOINTS,
        );
        let mut backend = SinkBackend {
            sink: &mut *sink,
            bodies: &self.bodies,
        };
        pipeline.render(
            &mut backend,
            &self.bodies,
            &self.colliders,
            &self.impulse_joints,
            &self.multibody_joints,
            &self.narrow_phase,
        );
        for pair in self.narrow_phase.contact_pairs() {
            let Some(co1) = self.colliders.get(pair.collider1) else {
                continue;
            };
            for manifold in &pair.manifolds {
                for point in &manifold.points {
                    sink.draw_contact_point(co1.position() * point.local_p1, manifold.data.normal, point.dist, COLOR_CONTACT);
                }
            }
        }
    }
}
