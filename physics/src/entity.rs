//! Per-entity collision state: one body per bone, one ghost per body.
//!
//! `EntityPhysics` is owned by the game entity and holds only handles into
//! the [`PhysicsWorld`]; every operation takes the world explicitly. The
//! scripting-facing setters validate their indices, log a warning and return
//! `false` on bad input instead of failing.

use level::{BoneDesc, RoomId, Skeleton};
use nalgebra::{Isometry3, Point3, Vector3};
use rapier3d::prelude::*;

use crate::{
    bitmask_flags::{CollisionGroup, CollisionMask},
    error::PhysicsError,
    factory::{RigidBodyFactory, ShapeSpec},
    ghost::GhostProxy,
    hair::HairChain,
    owner::{ObjectKind, OwnerHandle, OwnerTag, pack_user_data},
    world::PhysicsWorld,
};

/// How an entity's collision volume is derived from its model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShapeMode {
    /// One box per bone from the bone's bounding box.
    #[default]
    PerBoneBox,
    /// One sphere per bone from the bone's bounding sphere.
    PerBoneSphere,
    /// One shape per bone from the bone mesh (falls back to the box).
    PerBoneMesh,
    /// A single box around the whole model, attached to the root bone.
    SingleBox,
    /// A single sphere around the whole model, attached to the root bone.
    SingleSphere,
}

impl ShapeMode {
    #[inline]
    pub fn is_simplified(self) -> bool {
        matches!(self, ShapeMode::SingleBox | ShapeMode::SingleSphere)
    }
}

/// How an entity's bodies take part in the simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollisionType {
    /// Bodies exist but their colliders start disabled.
    None,
    /// Fixed bodies (doors, platforms that never move on their own).
    Static,
    /// Animation-driven bodies.
    #[default]
    Kinematic,
    /// Animation-driven character.
    Actor,
    /// Kinematic until a bone is given mass, then simulated.
    Dynamic,
}

/// Everything needed to build an entity's collision.
#[derive(Clone, Debug)]
pub struct EntityDesc<'a> {
    pub skeleton: &'a Skeleton,
    /// Model-to-world transform; bones start in bind pose relative to it.
    pub transform: Isometry3<f32>,
    pub room: Option<RoomId>,
    pub group: CollisionGroup,
    /// Interaction mask, defaults to the group's.
    pub mask: Option<CollisionMask>,
    pub shape_mode: ShapeMode,
    pub collision_type: CollisionType,
    pub heavy: bool,
}

impl<'a> EntityDesc<'a> {
    pub fn new(skeleton: &'a Skeleton, transform: Isometry3<f32>) -> Self {
        Self {
            skeleton,
            transform,
            room: None,
            group: CollisionGroup::Kinematic,
            mask: None,
            shape_mode: ShapeMode::default(),
            collision_type: CollisionType::default(),
            heavy: false,
        }
    }
}

/// Body of one bone.
#[derive(Clone, Debug)]
pub struct PhysicsBody {
    pub bone: usize,
    pub body: RigidBodyHandle,
    /// `None` when the bone has no usable volume.
    pub collider: Option<ColliderHandle>,
    pub mass: f32,
}

impl PhysicsBody {
    #[inline]
    pub fn has_collision(&self) -> bool {
        self.collider.is_some()
    }
}

/// Skeleton data kept for ragdoll joints and CCD sizing.
#[derive(Clone, Debug)]
pub(crate) struct BoneLink {
    pub parent: Option<usize>,
    pub local: Isometry3<f32>,
    pub radius: f32,
}

/// Ragdoll mode of an entity's bodies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RagdollState {
    #[default]
    Kinematic,
    Dynamic,
}

#[derive(Debug)]
pub struct EntityPhysics {
    pub(crate) owner: OwnerHandle,
    pub(crate) collision_type: CollisionType,
    pub(crate) shape_mode: ShapeMode,
    pub(crate) bones: Vec<BoneLink>,
    pub(crate) bodies: Vec<PhysicsBody>,
    pub(crate) ghosts: Vec<GhostProxy>,
    pub(crate) collision_enabled: bool,
    pub(crate) ragdoll_state: RagdollState,
    pub(crate) ragdoll_joints: Vec<ImpulseJointHandle>,
    pub(crate) hair: Vec<HairChain>,
}

fn shape_spec(mode: ShapeMode, bone: &BoneDesc, skeleton: &Skeleton) -> ShapeSpec {
    let boxed = |b: &BoneDesc| ShapeSpec::Box {
        min: b.bb_min,
        max: b.bb_max,
    };
    match mode {
        ShapeMode::PerBoneBox => boxed(bone),
        ShapeMode::PerBoneSphere => ShapeSpec::Sphere {
            centre: bone.centre,
            radius: bone.radius,
        },
        ShapeMode::PerBoneMesh => match &bone.mesh {
            Some(mesh) => ShapeSpec::Mesh {
                mesh: mesh.clone(),
                convex_only: false,
            },
            None => boxed(bone),
        },
        ShapeMode::SingleBox => ShapeSpec::Box {
            min: skeleton.bb_min,
            max: skeleton.bb_max,
        },
        ShapeMode::SingleSphere => ShapeSpec::Sphere {
            centre: nalgebra::center(&skeleton.bb_min, &skeleton.bb_max),
            radius: (skeleton.bb_max - skeleton.bb_min).norm() * 0.5,
        },
    }
}

impl EntityPhysics {
    /// Build bodies and ghosts for an entity.
    ///
    /// Bones without a usable volume still get a body (so joints can attach)
    /// and a detached ghost, but no collider. `ghosts[i]` belongs to `bodies[i]`.
    pub fn create(world: &mut PhysicsWorld, desc: &EntityDesc) -> Result<Self, PhysicsError> {
        let skeleton = desc.skeleton;
        if skeleton.bone_count() == 0 {
            return Err(PhysicsError::NoSuchBone { bone: 0, bone_count: 0 });
        }
        if skeleton.bone_count() > u16::MAX as usize {
            return Err(PhysicsError::TooManyBodies {
                bodies: skeleton.bone_count(),
                bone_count: u16::MAX as usize,
            });
        }

        let mut tag = OwnerTag::new(ObjectKind::Entity, desc.room, desc.group);
        if let Some(mask) = desc.mask {
            tag.mask = mask;
        }
        tag.heavy = desc.heavy;
        let owner = world.register_owner(tag);

        let is_static = desc.collision_type == CollisionType::Static;
        let enabled = desc.collision_type != CollisionType::None;
        let poses: Vec<Isometry3<f32>> = skeleton.bind_pose().iter().map(|p| desc.transform * p).collect();
        let body_bones = if desc.shape_mode.is_simplified() {
            1
        } else {
            skeleton.bone_count()
        };

        let mut bodies = Vec::with_capacity(body_bones);
        let mut ghosts = Vec::with_capacity(body_bones);
        for (i, bone) in skeleton.bones.iter().enumerate().take(body_bones) {
            let bits = pack_user_data(owner, ObjectKind::Entity, i as u16);
            let builder = if is_static {
                RigidBodyBuilder::fixed()
            } else {
                RigidBodyBuilder::kinematic_position_based()
            };
            let body = world.insert_body(builder.pose(poses[i]).user_data(bits).build());

            let spec = shape_spec(desc.shape_mode, bone, skeleton);
            let proxy = RigidBodyFactory::shape_from_spec(&spec, is_static);
            let collider = proxy.as_ref().map(|p| {
                let mut co = RigidBodyFactory::collider(p.shape.clone(), p.offset, bits).build();
                co.set_enabled(enabled);
                world.insert_collider(co, Some(body))
            });
            if collider.is_none() {
                log::debug!("Bone {} has no collision volume", i);
            }

            // Ghosts always use convex shapes.
            let ghost_shape = RigidBodyFactory::shape_from_spec(&spec, false);
            ghosts.push(GhostProxy::create(world, bits, i, ghost_shape, poses[i], collider, enabled));

            bodies.push(PhysicsBody {
                bone: i,
                body,
                collider,
                mass: 0.0,
            });
        }

        let bones = skeleton
            .bones
            .iter()
            .map(|b| BoneLink {
                parent: b.parent,
                local: b.local,
                radius: b.radius,
            })
            .collect();

        let inserted: Vec<ColliderHandle> = bodies
            .iter()
            .filter_map(|pb: &PhysicsBody| pb.collider)
            .chain(ghosts.iter().map(|g: &GhostProxy| g.collider))
            .collect();
        world.refresh_colliders(&inserted);

        log::debug!(
            "Entity collision built: {} bodies, {} ghosts ({:?}, {:?})",
            bodies.len(),
            ghosts.len(),
            desc.shape_mode,
            desc.collision_type
        );
        Ok(Self {
            owner,
            collision_type: desc.collision_type,
            shape_mode: desc.shape_mode,
            bones,
            bodies,
            ghosts,
            collision_enabled: enabled,
            ragdoll_state: RagdollState::Kinematic,
            ragdoll_joints: Vec::new(),
            hair: Vec::new(),
        })
    }

    /// Tear everything down: hair, ragdoll joints, ghosts, bodies, then the tag.
    pub fn destroy(mut self, world: &mut PhysicsWorld) {
        self.delete_hair(world);
        for joint in std::mem::take(&mut self.ragdoll_joints) {
            world.remove_joint(joint);
        }
        for ghost in self.ghosts.drain(..) {
            world.remove_collider(ghost.collider);
        }
        for body in self.bodies.drain(..) {
            world.remove_body(body.body);
        }
        world.release_owner(self.owner);
    }

    #[inline]
    pub fn owner(&self) -> OwnerHandle {
        self.owner
    }

    #[inline]
    pub fn collision_type(&self) -> CollisionType {
        self.collision_type
    }

    #[inline]
    pub fn shape_mode(&self) -> ShapeMode {
        self.shape_mode
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn bodies(&self) -> &[PhysicsBody] {
        &self.bodies
    }

    pub fn body(&self, bone: usize) -> Option<&PhysicsBody> {
        self.bodies.get(bone)
    }

    pub fn ghosts(&self) -> &[GhostProxy] {
        &self.ghosts
    }

    #[inline]
    pub fn ragdoll_state(&self) -> RagdollState {
        self.ragdoll_state
    }

    #[inline]
    pub fn is_collision_enabled(&self) -> bool {
        self.collision_enabled
    }

    pub(crate) fn checked_body(&self, bone: usize, op: &str) -> Option<&PhysicsBody> {
        let body = self.bodies.get(bone);
        if body.is_none() {
            log::warn!("{}: bone {} out of range ({} bodies)", op, bone, self.bodies.len());
        }
        body
    }

    pub fn set_room(&self, world: &mut PhysicsWorld, room: Option<RoomId>) -> bool {
        let ok = world.set_owner_room(self.owner, room);
        for chain in &self.hair {
            world.set_owner_room(chain.owner(), room);
        }
        ok
    }

    pub fn set_collision_enabled(&mut self, world: &mut PhysicsWorld, enabled: bool) {
        self.collision_enabled = enabled;
        for body in &self.bodies {
            if let Some(co) = body.collider.and_then(|h| world.colliders.get_mut(h)) {
                co.set_enabled(enabled);
            }
        }
        for ghost in &self.ghosts {
            if let Some(co) = world.colliders.get_mut(ghost.collider) {
                co.set_enabled(enabled && ghost.attached);
            }
        }
    }

    pub fn set_collision_group(&self, world: &mut PhysicsWorld, group: CollisionMask) -> bool {
        match world.owners.get_mut(self.owner) {
            Some(tag) => {
                tag.group = group;
                true
            }
            None => {
                log::warn!("set_collision_group: entity tag is not live");
                false
            }
        }
    }

    pub fn set_collision_mask(&self, world: &mut PhysicsWorld, mask: CollisionMask) -> bool {
        match world.owners.get_mut(self.owner) {
            Some(tag) => {
                tag.mask = mask;
                true
            }
            None => {
                log::warn!("set_collision_mask: entity tag is not live");
                false
            }
        }
    }

    pub fn set_heavy(&self, world: &mut PhysicsWorld, heavy: bool) -> bool {
        match world.owners.get_mut(self.owner) {
            Some(tag) => {
                tag.heavy = heavy;
                true
            }
            None => false,
        }
    }

    /// Replace the collision shape of one bone's body; the ghost's shape is set separately with [`EntityPhysics::set_ghost_shape`].
    pub fn set_collision_shape(&mut self, world: &mut PhysicsWorld, bone: usize, spec: &ShapeSpec) -> bool {
        let Some(pb) = self.checked_body(bone, "set_collision_shape").cloned() else {
            return false;
        };
        let is_static = world.body(pb.body).is_some_and(|b| b.is_fixed());
        let Some(proxy) = RigidBodyFactory::shape_from_spec(spec, is_static) else {
            log::warn!("set_collision_shape: degenerate shape for bone {}", bone);
            return false;
        };
        match pb.collider.and_then(|h| world.colliders.get_mut(h)) {
            Some(co) => {
                co.set_shape(proxy.shape);
                let o = proxy.offset;
                co.set_position_wrt_parent(Isometry3::translation(o.x, o.y, o.z));
            }
            None => {
                let bits = pack_user_data(self.owner, ObjectKind::Entity, bone as u16);
                let mut co = RigidBodyFactory::collider(proxy.shape, proxy.offset, bits).build();
                co.set_enabled(self.collision_enabled);
                let handle = world.insert_collider(co, Some(pb.body));
                self.bodies[bone].collider = Some(handle);
                if let Some(ghost) = self.ghosts.get_mut(bone) {
                    ghost.paired = Some(handle);
                }
                world.refresh_colliders(&[handle]);
            }
        }
        true
    }

    /// Give a bone mass (making it simulated) or take it away (back to kinematic).
    pub fn set_body_mass(&mut self, world: &mut PhysicsWorld, bone: usize, mass: f32) -> bool {
        let Some(pb) = self.checked_body(bone, "set_body_mass").cloned() else {
            return false;
        };
        if !(mass >= 0.0) {
            log::warn!("set_body_mass: invalid mass {} for bone {}", mass, bone);
            return false;
        }
        if self.collision_type == CollisionType::Static {
            log::warn!("set_body_mass: static entities cannot take mass");
            return false;
        }
        let body_type = if mass > 0.0 {
            RigidBodyType::Dynamic
        } else {
            RigidBodyType::KinematicPositionBased
        };
        apply_mass(world, &pb, mass, body_type);
        self.bodies[bone].mass = mass;
        true
    }

    /// Set a body's linear velocity (simulated bodies only).
    pub fn push_body(&self, world: &mut PhysicsWorld, bone: usize, velocity: Vector3<f32>) -> bool {
        let Some(pb) = self.checked_body(bone, "push_body") else {
            return false;
        };
        match world.bodies.get_mut(pb.body) {
            Some(body) if body.is_dynamic() => {
                body.set_linvel(velocity, true);
                true
            }
            Some(_) => {
                log::warn!("push_body: bone {} is not simulated", bone);
                false
            }
            None => false,
        }
    }

    /// Lock translation on every axis whose factor is zero.
    pub fn set_linear_factor(&self, world: &mut PhysicsWorld, bone: usize, factor: Vector3<f32>) -> bool {
        let Some(pb) = self.checked_body(bone, "set_linear_factor") else {
            return false;
        };
        match world.bodies.get_mut(pb.body) {
            Some(body) => {
                body.set_enabled_translations(factor.x != 0.0, factor.y != 0.0, factor.z != 0.0, true);
                true
            }
            None => false,
        }
    }

    /// Current world transform of a bone's body.
    pub fn body_transform(&self, world: &PhysicsWorld, bone: usize) -> Option<Isometry3<f32>> {
        let pb = self.bodies.get(bone)?;
        world.body(pb.body).map(|b| *b.position())
    }

    /// Move one body (and its ghost) to a world transform.
    pub fn set_body_transform(&mut self, world: &mut PhysicsWorld, bone: usize, pose: Isometry3<f32>) -> bool {
        let Some(pb) = self.checked_body(bone, "set_body_transform") else {
            return false;
        };
        let body_handle = pb.body;
        let Some(body) = world.bodies.get_mut(body_handle) else {
            return false;
        };
        place_body(body, pose);
        if let Some(ghost) = self.ghosts.get_mut(bone) {
            ghost.set_pose(world, pose);
        }
        true
    }

    /// Write animated bone transforms into kinematic bodies and ghosts.
    ///
    /// Simulated bodies are left alone; they drive the bones instead (see
    /// [`EntityPhysics::read_transforms`]).
    pub fn update_transforms(&mut self, world: &mut PhysicsWorld, poses: &[Isometry3<f32>]) -> bool {
        if poses.len() < self.bodies.len() {
            log::warn!(
                "update_transforms: {} poses for {} bodies",
                poses.len(),
                self.bodies.len()
            );
            return false;
        }
        for pb in &self.bodies {
            if let Some(body) = world.bodies.get_mut(pb.body) {
                if !body.is_dynamic() {
                    place_body(body, poses[pb.bone]);
                }
            }
        }
        for ghost in &mut self.ghosts {
            let dynamic = self.bodies[ghost.bone].mass > 0.0;
            if !dynamic {
                ghost.set_pose(world, poses[ghost.bone]);
            }
        }
        true
    }

    /// Copy simulated body transforms into `poses` and move ghosts to follow
    /// their bodies. Returns the number of bones written.
    pub fn read_transforms(&mut self, world: &mut PhysicsWorld, poses: &mut [Isometry3<f32>]) -> usize {
        let mut written = 0;
        for pb in &self.bodies {
            let Some(body) = world.bodies.get(pb.body) else {
                continue;
            };
            if body.is_dynamic() {
                if let Some(slot) = poses.get_mut(pb.bone) {
                    *slot = *body.position();
                    written += 1;
                }
            }
        }
        self.sync_ghosts(world);
        written
    }

    /// Move every ghost onto its body's current transform.
    pub fn sync_ghosts(&mut self, world: &mut PhysicsWorld) {
        for ghost in &mut self.ghosts {
            let Some(pose) = self.bodies.get(ghost.bone).and_then(|pb| world.body(pb.body)).map(|b| *b.position())
            else {
                continue;
            };
            ghost.set_pose(world, pose);
        }
    }

    /// World-space centre of the root body.
    pub fn root_position(&self, world: &PhysicsWorld) -> Option<Point3<f32>> {
        self.body_transform(world, 0).map(|p| Point3::from(p.translation.vector))
    }
}

/// Put a body at a pose in the way its type expects.
fn place_body(body: &mut RigidBody, pose: Isometry3<f32>) {
    if body.is_kinematic() {
        body.set_next_kinematic_position(pose);
    } else {
        body.set_position(pose, true);
    }
}

/// Assign mass and body type; inertia is recomputed from the collider.
pub(crate) fn apply_mass(world: &mut PhysicsWorld, pb: &PhysicsBody, mass: f32, body_type: RigidBodyType) {
    let has_collider = match pb.collider.and_then(|h| world.colliders.get_mut(h)) {
        Some(co) => {
            co.set_mass(mass);
            true
        }
        None => false,
    };
    let Some(body) = world.bodies.get_mut(pb.body) else {
        return;
    };
    body.set_body_type(body_type, true);
    body.set_additional_mass(if has_collider { 0.0 } else { mass }, true);
    body.recompute_mass_properties_from_colliders(&world.colliders);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use level::BoneDesc;

    /// Three stacked 1m boxes: root, spine, head.
    pub(crate) fn biped() -> Skeleton {
        let bone = |parent: Option<usize>, y: f32| {
            BoneDesc::boxed(
                parent,
                Isometry3::translation(0.0, y, 0.0),
                Point3::new(-0.25, 0.0, -0.25),
                Point3::new(0.25, 1.0, 0.25),
            )
        };
        Skeleton::new(vec![bone(None, 0.0), bone(Some(0), 1.0), bone(Some(1), 1.0)])
    }

    pub(crate) fn spawn(world: &mut PhysicsWorld, skeleton: &Skeleton, mode: ShapeMode) -> EntityPhysics {
        let mut desc = EntityDesc::new(skeleton, Isometry3::translation(0.0, 5.0, 0.0));
        desc.shape_mode = mode;
        EntityPhysics::create(world, &desc).unwrap()
    }

    #[test]
    fn one_body_and_ghost_per_bone() {
        let mut world = PhysicsWorld::default();
        let skeleton = biped();
        let e = spawn(&mut world, &skeleton, ShapeMode::PerBoneBox);
        assert_eq!(e.bodies().len(), 3);
        assert_eq!(e.ghosts().len(), 3);
        assert!(e.bodies().iter().all(|b| b.has_collision() && b.mass == 0.0));
        assert!(e.bodies().iter().all(|b| world.body(b.body).unwrap().is_kinematic()));
        assert_eq!(world.body_count(), 3);
        assert_eq!(world.collider_count(), 6);
    }

    #[test]
    fn simplified_modes_make_one_body_and_one_ghost() {
        let mut world = PhysicsWorld::default();
        let skeleton = biped();
        for mode in [ShapeMode::SingleBox, ShapeMode::SingleSphere] {
            let e = spawn(&mut world, &skeleton, mode);
            assert_eq!(e.bodies().len(), 1);
            assert_eq!(e.ghosts().len(), 1);
            e.destroy(&mut world);
        }
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.collider_count(), 0);
    }

    #[test]
    fn degenerate_bone_gets_body_and_detached_ghost() {
        let mut world = PhysicsWorld::default();
        let mut skeleton = biped();
        skeleton.bones[1] = BoneDesc::boxed(
            Some(0),
            Isometry3::translation(0.0, 1.0, 0.0),
            Point3::new(-0.25, 0.0, -0.25),
            Point3::new(0.25, 0.0, 0.25),
        );
        let e = spawn(&mut world, &skeleton, ShapeMode::PerBoneBox);
        assert_eq!(e.bone_count(), 3);
        assert_eq!(e.bodies().len(), 3);
        assert_eq!(e.ghosts().len(), e.bodies().len());
        assert!(e.ghosts().iter().enumerate().all(|(i, g)| g.bone == i));

        assert!(!e.bodies()[1].has_collision());
        let ghost = &e.ghosts()[1];
        assert!(!ghost.attached);
        assert!(ghost.paired.is_none());
        assert!(!world.collider(ghost.collider).unwrap().is_enabled());
        assert!(e.ghosts()[2].attached);
    }

    #[test]
    fn scripting_setters_reject_bad_bones() {
        let mut world = PhysicsWorld::default();
        let skeleton = biped();
        let mut e = spawn(&mut world, &skeleton, ShapeMode::PerBoneBox);
        assert!(!e.set_body_mass(&mut world, 7, 1.0));
        assert!(!e.push_body(&mut world, 7, Vector3::x()));
        assert!(!e.set_linear_factor(&mut world, 9, Vector3::zeros()));
        assert!(!e.set_body_transform(&mut world, 3, Isometry3::identity()));
        assert!(e.body_transform(&world, 3).is_none());
        assert!(!e.set_body_mass(&mut world, 0, -1.0));
    }

    #[test]
    fn mass_switches_between_kinematic_and_dynamic() {
        let mut world = PhysicsWorld::default();
        let skeleton = biped();
        let mut e = spawn(&mut world, &skeleton, ShapeMode::PerBoneBox);
        assert!(e.set_body_mass(&mut world, 1, 2.0));
        let h = e.body(1).unwrap().body;
        assert!(world.body(h).unwrap().is_dynamic());
        assert!((world.body(h).unwrap().mass() - 2.0).abs() < 1.0e-4);
        assert!(e.push_body(&mut world, 1, Vector3::new(1.0, 0.0, 0.0)));
        assert_eq!(*world.body(h).unwrap().linvel(), Vector3::new(1.0, 0.0, 0.0));

        assert!(e.set_body_mass(&mut world, 1, 0.0));
        assert!(world.body(h).unwrap().is_kinematic());
        assert!(!e.push_body(&mut world, 1, Vector3::x()));
    }

    #[test]
    fn collision_toggle_reaches_bodies_and_ghosts() {
        let mut world = PhysicsWorld::default();
        let skeleton = biped();
        let mut e = spawn(&mut world, &skeleton, ShapeMode::PerBoneBox);
        e.set_collision_enabled(&mut world, false);
        assert!(e.bodies().iter().all(|b| !world.collider(b.collider.unwrap()).unwrap().is_enabled()));
        assert!(e.ghosts().iter().all(|g| !world.collider(g.collider).unwrap().is_enabled()));
        e.set_collision_enabled(&mut world, true);
        assert!(e.ghosts().iter().all(|g| world.collider(g.collider).unwrap().is_enabled()));
    }

    #[test]
    fn group_and_mask_update_the_shared_tag() {
        let mut world = PhysicsWorld::default();
        let skeleton = biped();
        let e = spawn(&mut world, &skeleton, ShapeMode::PerBoneBox);
        assert!(e.set_collision_group(&mut world, CollisionGroup::Characters.flags()));
        assert!(e.set_collision_mask(&mut world, CollisionGroup::StaticRoom.flags()));
        let tag = world.owners().get(e.owner()).unwrap();
        assert!(tag.group.has(CollisionGroup::Characters));
        assert_eq!(tag.mask, CollisionGroup::StaticRoom.flags());
    }

    #[test]
    fn transforms_round_trip_through_bodies() {
        let mut world = PhysicsWorld::default();
        let skeleton = biped();
        let mut e = spawn(&mut world, &skeleton, ShapeMode::PerBoneBox);
        let pose = Isometry3::translation(2.0, 3.0, 4.0);
        assert!(e.set_body_mass(&mut world, 0, 1.0));
        assert!(e.set_body_transform(&mut world, 0, pose));
        assert_eq!(e.body_transform(&world, 0), Some(pose));
        let ghost = world.collider(e.ghosts()[0].collider).unwrap();
        assert_eq!(ghost.position().translation.vector, Vector3::new(2.0, 3.0, 4.0));
    }
}
