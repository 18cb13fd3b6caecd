//! Hair chains: a string of dynamic bodies hanging from one of an entity's
//! bone bodies.
//!
//! Each chain has its own owner tag (kind `Hair`, linked to the entity) so it
//! never collides with the entity it hangs from, with other hair, or with
//! itself. Bodies never sleep; hair has to keep tracking a head that moves
//! only kinematically.

use std::sync::Arc;

use level::{MeshData, RoomId};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use rapier3d::prelude::*;

use crate::{
    bitmask_flags::CollisionGroup,
    constants::{
        HAIR_ANCHOR_ANGULAR_LOWER, HAIR_ANCHOR_ANGULAR_UPPER, HAIR_ANCHOR_SOLVER_ITERATIONS, HAIR_CHAIN_ANGULAR_LIMIT,
    },
    entity::{EntityPhysics, PhysicsBody, apply_mass},
    error::PhysicsError,
    factory::RigidBodyFactory,
    owner::{ObjectKind, OwnerHandle, OwnerTag, pack_user_data},
    ragdoll::soften,
    world::PhysicsWorld,
};

const ANGULAR_AXES: [JointAxis; 3] = [JointAxis::AngX, JointAxis::AngY, JointAxis::AngZ];

/// Description of one hair chain. Segment meshes hang along -Y from their
/// local origin.
#[derive(Clone, Debug)]
pub struct HairSetup {
    /// Bone whose body the first segment hangs from.
    pub link_bone: usize,
    pub segments: Vec<Arc<MeshData>>,
    /// Mass of the first segment; later segments blend towards `tail_weight`.
    pub root_weight: f32,
    pub tail_weight: f32,
    /// Linear and angular damping.
    pub damping: [f32; 2],
    pub restitution: f32,
    pub friction: f32,
    /// Fraction of a segment's length at which the next one attaches.
    pub joint_overlap: f32,
    pub joint_cfm: f32,
    pub joint_erp: f32,
    /// Scalp attachment point in the link body's frame.
    pub head_offset: Vector3<f32>,
    /// Scalp attachment rotation as roll, pitch, yaw.
    pub root_angle: [f32; 3],
}

impl HairSetup {
    pub fn new(link_bone: usize, segments: Vec<Arc<MeshData>>) -> Self {
        Self {
            link_bone,
            segments,
            root_weight: 1.0,
            tail_weight: 0.5,
            damping: [0.25, 0.25],
            restitution: 0.0,
            friction: 0.5,
            joint_overlap: 1.0,
            joint_cfm: 0.0,
            joint_erp: 0.8,
            head_offset: Vector3::zeros(),
            root_angle: [0.0; 3],
        }
    }

    fn segment_mass(&self, index: usize) -> f32 {
        let n = self.segments.len();
        if n < 2 {
            return self.root_weight;
        }
        let t = index as f32 / (n - 1) as f32;
        self.root_weight + (self.tail_weight - self.root_weight) * t
    }
}

fn segment_length(mesh: &MeshData) -> f32 {
    mesh.bounds().map_or(0.0, |(lo, hi)| hi.y - lo.y)
}

#[derive(Clone, Debug)]
pub struct HairElement {
    pub mesh: Arc<MeshData>,
    pub body: PhysicsBody,
}

#[derive(Debug)]
pub struct HairChain {
    owner: OwnerHandle,
    link_body: RigidBodyHandle,
    elements: Vec<HairElement>,
    joints: Vec<ImpulseJointHandle>,
}

impl HairChain {
    pub(crate) fn create(
        world: &mut PhysicsWorld,
        entity: OwnerHandle,
        room: Option<RoomId>,
        link_body: RigidBodyHandle,
        setup: &HairSetup,
    ) -> Result<Self, PhysicsError> {
        if setup.segments.is_empty() {
            return Err(PhysicsError::EmptyHair);
        }
        let link_pose = *world
            .body(link_body)
            .ok_or(PhysicsError::MissingLinkBody { bone: setup.link_bone })?
            .position();

        let mut tag = OwnerTag::new(ObjectKind::Hair, room, CollisionGroup::DynamicsNoInteraction);
        tag.linked_owner = Some(entity);
        let owner = world.register_owner(tag);

        let [roll, pitch, yaw] = setup.root_angle;
        let anchor = Isometry3::from_parts(
            Translation3::from(setup.head_offset),
            UnitQuaternion::from_euler_angles(roll, pitch, yaw),
        );
        let dt = world.settings().fixed_timestep;

        let mut elements: Vec<HairElement> = Vec::with_capacity(setup.segments.len());
        let mut joints = Vec::with_capacity(setup.segments.len());
        let mut pose = link_pose * anchor;
        for (i, mesh) in setup.segments.iter().enumerate() {
            let bits = pack_user_data(owner, ObjectKind::Hair, i as u16);
            let mut builder = RigidBodyBuilder::dynamic()
                .pose(pose)
                .user_data(bits)
                .linear_damping(setup.damping[0])
                .angular_damping(setup.damping[1])
                .can_sleep(false);
            if i == 0 {
                builder = builder.additional_solver_iterations(HAIR_ANCHOR_SOLVER_ITERATIONS);
            }
            let body = world.insert_body(builder.build());
            let collider = RigidBodyFactory::mesh_shape(mesh, true, false).map(|proxy| {
                let co = RigidBodyFactory::collider(proxy.shape, proxy.offset, bits)
                    .restitution(setup.restitution)
                    .friction(setup.friction)
                    .build();
                world.insert_collider(co, Some(body))
            });
            if collider.is_none() {
                log::debug!("Hair segment {} has no collision volume", i);
            }
            let pb = PhysicsBody {
                bone: i,
                body,
                collider,
                mass: setup.segment_mass(i),
            };
            apply_mass(world, &pb, pb.mass, RigidBodyType::Dynamic);

            let joint = match elements.last() {
                None => {
                    let mut joint = GenericJointBuilder::new(JointAxesMask::LOCKED_SPHERICAL_AXES)
                        .local_frame1(anchor)
                        .local_frame2(Isometry3::identity())
                        .contacts_enabled(false)
                        .build();
                    for (k, axis) in ANGULAR_AXES.into_iter().enumerate() {
                        joint.set_limits(axis, [HAIR_ANCHOR_ANGULAR_LOWER[k], HAIR_ANCHOR_ANGULAR_UPPER[k]]);
                    }
                    soften(&mut joint, &ANGULAR_AXES, setup.joint_cfm, setup.joint_erp, dt);
                    world.insert_joint(link_body, body, joint)
                }
                Some(prev) => {
                    let hang = Isometry3::translation(0.0, -segment_length(&prev.mesh) * setup.joint_overlap, 0.0);
                    let mut joint = GenericJointBuilder::new(JointAxesMask::LOCKED_SPHERICAL_AXES)
                        .local_frame1(hang)
                        .local_frame2(Isometry3::identity())
                        .contacts_enabled(false)
                        .build();
                    for (k, axis) in ANGULAR_AXES.into_iter().enumerate() {
                        let limit = HAIR_CHAIN_ANGULAR_LIMIT[k];
                        joint.set_limits(axis, [-limit, limit]);
                    }
                    soften(&mut joint, &ANGULAR_AXES, setup.joint_cfm, setup.joint_erp, dt);
                    world.insert_joint(prev.body.body, body, joint)
                }
            };
            joints.push(joint);

            pose = pose * Translation3::new(0.0, -segment_length(mesh) * setup.joint_overlap, 0.0);
            elements.push(HairElement {
                mesh: mesh.clone(),
                body: pb,
            });
        }

        let inserted: Vec<ColliderHandle> = elements.iter().filter_map(|e| e.body.collider).collect();
        world.refresh_colliders(&inserted);

        log::debug!("Hair chain built: {} segments", elements.len());
        Ok(Self {
            owner,
            link_body,
            elements,
            joints,
        })
    }

    /// Remove joints, then bodies, then the tag.
    pub(crate) fn destroy(self, world: &mut PhysicsWorld) {
        for joint in self.joints {
            world.remove_joint(joint);
        }
        for element in self.elements {
            world.remove_body(element.body.body);
        }
        world.release_owner(self.owner);
    }

    #[inline]
    pub fn owner(&self) -> OwnerHandle {
        self.owner
    }

    #[inline]
    pub fn link_body(&self) -> RigidBodyHandle {
        self.link_body
    }

    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Render data for one segment: its mesh and current world transform.
    pub fn element(&self, world: &PhysicsWorld, index: usize) -> Option<(Arc<MeshData>, Isometry3<f32>)> {
        let element = self.elements.get(index)?;
        let pose = *world.body(element.body.body)?.position();
        Some((element.mesh.clone(), pose))
    }

    /// Follow the entity into `room` and keep every segment awake.
    pub fn update(&self, world: &mut PhysicsWorld, room: Option<RoomId>) {
        world.set_owner_room(self.owner, room);
        for element in &self.elements {
            if let Some(body) = world.bodies.get_mut(element.body.body) {
                body.wake_up(false);
            }
        }
    }
}

impl EntityPhysics {
    /// Hang a hair chain from one of the entity's bodies. Returns the chain index.
    pub fn create_hair(&mut self, world: &mut PhysicsWorld, setup: &HairSetup) -> Result<usize, PhysicsError> {
        let room = world.owners.get(self.owner).ok_or(PhysicsError::UnknownEntity)?.room;
        let link_body = self
            .bodies
            .get(setup.link_bone)
            .map(|pb| pb.body)
            .ok_or(PhysicsError::MissingLinkBody { bone: setup.link_bone })?;
        match HairChain::create(world, self.owner, room, link_body, setup) {
            Ok(chain) => {
                self.hair.push(chain);
                Ok(self.hair.len() - 1)
            }
            Err(err) => {
                log::error!("Hair creation failed: {}", err);
                Err(err)
            }
        }
    }

    pub fn delete_hair(&mut self, world: &mut PhysicsWorld) {
        for chain in self.hair.drain(..) {
            chain.destroy(world);
        }
    }

    /// Per-frame hair refresh; call after moving the entity.
    pub fn update_hair(&self, world: &mut PhysicsWorld) {
        let room = world.owners.get(self.owner).and_then(|tag| tag.room);
        for chain in &self.hair {
            chain.update(world, room);
        }
    }

    #[inline]
    pub fn hair_count(&self) -> usize {
        self.hair.len()
    }

    pub fn hair(&self, index: usize) -> Option<&HairChain> {
        self.hair.get(index)
    }
}
