//! Ragdoll activation: hands an entity's bone bodies from animation to the
//! solver and back.
//!
//! Kinematic -> Dynamic on [`EntityPhysics::create_ragdoll`], Dynamic ->
//! Kinematic on [`EntityPhysics::delete_ragdoll`]. A failed activation always
//! ends Kinematic.

use nalgebra::Isometry3;
use rapier3d::prelude::*;

use crate::{
    bitmask_flags::CollisionGroup,
    constants::{CCD_SWEEP_RADIUS_FACTOR, RAGDOLL_SLEEP_ANGULAR, RAGDOLL_SLEEP_LINEAR},
    entity::{EntityPhysics, PhysicsBody, RagdollState, apply_mass},
    error::PhysicsError,
    world::PhysicsWorld,
};

/// Simulation parameters for one bone's body. Index in
/// [`RagdollSetup::bodies`] is the bone index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RagdollBodySetup {
    pub mass: f32,
    /// Linear and angular damping.
    pub damping: [f32; 2],
    pub restitution: f32,
    pub friction: f32,
}

impl Default for RagdollBodySetup {
    fn default() -> Self {
        Self {
            mass: 1.0,
            damping: [0.05, 0.85],
            restitution: 0.0,
            friction: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JointKind {
    /// Free rotation about the anchor.
    #[default]
    Point,
    /// Rotation about the anchor's X axis only, limited to `[limits[0], limits[1]]`.
    Hinge,
    /// Swing about Y and Z within `±limits[0]` and `±limits[1]`, twist about
    /// X within `±limits[2]`.
    ConeTwist,
}

/// Joint between a bone and its skeleton parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RagdollJointSetup {
    pub body_index: usize,
    /// Joint frame relative to the child bone.
    pub local: Isometry3<f32>,
    pub kind: JointKind,
    pub limits: [f32; 3],
    /// Constraint force mixing; `<= 0` keeps the joint rigid.
    pub cfm: f32,
    /// Error reduction parameter in `[0, 1]`.
    pub erp: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RagdollSetup {
    pub bodies: Vec<RagdollBodySetup>,
    pub joints: Vec<RagdollJointSetup>,
}

/// Free angular axes of a joint kind.
fn free_angular_axes(kind: JointKind) -> &'static [JointAxis] {
    match kind {
        JointKind::Hinge => &[JointAxis::AngX],
        JointKind::Point | JointKind::ConeTwist => &[JointAxis::AngX, JointAxis::AngY, JointAxis::AngZ],
    }
}

/// Turn CFM/ERP softness into a spring on every free angular axis.
///
/// stiffness = erp / (dt * cfm), damping = (1 - erp) / cfm.
pub(crate) fn soften(joint: &mut GenericJoint, axes: &[JointAxis], cfm: f32, erp: f32, dt: f32) {
    if !(cfm > 0.0) || !(dt > 0.0) {
        return;
    }
    let erp = erp.clamp(0.0, 1.0);
    let stiffness = erp / (dt * cfm);
    let damping = (1.0 - erp) / cfm;
    for &axis in axes {
        joint.set_motor_model(axis, MotorModel::ForceBased);
        joint.set_motor_position(axis, 0.0, stiffness, damping);
    }
}

pub(crate) fn build_joint(
    setup: &RagdollJointSetup,
    parent_to_child: &Isometry3<f32>,
    dt: f32,
) -> GenericJoint {
    let locked = match setup.kind {
        JointKind::Hinge => JointAxesMask::LOCKED_REVOLUTE_AXES,
        JointKind::Point | JointKind::ConeTwist => JointAxesMask::LOCKED_SPHERICAL_AXES,
    };
    let mut joint = GenericJointBuilder::new(locked)
        .local_frame1(parent_to_child * setup.local)
        .local_frame2(setup.local)
        .contacts_enabled(false)
        .build();
    let l = setup.limits;
    match setup.kind {
        JointKind::Point => {}
        JointKind::Hinge => {
            joint.set_limits(JointAxis::AngX, [l[0].min(l[1]), l[0].max(l[1])]);
        }
        JointKind::ConeTwist => {
            joint.set_limits(JointAxis::AngY, [-l[0].abs(), l[0].abs()]);
            joint.set_limits(JointAxis::AngZ, [-l[1].abs(), l[1].abs()]);
            joint.set_limits(JointAxis::AngX, [-l[2].abs(), l[2].abs()]);
        }
    }
    soften(&mut joint, free_angular_axes(setup.kind), setup.cfm, setup.erp, dt);
    joint
}

impl EntityPhysics {
    /// Make the entity's bodies simulated and join them per `setup`.
    ///
    /// Counts are checked before anything is touched. Any failure after that
    /// tears the partial ragdoll down again and leaves the entity kinematic.
    pub fn create_ragdoll(&mut self, world: &mut PhysicsWorld, setup: &RagdollSetup) -> Result<(), PhysicsError> {
        let bone_count = self.bone_count();
        if setup.bodies.len() > bone_count {
            return Err(PhysicsError::TooManyBodies {
                bodies: setup.bodies.len(),
                bone_count,
            });
        }
        if setup.joints.len() > bone_count {
            return Err(PhysicsError::TooManyJoints {
                joints: setup.joints.len(),
                bone_count,
            });
        }
        if !world.owners.contains(self.owner) {
            return Err(PhysicsError::UnknownEntity);
        }
        if self.ragdoll_state == RagdollState::Dynamic {
            self.delete_ragdoll(world);
        }

        match self.activate_ragdoll(world, setup) {
            Ok(()) => {
                self.ragdoll_state = RagdollState::Dynamic;
                log::debug!(
                    "Ragdoll active: {} bodies, {} joints",
                    setup.bodies.len(),
                    self.ragdoll_joints.len()
                );
                Ok(())
            }
            Err(err) => {
                log::error!("Ragdoll activation aborted: {}", err);
                self.delete_ragdoll(world);
                Err(err)
            }
        }
    }

    fn activate_ragdoll(&mut self, world: &mut PhysicsWorld, setup: &RagdollSetup) -> Result<(), PhysicsError> {
        for (bone, params) in setup.bodies.iter().enumerate() {
            let pb = self.bodies.get(bone).cloned().ok_or(PhysicsError::NoSuchBone {
                bone,
                bone_count: self.bodies.len(),
            })?;
            self.activate_body(world, &pb, params);
            self.bodies[bone].mass = params.mass.max(0.0);
        }
        if let Some(tag) = world.owners.get_mut(self.owner) {
            tag.group = CollisionGroup::Characters.flags();
        }

        let dt = world.settings().fixed_timestep;
        for joint in &setup.joints {
            let bone = joint.body_index;
            let link = self.bones.get(bone).ok_or(PhysicsError::NoSuchBone {
                bone,
                bone_count: self.bones.len(),
            })?;
            let child = self
                .bodies
                .get(bone)
                .map(|pb| pb.body)
                .ok_or(PhysicsError::NoSuchBone {
                    bone,
                    bone_count: self.bodies.len(),
                })?;
            let parent = link
                .parent
                .and_then(|p| self.bodies.get(p))
                .map(|pb| pb.body)
                .ok_or(PhysicsError::MissingParentBone { bone })?;
            let handle = world.insert_joint(parent, child, build_joint(joint, &link.local, dt));
            self.ragdoll_joints.push(handle);
        }
        Ok(())
    }

    fn activate_body(&self, world: &mut PhysicsWorld, pb: &PhysicsBody, params: &RagdollBodySetup) {
        let mass = params.mass.max(0.0);
        let body_type = if mass > 0.0 {
            RigidBodyType::Dynamic
        } else {
            RigidBodyType::KinematicPositionBased
        };
        apply_mass(world, pb, mass, body_type);

        if let Some(co) = pb.collider.and_then(|h| world.colliders.get_mut(h)) {
            co.set_restitution(params.restitution);
            co.set_friction(params.friction);
            co.set_enabled(self.collision_enabled);
        }
        let is_root = self.bones.get(pb.bone).is_some_and(|b| b.parent.is_none());
        let radius = self.bones.get(pb.bone).map_or(0.0, |b| b.radius);
        let Some(body) = world.bodies.get_mut(pb.body) else {
            return;
        };
        body.set_linear_damping(params.damping[0]);
        body.set_angular_damping(params.damping[1]);
        let activation = body.activation_mut();
        activation.normalized_linear_threshold = RAGDOLL_SLEEP_LINEAR;
        activation.angular_threshold = RAGDOLL_SLEEP_ANGULAR;
        if is_root {
            body.enable_ccd(true);
            body.set_soft_ccd_prediction(radius * CCD_SWEEP_RADIUS_FACTOR);
        }
        body.wake_up(true);
    }

    /// Remove every ragdoll joint and return all bodies to massless kinematic.
    ///
    /// Masses given by the setup are not remembered; the next activation must
    /// supply them again.
    pub fn delete_ragdoll(&mut self, world: &mut PhysicsWorld) {
        for joint in std::mem::take(&mut self.ragdoll_joints) {
            world.remove_joint(joint);
        }
        for i in 0..self.bodies.len() {
            let pb = self.bodies[i].clone();
            apply_mass(world, &pb, 0.0, RigidBodyType::KinematicPositionBased);
            if let Some(body) = world.bodies.get_mut(pb.body) {
                body.enable_ccd(false);
                body.set_soft_ccd_prediction(0.0);
            }
            self.bodies[i].mass = 0.0;
        }
        if let Some(tag) = world.owners.get_mut(self.owner) {
            tag.group = CollisionGroup::Kinematic.flags();
        }
        self.ragdoll_state = RagdollState::Kinematic;
    }
}
