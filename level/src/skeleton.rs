//! Skeletal model description consumed from the animation collaborator.
//!
//! The collision layer only needs per-bone bounding volumes, the parent links,
//! and (for mesh-shaped proxies and hair) the bone meshes. Poses arrive every
//! frame as world-space isometries indexed like [`Skeleton::bones`].

use std::sync::Arc;

use nalgebra::{Isometry3, Point3, Vector3};

use crate::mesh::MeshData;

#[derive(Clone, Debug)]
pub struct BoneDesc {
    /// Parent bone index; `None` for the root.
    pub parent: Option<usize>,
    /// Bind-pose transform relative to the parent bone (or the model for the root).
    pub local: Isometry3<f32>,
    /// Mesh-local bounding box.
    pub bb_min: Point3<f32>,
    pub bb_max: Point3<f32>,
    /// Mesh-local bounding sphere.
    pub centre: Point3<f32>,
    pub radius: f32,
    pub mesh: Option<Arc<MeshData>>,
}

impl BoneDesc {
    /// Bone with an axis-aligned box volume and no mesh.
    pub fn boxed(parent: Option<usize>, local: Isometry3<f32>, bb_min: Point3<f32>, bb_max: Point3<f32>) -> Self {
        let centre = nalgebra::center(&bb_min, &bb_max);
        let radius = (bb_max - bb_min).norm() * 0.5;
        Self {
            parent,
            local,
            bb_min,
            bb_max,
            centre,
            radius,
            mesh: None,
        }
    }

    pub fn half_extents(&self) -> Vector3<f32> {
        (self.bb_max - self.bb_min) * 0.5
    }
}

#[derive(Clone, Debug)]
pub struct Skeleton {
    pub bones: Vec<BoneDesc>,
    /// Whole-model bounding box in model space.
    pub bb_min: Point3<f32>,
    pub bb_max: Point3<f32>,
}

impl Skeleton {
    /// Build a skeleton and derive the model bounds from bone volumes in bind pose.
    pub fn new(bones: Vec<BoneDesc>) -> Self {
        let poses = bind_pose(&bones);
        let mut lo = Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
        let mut hi = Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
        for (bone, pose) in bones.iter().zip(&poses) {
            for p in [bone.bb_min, bone.bb_max] {
                let w = pose * p;
                lo = lo.inf(&w);
                hi = hi.sup(&w);
            }
        }
        if bones.is_empty() {
            lo = Point3::origin();
            hi = Point3::origin();
        }
        Self {
            bones,
            bb_min: lo,
            bb_max: hi,
        }
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn parent_of(&self, bone: usize) -> Option<usize> {
        self.bones.get(bone)?.parent
    }

    /// Model-space bind pose of every bone.
    pub fn bind_pose(&self) -> Vec<Isometry3<f32>> {
        bind_pose(&self.bones)
    }
}

/// Accumulate parent-relative transforms; parents must precede children.
fn bind_pose(bones: &[BoneDesc]) -> Vec<Isometry3<f32>> {
    let mut out: Vec<Isometry3<f32>> = Vec::with_capacity(bones.len());
    for bone in bones {
        let pose = match bone.parent.and_then(|p| out.get(p)) {
            Some(parent) => parent * bone.local,
            None => bone.local,
        };
        out.push(pose);
    }
    out
}
