use nalgebra::{Point3, Vector3};

use crate::{constants::NODE_BLOCK_SIZE, owner::ColliderOwner};

/// One penetrating contact point found by a ghost query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionNode {
    /// Owner of the touched collider; `None` for untagged geometry.
    pub other: Option<ColliderOwner>,
    /// Bone of the querying entity whose ghost touched.
    pub self_part: u16,
    pub other_part: u16,
    /// World-space contact point on the ghost.
    pub point: Point3<f32>,
    /// Unit direction that pushes the ghost out of the other collider.
    pub normal: Vector3<f32>,
    /// Penetration depth (positive).
    pub depth: f32,
}

impl CollisionNode {
    #[inline]
    pub fn correction(&self) -> Vector3<f32> {
        self.normal * self.depth
    }
}

/// Per-query node storage, reset wholesale before each query.
///
/// Capacity grows in blocks of [`NODE_BLOCK_SIZE`] and is kept across resets.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<CollisionNode>,
    blocks: usize,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.nodes.clear();
    }

    pub fn push(&mut self, node: CollisionNode) {
        if self.nodes.len() == self.blocks * NODE_BLOCK_SIZE {
            self.nodes.reserve_exact(NODE_BLOCK_SIZE);
            self.blocks += 1;
        }
        self.nodes.push(node);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Blocks allocated so far.
    #[inline]
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    pub(crate) fn since(&self, start: usize) -> &[CollisionNode] {
        self.nodes.get(start..).unwrap_or(&[])
    }

    pub fn as_list(&self) -> CollisionList<'_> {
        CollisionList { nodes: &self.nodes }
    }
}

/// Result of a penetration query. Borrowed from the arena, so it cannot
/// outlive the next query.
#[derive(Clone, Copy, Debug)]
pub struct CollisionList<'a> {
    nodes: &'a [CollisionNode],
}

impl<'a> CollisionList<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'a, CollisionNode> {
        self.nodes.iter()
    }

    pub fn get(&self, index: usize) -> Option<&'a CollisionNode> {
        self.nodes.get(index)
    }

    /// Sum of `normal * depth` over all nodes.
    pub fn total_correction(&self) -> Vector3<f32> {
        self.nodes.iter().map(CollisionNode::correction).sum()
    }
}

impl<'a> IntoIterator for CollisionList<'a> {
    type Item = &'a CollisionNode;
    type IntoIter = std::slice::Iter<'a, CollisionNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
