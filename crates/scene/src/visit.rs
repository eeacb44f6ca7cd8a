use crate::node::{Drawable, Light, NodeKind, SceneNode};
use crate::tree::NodeTree;
use glam::Mat4;
use starfolio_common::{Aabb, NodeId};

/// Typed traversal callbacks. `world` is the accumulated transform of the
/// visited node, including its own local transform.
pub trait NodeVisitor {
    fn group(&mut self, _id: NodeId, _node: &SceneNode, _world: &Mat4) {}
    fn drawable(&mut self, _id: NodeId, _drawable: &Drawable, _world: &Mat4) {}
    fn light(&mut self, _id: NodeId, _light: &Light, _world: &Mat4) {}
}

impl NodeTree {
    /// Visit the subtree at `from`, composing transforms onto `base`.
    pub fn walk(&self, from: NodeId, base: Mat4, visitor: &mut impl NodeVisitor) {
        self.walk_inner(from, base, false, visitor);
    }

    /// Like [`NodeTree::walk`] but prunes invisible subtrees.
    pub fn walk_visible(&self, from: NodeId, base: Mat4, visitor: &mut impl NodeVisitor) {
        self.walk_inner(from, base, true, visitor);
    }

    fn walk_inner(
        &self,
        from: NodeId,
        base: Mat4,
        skip_hidden: bool,
        visitor: &mut impl NodeVisitor,
    ) {
        let mut stack = vec![(from, base)];
        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            if skip_hidden && !node.visible {
                continue;
            }
            let world = parent_world * node.transform.matrix();
            match &node.kind {
                NodeKind::Group => visitor.group(id, node, &world),
                NodeKind::Drawable(d) => visitor.drawable(id, d, &world),
                NodeKind::Light(l) => visitor.light(id, l, &world),
            }
            for child in node.children().iter().rev() {
                stack.push((*child, world));
            }
        }
    }

    /// Bounds of all drawable geometry under `from`, in the frame of
    /// `from`'s parent.
    pub fn subtree_bounds(&self, from: NodeId) -> Aabb {
        let mut visitor = BoundsVisitor::default();
        self.walk(from, Mat4::IDENTITY, &mut visitor);
        visitor.bounds
    }

    /// Bounds of the subtree at `from` with `from`'s own transform replaced
    /// by `root_matrix`.
    pub fn bounds_with_root(&self, from: NodeId, root_matrix: Mat4) -> Aabb {
        let mut visitor = BoundsVisitor::default();
        let Some(node) = self.get(from) else {
            return Aabb::EMPTY;
        };
        if let NodeKind::Drawable(d) = &node.kind {
            visitor.drawable(from, d, &root_matrix);
        }
        for child in node.children() {
            self.walk(*child, root_matrix, &mut visitor);
        }
        visitor.bounds
    }
}

/// Accumulates transformed mesh bounds.
#[derive(Debug, Default)]
pub struct BoundsVisitor {
    pub bounds: Aabb,
}

impl NodeVisitor for BoundsVisitor {
    fn drawable(&mut self, _id: NodeId, drawable: &Drawable, world: &Mat4) {
        let local = drawable.mesh.bounds();
        self.bounds = self.bounds.union(&local.transformed(world));
    }
}
