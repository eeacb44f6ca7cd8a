use crate::node::{Drawable, NodeKind, SceneNode};
use glam::Mat4;
use serde::{Deserialize, Serialize};
use starfolio_common::NodeId;

/// Errors from tree mutations.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("node {0} not found")]
    UnknownNode(NodeId),
}

/// Arena-backed node hierarchy. The root is always `NodeId(0)`.
///
/// Used both for the live scene and for detached model hierarchies coming
/// out of a loader, which are later grafted under a scene group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTree {
    nodes: Vec<SceneNode>,
}

impl NodeTree {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new(root: SceneNode) -> Self {
        let mut root = root;
        root.parent = None;
        root.children.clear();
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    /// Add `node` as the last child of `parent`.
    pub fn add(&mut self, parent: NodeId, node: SceneNode) -> Result<NodeId, SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::UnknownNode(parent));
        }
        let id = NodeId(self.nodes.len() as u32);
        let mut node = node;
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.index()].children.push(id);
        Ok(id)
    }

    /// Move every node of `other` into this tree under `parent`.
    /// Returns the new id of `other`'s root.
    pub fn graft(&mut self, parent: NodeId, other: NodeTree) -> Result<NodeId, SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::UnknownNode(parent));
        }
        let offset = self.nodes.len() as u32;
        let shift = |id: NodeId| NodeId(id.0 + offset);
        for mut node in other.nodes {
            node.parent = Some(node.parent.map_or(parent, shift));
            for child in &mut node.children {
                *child = shift(*child);
            }
            self.nodes.push(node);
        }
        let grafted_root = NodeId(offset);
        self.nodes[parent.index()].children.push(grafted_root);
        Ok(grafted_root)
    }

    /// Pre-order ids of `from` and everything below it.
    pub fn descendants(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(from) {
            return out;
        }
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.index()].children.iter().rev());
        }
        out
    }

    /// First node named `name` in the subtree rooted at `from`.
    pub fn find_by_name(&self, from: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(from)
            .into_iter()
            .find(|id| self.nodes[id.index()].name == name)
    }

    /// Accumulated transform from the tree root down to `id`, inclusive.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut m = Mat4::IDENTITY;
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            let Some(node) = self.get(c) else { break };
            m = node.transform.matrix() * m;
            cursor = node.parent;
        }
        m
    }

    /// Apply `f` to every drawable in the subtree rooted at `from`.
    pub fn for_each_drawable_mut(&mut self, from: NodeId, mut f: impl FnMut(&mut Drawable)) {
        for id in self.descendants(from) {
            if let NodeKind::Drawable(d) = &mut self.nodes[id.index()].kind {
                f(d);
            }
        }
    }

    pub fn drawable_count(&self, from: NodeId) -> usize {
        self.descendants(from)
            .into_iter()
            .filter(|id| matches!(self.nodes[id.index()].kind, NodeKind::Drawable(_)))
            .count()
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new(SceneNode::group("root"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use starfolio_common::Transform;

    #[test]
    fn add_sets_parent_once() {
        let mut tree = NodeTree::default();
        let a = tree.add(tree.root(), SceneNode::group("a")).unwrap();
        let b = tree.add(a, SceneNode::group("b")).unwrap();
        assert_eq!(tree.get(b).unwrap().parent(), Some(a));
        assert_eq!(tree.get(a).unwrap().children(), &[b]);
    }

    #[test]
    fn add_to_unknown_parent_fails() {
        let mut tree = NodeTree::default();
        assert!(tree.add(NodeId(42), SceneNode::group("x")).is_err());
    }

    #[test]
    fn graft_remaps_ids() {
        let mut scene = NodeTree::default();
        let slot = scene.add(scene.root(), SceneNode::group("slot")).unwrap();

        let mut model = NodeTree::new(SceneNode::group("model"));
        let arm = model.add(model.root(), SceneNode::group("arm")).unwrap();
        model.add(arm, SceneNode::group("hand")).unwrap();

        let root = scene.graft(slot, model).unwrap();
        assert_eq!(scene.len(), 5);
        assert_eq!(scene.get(root).unwrap().parent(), Some(slot));
        let hand = scene.find_by_name(root, "hand").unwrap();
        let arm = scene.get(hand).unwrap().parent().unwrap();
        assert_eq!(scene.get(arm).unwrap().name, "arm");
        assert_eq!(scene.get(arm).unwrap().parent(), Some(root));
    }

    #[test]
    fn world_matrix_composes_parents() {
        let mut tree = NodeTree::default();
        let a = tree
            .add(
                tree.root(),
                SceneNode::group("a").with_transform(Transform::from_position(Vec3::X)),
            )
            .unwrap();
        let b = tree
            .add(
                a,
                SceneNode::group("b")
                    .with_transform(Transform::from_position(Vec3::Y).with_uniform_scale(2.0)),
            )
            .unwrap();
        let p = tree.world_matrix(b).transform_point3(Vec3::Z);
        assert_eq!(p, Vec3::new(1.0, 1.0, 2.0));
    }

    #[test]
    fn descendants_are_preorder() {
        let mut tree = NodeTree::default();
        let a = tree.add(tree.root(), SceneNode::group("a")).unwrap();
        let b = tree.add(tree.root(), SceneNode::group("b")).unwrap();
        let a1 = tree.add(a, SceneNode::group("a1")).unwrap();
        assert_eq!(tree.descendants(tree.root()), vec![tree.root(), a, a1, b]);
    }
}
