use crate::node::{Light, SceneNode};
use crate::tree::{NodeTree, SceneError};
use serde::{Deserialize, Serialize};
use starfolio_common::{NodeId, Rgb, Transform};

/// A record produced by every structural change to the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneEvent {
    /// An empty placeholder group was created under the root.
    GroupCreated { id: NodeId, name: String },
    /// A light was added.
    LightAdded { id: NodeId, name: String },
    /// A loaded model hierarchy was grafted under a group.
    ModelAttached {
        group: NodeId,
        root: NodeId,
        nodes: usize,
    },
}

/// The live scene: node tree, background colour and structural event log.
///
/// Structure only grows: groups and lights are created at startup, models
/// are grafted as their loads complete. Per-frame motion mutates transforms
/// in place and is not logged.
#[derive(Debug, Clone)]
pub struct Scene {
    tree: NodeTree,
    pub background: Rgb,
    events: Vec<SceneEvent>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Rgb::BLACK)
    }
}

impl Scene {
    pub fn new(background: Rgb) -> Self {
        Self {
            tree: NodeTree::new(SceneNode::group("scene")),
            background,
            events: Vec::new(),
        }
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Create an empty group directly under the scene root.
    pub fn add_group(&mut self, name: &str, transform: Transform) -> Result<NodeId, SceneError> {
        let node = SceneNode::group(name).with_transform(transform);
        let id = self.tree.add(self.tree.root(), node)?;
        self.events.push(SceneEvent::GroupCreated {
            id,
            name: name.to_string(),
        });
        tracing::debug!(%id, name, "group created");
        Ok(id)
    }

    pub fn add_light(
        &mut self,
        parent: NodeId,
        name: &str,
        light: Light,
        transform: Transform,
    ) -> Result<NodeId, SceneError> {
        let id = self
            .tree
            .add(parent, SceneNode::light(name, light).with_transform(transform))?;
        self.events.push(SceneEvent::LightAdded {
            id,
            name: name.to_string(),
        });
        Ok(id)
    }

    /// Graft a detached model under `group`. Returns the model root's new id.
    pub fn attach_model(&mut self, group: NodeId, model: NodeTree) -> Result<NodeId, SceneError> {
        let nodes = model.len();
        let root = self.tree.graft(group, model)?;
        self.events.push(SceneEvent::ModelAttached { group, root, nodes });
        tracing::debug!(%group, %root, nodes, "model attached");
        Ok(root)
    }

    /// Number of direct children of `id` (0 for a placeholder group).
    pub fn child_count(&self, id: NodeId) -> usize {
        self.tree.get(id).map_or(0, |n| n.children().len())
    }

    pub fn events(&self) -> &[SceneEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_start_empty_under_root() {
        let mut scene = Scene::default();
        let g = scene.add_group("head", Transform::default()).unwrap();
        assert_eq!(scene.tree().get(g).unwrap().parent(), Some(scene.root()));
        assert_eq!(scene.child_count(g), 0);
        assert!(matches!(scene.events()[0], SceneEvent::GroupCreated { .. }));
    }

    #[test]
    fn attach_model_logs_event() {
        let mut scene = Scene::default();
        let g = scene.add_group("decor", Transform::default()).unwrap();
        let root = scene.attach_model(g, NodeTree::default()).unwrap();
        assert_eq!(scene.child_count(g), 1);
        assert_eq!(
            scene.events().last(),
            Some(&SceneEvent::ModelAttached {
                group: g,
                root,
                nodes: 1
            })
        );
    }

    #[test]
    fn drain_events_clears_log() {
        let mut scene = Scene::default();
        scene.add_group("a", Transform::default()).unwrap();
        assert_eq!(scene.drain_events().len(), 1);
        assert!(scene.events().is_empty());
    }
}
