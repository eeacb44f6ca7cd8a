use starfolio_common::NodeId;
use starfolio_scene::{NodeKind, NodeTree};
use starfolio_stage::Session;

/// Session inspector for developer tooling.
///
/// Read-only queries against a [`Session`] for the debug panel and the CLI.
pub struct SessionInspector;

impl SessionInspector {
    /// Produce a summary of the session state.
    pub fn summary(session: &Session) -> SessionSummary {
        let scene = session.scene();
        let loads = session.loads();
        SessionSummary {
            elapsed: session.last_time().elapsed,
            frames: session.frames(),
            stars: session.stars().len(),
            nodes: scene.tree().len(),
            groups: session
                .groups()
                .iter()
                .map(|(name, &id)| GroupInfo {
                    name: name.clone(),
                    id,
                    children: scene.child_count(id),
                    drawables: scene.tree().drawable_count(id),
                })
                .collect(),
            pending_loads: loads.pending(),
            attached: loads.attached(),
            failed: loads.failed(),
            textures: session.textures().len(),
            bindings: session.animations().len(),
            hovering: session.hit_tester().is_hovering(),
        }
    }

    /// Describe one node, or `None` for an id the scene does not hold.
    pub fn inspect_node(tree: &NodeTree, id: NodeId) -> Option<NodeInfo> {
        let node = tree.get(id)?;
        let kind = match &node.kind {
            NodeKind::Group => "group",
            NodeKind::Drawable(_) => "drawable",
            NodeKind::Light(_) => "light",
        };
        let world = tree.world_matrix(id).w_axis;
        Some(NodeInfo {
            id,
            name: node.name.clone(),
            kind,
            position: node.transform.position.to_array(),
            scale: node.transform.scale.to_array(),
            world_position: [world.x, world.y, world.z],
            children: node.children().len(),
        })
    }

    /// Every node below `from`, depth first, with its depth.
    pub fn outline(tree: &NodeTree, from: NodeId) -> Vec<(usize, NodeId)> {
        let mut out = Vec::new();
        let mut stack = vec![(0, from)];
        while let Some((depth, id)) = stack.pop() {
            let Some(node) = tree.get(id) else { continue };
            out.push((depth, id));
            stack.extend(node.children().iter().rev().map(|&c| (depth + 1, c)));
        }
        out
    }
}

/// One named scene group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupInfo {
    pub name: String,
    pub id: NodeId,
    pub children: usize,
    pub drawables: usize,
}

/// Summary of session state for the inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub elapsed: f32,
    pub frames: u64,
    pub stars: usize,
    pub nodes: usize,
    pub groups: Vec<GroupInfo>,
    pub pending_loads: usize,
    pub attached: usize,
    pub failed: usize,
    pub textures: usize,
    pub bindings: usize,
    pub hovering: bool,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Session: t={:.2}s frames={} stars={} nodes={}",
            self.elapsed, self.frames, self.stars, self.nodes
        )?;
        writeln!(
            f,
            "Loads: pending={} attached={} failed={} textures={} bindings={}",
            self.pending_loads, self.attached, self.failed, self.textures, self.bindings
        )?;
        for g in &self.groups {
            writeln!(
                f,
                "  group {} {}: children={} drawables={}",
                g.id, g.name, g.children, g.drawables
            )?;
        }
        write!(f, "Hovering: {}", if self.hovering { "yes" } else { "no" })
    }
}

/// Detailed info about a single node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub id: NodeId,
    pub name: String,
    pub kind: &'static str,
    pub position: [f32; 3],
    pub scale: [f32; 3],
    pub world_position: [f32; 3],
    pub children: usize,
}

impl std::fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} [{}] pos=({:.2}, {:.2}, {:.2}) scale=({:.2}, {:.2}, {:.2}) world=({:.2}, {:.2}, {:.2}) children={}",
            self.id,
            self.name,
            self.kind,
            self.position[0],
            self.position[1],
            self.position[2],
            self.scale[0],
            self.scale[1],
            self.scale[2],
            self.world_position[0],
            self.world_position[1],
            self.world_position[2],
            self.children,
        )
    }
}
