use crate::pointer::PointerState;
use glam::{Mat4, Vec3};
use starfolio_common::{NodeId, Ray};
use starfolio_render::PerspectiveCamera;
use starfolio_scene::{Drawable, NodeTree, NodeVisitor};

/// Nearest intersection of a ray with a subtree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub node: NodeId,
    /// Distance along the ray in world units.
    pub distance: f32,
    pub point: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverTransition {
    None,
    Entered,
    Left,
}

/// Opens links on behalf of a click.
pub trait Navigator {
    fn open(&mut self, url: &str);
}

struct PickVisitor {
    ray: Ray,
    best: Option<Hit>,
}

impl PickVisitor {
    fn offer(&mut self, node: NodeId, point: Vec3) {
        let distance = self.ray.origin.distance(point);
        if self.best.is_none_or(|b| distance < b.distance) {
            self.best = Some(Hit { node, distance, point });
        }
    }
}

impl NodeVisitor for PickVisitor {
    fn drawable(&mut self, id: NodeId, drawable: &Drawable, world: &Mat4) {
        let bounds = drawable.mesh.bounds();
        let Some(box_t) = self.ray.intersect_aabb(&bounds.transformed(world)) else {
            return;
        };
        if drawable.mesh.triangle_count() == 0 || world.determinant().abs() < 1e-12 {
            self.offer(id, self.ray.at(box_t));
            return;
        }
        let local = self.ray.transformed(&world.inverse());
        let nearest = drawable
            .mesh
            .triangles()
            .filter_map(|[a, b, c]| local.intersect_triangle(a, b, c))
            .fold(None, |acc: Option<f32>, t| Some(acc.map_or(t, |m| m.min(t))));
        if let Some(t) = nearest {
            self.offer(id, world.transform_point3(local.at(t)));
        }
    }
}

/// Nearest hit of `ray` against the visible drawables under `from`.
pub fn pick(tree: &NodeTree, from: NodeId, ray: Ray) -> Option<Hit> {
    let base = tree
        .get(from)
        .and_then(|n| n.parent())
        .map_or(Mat4::IDENTITY, |p| tree.world_matrix(p));
    let mut visitor = PickVisitor { ray, best: None };
    tree.walk_visible(from, base, &mut visitor);
    visitor.best
}

/// Hover state for the single interactive target.
#[derive(Debug, Clone, Default)]
pub struct HitTester {
    target: Option<NodeId>,
    hover: Option<Hit>,
}

impl HitTester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `root` the interactive target, replacing any previous one.
    pub fn set_target(&mut self, root: NodeId) {
        tracing::debug!(%root, "interactive target set");
        self.target = Some(root);
        self.hover = None;
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn hover(&self) -> Option<&Hit> {
        self.hover.as_ref()
    }

    pub fn is_hovering(&self) -> bool {
        self.hover.is_some()
    }

    /// Re-test the pointer ray against the target. Without a target or a
    /// pointer position the state is idle.
    pub fn evaluate(
        &mut self,
        tree: &NodeTree,
        camera: &PerspectiveCamera,
        pointer: &PointerState,
    ) -> HoverTransition {
        let hit = match (self.target, pointer.ndc()) {
            (Some(target), Some(ndc)) if tree.contains(target) => {
                pick(tree, target, camera.ray_from_ndc(ndc))
            }
            _ => None,
        };
        let was_hovering = self.hover.is_some();
        self.hover = hit;
        match (was_hovering, self.hover.is_some()) {
            (false, true) => {
                tracing::trace!("pointer entered target");
                HoverTransition::Entered
            }
            (true, false) => {
                tracing::trace!("pointer left target");
                HoverTransition::Left
            }
            _ => HoverTransition::None,
        }
    }

    /// Open `url` if the pointer is over the target. Returns whether it did.
    pub fn click(&self, url: &str, navigator: &mut dyn Navigator) -> bool {
        if self.hover.is_none() || url.is_empty() {
            return false;
        }
        tracing::info!(url, "opening link");
        navigator.open(url);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use starfolio_common::Transform;
    use starfolio_scene::{Mesh, SceneNode};

    #[derive(Default)]
    struct Recorder {
        opened: Vec<String>,
    }

    impl Navigator for Recorder {
        fn open(&mut self, url: &str) {
            self.opened.push(url.to_string());
        }
    }

    /// Camera on +Z looking at a unit cube at the origin.
    fn setup() -> (NodeTree, NodeId, PerspectiveCamera) {
        let mut tree = NodeTree::default();
        let group = tree
            .add(tree.root(), SceneNode::group("head").with_transform(Transform::from_position(Vec3::ZERO)))
            .unwrap();
        let model = tree.add(group, SceneNode::group("model")).unwrap();
        tree.add(
            model,
            SceneNode::drawable(
                "face",
                Drawable {
                    mesh: Mesh::cuboid(Vec3::ONE),
                    ..Drawable::default()
                },
            ),
        )
        .unwrap();
        let mut camera = PerspectiveCamera::default();
        camera.position = Vec3::new(0.0, 0.0, 5.0);
        camera.target = Vec3::ZERO;
        camera.set_aspect(1.0);
        (tree, model, camera)
    }

    fn pointer_at(x: f32, y: f32) -> PointerState {
        let mut p = PointerState::default();
        p.set_ndc(Vec2::new(x, y));
        p
    }

    #[test]
    fn centre_ray_hits_front_face() {
        let (tree, model, camera) = setup();
        let hit = pick(&tree, model, camera.ray_from_ndc(Vec2::ZERO)).unwrap();
        assert!((hit.distance - 4.5).abs() < 1e-4);
        assert!((hit.point.z - 0.5).abs() < 1e-4);
    }

    #[test]
    fn hover_follows_the_pointer() {
        let (tree, model, camera) = setup();
        let mut tester = HitTester::new();
        tester.set_target(model);

        assert_eq!(tester.evaluate(&tree, &camera, &pointer_at(0.0, 0.0)), HoverTransition::Entered);
        assert!(tester.is_hovering());
        assert_eq!(tester.evaluate(&tree, &camera, &pointer_at(0.05, 0.0)), HoverTransition::None);
        assert_eq!(tester.evaluate(&tree, &camera, &pointer_at(0.9, 0.9)), HoverTransition::Left);
        assert!(!tester.is_hovering());
    }

    #[test]
    fn no_target_or_pointer_means_idle() {
        let (tree, model, camera) = setup();
        let mut tester = HitTester::new();
        assert_eq!(tester.evaluate(&tree, &camera, &pointer_at(0.0, 0.0)), HoverTransition::None);
        tester.set_target(model);
        assert_eq!(tester.evaluate(&tree, &camera, &PointerState::default()), HoverTransition::None);
        assert!(!tester.is_hovering());
    }

    #[test]
    fn moved_group_moves_the_hit_region() {
        let (mut tree, model, camera) = setup();
        let group = tree.get(model).unwrap().parent().unwrap();
        tree.get_mut(group).unwrap().transform.position = Vec3::new(3.0, 0.0, 0.0);
        let mut tester = HitTester::new();
        tester.set_target(model);
        assert_eq!(tester.evaluate(&tree, &camera, &pointer_at(0.0, 0.0)), HoverTransition::None);
    }

    #[test]
    fn click_navigates_only_while_hovering() {
        let (tree, model, camera) = setup();
        let mut tester = HitTester::new();
        tester.set_target(model);
        let mut nav = Recorder::default();

        tester.evaluate(&tree, &camera, &pointer_at(0.9, 0.9));
        assert!(!tester.click("https://example.com", &mut nav));
        assert!(nav.opened.is_empty());

        tester.evaluate(&tree, &camera, &pointer_at(0.0, 0.0));
        assert!(tester.click("https://example.com", &mut nav));
        assert_eq!(nav.opened, vec!["https://example.com"]);
    }
}
