use glam::{Mat4, Vec3};
use starfolio_common::{NodeId, Rgb};
use starfolio_scene::{Drawable, Light, NodeTree, NodeVisitor, Scene};

/// A visible drawable and its world matrix.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    pub id: NodeId,
    pub drawable: &'a Drawable,
    pub world: Mat4,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    /// Colour already multiplied by intensity.
    pub color: Rgb,
    pub range: f32,
}

/// Lights reduced to what a simple forward shader needs. Colours are
/// multiplied by intensity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneLights {
    pub ambient: Rgb,
    /// Direction the light travels, and its colour.
    pub directional: Vec<(Vec3, Rgb)>,
    pub points: Vec<PointLight>,
}

#[derive(Default)]
struct DrawCollector {
    found: Vec<(NodeId, Mat4)>,
}

impl NodeVisitor for DrawCollector {
    fn drawable(&mut self, id: NodeId, _drawable: &Drawable, world: &Mat4) {
        self.found.push((id, *world));
    }
}

impl NodeVisitor for SceneLights {
    fn light(&mut self, _id: NodeId, light: &Light, world: &Mat4) {
        let position = world.w_axis.truncate();
        match *light {
            Light::Ambient { color, intensity } => {
                let add = color.scaled(intensity);
                self.ambient = Rgb::new(self.ambient.r + add.r, self.ambient.g + add.g, self.ambient.b + add.b);
            }
            Light::Directional { color, intensity } => {
                let dir = (-position).normalize_or_zero();
                let dir = if dir == Vec3::ZERO { Vec3::NEG_Y } else { dir };
                self.directional.push((dir, color.scaled(intensity)));
            }
            Light::Point { color, intensity, range } => self.points.push(PointLight {
                position,
                color: color.scaled(intensity),
                range,
            }),
        }
    }
}

/// Every visible drawable in the scene, in tree order.
pub fn collect_draws(scene: &Scene) -> Vec<DrawItem<'_>> {
    let tree: &NodeTree = scene.tree();
    let mut collector = DrawCollector::default();
    tree.walk_visible(tree.root(), Mat4::IDENTITY, &mut collector);
    collector
        .found
        .into_iter()
        .filter_map(|(id, world)| {
            let drawable = tree.get(id)?.as_drawable()?;
            Some(DrawItem { id, drawable, world })
        })
        .collect()
}

pub fn collect_lights(scene: &Scene) -> SceneLights {
    let mut lights = SceneLights::default();
    let tree = scene.tree();
    tree.walk_visible(tree.root(), Mat4::IDENTITY, &mut lights);
    lights
}
