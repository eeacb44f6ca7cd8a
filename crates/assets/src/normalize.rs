use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use starfolio_common::Rgb;
use starfolio_scene::NodeTree;

/// Horizontal extents below this are treated as degenerate.
const MIN_EXTENT: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalePolicy {
    Fixed { factor: f32 },
    /// Largest of the X and Z extents maps to `target_size`.
    FitHorizontal { target_size: f32, fallback: f32 },
}

impl Default for ScalePolicy {
    fn default() -> Self {
        Self::Fixed { factor: 1.0 }
    }
}

impl ScalePolicy {
    /// Every factor is finite and positive.
    pub fn is_valid(&self) -> bool {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        match *self {
            Self::Fixed { factor } => positive(factor),
            Self::FitHorizontal {
                target_size,
                fallback,
            } => positive(target_size) && positive(fallback),
        }
    }

    /// Scale factor for geometry of `size`, and whether the fallback was used.
    pub fn resolve(&self, size: Vec3) -> (f32, bool) {
        match *self {
            Self::Fixed { factor } => (factor, false),
            Self::FitHorizontal {
                target_size,
                fallback,
            } => {
                let extent = size.x.max(size.z);
                if extent.is_finite() && extent > MIN_EXTENT {
                    (target_size / extent, false)
                } else {
                    (fallback, true)
                }
            }
        }
    }
}

/// Surface overrides applied to every drawable of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialPreset {
    pub roughness: f32,
    pub metalness: f32,
    pub env_intensity: f32,
    #[serde(default)]
    pub texture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeSpec {
    /// Where the bounding-box centre ends up, in the parent group's frame.
    pub target_offset: Vec3,
    pub scale: ScalePolicy,
    pub material: Option<MaterialPreset>,
    /// Replace vertex colours with this uniform colour.
    pub override_color: Option<Rgb>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    /// Bounding-box centre before scaling, in the root's rotated frame.
    pub center: Vec3,
    pub size: Vec3,
    pub scale: f32,
    /// The box was empty or flat and the fallback scale was used.
    pub degenerate: bool,
}

/// Re-centre and rescale a detached model so its bounding-box centre sits
/// at `spec.target_offset`.
///
/// Bounds are measured with the root's rotation but without its position or
/// scale, so running this twice gives the same transform as running it once.
pub fn normalize(tree: &mut NodeTree, spec: &NormalizeSpec) -> Normalization {
    let root = tree.root();
    let rotation = tree
        .get(root)
        .map(|n| n.transform.rotation)
        .unwrap_or_default();
    let bounds = tree.bounds_with_root(root, Mat4::from_quat(rotation));

    let (center, size) = if bounds.is_empty() {
        (Vec3::ZERO, Vec3::ZERO)
    } else {
        (bounds.center(), bounds.size())
    };
    let (scale, degenerate) = spec.scale.resolve(size);
    if degenerate {
        tracing::debug!(?size, fallback = scale, "degenerate model bounds, using fallback scale");
    }

    if let Some(node) = tree.get_mut(root) {
        node.transform.scale = Vec3::splat(scale);
        node.transform.position = spec.target_offset - center * scale;
    }

    if let Some(preset) = &spec.material {
        tree.for_each_drawable_mut(root, |d| {
            d.material.roughness = preset.roughness;
            d.material.metalness = preset.metalness;
            d.material.env_intensity = preset.env_intensity;
            if preset.texture.is_some() {
                d.material.texture = preset.texture.clone();
            }
        });
    }
    if let Some(color) = spec.override_color {
        tree.for_each_drawable_mut(root, |d| {
            d.mesh.colors = None;
            d.material.vertex_colors = false;
            d.material.base_color = color;
        });
    }

    Normalization {
        center,
        size,
        scale,
        degenerate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starfolio_common::Transform;
    use starfolio_scene::{Drawable, Mesh, SceneNode};

    fn model(offset: Vec3, size: Vec3) -> NodeTree {
        let mut tree = NodeTree::new(SceneNode::group("model"));
        let drawable = Drawable {
            mesh: Mesh::cuboid(size),
            ..Drawable::default()
        };
        tree.add(
            tree.root(),
            SceneNode::drawable("body", drawable).with_transform(Transform::from_position(offset)),
        )
        .unwrap();
        tree
    }

    fn world_center(tree: &NodeTree) -> Vec3 {
        tree.subtree_bounds(tree.root()).center()
    }

    fn fit(target_size: f32) -> ScalePolicy {
        ScalePolicy::FitHorizontal {
            target_size,
            fallback: 0.5,
        }
    }

    #[test]
    fn centre_lands_on_target_offset() {
        let mut tree = model(Vec3::new(5.0, -3.0, 2.0), Vec3::new(4.0, 1.0, 2.0));
        let spec = NormalizeSpec {
            target_offset: Vec3::new(0.0, 0.4, 0.0),
            scale: fit(2.0),
            ..NormalizeSpec::default()
        };
        let n = normalize(&mut tree, &spec);
        assert_eq!(n.scale, 0.5);
        assert!(!n.degenerate);
        assert!(world_center(&tree).abs_diff_eq(spec.target_offset, 1e-5));
        let size = tree.subtree_bounds(tree.root()).size();
        assert!((size.x.max(size.z) - 2.0).abs() < 1e-5);
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        for seed in 0..16u32 {
            let k = seed as f32;
            let mut tree = model(Vec3::new(k, -k * 0.5, 3.0), Vec3::new(1.0 + k, 2.0, 0.5 + k * 0.25));
            tree.get_mut(tree.root()).unwrap().transform.rotation = glam::Quat::from_rotation_y(k * 0.3);
            let spec = NormalizeSpec {
                target_offset: Vec3::new(1.0, 2.0, -1.0),
                scale: fit(1.5),
                ..NormalizeSpec::default()
            };
            normalize(&mut tree, &spec);
            let once = tree.get(tree.root()).unwrap().transform;
            normalize(&mut tree, &spec);
            let twice = tree.get(tree.root()).unwrap().transform;
            assert!(once.position.abs_diff_eq(twice.position, 1e-5), "seed {seed}");
            assert_eq!(once.scale, twice.scale);
            assert!(world_center(&tree).abs_diff_eq(spec.target_offset, 1e-4), "seed {seed}");
        }
    }

    #[test]
    fn fixed_scale_is_applied_verbatim() {
        let mut tree = model(Vec3::X, Vec3::ONE);
        let spec = NormalizeSpec {
            scale: ScalePolicy::Fixed { factor: 5.0 },
            ..NormalizeSpec::default()
        };
        normalize(&mut tree, &spec);
        let root = tree.get(tree.root()).unwrap().transform;
        assert_eq!(root.scale, Vec3::splat(5.0));
        assert!(world_center(&tree).abs_diff_eq(Vec3::ZERO, 1e-5));
    }

    #[test]
    fn scale_policy_validity() {
        assert!(ScalePolicy::default().is_valid());
        assert!(!ScalePolicy::Fixed { factor: 0.0 }.is_valid());
        assert!(!ScalePolicy::Fixed { factor: f32::INFINITY }.is_valid());
        let fit = |target_size, fallback| ScalePolicy::FitHorizontal {
            target_size,
            fallback,
        };
        assert!(fit(2.4, 1.0).is_valid());
        assert!(!fit(f32::NAN, 1.0).is_valid());
        assert!(!fit(2.4, -1.0).is_valid());
    }

    #[test]
    fn empty_model_uses_fallback() {
        let mut tree = NodeTree::new(SceneNode::group("empty"));
        let spec = NormalizeSpec {
            target_offset: Vec3::Y,
            scale: fit(2.0),
            ..NormalizeSpec::default()
        };
        let n = normalize(&mut tree, &spec);
        assert!(n.degenerate);
        assert_eq!(n.scale, 0.5);
        assert_eq!(tree.get(tree.root()).unwrap().transform.position, Vec3::Y);
    }

    #[test]
    fn flat_vertical_model_uses_fallback() {
        let mut tree = model(Vec3::ZERO, Vec3::new(0.0, 3.0, 0.0));
        let n = normalize(
            &mut tree,
            &NormalizeSpec {
                scale: fit(2.0),
                ..NormalizeSpec::default()
            },
        );
        assert!(n.degenerate);
    }

    #[test]
    fn material_preset_and_colour_override() {
        let mut tree = model(Vec3::ZERO, Vec3::ONE);
        tree.for_each_drawable_mut(tree.root(), |d| {
            d.mesh.colors = Some(vec![Rgb::BLACK; d.mesh.positions.len()]);
            d.material.vertex_colors = true;
        });
        let spec = NormalizeSpec {
            material: Some(MaterialPreset {
                roughness: 0.2,
                metalness: 0.9,
                env_intensity: 1.5,
                texture: Some("gradient".into()),
            }),
            override_color: Some(Rgb::from_hex(0xff00ff)),
            ..NormalizeSpec::default()
        };
        normalize(&mut tree, &spec);
        let body = tree.find_by_name(tree.root(), "body").unwrap();
        let d = tree.get(body).unwrap().as_drawable().unwrap();
        assert_eq!(d.material.roughness, 0.2);
        assert_eq!(d.material.metalness, 0.9);
        assert_eq!(d.material.texture.as_deref(), Some("gradient"));
        assert!(d.mesh.colors.is_none());
        assert!(!d.material.vertex_colors);
        assert_eq!(d.material.base_color, Rgb::from_hex(0xff00ff));
    }
}
