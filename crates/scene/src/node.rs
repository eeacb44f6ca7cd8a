use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use starfolio_common::{Aabb, NodeId, Rgb, Transform};

/// Triangle geometry in the owning node's local frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Triangle list. Empty means `positions` is already a triangle list.
    pub indices: Vec<u32>,
    /// Per-vertex colours, when the source asset carried them.
    pub colors: Option<Vec<Rgb>>,
    #[serde(default)]
    pub uvs: Option<Vec<Vec2>>,
}

impl Mesh {
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.positions)
    }

    pub fn triangle_count(&self) -> usize {
        if self.indices.is_empty() {
            self.positions.len() / 3
        } else {
            self.indices.len() / 3
        }
    }

    /// Triangles as vertex triples. Out-of-range indices are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        let n = self.triangle_count();
        (0..n).filter_map(move |i| {
            let (a, b, c) = if self.indices.is_empty() {
                (i * 3, i * 3 + 1, i * 3 + 2)
            } else {
                (
                    self.indices[i * 3] as usize,
                    self.indices[i * 3 + 1] as usize,
                    self.indices[i * 3 + 2] as usize,
                )
            };
            Some([
                *self.positions.get(a)?,
                *self.positions.get(b)?,
                *self.positions.get(c)?,
            ])
        })
    }

    /// Axis-aligned box centred on the origin.
    pub fn cuboid(size: Vec3) -> Self {
        let h = size * 0.5;
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Y, Vec3::NEG_Z),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::Z, Vec3::NEG_X),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::X, Vec3::NEG_Y),
        ];
        let mut mesh = Mesh::default();
        for (normal, u, v) in faces {
            let base = mesh.positions.len() as u32;
            let c = normal * h;
            let du = u * h;
            let dv = v * h;
            for corner in [c - du - dv, c + du - dv, c + du + dv, c - du + dv] {
                mesh.positions.push(corner);
                mesh.normals.push(normal);
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        mesh
    }
}

/// Surface parameters the renderer understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub base_color: Rgb,
    pub roughness: f32,
    pub metalness: f32,
    pub env_intensity: f32,
    pub vertex_colors: bool,
    /// Key into the texture registry.
    pub texture: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: Rgb::new(0.8, 0.8, 0.8),
            roughness: 1.0,
            metalness: 0.0,
            env_intensity: 1.0,
            vertex_colors: false,
            texture: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Drawable {
    pub mesh: Mesh,
    pub material: Material,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Light {
    Ambient { color: Rgb, intensity: f32 },
    /// Shines from the node position towards the origin.
    Directional { color: Rgb, intensity: f32 },
    Point { color: Rgb, intensity: f32, range: f32 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum NodeKind {
    #[default]
    Group,
    Drawable(Drawable),
    Light(Light),
}

/// One node of a [`crate::NodeTree`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub visible: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl SceneNode {
    pub fn group(name: impl Into<String>) -> Self {
        Self::with_kind(name, NodeKind::Group)
    }

    pub fn drawable(name: impl Into<String>, drawable: Drawable) -> Self {
        Self::with_kind(name, NodeKind::Drawable(drawable))
    }

    pub fn light(name: impl Into<String>, light: Light) -> Self {
        Self::with_kind(name, NodeKind::Light(light))
    }

    fn with_kind(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            kind,
            visible: true,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn as_drawable(&self) -> Option<&Drawable> {
        match &self.kind {
            NodeKind::Drawable(d) => Some(d),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_has_twelve_triangles_and_expected_bounds() {
        let mesh = Mesh::cuboid(Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.triangles().count(), 12);
        let b = mesh.bounds();
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(b.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn unindexed_mesh_reads_positions_in_triples() {
        let mesh = Mesh {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
            ..Mesh::default()
        };
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.triangles().next().unwrap(), [Vec3::ZERO, Vec3::X, Vec3::Y]);
    }

    #[test]
    fn out_of_range_indices_are_skipped() {
        let mesh = Mesh {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            indices: vec![0, 1, 2, 0, 1, 9],
            ..Mesh::default()
        };
        assert_eq!(mesh.triangles().count(), 1);
    }
}
