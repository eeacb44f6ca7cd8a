//! CPU-side layouts uploaded to the GPU.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};
use starfolio_common::Rgb;
use starfolio_render::{PerspectiveCamera, SceneLights};
use starfolio_scene::{Drawable, Material};

pub const MAX_DIRECTIONAL: usize = 2;
pub const MAX_POINT: usize = 4;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
    pub uv: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Globals {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub camera_right: [f32; 4],
    pub camera_up: [f32; 4],
    pub ambient: [f32; 4],
    pub dir_dir: [[f32; 4]; MAX_DIRECTIONAL],
    pub dir_color: [[f32; 4]; MAX_DIRECTIONAL],
    pub point_pos: [[f32; 4]; MAX_POINT],
    pub point_color: [[f32; 4]; MAX_POINT],
    pub counts: [f32; 4],
}

impl Globals {
    /// Lights beyond the shader's fixed slots are dropped.
    pub fn new(camera: &PerspectiveCamera, lights: &SceneLights, star_size: f32, elapsed: f32) -> Self {
        let view = camera.view_matrix();
        let right = view.row(0).truncate();
        let up = view.row(1).truncate();
        let mut globals = Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
            camera_right: right.extend(0.0).to_array(),
            camera_up: up.extend(0.0).to_array(),
            ambient: with_w(linear(lights.ambient), 0.0),
            ..Self::zeroed()
        };
        let dirs = lights.directional.len().min(MAX_DIRECTIONAL);
        for (i, (dir, color)) in lights.directional.iter().take(dirs).enumerate() {
            globals.dir_dir[i] = dir.extend(0.0).to_array();
            globals.dir_color[i] = with_w(linear(*color), 0.0);
        }
        let points = lights.points.len().min(MAX_POINT);
        for (i, p) in lights.points.iter().take(points).enumerate() {
            globals.point_pos[i] = p.position.extend(p.range).to_array();
            globals.point_color[i] = with_w(linear(p.color), 0.0);
        }
        globals.counts = [dirs as f32, points as f32, star_size, elapsed];
        globals
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    pub model: [[f32; 4]; 4],
    pub base_color: [f32; 4],
    pub params: [f32; 4],
}

impl DrawUniforms {
    pub fn new(world: Mat4, material: &Material, textured: bool) -> Self {
        Self {
            model: world.to_cols_array_2d(),
            base_color: with_w(linear(material.base_color), if textured { 1.0 } else { 0.0 }),
            params: [material.roughness, material.metalness, material.env_intensity, 0.0],
        }
    }
}

/// Interleave a drawable's attributes. Unindexed meshes get a sequential
/// index list; missing normals, colours or uvs are filled with defaults.
pub fn pack_mesh(drawable: &Drawable) -> (Vec<MeshVertex>, Vec<u32>) {
    let mesh = &drawable.mesh;
    let colors = mesh.colors.as_deref().filter(|_| drawable.material.vertex_colors);
    let vertices = mesh
        .positions
        .iter()
        .enumerate()
        .map(|(i, p)| MeshVertex {
            position: p.to_array(),
            normal: mesh.normals.get(i).copied().unwrap_or(glam::Vec3::Y).to_array(),
            color: colors
                .and_then(|c| c.get(i))
                .map_or([1.0; 3], |c| linear(*c)),
            uv: mesh
                .uvs
                .as_deref()
                .and_then(|u| u.get(i))
                .copied()
                .unwrap_or(Vec2::ZERO)
                .to_array(),
        })
        .collect::<Vec<_>>();
    let indices = if mesh.indices.is_empty() {
        (0..vertices.len() as u32 - vertices.len() as u32 % 3).collect()
    } else {
        let n = vertices.len() as u32;
        mesh.indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&i| i < n))
            .flatten()
            .copied()
            .collect()
    };
    (vertices, indices)
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Colours are authored in sRGB; shading happens in linear space.
pub fn linear(c: Rgb) -> [f32; 3] {
    [srgb_to_linear(c.r), srgb_to_linear(c.g), srgb_to_linear(c.b)]
}

pub fn clear_color(c: Rgb) -> wgpu::Color {
    let [r, g, b] = linear(c);
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: 1.0,
    }
}

/// Swapchain extent for a requested physical size: at least 1x1, and scaled
/// down uniformly when either side exceeds the device's texture limit.
pub fn surface_extent(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let (width, height) = (width.max(1), height.max(1));
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }
    let k = max_dimension as f64 / longest as f64;
    let shrink = |v: u32| ((v as f64 * k).floor() as u32).clamp(1, max_dimension);
    (shrink(width), shrink(height))
}

fn with_w([x, y, z]: [f32; 3], w: f32) -> [f32; 4] {
    [x, y, z, w]
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use starfolio_render::PointLight;
    use starfolio_scene::Mesh;

    #[test]
    fn uniform_layouts_are_sixteen_byte_aligned() {
        assert_eq!(std::mem::size_of::<Globals>() % 16, 0);
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 96);
        assert_eq!(std::mem::size_of::<MeshVertex>(), 44);
    }

    #[test]
    fn unindexed_mesh_gets_sequential_indices() {
        let drawable = Drawable {
            mesh: Mesh {
                positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
                ..Mesh::default()
            },
            ..Drawable::default()
        };
        let (vertices, indices) = pack_mesh(&drawable);
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(vertices[0].normal, [0.0, 1.0, 0.0]);
        assert_eq!(vertices[0].color, [1.0; 3]);
    }

    #[test]
    fn broken_triangles_are_dropped() {
        let drawable = Drawable {
            mesh: Mesh {
                positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                indices: vec![0, 1, 2, 2, 1, 7],
                ..Mesh::default()
            },
            ..Drawable::default()
        };
        assert_eq!(pack_mesh(&drawable).1, vec![0, 1, 2]);
    }

    #[test]
    fn vertex_colours_follow_the_material_flag() {
        let mut drawable = Drawable {
            mesh: Mesh::cuboid(Vec3::ONE),
            ..Drawable::default()
        };
        drawable.mesh.colors = Some(vec![Rgb::BLACK; drawable.mesh.positions.len()]);
        assert_eq!(pack_mesh(&drawable).0[0].color, [1.0; 3]);
        drawable.material.vertex_colors = true;
        assert_eq!(pack_mesh(&drawable).0[0].color, [0.0; 3]);
    }

    #[test]
    fn extra_lights_are_dropped() {
        let lights = SceneLights {
            ambient: Rgb::WHITE,
            directional: vec![(Vec3::NEG_Y, Rgb::WHITE); 3],
            points: vec![
                PointLight {
                    position: Vec3::X,
                    color: Rgb::WHITE,
                    range: 4.0,
                };
                6
            ],
        };
        let globals = Globals::new(&PerspectiveCamera::default(), &lights, 0.15, 2.0);
        assert_eq!(globals.counts, [2.0, 4.0, 0.15, 2.0]);
        assert_eq!(globals.point_pos[3], [1.0, 0.0, 0.0, 4.0]);
        assert_eq!(globals.ambient, [1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn camera_basis_is_orthonormal() {
        let globals = Globals::new(&PerspectiveCamera::default(), &SceneLights::default(), 1.0, 0.0);
        let right = Vec3::from_slice(&globals.camera_right[..3]);
        let up = Vec3::from_slice(&globals.camera_up[..3]);
        assert!((right.length() - 1.0).abs() < 1e-5);
        assert!(right.dot(up).abs() < 1e-5);
    }

    #[test]
    fn surface_extent_respects_the_texture_limit() {
        assert_eq!(surface_extent(0, 0, 8192), (1, 1));
        assert_eq!(surface_extent(2560, 1440, 8192), (2560, 1440));
        assert_eq!(surface_extent(16384, 8192, 8192), (8192, 4096));
        assert_eq!(surface_extent(3000, 9000, 4500), (1500, 4500));
    }

    #[test]
    fn srgb_endpoints() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!(srgb_to_linear(0.5) < 0.25);
    }
}
