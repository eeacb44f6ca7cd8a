use crate::camera::PerspectiveCamera;
use crate::frame::{collect_draws, collect_lights};
use crate::viewport::SurfaceSize;
use starfolio_assets::TextureRegistry;
use starfolio_scene::Scene;
use starfolio_stars::StarField;
use std::fmt::Write;

/// Everything a renderer may read for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub scene: &'a Scene,
    pub stars: &'a StarField,
    pub textures: &'a TextureRegistry,
    pub camera: &'a PerspectiveCamera,
    /// Seconds since the session started.
    pub elapsed: f32,
    pub hovering: bool,
}

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// A renderer reads the frame view and produces output; it never mutates
/// the scene.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Adopt a new output resolution.
    fn resize(&mut self, size: SurfaceSize);

    /// Render one frame.
    fn render(&mut self, frame: &FrameView<'_>) -> Self::Output;
}

/// Produces a human-readable description of each frame. Used by the CLI,
/// in logs and in tests.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    size: Option<SurfaceSize>,
    frames: u64,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn size(&self) -> Option<SurfaceSize> {
        self.size
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn resize(&mut self, size: SurfaceSize) {
        self.size = Some(size);
    }

    fn render(&mut self, frame: &FrameView<'_>) -> String {
        self.frames += 1;
        let mut out = String::new();
        let _ = writeln!(out, "=== Frame {} (t={:.3}s) ===", self.frames, frame.elapsed);
        if let Some(s) = self.size {
            let _ = writeln!(
                out,
                "Surface: {}x{} @{:.2} ({}x{} px)",
                s.width, s.height, s.pixel_ratio, s.physical_width, s.physical_height
            );
        }
        let cam = frame.camera;
        let _ = writeln!(
            out,
            "Camera: eye=({:.2}, {:.2}, {:.2}) target=({:.2}, {:.2}, {:.2}) fov={:.0}",
            cam.position.x, cam.position.y, cam.position.z, cam.target.x, cam.target.y, cam.target.z, cam.fov_degrees
        );
        let _ = writeln!(out, "Stars: {} Textures: {}", frame.stars.len(), frame.textures.len());

        let lights = collect_lights(frame.scene);
        let _ = writeln!(
            out,
            "Lights: ambient=({:.2}, {:.2}, {:.2}) directional={} point={}",
            lights.ambient.r,
            lights.ambient.g,
            lights.ambient.b,
            lights.directional.len(),
            lights.points.len()
        );

        let draws = collect_draws(frame.scene);
        let _ = writeln!(out, "Drawables: {}", draws.len());
        for item in &draws {
            let name = frame.scene.tree().get(item.id).map_or("?", |n| n.name.as_str());
            let p = item.world.w_axis;
            let _ = writeln!(
                out,
                "  {} {name} tris={} pos=({:.2}, {:.2}, {:.2})",
                item.id,
                item.drawable.mesh.triangle_count(),
                p.x,
                p.y,
                p.z
            );
        }
        if frame.hovering {
            out.push_str("Pointer: hovering\n");
        }
        out
    }
}
