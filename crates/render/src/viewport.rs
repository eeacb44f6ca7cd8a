use crate::camera::PerspectiveCamera;

/// Output resolution derived from a viewport change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    /// Logical size in CSS-style pixels.
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
    pub physical_width: u32,
    pub physical_height: u32,
}

impl SurfaceSize {
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Keeps the camera projection and output resolution in step with the
/// viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportBinder {
    pub max_pixel_ratio: f32,
}

impl Default for ViewportBinder {
    fn default() -> Self {
        Self { max_pixel_ratio: 2.0 }
    }
}

impl ViewportBinder {
    pub fn new(max_pixel_ratio: f32) -> Self {
        Self { max_pixel_ratio }
    }

    pub fn pixel_ratio(&self, device_pixel_ratio: f32) -> f32 {
        let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        dpr.min(self.max_pixel_ratio)
    }

    /// Update `camera`'s aspect for a `width`x`height` logical viewport and
    /// return the surface size to render at.
    pub fn apply(
        &self,
        camera: &mut PerspectiveCamera,
        width: u32,
        height: u32,
        device_pixel_ratio: f32,
    ) -> SurfaceSize {
        let width = width.max(1);
        let height = height.max(1);
        let pixel_ratio = self.pixel_ratio(device_pixel_ratio);
        camera.set_aspect(width as f32 / height as f32);
        let size = SurfaceSize {
            width,
            height,
            pixel_ratio,
            physical_width: ((width as f32 * pixel_ratio).round() as u32).max(1),
            physical_height: ((height as f32 * pixel_ratio).round() as u32).max(1),
        };
        tracing::debug!(width, height, pixel_ratio, "viewport bound");
        size
    }
}
