use glam::Vec2;

/// Last pointer position, in normalized device coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    ndc: Option<Vec2>,
}

impl PointerState {
    /// `None` until the pointer has moved over the viewport once.
    pub fn ndc(&self) -> Option<Vec2> {
        self.ndc
    }

    pub fn set_ndc(&mut self, ndc: Vec2) {
        if ndc.is_finite() {
            self.ndc = Some(ndc.clamp(Vec2::splat(-1.0), Vec2::ONE));
        }
    }

    /// Store a pixel position inside a `width`x`height` viewport. Pixel y
    /// grows downwards, NDC y grows upwards.
    pub fn set_from_pixels(&mut self, x: f32, y: f32, width: u32, height: u32) {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        self.set_ndc(Vec2::new(x / w * 2.0 - 1.0, -(y / h) * 2.0 + 1.0));
    }

    pub fn clear(&mut self) {
        self.ndc = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixels_map_to_ndc() {
        let mut p = PointerState::default();
        assert_eq!(p.ndc(), None);
        p.set_from_pixels(0.0, 0.0, 800, 600);
        assert_eq!(p.ndc(), Some(Vec2::new(-1.0, 1.0)));
        p.set_from_pixels(400.0, 300.0, 800, 600);
        assert_eq!(p.ndc(), Some(Vec2::ZERO));
        p.set_from_pixels(800.0, 600.0, 800, 600);
        assert_eq!(p.ndc(), Some(Vec2::new(1.0, -1.0)));
    }

    #[test]
    fn outside_positions_are_clamped_and_nan_ignored() {
        let mut p = PointerState::default();
        p.set_from_pixels(-50.0, 900.0, 100, 100);
        assert_eq!(p.ndc(), Some(Vec2::new(-1.0, -1.0)));
        p.set_ndc(Vec2::new(f32::NAN, 0.0));
        assert_eq!(p.ndc(), Some(Vec2::new(-1.0, -1.0)));
        p.clear();
        assert_eq!(p.ndc(), None);
    }
}
