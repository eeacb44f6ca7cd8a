use crate::palette::Palette;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Errors from starfield generation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StarFieldError {
    #[error("min_radius {min_radius} must be in [0, {half_range}) for max_range {max_range}")]
    InvalidRadii {
        min_radius: f32,
        max_range: f32,
        half_range: f32,
    },
    #[error("palette bands must be finite")]
    InvalidPalette,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarFieldConfig {
    pub count: usize,
    /// No star lies closer than this to the origin.
    pub min_radius: f32,
    /// Edge length of the sampling cube.
    pub max_range: f32,
    /// Point size in world units, for renderers that honour it.
    pub size: f32,
    pub palette: Palette,
    /// Fixed seed for a reproducible sky; entropy when unset.
    pub seed: Option<u64>,
}

impl Default for StarFieldConfig {
    fn default() -> Self {
        Self {
            count: 5000,
            min_radius: 20.0,
            max_range: 200.0,
            size: 0.15,
            palette: Palette::default(),
            seed: None,
        }
    }
}

impl StarFieldConfig {
    pub fn validate(&self) -> Result<(), StarFieldError> {
        let half_range = self.max_range * 0.5;
        let radii_ok = self.max_range.is_finite()
            && self.max_range > 0.0
            && self.min_radius.is_finite()
            && self.min_radius >= 0.0
            && self.min_radius < half_range;
        if !radii_ok {
            return Err(StarFieldError::InvalidRadii {
                min_radius: self.min_radius,
                max_range: self.max_range,
                half_range,
            });
        }
        if !self.palette.is_valid() {
            return Err(StarFieldError::InvalidPalette);
        }
        Ok(())
    }
}

/// One point of the field, laid out for direct upload as a vertex buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Star {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Star {
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// Immutable star buffer.
#[derive(Debug, Clone)]
pub struct StarField {
    stars: Box<[Star]>,
    size: f32,
}

impl StarField {
    /// Generate from the configured seed, or from entropy.
    pub fn generate(config: &StarFieldConfig) -> Result<Self, StarFieldError> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::generate_with(config, &mut rng)
    }

    pub fn generate_with(
        config: &StarFieldConfig,
        rng: &mut impl Rng,
    ) -> Result<Self, StarFieldError> {
        config.validate()?;
        let _span = tracing::info_span!("starfield_generate", count = config.count).entered();

        let half = config.max_range * 0.5;
        let min_sq = config.min_radius * config.min_radius;
        let mut stars = Vec::with_capacity(config.count);
        let mut rejected: u64 = 0;

        while stars.len() < config.count {
            let p = Vec3::new(
                rng.gen_range(-half..=half),
                rng.gen_range(-half..=half),
                rng.gen_range(-half..=half),
            );
            if p.length_squared() < min_sq {
                rejected += 1;
                continue;
            }
            stars.push(Star {
                position: p.to_array(),
                color: config.palette.sample(rng).to_array(),
            });
        }

        tracing::debug!(accepted = stars.len(), rejected, "starfield generated");
        Ok(Self {
            stars: stars.into_boxed_slice(),
            size: config.size,
        })
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.stars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(count: usize, min_radius: f32, max_range: f32) -> StarFieldConfig {
        StarFieldConfig {
            count,
            min_radius,
            max_range,
            ..StarFieldConfig::default()
        }
    }

    #[test]
    fn every_point_respects_both_bounds_across_seeds() {
        for seed in 0..64 {
            let cfg = StarFieldConfig {
                seed: Some(seed),
                ..config(500, 30.0, 200.0)
            };
            let field = StarField::generate(&cfg).unwrap();
            for star in field.stars() {
                let p = star.position();
                assert!(p.length() >= 30.0, "seed {seed}: {p} inside hole");
                assert!(p.abs().max_element() <= 100.0, "seed {seed}: {p} outside cube");
            }
        }
    }

    #[test]
    fn exact_count_even_with_tight_hole() {
        // Hole radius close to the cube half-width leaves mostly corners.
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let field = StarField::generate_with(&config(200, 9.9, 20.0), &mut rng).unwrap();
            assert_eq!(field.len(), 200);
        }
    }

    #[test]
    fn zero_min_radius_fills_the_cube() {
        let mut rng = StdRng::seed_from_u64(5);
        let field = StarField::generate_with(&config(1000, 0.0, 2.0), &mut rng).unwrap();
        assert_eq!(field.len(), 1000);
        assert!(field.stars().iter().any(|s| s.position().length() < 0.5));
    }

    #[test]
    fn empty_field_is_allowed() {
        let mut rng = StdRng::seed_from_u64(0);
        let field = StarField::generate_with(&config(0, 1.0, 10.0), &mut rng).unwrap();
        assert!(field.is_empty());
        assert!(field.as_bytes().is_empty());
    }

    #[test]
    fn hole_as_large_as_cube_is_rejected() {
        let err = StarField::generate(&config(10, 5.0, 10.0)).unwrap_err();
        assert!(matches!(err, StarFieldError::InvalidRadii { .. }));
        assert!(StarField::generate(&config(10, -1.0, 10.0)).is_err());
        assert!(StarField::generate(&config(10, 1.0, f32::NAN)).is_err());
    }

    #[test]
    fn same_seed_same_sky() {
        let cfg = StarFieldConfig {
            seed: Some(42),
            ..config(100, 10.0, 100.0)
        };
        let a = StarField::generate(&cfg).unwrap();
        let b = StarField::generate(&cfg).unwrap();
        assert_eq!(a.stars(), b.stars());
    }

    #[test]
    fn byte_view_matches_layout() {
        let mut rng = StdRng::seed_from_u64(11);
        let field = StarField::generate_with(&config(3, 1.0, 10.0), &mut rng).unwrap();
        assert_eq!(field.as_bytes().len(), 3 * 6 * 4);
    }

    #[test]
    fn uniform_rgb_palette_is_selectable() {
        let cfg = StarFieldConfig {
            palette: Palette::UniformRgb,
            seed: Some(2),
            ..config(50, 1.0, 10.0)
        };
        let field = StarField::generate(&cfg).unwrap();
        assert!(
            field
                .stars()
                .iter()
                .all(|s| s.color.iter().all(|c| (0.0..=1.0).contains(c)))
        );
    }
}
