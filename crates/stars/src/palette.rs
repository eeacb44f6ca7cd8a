use rand::Rng;
use serde::{Deserialize, Serialize};
use starfolio_common::Rgb;

/// How each star picks its colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Palette {
    /// Independent uniform red, green and blue.
    UniformRgb,
    /// Hue, saturation and lightness each uniform within `[lo, hi]`.
    HslBand {
        hue: [f32; 2],
        saturation: [f32; 2],
        lightness: [f32; 2],
    },
}

impl Default for Palette {
    fn default() -> Self {
        Self::cold()
    }
}

impl Palette {
    /// Pale blues and greys.
    pub fn cold() -> Self {
        Self::HslBand {
            hue: [0.55, 0.70],
            saturation: [0.2, 0.6],
            lightness: [0.65, 0.95],
        }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> Rgb {
        match self {
            Self::UniformRgb => Rgb::new(
                rng.gen_range(0.0..=1.0),
                rng.gen_range(0.0..=1.0),
                rng.gen_range(0.0..=1.0),
            ),
            Self::HslBand {
                hue,
                saturation,
                lightness,
            } => Rgb::from_hsl(
                in_band(rng, *hue),
                in_band(rng, *saturation),
                in_band(rng, *lightness),
            ),
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        match self {
            Self::UniformRgb => true,
            Self::HslBand {
                hue,
                saturation,
                lightness,
            } => [hue, saturation, lightness]
                .iter()
                .all(|b| b[0].is_finite() && b[1].is_finite()),
        }
    }
}

fn in_band(rng: &mut impl Rng, band: [f32; 2]) -> f32 {
    let (lo, hi) = if band[0] <= band[1] {
        (band[0], band[1])
    } else {
        (band[1], band[0])
    };
    rng.gen_range(lo..=hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn uniform_rgb_stays_in_unit_cube() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let c = Palette::UniformRgb.sample(&mut rng);
            for ch in c.to_array() {
                assert!((0.0..=1.0).contains(&ch));
            }
        }
    }

    #[test]
    fn narrow_band_gives_stable_colour() {
        let palette = Palette::HslBand {
            hue: [0.6, 0.6],
            saturation: [0.5, 0.5],
            lightness: [0.8, 0.8],
        };
        let mut rng = StdRng::seed_from_u64(1);
        let a = palette.sample(&mut rng);
        let b = palette.sample(&mut rng);
        assert_eq!(a, b);
        assert_eq!(a, Rgb::from_hsl(0.6, 0.5, 0.8));
    }

    #[test]
    fn reversed_band_is_accepted() {
        let palette = Palette::HslBand {
            hue: [0.7, 0.5],
            saturation: [1.0, 0.0],
            lightness: [0.9, 0.1],
        };
        let mut rng = StdRng::seed_from_u64(9);
        palette.sample(&mut rng);
    }
}
