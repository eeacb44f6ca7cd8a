//! YAML session configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes. A file that parses but fails validation is replaced by the
//! defaults with a warning.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use starfolio_assets::{MaterialPreset, NormalizeSpec, ScalePolicy, TextureOptions};
use starfolio_render::{OrbitControls, PerspectiveCamera};
use starfolio_stars::StarFieldConfig;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A named placeholder group created under the scene root at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub name: String,
    pub position: Vec3,
    /// Per-axis Euler rotation in degrees, applied X then Y then Z.
    pub rotation_degrees: Vec3,
    pub scale: f32,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: Vec3::ZERO,
            rotation_degrees: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

impl GroupConfig {
    fn named(name: &str) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub label: String,
    pub path: String,
    pub group: String,
    #[serde(default)]
    pub normalize: NormalizeSpec,
    #[serde(default)]
    pub interactive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureConfig {
    pub key: String,
    pub path: String,
    #[serde(default)]
    pub options: TextureOptions,
}

/// A point light moving on an ellipse around `center`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitingLightConfig {
    pub color: u32,
    pub intensity: f32,
    pub range: f32,
    pub center: Vec3,
    pub radius_x: f32,
    pub radius_z: f32,
    pub height: f32,
    pub speed: f32,
    pub phase: f32,
}

impl Default for OrbitingLightConfig {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            intensity: 3.0,
            range: 8.0,
            center: Vec3::ZERO,
            radius_x: 3.0,
            radius_z: 3.0,
            height: 1.5,
            speed: 0.5,
            phase: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient_color: u32,
    pub ambient_intensity: f32,
    pub directional_color: u32,
    pub directional_intensity: f32,
    pub directional_position: Vec3,
    pub orbiting: Vec<OrbitingLightConfig>,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_color: 0xffffff,
            ambient_intensity: 2.4,
            directional_color: 0xffffff,
            directional_intensity: 1.8,
            directional_position: Vec3::splat(5.0),
            orbiting: vec![
                OrbitingLightConfig {
                    color: 0x8a5cff,
                    ..OrbitingLightConfig::default()
                },
                OrbitingLightConfig {
                    color: 0x3fd0ff,
                    radius_x: 4.0,
                    radius_z: 2.5,
                    height: -0.5,
                    speed: 0.35,
                    phase: std::f32::consts::PI,
                    ..OrbitingLightConfig::default()
                },
            ],
        }
    }
}

impl LightingConfig {
    pub const AMBIENT: &'static str = "ambient";
    pub const SUN: &'static str = "sun";

    /// Scene node name of the `i`-th orbiting light.
    pub fn orbit_light_name(i: usize) -> String {
        format!("orbit_light_{i}")
    }

    /// Every light node a session creates, in creation order.
    pub fn light_names(&self) -> Vec<String> {
        [Self::AMBIENT.to_string(), Self::SUN.to_string()]
            .into_iter()
            .chain((0..self.orbiting.len()).map(Self::orbit_light_name))
            .collect()
    }
}

/// Procedural motion attached to a group or light by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MotionConfig {
    Spin {
        target: String,
        axis: Vec3,
        /// Radians per second.
        rate: f32,
    },
    Oscillate {
        target: String,
        axis: Vec3,
        amplitude: f32,
        frequency: f32,
        #[serde(default)]
        phase: f32,
    },
    Orbit {
        target: String,
        #[serde(default)]
        center: Vec3,
        radius_x: f32,
        radius_z: f32,
        #[serde(default)]
        height: f32,
        speed: f32,
        #[serde(default)]
        phase: f32,
    },
}

impl MotionConfig {
    pub fn target(&self) -> &str {
        match self {
            Self::Spin { target, .. } | Self::Oscillate { target, .. } | Self::Orbit { target, .. } => target,
        }
    }

    fn axis(&self) -> Option<Vec3> {
        match self {
            Self::Spin { axis, .. } | Self::Oscillate { axis, .. } => Some(*axis),
            Self::Orbit { .. } => None,
        }
    }
}

/// Everything a portfolio session is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioConfig {
    /// Background colour as `0xRRGGBB`.
    pub background: u32,
    pub stars: StarFieldConfig,
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
    pub lighting: LightingConfig,
    pub groups: Vec<GroupConfig>,
    pub models: Vec<ModelConfig>,
    pub textures: Vec<TextureConfig>,
    pub motion: Vec<MotionConfig>,
    /// Opened when the interactive model is clicked.
    pub link_url: String,
    pub max_pixel_ratio: f32,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        let fit = |target_size: f32| ScalePolicy::FitHorizontal {
            target_size,
            fallback: 1.0,
        };
        Self {
            background: 0x09041a,
            stars: StarFieldConfig::default(),
            camera: PerspectiveCamera::default(),
            controls: OrbitControls::default(),
            lighting: LightingConfig::default(),
            groups: vec![
                GroupConfig::named("head"),
                GroupConfig {
                    position: Vec3::new(0.0, 1.9, 0.0),
                    ..GroupConfig::named("label")
                },
                GroupConfig {
                    position: Vec3::new(0.0, -0.2, 0.0),
                    ..GroupConfig::named("decor")
                },
                GroupConfig {
                    position: Vec3::new(1.6, 1.0, 0.0),
                    ..GroupConfig::named("accent")
                },
            ],
            models: vec![
                ModelConfig {
                    label: "head".into(),
                    path: "models/patmog/patmog.gltf".into(),
                    group: "head".into(),
                    normalize: NormalizeSpec {
                        target_offset: Vec3::new(0.0, 0.75, 0.0),
                        scale: ScalePolicy::Fixed { factor: 5.0 },
                        ..NormalizeSpec::default()
                    },
                    interactive: true,
                },
                ModelConfig {
                    label: "label".into(),
                    path: "models/label/label.gltf".into(),
                    group: "label".into(),
                    normalize: NormalizeSpec {
                        scale: fit(2.4),
                        material: Some(MaterialPreset {
                            roughness: 0.35,
                            metalness: 0.6,
                            env_intensity: 1.0,
                            texture: Some("gradient".into()),
                        }),
                        ..NormalizeSpec::default()
                    },
                    interactive: false,
                },
                ModelConfig {
                    label: "decor".into(),
                    path: "models/decor/decor.gltf".into(),
                    group: "decor".into(),
                    normalize: NormalizeSpec {
                        scale: fit(3.0),
                        override_color: Some(starfolio_common::Rgb::from_hex(0x6b4cff)),
                        ..NormalizeSpec::default()
                    },
                    interactive: false,
                },
                ModelConfig {
                    label: "accent".into(),
                    path: "models/accent/accent.gltf".into(),
                    group: "accent".into(),
                    normalize: NormalizeSpec {
                        scale: fit(0.4),
                        ..NormalizeSpec::default()
                    },
                    interactive: false,
                },
            ],
            textures: vec![TextureConfig {
                key: "gradient".into(),
                path: "textures/gradient.png".into(),
                options: TextureOptions::default(),
            }],
            motion: vec![
                MotionConfig::Spin {
                    target: "label".into(),
                    axis: Vec3::Y,
                    rate: 0.6,
                },
                MotionConfig::Spin {
                    target: "decor".into(),
                    axis: Vec3::Y,
                    rate: -0.15,
                },
                MotionConfig::Orbit {
                    target: "accent".into(),
                    center: Vec3::new(0.0, 0.0, 0.0),
                    radius_x: 1.6,
                    radius_z: 1.6,
                    height: 1.0,
                    speed: 0.4,
                    phase: 0.0,
                },
                MotionConfig::Oscillate {
                    target: "accent".into(),
                    axis: Vec3::X,
                    amplitude: 0.5,
                    frequency: 1.5,
                    phase: 0.0,
                },
            ],
            link_url: "https://github.com/default-user".into(),
            max_pixel_ratio: 2.0,
        }
    }
}

impl PortfolioConfig {
    /// Load from a YAML file. Missing fields take defaults; a config that
    /// fails validation is replaced by the defaults with a warning.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&content)?;
        if let Err(e) = config.validate() {
            warn!("config validation warning: {e}");
            warn!("falling back to default config");
            return Ok(Self::default());
        }
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stars
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("stars: {e}")))?;

        let cam = &self.camera;
        if !(cam.near > 0.0 && cam.far > cam.near && cam.fov_degrees > 0.0 && cam.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera: need 0 < near < far and 0 < fov < 180, got near={} far={} fov={}",
                cam.near, cam.far, cam.fov_degrees
            )));
        }
        if !(self.controls.min_distance > 0.0 && self.controls.max_distance >= self.controls.min_distance) {
            return Err(ConfigError::Invalid("controls: distance limits out of order".into()));
        }
        if !(self.controls.damping > 0.0 && self.controls.damping <= 1.0) {
            return Err(ConfigError::Invalid("controls: damping must be in (0, 1]".into()));
        }
        if !(self.max_pixel_ratio.is_finite() && self.max_pixel_ratio > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_pixel_ratio must be positive, got {}",
                self.max_pixel_ratio
            )));
        }

        let mut names = std::collections::HashSet::new();
        for group in &self.groups {
            if group.name.is_empty() || !names.insert(group.name.as_str()) {
                return Err(ConfigError::Invalid(format!("group name {:?} is empty or repeated", group.name)));
            }
        }
        for model in &self.models {
            if !names.contains(model.group.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "model {} targets unknown group {}",
                    model.label, model.group
                )));
            }
            if !model.normalize.scale.is_valid() {
                return Err(ConfigError::Invalid(format!(
                    "model {} needs finite positive scale factors, got {:?}",
                    model.label, model.normalize.scale
                )));
            }
        }
        if self.models.iter().filter(|m| m.interactive).count() > 1 {
            return Err(ConfigError::Invalid("at most one model may be interactive".into()));
        }
        let lights = self.lighting.light_names();
        for motion in &self.motion {
            let target = motion.target();
            if !names.contains(target) && !lights.iter().any(|l| l == target) {
                return Err(ConfigError::Invalid(format!("motion targets unknown group or light {target:?}")));
            }
            if motion.axis().is_some_and(|a| !a.is_finite() || a.length_squared() == 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "motion on {} needs a non-zero axis",
                    motion.target()
                )));
            }
        }
        Ok(())
    }
}
