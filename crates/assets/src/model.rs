use serde::{Deserialize, Serialize};
use starfolio_animation::AnimationClip;
use starfolio_scene::{NodeTree, SceneNode};
use std::collections::BTreeMap;

/// A parsed model, detached from any scene until the coordinator grafts it.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub name: String,
    pub tree: NodeTree,
    /// In file order; the animation driver picks which one plays.
    pub clips: Vec<AnimationClip>,
}

impl LoadedModel {
    pub fn new(name: impl Into<String>, tree: NodeTree) -> Self {
        Self {
            name: name.into(),
            tree,
            clips: Vec::new(),
        }
    }

    pub fn with_clips(mut self, clips: Vec<AnimationClip>) -> Self {
        self.clips = clips;
        self
    }

    /// An empty model whose root group carries `name`.
    pub fn empty(name: &str) -> Self {
        Self::new(name, NodeTree::new(SceneNode::group(name)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    #[default]
    Srgb,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFilter {
    /// Hard steps, used for gradient ramps.
    #[default]
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureOptions {
    pub color_space: ColorSpace,
    pub filter: TextureFilter,
}

/// Decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub options: TextureOptions,
}

impl Texture {
    /// A 1x1 texture of one colour.
    pub fn solid(rgba: [u8; 4], options: TextureOptions) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
            options,
        }
    }
}

/// Textures by key.
#[derive(Debug, Clone, Default)]
pub struct TextureRegistry {
    textures: BTreeMap<String, Texture>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the texture previously stored under `key`, if any.
    pub fn insert(&mut self, key: impl Into<String>, texture: Texture) -> Option<Texture> {
        self.textures.insert(key.into(), texture)
    }

    pub fn get(&self, key: &str) -> Option<&Texture> {
        self.textures.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.textures.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Texture)> {
        self.textures.iter().map(|(k, v)| (k.as_str(), v))
    }
}
