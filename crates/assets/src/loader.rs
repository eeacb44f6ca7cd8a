use crate::model::{LoadedModel, Texture, TextureOptions};
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use starfolio_scene::SceneError;
use std::collections::HashMap;
use std::path::PathBuf;

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("glTF parse error: {0}")]
    GltfParse(String),
    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("load of {0} was dropped before completing")]
    Cancelled(String),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

pub type LoadFuture<T> = BoxFuture<'static, Result<T, AssetError>>;

/// Source of models and textures. Each call starts one independent load.
pub trait AssetLoader {
    fn load_model(&self, path: &str) -> LoadFuture<LoadedModel>;
    fn load_texture(&self, path: &str, options: TextureOptions) -> LoadFuture<Texture>;
}

/// Serves prebuilt assets from memory. Unknown paths fail with
/// [`AssetError::NotFound`].
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    models: HashMap<String, LoadedModel>,
    textures: HashMap<String, Texture>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, path: impl Into<String>, model: LoadedModel) -> Self {
        self.models.insert(path.into(), model);
        self
    }

    pub fn with_texture(mut self, path: impl Into<String>, texture: Texture) -> Self {
        self.textures.insert(path.into(), texture);
        self
    }
}

impl AssetLoader for MemoryLoader {
    fn load_model(&self, path: &str) -> LoadFuture<LoadedModel> {
        let result = self
            .models
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(path.to_string()));
        future::ready(result).boxed()
    }

    fn load_texture(&self, path: &str, options: TextureOptions) -> LoadFuture<Texture> {
        let result = self
            .textures
            .get(path)
            .cloned()
            .map(|mut t| {
                t.options = options;
                t
            })
            .ok_or_else(|| AssetError::NotFound(path.to_string()));
        future::ready(result).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn memory_loader_serves_and_rejects() {
        let loader = MemoryLoader::new().with_model("a.gltf", LoadedModel::empty("a"));
        let model = block_on(loader.load_model("a.gltf")).unwrap();
        assert_eq!(model.name, "a");
        let err = block_on(loader.load_model("b.gltf")).unwrap_err();
        assert!(matches!(err, AssetError::NotFound(p) if p == "b.gltf"));
    }

    #[test]
    fn memory_loader_applies_requested_texture_options() {
        let loader = MemoryLoader::new()
            .with_texture("ramp.png", Texture::solid([1, 2, 3, 4], TextureOptions::default()));
        let opts = TextureOptions {
            color_space: crate::ColorSpace::Linear,
            filter: crate::TextureFilter::Linear,
        };
        let tex = block_on(loader.load_texture("ramp.png", opts)).unwrap();
        assert_eq!(tex.options, opts);
    }
}
