use crate::loader::{AssetError, AssetLoader};
use crate::model::{LoadedModel, Texture, TextureOptions, TextureRegistry};
use crate::normalize::{NormalizeSpec, Normalization, normalize};
use futures::FutureExt;
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use starfolio_animation::AnimationDriver;
use starfolio_common::NodeId;
use starfolio_scene::Scene;
use std::task::{Context, Poll};

/// One model to fetch and where to put it.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub label: String,
    pub path: String,
    pub group: NodeId,
    pub normalize: NormalizeSpec,
    /// Mark the attached root as the hit-test target.
    pub interactive: bool,
}

#[derive(Debug, Clone)]
pub struct TextureRequest {
    pub key: String,
    pub path: String,
    pub options: TextureOptions,
}

/// What a finished load did to the session.
#[derive(Debug)]
pub enum LoadOutcome {
    Attached {
        label: String,
        group: NodeId,
        root: NodeId,
        /// Index into the animation driver, when the model had clips.
        binding: Option<usize>,
        interactive: bool,
        normalization: Normalization,
    },
    TextureReady {
        key: String,
        width: u32,
        height: u32,
    },
    Failed {
        label: String,
        path: String,
        error: AssetError,
    },
}

impl LoadOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Everything a completion may touch.
pub struct AttachContext<'a> {
    pub scene: &'a mut Scene,
    pub animations: &'a mut AnimationDriver,
    pub textures: &'a mut TextureRegistry,
}

enum Completion {
    Model {
        request: ModelRequest,
        result: Result<LoadedModel, AssetError>,
    },
    Texture {
        request: TextureRequest,
        result: Result<Texture, AssetError>,
    },
}

/// Independent in-flight loads, applied to the scene as each one finishes.
///
/// There is no join: a failed or hung request only leaves its own group
/// empty.
#[derive(Default)]
pub struct LoadCoordinator {
    pending: FuturesUnordered<BoxFuture<'static, Completion>>,
    requested: usize,
    attached: usize,
    failed: usize,
}

impl std::fmt::Debug for LoadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadCoordinator")
            .field("pending", &self.pending.len())
            .field("requested", &self.requested)
            .field("attached", &self.attached)
            .field("failed", &self.failed)
            .finish()
    }
}

impl LoadCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_model(&mut self, loader: &dyn AssetLoader, request: ModelRequest) {
        tracing::info!(label = %request.label, path = %request.path, group = %request.group, "model load requested");
        let load = loader.load_model(&request.path);
        self.requested += 1;
        self.pending.push(
            async move {
                Completion::Model {
                    result: load.await,
                    request,
                }
            }
            .boxed(),
        );
    }

    pub fn request_texture(&mut self, loader: &dyn AssetLoader, request: TextureRequest) {
        tracing::info!(key = %request.key, path = %request.path, "texture load requested");
        let load = loader.load_texture(&request.path, request.options);
        self.requested += 1;
        self.pending.push(
            async move {
                Completion::Texture {
                    result: load.await,
                    request,
                }
            }
            .boxed(),
        );
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn attached(&self) -> usize {
        self.attached
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Apply every load that has already finished. Never blocks.
    pub fn poll_completions(&mut self, ctx: &mut AttachContext<'_>) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();
        if self.pending.is_empty() {
            return outcomes;
        }
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        while let Poll::Ready(Some(done)) = self.pending.poll_next_unpin(&mut cx) {
            outcomes.push(self.complete(done, ctx));
        }
        outcomes
    }

    /// Wait for the next load to finish and apply it. `None` once idle.
    pub async fn next_outcome(&mut self, ctx: &mut AttachContext<'_>) -> Option<LoadOutcome> {
        let done = self.pending.next().await?;
        Some(self.complete(done, ctx))
    }

    fn complete(&mut self, done: Completion, ctx: &mut AttachContext<'_>) -> LoadOutcome {
        let outcome = match done {
            Completion::Model { request, result } => match result {
                Ok(model) => attach(request, model, ctx),
                Err(error) => LoadOutcome::Failed {
                    label: request.label,
                    path: request.path,
                    error,
                },
            },
            Completion::Texture { request, result } => match result {
                Ok(texture) => {
                    let (width, height) = (texture.width, texture.height);
                    ctx.textures.insert(request.key.clone(), texture);
                    tracing::info!(key = %request.key, width, height, "texture ready");
                    LoadOutcome::TextureReady {
                        key: request.key,
                        width,
                        height,
                    }
                }
                Err(error) => LoadOutcome::Failed {
                    label: request.key,
                    path: request.path,
                    error,
                },
            },
        };
        match &outcome {
            LoadOutcome::Failed { label, path, error } => {
                self.failed += 1;
                tracing::warn!(%label, %path, %error, "asset load failed, leaving its slot empty");
            }
            LoadOutcome::Attached { .. } => self.attached += 1,
            LoadOutcome::TextureReady { .. } => {}
        }
        outcome
    }
}

fn attach(request: ModelRequest, model: LoadedModel, ctx: &mut AttachContext<'_>) -> LoadOutcome {
    let LoadedModel { name, mut tree, clips } = model;
    let normalization = normalize(&mut tree, &request.normalize);
    let root = match ctx.scene.attach_model(request.group, tree) {
        Ok(root) => root,
        Err(e) => {
            return LoadOutcome::Failed {
                label: request.label,
                path: request.path,
                error: e.into(),
            };
        }
    };
    let binding = ctx.animations.bind(ctx.scene.tree(), root, clips);
    tracing::info!(
        label = %request.label,
        model = %name,
        %root,
        scale = normalization.scale,
        animated = binding.is_some(),
        "model attached"
    );
    LoadOutcome::Attached {
        label: request.label,
        group: request.group,
        root,
        binding,
        interactive: request.interactive,
        normalization,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{LoadFuture, MemoryLoader};
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use glam::Vec3;
    use starfolio_animation::{AnimationClip, Track, TrackValues};
    use starfolio_common::{Rgb, Transform};
    use starfolio_scene::{Drawable, Mesh, NodeTree, SceneNode};
    use std::cell::RefCell;
    use std::collections::HashMap;

    fn boxed_model(name: &str) -> LoadedModel {
        let mut tree = NodeTree::new(SceneNode::group(name));
        let body = Drawable {
            mesh: Mesh::cuboid(Vec3::new(2.0, 1.0, 2.0)),
            ..Drawable::default()
        };
        tree.add(tree.root(), SceneNode::drawable("body", body)).unwrap();
        LoadedModel::new(name, tree)
    }

    fn animated_model(name: &str) -> LoadedModel {
        let clip = |n: &str| {
            AnimationClip::new(
                n,
                vec![Track {
                    target: "body".into(),
                    times: vec![0.0, 1.0],
                    values: TrackValues::Translation(vec![Vec3::ZERO, Vec3::Y]),
                }],
            )
        };
        boxed_model(name).with_clips(vec![clip("idle"), clip("wave")])
    }

    struct Fixture {
        scene: Scene,
        animations: AnimationDriver,
        textures: TextureRegistry,
        groups: Vec<NodeId>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut scene = Scene::new(Rgb::BLACK);
            let groups = ["head", "label", "decor"]
                .iter()
                .map(|n| scene.add_group(n, Transform::IDENTITY).unwrap())
                .collect();
            Self {
                scene,
                animations: AnimationDriver::new(),
                textures: TextureRegistry::new(),
                groups,
            }
        }

        fn ctx(&mut self) -> AttachContext<'_> {
            AttachContext {
                scene: &mut self.scene,
                animations: &mut self.animations,
                textures: &mut self.textures,
            }
        }
    }

    fn request(label: &str, group: NodeId) -> ModelRequest {
        ModelRequest {
            label: label.into(),
            path: format!("{label}.gltf"),
            group,
            normalize: NormalizeSpec::default(),
            interactive: label == "head",
        }
    }

    #[test]
    fn one_rejected_load_does_not_block_the_others() {
        let mut fx = Fixture::new();
        let loader = MemoryLoader::new()
            .with_model("head.gltf", animated_model("head"))
            .with_model("decor.gltf", boxed_model("decor"));

        let mut coord = LoadCoordinator::new();
        for (label, group) in ["head", "label", "decor"].iter().zip(fx.groups.clone()) {
            coord.request_model(&loader, request(label, group));
        }
        assert_eq!(coord.pending(), 3);

        let outcomes = coord.poll_completions(&mut fx.ctx());
        assert_eq!(outcomes.len(), 3);
        assert!(coord.is_idle());
        assert_eq!((coord.attached(), coord.failed()), (2, 1));

        let failed: Vec<_> = outcomes.iter().filter(|o| o.is_failure()).collect();
        assert!(matches!(failed[0], LoadOutcome::Failed { label, .. } if label == "label"));
        assert_eq!(fx.scene.child_count(fx.groups[0]), 1);
        assert_eq!(fx.scene.child_count(fx.groups[1]), 0);
        assert_eq!(fx.scene.child_count(fx.groups[2]), 1);
        assert_eq!(fx.animations.len(), 1);
        assert_eq!(fx.animations.bindings()[0].clip().name, "wave");
    }

    /// Loader whose futures resolve only when the test says so.
    #[derive(Default)]
    struct GatedLoader {
        gates: RefCell<HashMap<String, oneshot::Sender<Result<LoadedModel, AssetError>>>>,
    }

    impl GatedLoader {
        fn open(&self, path: &str, result: Result<LoadedModel, AssetError>) {
            let tx = self.gates.borrow_mut().remove(path).unwrap();
            tx.send(result).ok().unwrap();
        }
    }

    impl AssetLoader for GatedLoader {
        fn load_model(&self, path: &str) -> LoadFuture<LoadedModel> {
            let (tx, rx) = oneshot::channel();
            self.gates.borrow_mut().insert(path.to_string(), tx);
            let path = path.to_string();
            async move { rx.await.unwrap_or(Err(AssetError::Cancelled(path))) }.boxed()
        }

        fn load_texture(&self, path: &str, _options: TextureOptions) -> LoadFuture<Texture> {
            futures::future::ready(Err(AssetError::NotFound(path.to_string()))).boxed()
        }
    }

    #[test]
    fn completions_apply_in_arrival_order() {
        let mut fx = Fixture::new();
        let loader = GatedLoader::default();
        let mut coord = LoadCoordinator::new();
        coord.request_model(&loader, request("head", fx.groups[0]));
        coord.request_model(&loader, request("decor", fx.groups[2]));

        assert!(coord.poll_completions(&mut fx.ctx()).is_empty());

        loader.open("decor.gltf", Ok(boxed_model("decor")));
        let first = coord.poll_completions(&mut fx.ctx());
        assert!(matches!(&first[..], [LoadOutcome::Attached { label, .. }] if label == "decor"));
        assert_eq!(fx.scene.child_count(fx.groups[0]), 0);

        loader.open("head.gltf", Ok(boxed_model("head")));
        let second = coord.poll_completions(&mut fx.ctx());
        assert!(matches!(&second[..], [LoadOutcome::Attached { interactive: true, .. }]));
        assert_eq!(fx.scene.child_count(fx.groups[0]), 1);
    }

    #[test]
    fn dropped_worker_reports_cancelled() {
        let mut fx = Fixture::new();
        let loader = GatedLoader::default();
        let mut coord = LoadCoordinator::new();
        coord.request_model(&loader, request("head", fx.groups[0]));
        loader.gates.borrow_mut().clear();

        let outcome = block_on(coord.next_outcome(&mut fx.ctx())).unwrap();
        assert!(matches!(outcome, LoadOutcome::Failed { error: AssetError::Cancelled(_), .. }));
        assert!(block_on(coord.next_outcome(&mut fx.ctx())).is_none());
    }

    #[test]
    fn attached_models_are_normalized() {
        let mut fx = Fixture::new();
        let loader = MemoryLoader::new().with_model("head.gltf", boxed_model("head"));
        let mut coord = LoadCoordinator::new();
        let mut req = request("head", fx.groups[0]);
        req.normalize = NormalizeSpec {
            target_offset: Vec3::new(0.0, 0.4, 0.0),
            scale: crate::ScalePolicy::FitHorizontal {
                target_size: 1.0,
                fallback: 1.0,
            },
            ..NormalizeSpec::default()
        };
        coord.request_model(&loader, req);
        let outcomes = coord.poll_completions(&mut fx.ctx());
        let LoadOutcome::Attached { root, normalization, .. } = &outcomes[0] else {
            panic!("expected attach, got {outcomes:?}");
        };
        assert_eq!(normalization.scale, 0.5);
        let center = fx.scene.tree().subtree_bounds(*root).center();
        assert!(center.abs_diff_eq(Vec3::new(0.0, 0.4, 0.0), 1e-5));
    }

    #[test]
    fn textures_register_under_their_key() {
        let mut fx = Fixture::new();
        let loader = MemoryLoader::new().with_texture("g.png", Texture::solid([9; 4], TextureOptions::default()));
        let mut coord = LoadCoordinator::new();
        coord.request_texture(
            &loader,
            TextureRequest {
                key: "gradient".into(),
                path: "g.png".into(),
                options: TextureOptions::default(),
            },
        );
        let outcomes = coord.poll_completions(&mut fx.ctx());
        assert!(matches!(&outcomes[..], [LoadOutcome::TextureReady { key, .. }] if key == "gradient"));
        assert!(fx.textures.contains("gradient"));
    }
}
