use crate::clock::{FrameClock, FrameTime};
use crate::config::{LightingConfig, ModelConfig, MotionConfig, PortfolioConfig, TextureConfig};
use crate::motion::{Motion, MotionPlan};
use glam::Vec3;
use starfolio_animation::AnimationDriver;
use starfolio_assets::{
    AssetLoader, AttachContext, LoadCoordinator, LoadOutcome, ModelRequest, TextureRegistry, TextureRequest,
};
use starfolio_common::{NodeId, Rgb, Transform};
use starfolio_input::{Action, HitTester, HoverTransition, Navigator, PointerState};
use starfolio_render::{FrameView, OrbitControls, PerspectiveCamera, SurfaceSize, ViewportBinder};
use starfolio_scene::{Light, Scene, SceneError};
use starfolio_stars::{StarField, StarFieldError};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("starfield: {0}")]
    Stars(#[from] StarFieldError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("motion targets unknown node {0:?}")]
    UnknownMotionTarget(String),
}

/// Per-frame input to [`Session::update`].
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    pub time: FrameTime,
    /// Input gathered since the previous frame, in arrival order.
    pub actions: Vec<Action>,
}

/// What changed during one update.
#[derive(Debug, Default)]
pub struct FrameReport {
    pub time: FrameTime,
    pub outcomes: Vec<LoadOutcome>,
    pub hover: Option<HoverTransition>,
    pub resized: Option<SurfaceSize>,
    /// A click opened the link.
    pub navigated: bool,
    pub camera_moved: bool,
}

/// The whole state of one portfolio session.
///
/// Built once from a [`PortfolioConfig`]: camera, then lights and empty
/// groups, then the starfield and motion plan. Loads are started separately
/// so the caller chooses the loader.
#[derive(Debug)]
pub struct Session {
    scene: Scene,
    groups: BTreeMap<String, NodeId>,
    stars: StarField,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    binder: ViewportBinder,
    surface: SurfaceSize,
    animations: AnimationDriver,
    textures: TextureRegistry,
    loads: LoadCoordinator,
    motion: MotionPlan,
    pointer: PointerState,
    hit: HitTester,
    clock: FrameClock,
    last_time: FrameTime,
    link_url: String,
    models: Vec<ModelConfig>,
    texture_requests: Vec<TextureConfig>,
}

impl Session {
    pub fn new(config: &PortfolioConfig) -> Result<Self, SessionError> {
        let _span = tracing::info_span!("session_new").entered();

        let mut camera = config.camera;
        let binder = ViewportBinder::new(config.max_pixel_ratio);
        let surface = binder.apply(&mut camera, 1280, 720, 1.0);
        let mut controls = config.controls.clone();
        controls.target = camera.target;

        let mut scene = Scene::new(Rgb::from_hex(config.background));
        let root = scene.root();
        let mut motion = MotionPlan::new();

        let lighting = &config.lighting;
        scene.add_light(
            root,
            LightingConfig::AMBIENT,
            Light::Ambient {
                color: Rgb::from_hex(lighting.ambient_color),
                intensity: lighting.ambient_intensity,
            },
            Transform::IDENTITY,
        )?;
        scene.add_light(
            root,
            LightingConfig::SUN,
            Light::Directional {
                color: Rgb::from_hex(lighting.directional_color),
                intensity: lighting.directional_intensity,
            },
            Transform::from_position(lighting.directional_position),
        )?;
        for (i, orbiting) in lighting.orbiting.iter().enumerate() {
            let id = scene.add_light(
                root,
                &LightingConfig::orbit_light_name(i),
                Light::Point {
                    color: Rgb::from_hex(orbiting.color),
                    intensity: orbiting.intensity,
                    range: orbiting.range,
                },
                Transform::IDENTITY,
            )?;
            motion.add(
                scene.tree(),
                id,
                Motion::Orbit {
                    center: orbiting.center,
                    radius_x: orbiting.radius_x,
                    radius_z: orbiting.radius_z,
                    height: orbiting.height,
                    speed: orbiting.speed,
                    phase: orbiting.phase,
                },
            )?;
        }

        let mut groups = BTreeMap::new();
        for group in &config.groups {
            let r = group.rotation_degrees;
            let transform = Transform::from_position(group.position)
                .with_euler(r.x.to_radians(), r.y.to_radians(), r.z.to_radians())
                .with_uniform_scale(group.scale);
            groups.insert(group.name.clone(), scene.add_group(&group.name, transform)?);
        }

        for entry in &config.motion {
            let target = entry.target();
            let node = groups
                .get(target)
                .copied()
                .or_else(|| scene.tree().find_by_name(root, target))
                .ok_or_else(|| SessionError::UnknownMotionTarget(target.to_string()))?;
            motion.add(scene.tree(), node, motion_from(entry))?;
        }

        let stars = StarField::generate(&config.stars)?;
        tracing::info!(
            stars = stars.len(),
            groups = groups.len(),
            motions = motion.len(),
            "session built"
        );

        Ok(Self {
            scene,
            groups,
            stars,
            camera,
            controls,
            binder,
            surface,
            animations: AnimationDriver::new(),
            textures: TextureRegistry::new(),
            loads: LoadCoordinator::new(),
            motion,
            pointer: PointerState::default(),
            hit: HitTester::new(),
            clock: FrameClock::new(),
            last_time: FrameTime::default(),
            link_url: config.link_url.clone(),
            models: config.models.clone(),
            texture_requests: config.textures.clone(),
        })
    }

    /// Issue one independent request per configured model and texture.
    pub fn start_loads(&mut self, loader: &dyn AssetLoader) {
        for model in &self.models {
            let Some(&group) = self.groups.get(&model.group) else {
                tracing::warn!(label = %model.label, group = %model.group, "model targets unknown group, skipped");
                continue;
            };
            self.loads.request_model(
                loader,
                ModelRequest {
                    label: model.label.clone(),
                    path: model.path.clone(),
                    group,
                    normalize: model.normalize.clone(),
                    interactive: model.interactive,
                },
            );
        }
        for texture in &self.texture_requests {
            self.loads.request_texture(
                loader,
                TextureRequest {
                    key: texture.key.clone(),
                    path: texture.path.clone(),
                    options: texture.options,
                },
            );
        }
    }

    /// Advance the session clock to `now` seconds.
    pub fn clock_tick(&mut self, now: f64) -> FrameTime {
        self.clock.tick(now)
    }

    /// Apply one input action outside of a frame. Returns a new surface size
    /// when the action was a resize.
    pub fn handle(&mut self, action: Action, navigator: &mut dyn Navigator) -> (Option<SurfaceSize>, bool) {
        match action {
            Action::PointerMoved { x, y } => {
                self.pointer
                    .set_from_pixels(x, y, self.surface.width, self.surface.height);
                (None, false)
            }
            Action::Click => (None, self.hit.click(&self.link_url, navigator)),
            Action::Resize {
                width,
                height,
                pixel_ratio,
            } => {
                self.surface = self.binder.apply(&mut self.camera, width, height, pixel_ratio);
                (Some(self.surface), false)
            }
            Action::Orbit { dx, dy } => {
                self.controls.rotate(dx, dy, self.surface.height as f32);
                (None, false)
            }
            Action::Zoom(steps) => {
                self.controls.zoom(steps);
                (None, false)
            }
        }
    }

    /// One frame: drain finished loads, apply input, advance animation and
    /// motion, re-test the pointer and settle the camera.
    pub fn update(&mut self, input: FrameInput, navigator: &mut dyn Navigator) -> FrameReport {
        let FrameInput { time, actions } = input;
        let _span = tracing::trace_span!("session_update", frame = time.frame).entered();
        let mut report = FrameReport {
            time,
            ..FrameReport::default()
        };

        let mut ctx = AttachContext {
            scene: &mut self.scene,
            animations: &mut self.animations,
            textures: &mut self.textures,
        };
        report.outcomes = self.loads.poll_completions(&mut ctx);
        for outcome in &report.outcomes {
            self.track_interactive(outcome);
        }

        for action in actions {
            let (resized, navigated) = self.handle(action, navigator);
            if resized.is_some() {
                report.resized = resized;
            }
            report.navigated |= navigated;
        }

        self.animations.advance(self.scene.tree_mut(), time.delta);
        self.motion.apply(self.scene.tree_mut(), time.elapsed);

        let transition = self.hit.evaluate(self.scene.tree(), &self.camera, &self.pointer);
        if transition != HoverTransition::None {
            report.hover = Some(transition);
        }
        report.camera_moved = self.controls.update(&mut self.camera);

        self.last_time = time;
        tracing::trace!(elapsed = time.elapsed, delta = time.delta, "frame updated");
        report
    }

    /// Wait for the next load to finish and apply it. `None` once every
    /// request has completed. For headless use; the frame loop polls instead.
    pub async fn next_load(&mut self) -> Option<LoadOutcome> {
        let mut ctx = AttachContext {
            scene: &mut self.scene,
            animations: &mut self.animations,
            textures: &mut self.textures,
        };
        let outcome = self.loads.next_outcome(&mut ctx).await?;
        self.track_interactive(&outcome);
        Some(outcome)
    }

    fn track_interactive(&mut self, outcome: &LoadOutcome) {
        if let LoadOutcome::Attached {
            root,
            interactive: true,
            ..
        } = outcome
        {
            self.hit.set_target(*root);
        }
    }

    pub fn frame_view(&self) -> FrameView<'_> {
        FrameView {
            scene: &self.scene,
            stars: &self.stars,
            textures: &self.textures,
            camera: &self.camera,
            elapsed: self.last_time.elapsed,
            hovering: self.hit.is_hovering(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn groups(&self) -> &BTreeMap<String, NodeId> {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<NodeId> {
        self.groups.get(name).copied()
    }

    pub fn stars(&self) -> &StarField {
        &self.stars
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn surface(&self) -> SurfaceSize {
        self.surface
    }

    pub fn animations(&self) -> &AnimationDriver {
        &self.animations
    }

    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    pub fn loads(&self) -> &LoadCoordinator {
        &self.loads
    }

    pub fn hit_tester(&self) -> &HitTester {
        &self.hit
    }

    pub fn link_url(&self) -> &str {
        &self.link_url
    }

    pub fn last_time(&self) -> FrameTime {
        self.last_time
    }

    pub fn frames(&self) -> u64 {
        self.clock.frames()
    }

    /// Distance from the camera to its orbit target.
    pub fn camera_distance(&self) -> f32 {
        self.camera.position.distance(self.controls.target)
    }

    pub fn camera_target(&self) -> Vec3 {
        self.controls.target
    }
}

fn motion_from(config: &MotionConfig) -> Motion {
    match *config {
        MotionConfig::Spin { axis, rate, .. } => Motion::Spin { axis, rate },
        MotionConfig::Oscillate {
            axis,
            amplitude,
            frequency,
            phase,
            ..
        } => Motion::Oscillation {
            axis,
            amplitude,
            frequency,
            phase,
        },
        MotionConfig::Orbit {
            center,
            radius_x,
            radius_z,
            height,
            speed,
            phase,
            ..
        } => Motion::Orbit {
            center,
            radius_x,
            radius_z,
            height,
            speed,
            phase,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use starfolio_assets::{LoadedModel, MemoryLoader};
    use starfolio_scene::{Drawable, Mesh, NodeTree, SceneNode};
    use starfolio_stars::StarFieldConfig;

    #[derive(Default)]
    struct Recorder {
        opened: Vec<String>,
    }

    impl Navigator for Recorder {
        fn open(&mut self, url: &str) {
            self.opened.push(url.to_string());
        }
    }

    fn small_config() -> PortfolioConfig {
        PortfolioConfig {
            stars: StarFieldConfig {
                count: 50,
                seed: Some(3),
                ..StarFieldConfig::default()
            },
            ..PortfolioConfig::default()
        }
    }

    fn cube_model(name: &str, size: f32) -> LoadedModel {
        let mut tree = NodeTree::new(SceneNode::group(name));
        let drawable = Drawable {
            mesh: Mesh::cuboid(Vec3::splat(size)),
            ..Drawable::default()
        };
        tree.add(tree.root(), SceneNode::drawable("body", drawable)).unwrap();
        LoadedModel::new(name, tree)
    }

    fn frame(session: &mut Session, now: f64, actions: Vec<Action>, nav: &mut Recorder) -> FrameReport {
        let time = session.clock_tick(now);
        session.update(FrameInput { time, actions }, nav)
    }

    #[test]
    fn construction_creates_groups_lights_and_stars() {
        let session = Session::new(&small_config()).unwrap();
        assert_eq!(session.groups().len(), 4);
        assert_eq!(session.stars().len(), 50);
        for id in session.groups().values() {
            assert_eq!(session.scene().child_count(*id), 0);
        }
        assert!(session.scene().tree().find_by_name(session.scene().root(), "orbit_light_1").is_some());
        assert_eq!(session.scene().background, Rgb::from_hex(0x09041a));
    }

    #[test]
    fn unknown_motion_target_fails_construction() {
        let mut config = small_config();
        config.motion.push(MotionConfig::Spin {
            target: "ghost".into(),
            axis: Vec3::Y,
            rate: 1.0,
        });
        assert!(matches!(Session::new(&config), Err(SessionError::UnknownMotionTarget(t)) if t == "ghost"));
    }

    #[test]
    fn hover_then_click_opens_the_link_once() {
        let mut session = Session::new(&small_config()).unwrap();
        let loader = MemoryLoader::new().with_model("models/patmog/patmog.gltf", cube_model("head", 0.1));
        session.start_loads(&loader);
        let mut nav = Recorder::default();

        let resize = Action::Resize {
            width: 800,
            height: 800,
            pixel_ratio: 1.0,
        };
        let report = frame(&mut session, 0.0, vec![resize], &mut nav);
        assert_eq!(report.outcomes.iter().filter(|o| !o.is_failure()).count(), 1);
        assert!(session.hit_tester().target().is_some());

        // Screen centre looks at the orbit target, where the scaled head sits.
        let report = frame(&mut session, 0.016, vec![Action::PointerMoved { x: 400.0, y: 400.0 }], &mut nav);
        assert_eq!(report.hover, Some(HoverTransition::Entered));

        let report = frame(&mut session, 0.032, vec![Action::Click], &mut nav);
        assert!(report.navigated);
        assert_eq!(nav.opened, vec![session.link_url().to_string()]);

        let report = frame(&mut session, 0.048, vec![Action::PointerMoved { x: 5.0, y: 5.0 }], &mut nav);
        assert_eq!(report.hover, Some(HoverTransition::Left));
        let report = frame(&mut session, 0.064, vec![Action::Click], &mut nav);
        assert!(!report.navigated);
        assert_eq!(nav.opened.len(), 1);
    }

    #[test]
    fn motion_runs_while_groups_are_empty() {
        let mut session = Session::new(&small_config()).unwrap();
        let mut nav = Recorder::default();
        let label = session.group("label").unwrap();
        frame(&mut session, 0.0, vec![], &mut nav);
        frame(&mut session, 1.0, vec![], &mut nav);
        let rotation = session.scene().tree().get(label).unwrap().transform.rotation;
        assert!((rotation.angle_between(glam::Quat::IDENTITY) - 0.6).abs() < 1e-4);
        assert_eq!(session.scene().child_count(label), 0);
    }

    #[test]
    fn next_load_drains_every_request() {
        let mut session = Session::new(&small_config()).unwrap();
        let loader = MemoryLoader::new().with_model("models/patmog/patmog.gltf", cube_model("head", 0.1));
        session.start_loads(&loader);
        let mut outcomes = Vec::new();
        while let Some(outcome) = futures::executor::block_on(session.next_load()) {
            outcomes.push(outcome);
        }
        assert_eq!(outcomes.len(), 5);
        assert!(session.loads().is_idle());
        assert!(session.hit_tester().target().is_some());
    }

    #[test]
    fn resize_updates_the_camera_aspect() {
        let mut session = Session::new(&small_config()).unwrap();
        let mut nav = Recorder::default();
        let report = frame(
            &mut session,
            0.0,
            vec![Action::Resize {
                width: 1000,
                height: 500,
                pixel_ratio: 3.0,
            }],
            &mut nav,
        );
        let size = report.resized.unwrap();
        assert_eq!(size.pixel_ratio, 2.0);
        assert!((session.camera().aspect() - 2.0).abs() < 1e-6);
    }
}
