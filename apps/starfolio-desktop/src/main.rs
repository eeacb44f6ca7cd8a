use anyhow::{Context, Result};
use clap::Parser;
use egui::Context as EguiContext;
use starfolio_assets::GltfLoader;
use starfolio_input::{Action, HoverTransition, Navigator};
use starfolio_render_wgpu::WgpuRenderer;
use starfolio_stage::{FrameLoop, PortfolioConfig, Session};
use starfolio_tools::SessionInspector;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorIcon, Window, WindowId};

/// Pointer travel, in logical pixels, below which a press and release is a click.
const CLICK_SLOP: f64 = 4.0;

#[derive(Parser)]
#[command(name = "starfolio-desktop", about = "Starfield portfolio in a desktop window")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Portfolio configuration (YAML); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory model and texture paths are resolved against
    #[arg(long, default_value = "./assets")]
    assets: PathBuf,
}

/// Opens links in the system browser.
struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn open(&mut self, url: &str) {
        if let Err(e) = open::that(url) {
            tracing::warn!(url, "failed to open link: {e}");
        }
    }
}

/// Left-button press being tracked as a drag or a click.
struct Press {
    origin: PhysicalPosition<f64>,
    last: PhysicalPosition<f64>,
    dragged: bool,
}

struct Gpu {
    window: Arc<Window>,
    frame_loop: FrameLoop<WgpuRenderer>,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

struct App {
    /// Held until the window exists, then moved into the frame loop.
    session: Option<Session>,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
    pending: Vec<Action>,
    cursor: PhysicalPosition<f64>,
    press: Option<Press>,
    navigator: BrowserNavigator,
    show_inspector: bool,
    start: Instant,
}

impl App {
    fn new(session: Session) -> Self {
        Self {
            session: Some(session),
            gpu: None,
            egui_ctx: EguiContext::default(),
            pending: Vec::new(),
            cursor: PhysicalPosition::new(0.0, 0.0),
            press: None,
            navigator: BrowserNavigator,
            show_inspector: false,
            start: Instant::now(),
        }
    }

    fn init_gpu(&self, event_loop: &ActiveEventLoop, session: Session) -> Result<Gpu> {
        let attrs = Window::default_attributes()
            .with_title("Starfolio")
            .with_inner_size(LogicalSize::new(1280.0, 720.0));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no suitable GPU adapter")?;
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("starfolio_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;
        tracing::info!(backend = adapter.get_info().backend.to_str(), "GPU initialized");

        let size = window.inner_size();
        let renderer = WgpuRenderer::new(surface, &adapter, device, queue, size.width, size.height)?;
        let egui_renderer = egui_wgpu::Renderer::new(renderer.device(), renderer.surface_format(), None, 1, false);
        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        Ok(Gpu {
            window,
            frame_loop: FrameLoop::new(renderer, session),
            egui_winit,
            egui_renderer,
        })
    }

    fn resize_action(window: &Window, size: PhysicalSize<u32>) -> Action {
        let scale = window.scale_factor();
        let logical = size.to_logical::<f64>(scale);
        Action::Resize {
            width: logical.width.round() as u32,
            height: logical.height.round() as u32,
            pixel_ratio: scale as f32,
        }
    }

    fn pointer_moved(&mut self, window: &Window, position: PhysicalPosition<f64>) {
        let scale = window.scale_factor();
        let logical = position.to_logical::<f64>(scale);
        self.pending.push(Action::PointerMoved {
            x: logical.x as f32,
            y: logical.y as f32,
        });
        self.cursor = position;
        if let Some(press) = &mut self.press {
            let travel = (position.x - press.origin.x).hypot(position.y - press.origin.y) / scale;
            press.dragged |= travel > CLICK_SLOP;
            if press.dragged {
                self.pending.push(Action::Orbit {
                    dx: ((position.x - press.last.x) / scale) as f32,
                    dy: ((position.y - press.last.y) / scale) as f32,
                });
            }
            press.last = position;
        }
    }

    fn redraw(&mut self) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let now = self.start.elapsed().as_secs_f64();
        let actions = std::mem::take(&mut self.pending);
        let (report, output) = gpu.frame_loop.tick(now, actions, &mut self.navigator);

        match report.hover {
            Some(HoverTransition::Entered) => gpu.window.set_cursor(CursorIcon::Pointer),
            Some(HoverTransition::Left) => gpu.window.set_cursor(CursorIcon::Default),
            _ => {}
        }

        let target = match output {
            Ok(target) => target,
            Err(e) => {
                tracing::debug!("frame skipped: {e}");
                gpu.window.request_redraw();
                return;
            }
        };

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let show_inspector = self.show_inspector;
        let session = gpu.frame_loop.session();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            if show_inspector {
                draw_inspector(ctx, session);
            }
        });
        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let renderer = gpu.frame_loop.renderer();
        let (device, queue) = (renderer.device(), renderer.queue());
        let (width, height) = renderer.surface_size();
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("egui_encoder"),
        });
        gpu.egui_renderer
            .update_buffers(device, queue, &mut encoder, &paint_jobs, &screen_descriptor);
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &target.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            gpu.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        target.present();
        gpu.window.request_redraw();
    }
}

fn draw_inspector(ctx: &EguiContext, session: &Session) {
    let summary = SessionInspector::summary(session);
    egui::SidePanel::left("inspector")
        .default_width(260.0)
        .show(ctx, |ui| {
            ui.heading("Starfolio");
            ui.separator();
            ui.label(format!("Time: {:.1}s  Frames: {}", summary.elapsed, summary.frames));
            ui.label(format!("Stars: {}  Nodes: {}", summary.stars, summary.nodes));
            let cam = session.camera();
            ui.label(format!(
                "Camera: ({:.2}, {:.2}, {:.2})  distance {:.2}",
                cam.position.x,
                cam.position.y,
                cam.position.z,
                session.camera_distance()
            ));
            let surface = session.surface();
            ui.label(format!(
                "Surface: {}x{} @{:.2}",
                surface.width, surface.height, surface.pixel_ratio
            ));
            ui.separator();

            ui.heading("Loads");
            ui.label(format!(
                "Pending: {}  Attached: {}  Failed: {}",
                summary.pending_loads, summary.attached, summary.failed
            ));
            ui.label(format!(
                "Textures: {}  Animations: {}",
                summary.textures, summary.bindings
            ));
            ui.separator();

            ui.heading("Groups");
            for group in &summary.groups {
                let state = if group.children == 0 { "empty" } else { "loaded" };
                ui.label(format!("{} {}: {} ({} drawables)", group.id, group.name, state, group.drawables));
            }
            ui.separator();
            ui.label(if summary.hovering { "Pointer: over link" } else { "Pointer: idle" });
            ui.small(format!("Link: {}", session.link_url()));
            ui.separator();
            ui.small("F1: Toggle Inspector | LMB drag: Orbit | Wheel: Zoom");
        });
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        let Some(session) = self.session.take() else {
            return;
        };
        match self.init_gpu(event_loop, session) {
            Ok(gpu) => {
                let size = gpu.window.inner_size();
                self.pending.push(Self::resize_action(&gpu.window, size));
                gpu.window.request_redraw();
                self.gpu = Some(gpu);
            }
            Err(e) => {
                tracing::error!("failed to initialise the window: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let window = gpu.window.clone();
        if gpu.egui_winit.on_window_event(&window, &event).consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                if let Some(gpu) = self.gpu.take() {
                    gpu.frame_loop.shutdown();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.pending.push(Self::resize_action(&window, size));
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                self.pending.push(Self::resize_action(&window, window.inner_size()));
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer_moved(&window, position);
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => match state {
                ElementState::Pressed => {
                    self.press = Some(Press {
                        origin: self.cursor,
                        last: self.cursor,
                        dragged: false,
                    });
                }
                ElementState::Released => {
                    if let Some(press) = self.press.take() {
                        if !press.dragged {
                            self.pending.push(Action::Click);
                        }
                    }
                }
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / 50.0) as f32,
                };
                self.pending.push(Action::Zoom(steps));
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::F1),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.show_inspector = !self.show_inspector;
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    tracing::info!("starfolio-desktop starting");

    let config = match &cli.config {
        Some(path) => PortfolioConfig::load(path)?,
        None => PortfolioConfig::default(),
    };
    let mut session = Session::new(&config)?;
    session.start_loads(&GltfLoader::new(&cli.assets));

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(session);
    event_loop.run_app(&mut app)?;

    Ok(())
}
