use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::executor::block_on;
use starfolio_assets::{AssetLoader, GltfLoader, NormalizeSpec, ScalePolicy, normalize};
use starfolio_input::{Action, Navigator};
use starfolio_render::DebugTextRenderer;
use starfolio_stage::{FrameLoop, PortfolioConfig, Session};
use starfolio_stars::{StarField, StarFieldConfig};
use starfolio_tools::SessionInspector;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "starfolio-cli", about = "Headless tools for the starfield portfolio")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Portfolio configuration (YAML); built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the effective configuration
    Info,
    /// Generate a starfield and report its statistics
    Stars {
        /// Number of stars (defaults to the configured count)
        #[arg(short, long)]
        count: Option<usize>,
        /// RNG seed for a reproducible field
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load a glTF/GLB model and print its structure
    InspectModel {
        /// Model file
        path: PathBuf,
        /// Preview normalization to this horizontal size
        #[arg(long)]
        fit: Option<f32>,
    },
    /// Run the session headlessly for a number of frames
    Simulate {
        /// Directory model and texture paths are resolved against
        #[arg(long, default_value = "./assets")]
        assets: PathBuf,
        /// Number of frames to run
        #[arg(short, long, default_value = "120")]
        frames: u32,
        /// Simulated frame rate
        #[arg(long, default_value = "60")]
        fps: f64,
        /// Move the pointer to logical pixel "x,y" before the first frame
        #[arg(long, value_parser = parse_point)]
        pointer: Option<(f32, f32)>,
        /// Click once, halfway through
        #[arg(long)]
        click: bool,
    },
}

fn parse_point(s: &str) -> Result<(f32, f32), String> {
    let (x, y) = s.split_once(',').ok_or("expected x,y")?;
    let x = x.trim().parse().map_err(|e| format!("x: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("y: {e}"))?;
    Ok((x, y))
}

/// Records link requests instead of opening a browser.
#[derive(Default)]
struct PrintNavigator {
    opened: Vec<String>,
}

impl Navigator for PrintNavigator {
    fn open(&mut self, url: &str) {
        println!("navigate: {url}");
        self.opened.push(url.to_string());
    }
}

fn load_config(path: Option<&Path>) -> Result<PortfolioConfig> {
    Ok(match path {
        Some(path) => PortfolioConfig::load(path)?,
        None => PortfolioConfig::default(),
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(path = ?cli.config, "configuration resolved");

    match cli.command {
        Commands::Info => {
            println!("starfolio-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "stars: {} in a {:.0}-unit cube, none within {:.1} of the origin",
                config.stars.count, config.stars.max_range, config.stars.min_radius
            );
            println!("groups: {}", config.groups.iter().map(|g| g.name.as_str()).collect::<Vec<_>>().join(", "));
            for model in &config.models {
                let marker = if model.interactive { " (link)" } else { "" };
                println!("model: {} -> {} [{}]{marker}", model.label, model.path, model.group);
            }
            println!("motions: {}", config.motion.len());
            println!("link: {}", config.link_url);
            println!("---");
            print!("{}", config.to_yaml()?);
        }
        Commands::Stars { count, seed, json } => {
            let stars_config = StarFieldConfig {
                count: count.unwrap_or(config.stars.count),
                seed: Some(seed),
                ..config.stars.clone()
            };
            let field = StarField::generate(&stars_config)?;
            let (mut nearest, mut extent) = (f32::INFINITY, 0.0f32);
            for star in field.stars() {
                let p = star.position();
                nearest = nearest.min(p.length());
                extent = extent.max(p.abs().max_element());
            }
            if json {
                let stats = serde_json::json!({
                    "count": field.len(),
                    "seed": seed,
                    "min_radius": stars_config.min_radius,
                    "half_range": stars_config.max_range * 0.5,
                    "nearest": nearest,
                    "extent": extent,
                });
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Generated {} stars (seed={seed})", field.len());
                println!("  nearest to origin: {nearest:.3} (min {:.3})", stars_config.min_radius);
                println!(
                    "  largest coordinate: {extent:.3} (max {:.3})",
                    stars_config.max_range * 0.5
                );
                for star in field.stars().iter().take(5) {
                    let [x, y, z] = star.position;
                    let [r, g, b] = star.color;
                    println!("  ({x:8.2}, {y:8.2}, {z:8.2}) rgb=({r:.2}, {g:.2}, {b:.2})");
                }
            }
        }
        Commands::InspectModel { path, fit } => {
            let dir = path.parent().unwrap_or(Path::new(""));
            let file = path
                .file_name()
                .and_then(|f| f.to_str())
                .context("model path has no file name")?;
            let loader = GltfLoader::new(dir);
            let mut model = block_on(loader.load_model(file))?;
            let tree = &model.tree;

            println!("Model '{}': {} nodes, {} drawables", model.name, tree.len(), tree.drawable_count(tree.root()));
            for (depth, id) in SessionInspector::outline(tree, tree.root()) {
                if let Some(info) = SessionInspector::inspect_node(tree, id) {
                    println!("{:indent$}{info}", "", indent = depth * 2);
                }
            }
            let bounds = tree.subtree_bounds(tree.root());
            if !bounds.is_empty() {
                let (c, s) = (bounds.center(), bounds.size());
                println!(
                    "bounds: centre=({:.3}, {:.3}, {:.3}) size=({:.3}, {:.3}, {:.3})",
                    c.x, c.y, c.z, s.x, s.y, s.z
                );
            }
            for clip in &model.clips {
                println!("clip '{}': {:.2}s, {} tracks", clip.name, clip.duration, clip.tracks.len());
            }
            if let Some(target_size) = fit {
                let spec = NormalizeSpec {
                    scale: ScalePolicy::FitHorizontal {
                        target_size,
                        fallback: 1.0,
                    },
                    ..NormalizeSpec::default()
                };
                let n = normalize(&mut model.tree, &spec);
                println!(
                    "normalized: scale={:.4}{}",
                    n.scale,
                    if n.degenerate { " (fallback, degenerate bounds)" } else { "" }
                );
            }
        }
        Commands::Simulate {
            assets,
            frames,
            fps,
            pointer,
            click,
        } => {
            let mut session = Session::new(&config)?;
            session.start_loads(&GltfLoader::new(&assets));
            while let Some(outcome) = block_on(session.next_load()) {
                println!("load: {outcome:?}");
            }

            let mut frame_loop = FrameLoop::new(DebugTextRenderer::new(), session);
            let mut navigator = PrintNavigator::default();
            let step = 1.0 / fps.max(1.0);
            let mut last = String::new();
            for i in 0..frames {
                let mut actions = Vec::new();
                if i == 0 {
                    if let Some((x, y)) = pointer {
                        actions.push(Action::PointerMoved { x, y });
                    }
                }
                if click && i == frames / 2 {
                    actions.push(Action::Click);
                }
                let (report, text) = frame_loop.tick(i as f64 * step, actions, &mut navigator);
                if let Some(hover) = report.hover {
                    println!("frame {i}: hover {hover:?}");
                }
                last = text;
            }
            print!("{last}");
            println!("{}", SessionInspector::summary(frame_loop.session()));
            let report = frame_loop.shutdown();
            println!(
                "Simulated {} frames over {:.2}s: {} attached, {} failed, {} links opened",
                report.frames,
                report.elapsed,
                report.attached,
                report.failed,
                navigator.opened.len()
            );
        }
    }

    Ok(())
}
