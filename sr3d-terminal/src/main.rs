/// SR3D Terminal - shadow-mapped software rendering in the terminal
///
/// Controls:
///   - WASD: Orbit the camera, Shift+WASD: Pan, R/F: Zoom, G: Toggle orthographic, H: Reset
///   - Arrow Keys: Steer the light
///   - Tab/Shift+Tab: Select node, Q/E: Rotate it, J/L U/O I/K: Move it on x/y/z
///   - +/-: Scale it (never below 0.1), V: Hide, C: Duplicate, X: Delete
///   - Space: Auto-spin, P: Capture PNG, ESC: Quit
use anyhow::Context;
use clap::Parser;
use sr3d_core::{AssetLoader, RenderConfig, Texture};
use sr3d_terminal::{build_scene, render_headless, PresentMode, TerminalApp, DEFAULT_MESHES};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sr3d-terminal")]
#[command(about = "Shadow-mapped software renderer for the terminal", long_about = None)]
struct Args {
    /// Meshes to load: OBJ or STL files, or builtin:cube / builtin:plane
    meshes: Vec<String>,

    /// Render configuration (RON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Background image drawn behind the scene
    #[arg(long)]
    background: Option<PathBuf>,

    /// Use the ASCII luminosity ramp instead of 24-bit color
    #[arg(long)]
    ascii: bool,

    /// PNG file written by captures (and by headless mode)
    #[arg(long)]
    capture: Option<PathBuf>,

    /// Render a single frame to a PNG without opening the terminal UI
    #[arg(long)]
    headless: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the effective configuration as RON and exit
    #[arg(long)]
    print_config: bool,
}

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match &args.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            builder.with_writer(Mutex::new(file)).with_ansi(false).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    if args.print_config {
        println!("{}", config.to_ron()?);
        return Ok(());
    }

    let meshes: Vec<String> = if args.meshes.is_empty() {
        DEFAULT_MESHES.iter().map(|s| s.to_string()).collect()
    } else {
        args.meshes.clone()
    };
    let mut scene = build_scene(&AssetLoader::new(), &meshes)?;
    if let Some(path) = &args.background {
        scene.set_background(Texture::load(path)?);
    }
    tracing::info!("scene ready:\n{}", scene.hierarchy());

    if args.headless {
        let path = args.capture.unwrap_or_else(|| PathBuf::from("sr3d_frame.png"));
        let stats = render_headless(&mut scene, config, &path)?;
        println!(
            "Rendered {} nodes ({} triangles, {} fragments) to {}",
            stats.nodes,
            stats.triangles,
            stats.fragments,
            path.display()
        );
        return Ok(());
    }

    let mode = if args.ascii {
        PresentMode::Ascii
    } else {
        PresentMode::TrueColor
    };
    let mut app = TerminalApp::new(scene, config, mode, args.capture)?;
    app.run()?;

    println!("Thank you for using SR3D Terminal!");
    Ok(())
}
