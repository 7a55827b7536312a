/// Terminal front end for the SR3D software renderer
use anyhow::Context;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use nalgebra::Vector3;
use sr3d_core::{AssetLoader, FrameBuffer, FrameStats, OrbitRig, RenderConfig, Renderer, Scene};
use std::io::{self, stdout, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub mod presenter;

pub use presenter::{PresentMode, TerminalPresenter};

/// Meshes loaded when none are given on the command line
pub const DEFAULT_MESHES: &[&str] = &["builtin:plane", "builtin:cube"];

/// Height the lowest point of every mesh is placed at
const GROUND_Y: f32 = -0.5;
const MESH_SPACING: f32 = 1.5;

const ORBIT_STEP: f32 = 0.1;
const ZOOM_STEP: f32 = 0.25;
const LIGHT_STEP: f32 = 0.15;
const ROTATE_STEP: f32 = 0.1;
const MOVE_STEP: f32 = 0.1;
const SCALE_STEP: f32 = 0.1;
const PAN_STEP: f32 = 0.1;
const SPIN_STEP: f32 = 0.02;

/// Load `meshes` into a fresh scene and lay them out.
///
/// Flat meshes become the ground; everything else stands on it side by side.
/// The first mesh node is selected.
pub fn build_scene(loader: &AssetLoader, meshes: &[String]) -> anyhow::Result<Scene> {
    let mut scene = Scene::new();
    let mut standing = Vec::new();

    for path in meshes {
        let id = scene
            .create_mesh_node(loader, path, None)
            .with_context(|| format!("failed to add mesh {path}"))?;
        let Some((lo, hi)) = scene.node(id).and_then(|n| n.mesh()).and_then(|m| m.bounds()) else {
            continue;
        };
        let flat = hi.y - lo.y < 1e-3;
        if let Some(node) = scene.node_mut(id) {
            node.local.position.y = GROUND_Y - lo.y;
        }
        if !flat {
            standing.push(id);
        }
    }

    let offset = (standing.len() as f32 - 1.0) / 2.0;
    for (i, &id) in standing.iter().enumerate() {
        if let Some(node) = scene.node_mut(id) {
            node.local.position.x = (i as f32 - offset) * MESH_SPACING;
        }
    }

    scene.select_next();
    scene.update_world_transforms();
    Ok(scene)
}

/// Camera placement used at startup and on reset
pub fn home_rig() -> OrbitRig {
    let mut rig = OrbitRig::new(Vector3::zeros(), 4.0);
    rig.orbit(0.6, 0.45);
    rig
}

/// Save a frame as an RGB PNG
pub fn save_png(frame: &FrameBuffer, path: &Path) -> anyhow::Result<()> {
    let image = image::RgbImage::from_raw(frame.width() as u32, frame.height() as u32, frame.as_bytes().to_vec())
        .context("frame buffer size does not match its dimensions")?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!("frame saved to {}", path.display());
    Ok(())
}

/// Render one frame from the home camera and write it to `path`
pub fn render_headless(scene: &mut Scene, config: RenderConfig, path: &Path) -> anyhow::Result<FrameStats> {
    home_rig().apply(&mut scene.camera);
    scene.update_world_transforms();

    let mut renderer = Renderer::new(config);
    let stats = renderer.render(scene);
    save_png(renderer.frame(), path)?;
    Ok(stats)
}

/// Main application struct for interactive terminal rendering
pub struct TerminalApp {
    scene: Scene,
    renderer: Renderer,
    presenter: TerminalPresenter,
    rig: OrbitRig,
    auto_spin: bool,
    capture_path: Option<PathBuf>,
    captures: u32,
    status: String,
    stats: FrameStats,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(scene: Scene, config: RenderConfig, mode: PresentMode, capture_path: Option<PathBuf>) -> io::Result<Self> {
        let (columns, rows) = terminal::size()?;
        Ok(Self::with_size(scene, config, mode, capture_path, columns, rows))
    }

    /// Build the app for a terminal of `columns` x `rows` cells
    pub fn with_size(
        scene: Scene,
        config: RenderConfig,
        mode: PresentMode,
        capture_path: Option<PathBuf>,
        columns: u16,
        rows: u16,
    ) -> Self {
        // Row 0 holds the status line
        let presenter = TerminalPresenter::new(mode, 1);
        let (width, height) = presenter.frame_size(columns, rows);

        Self {
            scene,
            renderer: Renderer::new(config.with_size(width, height)),
            presenter,
            rig: home_rig(),
            auto_spin: false,
            capture_path,
            captures: 0,
            status: String::new(),
            stats: FrameStats::default(),
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }

            self.update();
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        match key.code {
            KeyCode::Esc => self.running = false,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => self.running = false,

            // Camera
            KeyCode::Char('w') => self.rig.orbit(0.0, ORBIT_STEP),
            KeyCode::Char('s') => self.rig.orbit(0.0, -ORBIT_STEP),
            KeyCode::Char('a') => self.rig.orbit(-ORBIT_STEP, 0.0),
            KeyCode::Char('d') => self.rig.orbit(ORBIT_STEP, 0.0),
            KeyCode::Char('r') => self.rig.zoom(-ZOOM_STEP),
            KeyCode::Char('f') => self.rig.zoom(ZOOM_STEP),
            KeyCode::Char('W') => self.pan(0.0, PAN_STEP),
            KeyCode::Char('S') => self.pan(0.0, -PAN_STEP),
            KeyCode::Char('A') => self.pan(-PAN_STEP, 0.0),
            KeyCode::Char('D') => self.pan(PAN_STEP, 0.0),
            KeyCode::Char('g') => {
                self.scene.camera.toggle_projection();
                self.status = if self.scene.camera.is_orthographic() {
                    "orthographic".into()
                } else {
                    "perspective".into()
                };
            }
            KeyCode::Char('h') => {
                self.rig = home_rig();
                self.auto_spin = false;
            }
            KeyCode::Char(' ') => self.auto_spin = !self.auto_spin,

            // Light
            KeyCode::Left => self.scene.light.nudge(-LIGHT_STEP, 0.0),
            KeyCode::Right => self.scene.light.nudge(LIGHT_STEP, 0.0),
            KeyCode::Up => self.scene.light.nudge(0.0, -LIGHT_STEP),
            KeyCode::Down => self.scene.light.nudge(0.0, LIGHT_STEP),

            // Selection
            KeyCode::Tab => {
                self.scene.select_next();
            }
            KeyCode::BackTab => {
                self.scene.select_previous();
            }
            KeyCode::Char('q') => self.rotate_selected(-ROTATE_STEP),
            KeyCode::Char('e') => self.rotate_selected(ROTATE_STEP),
            KeyCode::Char('j') => self.move_selected(Vector3::new(-MOVE_STEP, 0.0, 0.0)),
            KeyCode::Char('l') => self.move_selected(Vector3::new(MOVE_STEP, 0.0, 0.0)),
            KeyCode::Char('u') => self.move_selected(Vector3::new(0.0, MOVE_STEP, 0.0)),
            KeyCode::Char('o') => self.move_selected(Vector3::new(0.0, -MOVE_STEP, 0.0)),
            KeyCode::Char('i') => self.move_selected(Vector3::new(0.0, 0.0, -MOVE_STEP)),
            KeyCode::Char('k') => self.move_selected(Vector3::new(0.0, 0.0, MOVE_STEP)),
            KeyCode::Char('+') | KeyCode::Char('=') => self.scale_selected(SCALE_STEP),
            KeyCode::Char('-') => self.scale_selected(-SCALE_STEP),
            KeyCode::Char('v') => {
                if let Some(node) = self.scene.selected_node_mut() {
                    node.visible = !node.visible;
                }
            }
            KeyCode::Char('c') => self.duplicate_selected(),
            KeyCode::Char('x') => self.delete_selected(),

            KeyCode::Char('p') => self.capture(),
            _ => {}
        }
    }

    fn rotate_selected(&mut self, amount: f32) {
        if let Some(node) = self.scene.selected_node_mut() {
            node.local.rotate(0.0, amount, 0.0);
        }
    }

    fn move_selected(&mut self, delta: Vector3<f32>) {
        if let Some(node) = self.scene.selected_node_mut() {
            node.local.translate(delta);
        }
    }

    /// Uniform scale step; each axis stops at `MIN_SCALE`
    fn scale_selected(&mut self, amount: f32) {
        if let Some(node) = self.scene.selected_node_mut() {
            node.local.scale_by(Vector3::repeat(amount));
        }
    }

    /// Slide the orbit target in the current screen plane
    fn pan(&mut self, dx: f32, dy: f32) {
        self.rig.apply(&mut self.scene.camera);
        self.rig.pan(&self.scene.camera, dx, dy);
    }

    fn selected_name(&self) -> Option<String> {
        let id = self.scene.selected()?;
        self.scene.node(id).map(|node| node.name.clone())
    }

    fn duplicate_selected(&mut self) {
        let Some(name) = self.selected_name() else {
            return;
        };
        match self.scene.duplicate_node(&name) {
            Ok(copy) => {
                if let Some(node) = self.scene.node_mut(copy) {
                    node.local.position.x += MESH_SPACING;
                    self.status = format!("duplicated {name} as {}", node.name);
                }
                self.scene.select(Some(copy));
            }
            Err(e) => self.status = e.to_string(),
        }
    }

    fn delete_selected(&mut self) {
        let Some(name) = self.selected_name() else {
            return;
        };
        self.status = match self.scene.delete_node(&name) {
            Ok(()) => format!("deleted {name}"),
            Err(e) => e.to_string(),
        };
    }

    fn capture(&mut self) {
        let path = self
            .capture_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("sr3d_capture_{:03}.png", self.captures)));
        self.status = match save_png(self.renderer.frame(), &path) {
            Ok(()) => {
                self.captures += 1;
                format!("saved {}", path.display())
            }
            Err(e) => {
                tracing::warn!("capture failed: {e:#}");
                format!("capture failed: {e}")
            }
        };
    }

    /// Advance the camera and propagate node transforms
    pub fn update(&mut self) {
        if self.auto_spin {
            self.rig.orbit(SPIN_STEP, 0.0);
        }
        self.rig.apply(&mut self.scene.camera);
        self.scene.update_world_transforms();
    }

    fn render(&mut self) -> io::Result<()> {
        let (columns, rows) = terminal::size()?;
        let (width, height) = self.presenter.frame_size(columns, rows);
        self.renderer.resize(width, height);
        self.stats = self.renderer.render(&self.scene);

        let mut stdout = stdout();
        self.presenter.draw(self.renderer.frame(), &mut stdout)?;

        // Draw UI overlay
        let selected = self.selected_name().unwrap_or_else(|| "-".into());
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "SR3D | FPS: {:.1} | {} tris | sel: {} | WASD orbit +Shift pan R/F zoom arrows light Tab select Q/E rotate IJKLUO move +/- scale V hide C dup X del G proj P capture Esc quit | {}",
                self.fps, self.stats.triangles, selected, self.status
            )),
            ResetColor
        )?;

        stdout.flush()
    }
}
