use anyhow::{Context, Result, anyhow};
use clap::Parser;
use egui::Context as EguiContext;
use glam::DVec2;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};
use workshop_camera::Camera;
use workshop_common::WorkshopConfig;
use workshop_input::{Action, ActionOutcome, apply_action};
use workshop_pacer::{FramePacer, PaceReport};
use workshop_render::DebugDraw;
use workshop_render_wgpu::WgpuRenderer;
use workshop_sim::SimWorld;

#[derive(Parser)]
#[command(name = "workshop-desktop", about = "Workshop desktop harness")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target frame rate (overrides the config file)
    #[arg(long)]
    fps: Option<f64>,

    /// Initial window width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Initial window height in pixels
    #[arg(long)]
    height: Option<u32>,
}

impl Cli {
    fn config(&self) -> Result<WorkshopConfig> {
        let mut config = WorkshopConfig::load_or_default(self.config.as_deref())
            .context("loading config")?;
        if let Some(fps) = self.fps {
            config.pacer.target_fps = fps;
        }
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Map a key press to the action it triggers.
fn key_action(key: KeyCode) -> Action {
    let step = Action::PAN_STEP;
    match key {
        KeyCode::ArrowLeft => Action::Pan(DVec2::new(-step, 0.0)),
        KeyCode::ArrowRight => Action::Pan(DVec2::new(step, 0.0)),
        KeyCode::ArrowUp => Action::Pan(DVec2::new(0.0, step)),
        KeyCode::ArrowDown => Action::Pan(DVec2::new(0.0, -step)),
        KeyCode::KeyZ => Action::ZoomOut,
        KeyCode::KeyX => Action::ZoomIn,
        KeyCode::Home => Action::ResetView,
        KeyCode::KeyP => Action::TogglePause,
        _ => Action::Noop,
    }
}

/// Everything the loop owns apart from the GPU.
struct AppState {
    config: WorkshopConfig,
    camera: Camera,
    world: SimWorld,
    pacer: FramePacer,
    paused: bool,
    show_hud: bool,
    cursor: Option<DVec2>,
    dragging: bool,
    last_pace: Option<PaceReport>,
}

impl AppState {
    fn new(config: WorkshopConfig) -> Self {
        let camera = Camera::new(&config.camera, config.window.width, config.window.height);
        // One fixed simulation step per frame, whatever the frame really took.
        let world = SimWorld::from_config(&config.sim, config.pacer.target_period());
        let pacer = FramePacer::new(&config.pacer);
        Self {
            config,
            camera,
            world,
            pacer,
            paused: false,
            show_hud: true,
            cursor: None,
            dragging: false,
            last_pace: None,
        }
    }

    fn apply(&mut self, action: Action) {
        if action == Action::Noop {
            return;
        }
        tracing::debug!(?action, "input");
        if apply_action(&action, &mut self.camera, &mut self.world) == ActionOutcome::PauseToggled
        {
            self.paused = !self.paused;
            tracing::info!(paused = self.paused, "simulation pause toggled");
        }
    }

    fn cursor_moved(&mut self, position: DVec2) {
        if self.dragging {
            if let Some(from) = self.cursor {
                self.apply(Action::DragPan { from, to: position });
            }
        }
        self.cursor = Some(position);
    }

    fn debug_draw(&self) -> DebugDraw {
        let mut draw = DebugDraw::from_world(&self.world);
        draw.transform(glam::Vec2::ZERO, 0.0, 1.0);
        draw
    }

    /// Step the simulation and hold the loop to the target rate.
    fn advance(&mut self) {
        if !self.paused {
            self.world.step();
        }
        self.last_pace = Some(self.pacer.pace());
    }

    fn draw_hud(&mut self, ctx: &EguiContext) {
        if !self.show_hud {
            return;
        }

        let stats = self.pacer.stats();
        let fps = stats.fps();
        let avg_ms = stats.average().as_secs_f64() * 1e3;
        let max_ms = stats.max().as_secs_f64() * 1e3;
        let last_ms = stats.last().map_or(0.0, |d| d.as_secs_f64() * 1e3);
        let cursor_world = self
            .cursor
            .and_then(|c| self.camera.screen_to_world(c).ok());

        egui::Window::new("Workshop")
            .default_pos([10.0, 10.0])
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!(
                    "Target: {:.0} fps  Actual: {fps:.1} fps",
                    self.config.pacer.target_fps
                ));
                ui.label(format!(
                    "Frame: last {last_ms:.2} ms  avg {avg_ms:.2} ms  max {max_ms:.2} ms"
                ));
                if let Some(report) = self.last_pace {
                    ui.label(format!(
                        "Work {:.2} ms  Sleep {:.2} ms  Adjust {:+.3} ms",
                        report.work_time.as_secs_f64() * 1e3,
                        report.sleep_time.as_secs_f64() * 1e3,
                        report.sleep_adjust * 1e3
                    ));
                }
                ui.separator();
                ui.label(format!(
                    "Tick: {}  Bodies: {}",
                    self.world.tick(),
                    self.world.body_count()
                ));
                let c = self.camera.center();
                ui.label(format!(
                    "Camera: ({:.1}, {:.1})  zoom {:.2}",
                    c.x,
                    c.y,
                    self.camera.zoom()
                ));
                if let Some(p) = cursor_world {
                    ui.label(format!("Cursor: ({:.2}, {:.2})", p.x, p.y));
                }
                ui.separator();
                ui.horizontal(|ui| {
                    let pause_label = if self.paused { "Resume (P)" } else { "Pause (P)" };
                    if ui.button(pause_label).clicked() {
                        self.paused = !self.paused;
                    }
                    if ui.button("Reset view (Home)").clicked() {
                        self.camera.reset_view();
                    }
                });
                ui.small("LMB: spawn box | RMB: pan | Wheel/Z/X: zoom | F1: HUD");
            });
    }
}

/// Surface, device and the two renderers, created once the window exists.
struct Gpu {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: WgpuRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Gpu {
    fn new(window: Arc<Window>, egui_ctx: &EguiContext) -> Result<Self> {
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
        .ok_or_else(|| anyhow!("no compatible GPU adapter"))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("workshop_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no formats"))?;

        // The frame pacer sets the cadence, not vsync.
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoNoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer = WgpuRenderer::new(&device, surface_format);

        let egui_winit = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
    }

    fn render(&mut self, window: &Window, egui_ctx: &EguiContext, state: &mut AppState) {
        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let draw = state.debug_draw();
        if let Err(e) = self
            .renderer
            .render(&self.device, &self.queue, &view, &state.camera, &draw)
        {
            tracing::warn!("scene not drawn: {e}");
        }

        let raw_input = self.egui_winit.take_egui_input(window);
        let full_output = egui_ctx.run(raw_input, |ctx| {
            state.draw_hud(ctx);
        });

        self.egui_winit
            .handle_platform_output(window, full_output.platform_output);

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
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
            self.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        output.present();
    }
}

struct GpuApp {
    state: AppState,
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
    startup_error: Option<anyhow::Error>,
}

impl GpuApp {
    fn new(config: WorkshopConfig) -> Self {
        Self {
            state: AppState::new(config),
            window: None,
            gpu: None,
            egui_ctx: EguiContext::default(),
            startup_error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_config = &self.state.config.window;
        let attrs = Window::default_attributes()
            .with_title(window_config.title.clone())
            .with_inner_size(PhysicalSize::new(window_config.width, window_config.height));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let gpu = Gpu::new(window.clone(), &self.egui_ctx)?;

        let size = window.inner_size();
        self.state.camera.resize(size.width, size.height);
        self.window = Some(window);
        self.gpu = Some(gpu);
        // Startup time is not frame work.
        self.state.pacer.restart();
        Ok(())
    }

    fn redraw(&mut self) {
        let (Some(window), Some(gpu)) = (&self.window, &mut self.gpu) else {
            return;
        };

        if self.state.camera.is_degenerate() {
            tracing::trace!("viewport is degenerate, skipping render");
        } else {
            gpu.render(window, &self.egui_ctx, &mut self.state);
        }

        self.state.advance();
        window.request_redraw();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            tracing::error!("startup failed: {e:#}");
            self.startup_error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let (Some(window), Some(gpu)) = (&self.window, &mut self.gpu) {
            let response = gpu.egui_winit.on_window_event(window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.state.camera.resize(new_size.width, new_size.height);
                if new_size.width == 0 || new_size.height == 0 {
                    tracing::debug!("window minimized");
                } else if let Some(gpu) = &mut self.gpu {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match key {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::F1 => self.state.show_hud = !self.state.show_hud,
                _ => self.state.apply(key_action(key)),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.state.cursor_moved(DVec2::new(position.x, position.y));
            }
            WindowEvent::CursorLeft { .. } => {
                self.state.cursor = None;
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: ElementState::Pressed,
                ..
            } => {
                if let Some(cursor) = self.state.cursor {
                    self.state.apply(Action::SpawnBox(cursor));
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state: btn_state,
                ..
            } => {
                self.state.dragging = btn_state == ElementState::Pressed;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y as f64,
                    MouseScrollDelta::PixelDelta(p) => p.y,
                };
                self.state.apply(Action::Scroll(amount));
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = cli.config()?;
    tracing::info!(
        fps = config.pacer.target_fps,
        width = config.window.width,
        height = config.window.height,
        "workshop-desktop starting"
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(config);
    event_loop.run_app(&mut app)?;

    if let Some(e) = app.startup_error.take() {
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_keys_pan_half_a_unit() {
        assert_eq!(
            key_action(KeyCode::ArrowLeft),
            Action::Pan(DVec2::new(-0.5, 0.0))
        );
        assert_eq!(key_action(KeyCode::ArrowUp), Action::Pan(DVec2::new(0.0, 0.5)));
    }

    #[test]
    fn zoom_and_reset_keys() {
        assert_eq!(key_action(KeyCode::KeyZ), Action::ZoomOut);
        assert_eq!(key_action(KeyCode::KeyX), Action::ZoomIn);
        assert_eq!(key_action(KeyCode::Home), Action::ResetView);
        assert_eq!(key_action(KeyCode::KeyQ), Action::Noop);
    }

    #[test]
    fn cli_overrides_config() {
        let cli = Cli::parse_from(["workshop-desktop", "--fps", "30", "--width", "640"]);
        let config = cli.config().unwrap();
        assert_eq!(config.pacer.target_fps, 30.0);
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 800);
    }

    #[test]
    fn cli_rejects_invalid_fps() {
        let cli = Cli::parse_from(["workshop-desktop", "--fps", "0"]);
        assert!(cli.config().is_err());
        let cli = Cli::parse_from(["workshop-desktop", "--fps", "1e-30"]);
        assert!(cli.config().is_err());
    }

    #[test]
    fn pause_stops_simulation_but_not_pacing() {
        let mut config = WorkshopConfig::default();
        config.pacer.target_fps = 1000.0;
        let mut state = AppState::new(config);
        state.apply(Action::TogglePause);
        state.advance();
        assert_eq!(state.world.tick(), 0);
        assert!(state.last_pace.is_some());
        assert!(state.pacer.stats().last().is_some());
        state.apply(Action::TogglePause);
        state.advance();
        assert_eq!(state.world.tick(), 1);
    }
}
