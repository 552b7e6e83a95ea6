//! Mini Adventure -- main loop and application entry point.
//!
//! Architecture: winit drives the event loop via `ApplicationHandler`. All simulation
//! runs inside `RedrawRequested` using a **fixed-timestep** model (see `FrameClock`):
//!
//!   1. `begin_frame()` -- measure wall-clock delta, feed accumulator
//!   2. `while should_step()` -- advance the mode controller by one fixed slice
//!   3. Rebuild the sprite batch and text labels from the current mode
//!   4. Upload camera uniform, issue draw calls, composite the egui overlay
//!
//! Hot reload: the current level's map file is watched via mtime polling and
//! soft-reloaded at a step boundary; R forces the same reload.

mod audio;
mod collision;
mod config;
mod controller;
mod draw;
mod level;
mod lilypad;
mod mode;
#[cfg(test)]
mod replay;
mod session;
#[cfg(test)]
mod testing;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec2;
use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use audio::AudioBackend;
use config::{load_or_default, GameConfig, CONFIG_FILE};
use controller::PlayerIntent;
use draw::{build_frame, DrawOptions, Shape, PLAYER_TEXTURE_CANDIDATES};
use level::{find_asset_root, ContentSource, FileWatcher, FsContent};
use ma_core::input::{InputState, Key, MouseBtn};
use ma_core::time::FrameClock;
use ma_devtools::{Overlay, OverlayStats, SessionStats, TextLabel};
use ma_platform::window::PlatformConfig;
use ma_render::{circle_rgba, Camera2D, GpuContext, QuadSpec, SpriteBatch, SpritePipeline, SpriteVertex, Texture};
use mode::{FrameInput, GameModeController};

const ASSET_DIR: &str = "assets";
const WHITE_TEXTURE: &str = "__white";
const CIRCLE_TEXTURE: &str = "__circle";
const CIRCLE_DIAMETER: u32 = 64;

struct GpuSpriteTexture {
    _texture: Texture,
    bind_group: wgpu::BindGroup,
}

/// All mutable engine state lives here. Constructed lazily in `ApplicationHandler::resumed`
/// once the window and GPU surface are available.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    clock: FrameClock,
    input: InputState,
    camera: Camera2D,
    sprite_pipeline: SpritePipeline,
    overlay: Overlay,

    // --- Game ----------------------------------------------------------------
    content: FsContent,
    controller: GameModeController,
    audio_backend: Box<dyn AudioBackend>,
    map_watcher: Option<(u32, FileWatcher)>,
    draw_options: DrawOptions,
    paused: bool,
    single_step_requested: bool,
    /// `None` marks a texture that failed to load; it is not retried.
    textures: HashMap<Arc<str>, Option<GpuSpriteTexture>>,

    // --- Per-frame GPU mesh state --------------------------------------------
    // The batch is rebuilt on the CPU each frame, then streamed into these
    // GPU buffers. Buffers grow (power-of-two) but never shrink.
    batch: SpriteBatch,
    labels: Vec<TextLabel>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    mesh_vertex_capacity: usize,
    mesh_index_capacity: usize,
}

impl EngineState {
    fn new(
        window: Arc<Window>,
        config: GameConfig,
        asset_root: PathBuf,
        vsync: bool,
    ) -> Result<Self, String> {
        let gpu = GpuContext::new(window.clone(), vsync)?;
        let sprite_pipeline = SpritePipeline::new(&gpu.device, gpu.surface_format);
        let overlay = Overlay::new(&gpu.device, gpu.surface_format, &window);
        let camera = Camera2D::new(config.world.width, config.world.height, gpu.size);

        let content = FsContent::new(asset_root);
        let audio_backend = audio::open_backend(content.root());
        let player_texture = content
            .first_available(PLAYER_TEXTURE_CANDIDATES)
            .map(str::to_string);
        match &player_texture {
            Some(path) => log::info!("Player texture: {path}"),
            None => log::warn!("No player texture found; drawing a circle instead"),
        }

        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera.build_uniform()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group =
            sprite_pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);
        let vertex_buffer = create_vertex_buffer(&gpu.device, 1);
        let index_buffer = create_index_buffer(&gpu.device, 1);

        let mut state = Self {
            window,
            gpu,
            clock: FrameClock::default(),
            input: InputState::new(),
            camera,
            sprite_pipeline,
            overlay,
            content,
            controller: GameModeController::new(config),
            audio_backend,
            map_watcher: None,
            draw_options: DrawOptions {
                player_texture,
                show_collision: false,
            },
            paused: false,
            single_step_requested: false,
            textures: HashMap::new(),
            batch: SpriteBatch::new(),
            labels: Vec::new(),
            vertex_buffer,
            index_buffer,
            camera_buffer,
            camera_bind_group,
            mesh_vertex_capacity: 0,
            mesh_index_capacity: 0,
        };
        state.insert_generated_textures();
        state.ensure_mesh_capacity(4, 6);
        Ok(state)
    }

    fn insert_generated_textures(&mut self) {
        let white = Texture::from_rgba8(
            &self.gpu.device,
            &self.gpu.queue,
            &[255, 255, 255, 255],
            1,
            1,
            "white",
        );
        let circle = Texture::from_rgba8(
            &self.gpu.device,
            &self.gpu.queue,
            &circle_rgba(CIRCLE_DIAMETER),
            CIRCLE_DIAMETER,
            CIRCLE_DIAMETER,
            "circle",
        );
        for (key, texture) in [(WHITE_TEXTURE, white), (CIRCLE_TEXTURE, circle)] {
            let bind_group = self
                .sprite_pipeline
                .create_texture_bind_group(&self.gpu.device, &texture);
            self.textures.insert(
                Arc::from(key),
                Some(GpuSpriteTexture {
                    _texture: texture,
                    bind_group,
                }),
            );
        }
    }

    /// Load `path` on first use. Returns whether it is available.
    fn ensure_texture(&mut self, path: &str) -> bool {
        if let Some(entry) = self.textures.get(path) {
            return entry.is_some();
        }
        let loaded = load_texture_asset(
            &self.gpu.device,
            &self.gpu.queue,
            &self.sprite_pipeline,
            &self.content.resolve(path),
            path,
        );
        let entry = match loaded {
            Ok(texture) => {
                log::info!("Texture loaded: {path}");
                Some(texture)
            }
            Err(err) => {
                log::warn!("{err}. Using a placeholder.");
                None
            }
        };
        let available = entry.is_some();
        self.textures.insert(Arc::from(path), entry);
        available
    }

    fn simulate_step(&mut self) {
        let dt = self.clock.fixed_dt as f32;
        let input = FrameInput {
            intent: PlayerIntent {
                move_x: self
                    .input
                    .axis(&[Key::Left, Key::A], &[Key::Right, Key::D]),
                jump_pressed: self
                    .input
                    .is_any_just_pressed(&[Key::Space, Key::Up, Key::W]),
            },
            click: self
                .input
                .left_click()
                .map(|p| self.camera.screen_to_world(p)),
        };
        self.controller.update(dt, &input, &self.content);
        self.controller
            .audio_mut()
            .drain_into(self.audio_backend.as_mut());
        self.sync_map_watcher();
    }

    /// Keep the watcher pointed at the map of the level being played.
    fn sync_map_watcher(&mut self) {
        let level = self.controller.session().map(|s| s.level());
        match (level, &self.map_watcher) {
            (Some(level), Some((watched, _))) if *watched == level => {}
            (Some(level), _) => {
                self.map_watcher = Some((level, FileWatcher::new(self.content.map_path(level))));
            }
            (None, _) => self.map_watcher = None,
        }
    }

    fn reload_level(&mut self, reason: &str) {
        if self.controller.session().is_some() {
            log::info!("Reloading level ({reason})");
            self.controller.reload_level(&self.content);
        }
    }

    fn rebuild_frame(&mut self) {
        let frame = build_frame(&self.controller, &self.draw_options);
        for sprite in &frame.sprites {
            if let Some(path) = &sprite.texture {
                self.ensure_texture(path);
            }
        }

        self.batch.clear();
        for sprite in &frame.sprites {
            let loaded = sprite
                .texture
                .as_deref()
                .filter(|path| matches!(self.textures.get(*path), Some(Some(_))));
            let (texture_key, color) = match loaded {
                Some(path) => (path, [1.0, 1.0, 1.0, sprite.color[3]]),
                None => match sprite.shape {
                    Shape::Rect => (WHITE_TEXTURE, sprite.color),
                    Shape::Circle => (CIRCLE_TEXTURE, sprite.color),
                },
            };
            self.batch.push_quad(QuadSpec {
                texture_key,
                center: sprite.center.to_array(),
                size: sprite.size.to_array(),
                rotation_deg: sprite.rotation_deg,
                color,
            });
        }

        let pixels_per_point = self.window.scale_factor() as f32;
        let zoom = self.camera.zoom();
        self.labels = frame
            .labels
            .iter()
            .map(|label| {
                let screen = self.camera.world_to_screen(label.pos) / pixels_per_point;
                TextLabel {
                    text: label.text.clone(),
                    pos: screen.to_array(),
                    size: label.size * zoom / pixels_per_point,
                    color: label.color,
                    centered: label.centered,
                }
            })
            .collect();

        self.ensure_mesh_capacity(self.batch.vertices().len(), self.batch.indices().len());
        if !self.batch.indices().is_empty() {
            self.gpu.queue.write_buffer(
                &self.vertex_buffer,
                0,
                bytemuck::cast_slice(self.batch.vertices()),
            );
            self.gpu.queue.write_buffer(
                &self.index_buffer,
                0,
                bytemuck::cast_slice(self.batch.indices()),
            );
        }
    }

    fn overlay_stats(&self) -> OverlayStats {
        let session = self.controller.session().map(|session| {
            let content = session.content();
            SessionStats {
                level: session.level(),
                background_loaded: session.background_loaded(),
                platform_count: content.platforms.len(),
                hazard_count: content.spikes.len() + content.water.len(),
                coins_left: session.coins().len(),
                lily_pads_solid: session.pads().solid_count(),
                lily_pads_total: session.pads().len(),
                player_present: true,
                deaths: session.progress().deaths,
                score: session.progress().score,
            }
        });
        OverlayStats {
            mode_label: self.controller.mode().label().to_string(),
            draw_calls: self.batch.draw_calls().len() as u32,
            texture_binds: self.batch.texture_binds() as u32,
            sprite_count: self.batch.quad_count() as u32,
            paused: self.paused,
            session,
        }
    }

    fn ensure_mesh_capacity(&mut self, vertex_count: usize, index_count: usize) {
        let needed_vertices = vertex_count.max(1);
        if needed_vertices > self.mesh_vertex_capacity {
            self.mesh_vertex_capacity = needed_vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.gpu.device, self.mesh_vertex_capacity);
        }

        let needed_indices = index_count.max(1);
        if needed_indices > self.mesh_index_capacity {
            self.mesh_index_capacity = needed_indices.next_power_of_two();
            self.index_buffer = create_index_buffer(&self.gpu.device, self.mesh_index_capacity);
        }
    }

    fn render(&mut self) {
        let camera_uniform = self.camera.build_uniform();
        self.gpu.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[camera_uniform]),
        );

        let Some((output, view)) = self.gpu.acquire_frame() else {
            return;
        };

        let stats = self.overlay_stats();
        let (egui_primitives, egui_textures_delta, overlay_actions) =
            self.overlay
                .prepare(&self.window, &self.clock, &self.labels, &stats);

        if overlay_actions.toggle_pause {
            self.paused = !self.paused;
            log::info!(
                "Simulation {}",
                if self.paused { "PAUSED" } else { "RESUMED" }
            );
        }
        if overlay_actions.single_step {
            self.single_step_requested = true;
        }
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.size.0, self.gpu.size.1],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut last_bound_texture_key: Option<&Arc<str>> = None;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Sprite Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            render_pass.set_pipeline(&self.sprite_pipeline.render_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            for draw in self.batch.draw_calls() {
                if let Some(Some(texture)) = self.textures.get(&draw.texture_key) {
                    let need_rebind = match last_bound_texture_key {
                        Some(last) => **last != *draw.texture_key,
                        None => true,
                    };
                    if need_rebind {
                        render_pass.set_bind_group(1, &texture.bind_group, &[]);
                        last_bound_texture_key = Some(&draw.texture_key);
                    }
                    render_pass.draw_indexed(
                        draw.index_start..(draw.index_start + draw.index_count),
                        0,
                        0..1,
                    );
                }
            }
        }

        self.overlay.upload(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &egui_primitives,
            &egui_textures_delta,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
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

            self.overlay
                .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
        }

        self.overlay.cleanup(&egui_textures_delta);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}

struct App {
    platform: PlatformConfig,
    config: GameConfig,
    asset_root: PathBuf,
    state: Option<EngineState>,
}

impl App {
    fn new(config: GameConfig, asset_root: PathBuf) -> Self {
        let platform = PlatformConfig {
            width: config.world.width as u32,
            height: config.world.height as u32,
            vsync: config.world.vsync,
            ..PlatformConfig::default()
        };
        Self {
            platform,
            config,
            asset_root,
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let created = ma_platform::window::create_window(event_loop, &self.platform)
            .and_then(|window| {
                EngineState::new(
                    window,
                    self.config.clone(),
                    self.asset_root.clone(),
                    self.platform.vsync,
                )
            });
        match created {
            Ok(state) => self.state = Some(state),
            Err(err) => {
                log::error!("Engine initialization failed: {err}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state.overlay.handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    state.camera.viewport = (w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(game_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(game_key),
                            ElementState::Released => state.input.key_up(game_key),
                        }
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                state.input.cursor = Vec2::new(position.x as f32, position.y as f32);
            }

            WindowEvent::MouseInput { state: button_state, button, .. } if !egui_consumed => {
                let btn = match button {
                    MouseButton::Left => MouseBtn::Left,
                    MouseButton::Right => MouseBtn::Right,
                    _ => return,
                };
                match button_state {
                    ElementState::Pressed => state.input.mouse_down(btn),
                    ElementState::Released => state.input.mouse_up(btn),
                }
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }

                // Fixed-step simulation phase.
                state.clock.begin_frame();
                while state.clock.should_step() {
                    if state.input.is_just_pressed(Key::Escape) {
                        event_loop.exit();
                        return;
                    }
                    if state.input.is_just_pressed(Key::F3) {
                        state.overlay.toggle_debug();
                    }
                    if state.input.is_just_pressed(Key::F4) {
                        state.draw_options.show_collision = !state.draw_options.show_collision;
                        log::info!(
                            "Collision debug: {}",
                            if state.draw_options.show_collision {
                                "ON"
                            } else {
                                "OFF"
                            }
                        );
                    }

                    if state.input.is_just_pressed(Key::R) {
                        state.reload_level("manual trigger (R)");
                    } else if let Some(changed) =
                        state.map_watcher.as_mut().and_then(|(_, watcher)| {
                            watcher
                                .should_reload()
                                .then(|| watcher.path().display().to_string())
                        })
                    {
                        state.reload_level(&format!("{changed} changed"));
                    }

                    // Skip simulation update when paused (unless single-step requested)
                    if state.paused && !state.single_step_requested {
                        break;
                    }
                    state.single_step_requested = false;

                    state.simulate_step();
                }

                // Render phase reads finalized simulation state from this frame.
                state.rebuild_frame();
                state.render();

                // Only clear edge-triggered input (just_pressed / just_released)
                // after at least one fixed step consumed it. Otherwise a press
                // that lands on a frame with 0 simulation steps is silently lost.
                if state.clock.steps_this_frame > 0 {
                    state.input.end_frame();
                }
            }

            _ => {}
        }
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<SpriteVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn load_texture_asset(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pipeline: &SpritePipeline,
    file_path: &Path,
    label: &str,
) -> Result<GpuSpriteTexture, String> {
    let bytes = std::fs::read(file_path)
        .map_err(|e| format!("Failed to read texture '{}': {e}", file_path.display()))?;
    let texture = Texture::from_bytes(device, queue, &bytes, label)?;
    let bind_group = pipeline.create_texture_bind_group(device, &texture);
    Ok(GpuSpriteTexture {
        _texture: texture,
        bind_group,
    })
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::ArrowUp => Some(Key::Up),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::Space => Some(Key::Space),
        KeyCode::F3 => Some(Key::F3),
        KeyCode::F4 => Some(Key::F4),
        KeyCode::KeyW => Some(Key::W),
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyD => Some(Key::D),
        KeyCode::KeyR => Some(Key::R),
        _ => None,
    }
}

/// Next to the executable, then the workspace checkout, then the working
/// directory.
fn locate_asset_root() -> PathBuf {
    let mut candidates = Vec::new();
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(dir.join(ASSET_DIR));
    }
    candidates.push(Path::new(env!("CARGO_MANIFEST_DIR")).join("../..").join(ASSET_DIR));
    candidates.push(PathBuf::from(ASSET_DIR));

    match find_asset_root(&candidates) {
        Some(root) => {
            log::info!("Asset root: {}", root.display());
            root
        }
        None => {
            log::warn!("No asset folder with maps found; using '{ASSET_DIR}'");
            PathBuf::from(ASSET_DIR)
        }
    }
}

fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Mini Adventure starting...");
    let asset_root = locate_asset_root();
    let config = load_or_default(&asset_root.join(CONFIG_FILE));

    let event_loop =
        EventLoop::new().map_err(|e| format!("Failed to create event loop: {e}"))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, asset_root);
    event_loop
        .run_app(&mut app)
        .map_err(|e| format!("Event loop error: {e}"))
}
