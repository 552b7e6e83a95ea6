//! egui layer drawn on top of the sprite pass: game text plus the F3 debug panel.
//!
//! egui needs its own render pass with a `'static` lifetime, so a frame goes
//! through four calls in order:
//!
//!   1. `prepare()` -- run the UI, tessellate
//!   2. `upload()`  -- push textures and buffers (borrows the encoder)
//!   3. `paint()`   -- draw into a pass made with `forget_lifetime()`
//!   4. `cleanup()` -- free textures egui dropped
//!
//! Game text (menu label, HUD, intro and victory screens) is always drawn.
//! The debug panel only when `debug_visible` is set.

use ma_core::time::FrameClock;
use winit::window::Window;

/// A line of text placed in logical window points (y down).
#[derive(Debug, Clone)]
pub struct TextLabel {
    pub text: String,
    pub pos: [f32; 2],
    pub size: f32,
    pub color: [u8; 4],
    /// Anchor at the label's center instead of its top-left corner.
    pub centered: bool,
}

/// What the debug panel reports about the running level.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub level: u32,
    pub background_loaded: bool,
    pub platform_count: usize,
    pub hazard_count: usize,
    pub coins_left: usize,
    pub lily_pads_solid: usize,
    pub lily_pads_total: usize,
    pub player_present: bool,
    pub deaths: u32,
    pub score: u32,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayStats {
    pub mode_label: String,
    pub draw_calls: u32,
    pub texture_binds: u32,
    pub sprite_count: u32,
    pub paused: bool,
    pub session: Option<SessionStats>,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayActions {
    pub toggle_pause: bool,
    /// Advance one fixed step while paused.
    pub single_step: bool,
}

pub struct Overlay {
    pub egui_ctx: egui::Context,
    pub egui_winit_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    pub debug_visible: bool,
}

impl Overlay {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        window: &Window,
    ) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_winit_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            window,
            None,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            egui_ctx,
            egui_winit_state,
            egui_renderer,
            debug_visible: false,
        }
    }

    pub fn handle_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        let response = self.egui_winit_state.on_window_event(window, event);
        // Only the debug panel is interactive; game text never eats input.
        response.consumed && self.debug_visible
    }

    pub fn toggle_debug(&mut self) {
        self.debug_visible = !self.debug_visible;
        log::info!(
            "Debug panel: {}",
            if self.debug_visible { "ON" } else { "OFF" }
        );
    }

    pub fn prepare(
        &mut self,
        window: &Window,
        clock: &FrameClock,
        labels: &[TextLabel],
        stats: &OverlayStats,
    ) -> (
        Vec<egui::ClippedPrimitive>,
        egui::TexturesDelta,
        OverlayActions,
    ) {
        let mut actions = OverlayActions::default();
        let raw_input = self.egui_winit_state.take_egui_input(window);
        let debug_visible = self.debug_visible;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            for (i, label) in labels.iter().enumerate() {
                draw_label(ctx, i, label);
            }
            if debug_visible {
                draw_debug_panel(ctx, clock, stats, &mut actions);
            }
        });

        self.egui_winit_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        (primitives, full_output.textures_delta, actions)
    }

    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor);
    }

    pub fn paint(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    pub fn cleanup(&mut self, textures_delta: &egui::TexturesDelta) {
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

fn draw_label(ctx: &egui::Context, index: usize, label: &TextLabel) {
    let [r, g, b, a] = label.color;
    let pivot = if label.centered {
        egui::Align2::CENTER_CENTER
    } else {
        egui::Align2::LEFT_TOP
    };
    egui::Area::new(egui::Id::new(("game_label", index)))
        .fixed_pos(egui::pos2(label.pos[0], label.pos[1]))
        .pivot(pivot)
        .interactable(false)
        .show(ctx, |ui| {
            ui.label(
                egui::RichText::new(&label.text)
                    .size(label.size)
                    .strong()
                    .color(egui::Color32::from_rgba_unmultiplied(r, g, b, a)),
            );
        });
}

fn draw_debug_panel(
    ctx: &egui::Context,
    clock: &FrameClock,
    stats: &OverlayStats,
    actions: &mut OverlayActions,
) {
    egui::Window::new("Debug")
        .default_pos([10.0, 10.0])
        .show(ctx, |ui| {
            ui.label(format!("FPS: {:.1}", clock.smoothed_fps));
            ui.label(format!("Frame time: {:.2} ms", clock.smoothed_frame_time_ms));
            ui.label(format!("Steps this frame: {}", clock.steps_this_frame));
            ui.label(format!("Mode: {}", stats.mode_label));

            ui.separator();
            ui.label(format!("Draw calls: {}", stats.draw_calls));
            ui.label(format!("Texture binds: {}", stats.texture_binds));
            ui.label(format!("Sprites: {}", stats.sprite_count));

            if let Some(session) = &stats.session {
                ui.separator();
                ui.label(format!("Level: {}", session.level));
                ui.label(format!(
                    "Background: {}",
                    if session.background_loaded { "yes" } else { "no" }
                ));
                ui.label(format!("Platforms: {}", session.platform_count));
                ui.label(format!("Hazards: {}", session.hazard_count));
                ui.label(format!("Coins left: {}", session.coins_left));
                ui.label(format!(
                    "Lily pads: {}/{} solid",
                    session.lily_pads_solid, session.lily_pads_total
                ));
                ui.label(format!(
                    "Player: {}",
                    if session.player_present { "yes" } else { "no" }
                ));
                ui.label(format!("Deaths: {}  Score: {}", session.deaths, session.score));
            }

            ui.separator();
            ui.horizontal(|ui| {
                let pause_label = if stats.paused { "Resume" } else { "Pause" };
                if ui.button(pause_label).clicked() {
                    actions.toggle_pause = true;
                }
                if stats.paused && ui.button("Step").clicked() {
                    actions.single_step = true;
                }
            });
            if stats.paused {
                ui.label("\u{23f8} PAUSED");
            }
        });
}
