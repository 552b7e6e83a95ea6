//! Turns the current mode into a flat list of world-space sprites and labels.
//!
//! Nothing here touches the GPU. The binary maps texture keys to loaded
//! textures, substitutes placeholders for missing ones and batches the rest.

use glam::Vec2;

use crate::collision::Aabb;
use crate::level::EntityList;
use crate::mode::{GameMode, GameModeController};
use crate::session::LevelSession;

pub const PLAYER_TEXTURE_CANDIDATES: &[&str] =
    &["images/big2.png", "images/player.png", "images/character.png"];
pub const MENU_BACKGROUND: &str = "images/menu.png";
pub const BUTTON_TEXTURE: &str = "images/button.png";
pub const COIN_TEXTURE: &str = "images/coin.png";
pub const PORTAL_TEXTURE: &str = "images/portal.png";

const SKY: [f32; 4] = [0.45, 0.70, 0.95, 1.0];
const NIGHT: [f32; 4] = [0.08, 0.09, 0.16, 1.0];
const GROUND: [f32; 4] = [0.36, 0.25, 0.15, 1.0];
const DECOR: [f32; 4] = [0.30, 0.55, 0.30, 0.6];
const SPIKES: [f32; 4] = [0.75, 0.15, 0.15, 1.0];
const WATER: [f32; 4] = [0.15, 0.35, 0.85, 0.85];
const PORTAL: [f32; 4] = [0.60, 0.25, 0.85, 1.0];
const FINISH: [f32; 4] = [0.95, 0.80, 0.20, 1.0];
const COIN: [f32; 4] = [1.00, 0.85, 0.10, 1.0];
const PAD: [f32; 4] = [0.20, 0.70, 0.30, 1.0];
const PLAYER: [f32; 4] = [0.20, 0.35, 0.95, 1.0];
const BUTTON: [f32; 4] = [0.95, 0.55, 0.15, 1.0];

const WHITE_TEXT: [u8; 4] = [255, 255, 255, 255];

/// Intro lines fade in one after another.
const INTRO_LINE_DELAY: f32 = 0.8;
const INTRO_FADE: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Rect,
    Circle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    /// Asset path; `None` draws the placeholder shape.
    pub texture: Option<String>,
    pub shape: Shape,
    /// Placeholder color. Only its alpha applies to textured sprites.
    pub color: [f32; 4],
    pub center: Vec2,
    pub size: Vec2,
    pub rotation_deg: f32,
}

impl Sprite {
    fn rect(texture: Option<&str>, color: [f32; 4], aabb: &Aabb) -> Self {
        Self {
            texture: texture.map(str::to_string),
            shape: Shape::Rect,
            color,
            center: Vec2::new(aabb.center_x, aabb.center_y),
            size: Vec2::new(aabb.width(), aabb.height()),
            rotation_deg: 0.0,
        }
    }
}

/// Text anchored in world space (y up).
#[derive(Debug, Clone, PartialEq)]
pub struct WorldLabel {
    pub text: String,
    pub pos: Vec2,
    pub size: f32,
    pub color: [u8; 4],
    pub centered: bool,
}

impl WorldLabel {
    fn centered(text: impl Into<String>, pos: Vec2, size: f32) -> Self {
        Self {
            text: text.into(),
            pos,
            size,
            color: WHITE_TEXT,
            centered: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DrawOptions {
    /// Player texture that resolved at startup, if any.
    pub player_texture: Option<String>,
    pub show_collision: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub sprites: Vec<Sprite>,
    pub labels: Vec<WorldLabel>,
}

pub fn build_frame(controller: &GameModeController, options: &DrawOptions) -> Frame {
    let world = &controller.config().world;
    let world_size = Vec2::new(world.width, world.height);
    let mut frame = Frame::default();

    match controller.mode() {
        GameMode::Menu => draw_menu(controller, world_size, &mut frame),
        GameMode::Intro => draw_intro(controller.mode_time(), world_size, &mut frame),
        GameMode::Playing => {
            if let Some(session) = controller.session() {
                draw_level(session, world_size, options, &mut frame);
            }
        }
        GameMode::Victory => draw_victory(controller, world_size, &mut frame),
    }
    frame
}

fn backdrop(texture: Option<&str>, color: [f32; 4], world_size: Vec2) -> Sprite {
    Sprite::rect(
        texture,
        color,
        &Aabb::new(world_size.x * 0.5, world_size.y * 0.5, world_size.x, world_size.y),
    )
}

fn draw_menu(controller: &GameModeController, world_size: Vec2, frame: &mut Frame) {
    frame
        .sprites
        .push(backdrop(Some(MENU_BACKGROUND), NIGHT, world_size));

    let button = controller.button();
    frame.sprites.push(Sprite {
        texture: Some(BUTTON_TEXTURE.to_string()),
        shape: Shape::Rect,
        color: BUTTON,
        center: button.center,
        size: button.size,
        rotation_deg: button.angle_degrees(),
    });
    frame
        .labels
        .push(WorldLabel::centered("Play", button.center, 48.0));
    frame.labels.push(WorldLabel::centered(
        "Mini Adventure",
        Vec2::new(world_size.x * 0.5, world_size.y * 0.8),
        64.0,
    ));

    if let Some(run) = controller.last_run().filter(|run| !run.won) {
        frame.labels.push(WorldLabel {
            color: [255, 120, 120, 255],
            ..WorldLabel::centered(
                format!("Game over. Coins: {}", run.score),
                Vec2::new(world_size.x * 0.5, world_size.y * 0.25),
                32.0,
            )
        });
    }
}

fn draw_intro(elapsed: f32, world_size: Vec2, frame: &mut Frame) {
    frame.sprites.push(backdrop(None, NIGHT, world_size));
    let lines = [
        "A small hero sets out across three lands.",
        "Collect the coins, mind the spikes and the water.",
        "Lily pads hold you only for a while.",
    ];
    for (i, line) in lines.iter().enumerate() {
        let alpha = ((elapsed - i as f32 * INTRO_LINE_DELAY) / INTRO_FADE).clamp(0.0, 1.0);
        if alpha <= 0.0 {
            continue;
        }
        let mut label = WorldLabel::centered(
            *line,
            Vec2::new(world_size.x * 0.5, world_size.y * 0.6 - i as f32 * 60.0),
            32.0,
        );
        label.color[3] = (alpha * 255.0).round() as u8;
        frame.labels.push(label);
    }
}

fn draw_victory(controller: &GameModeController, world_size: Vec2, frame: &mut Frame) {
    frame.sprites.push(backdrop(None, NIGHT, world_size));
    frame.labels.push(WorldLabel {
        color: [255, 215, 60, 255],
        ..WorldLabel::centered(
            "Victory!",
            Vec2::new(world_size.x * 0.5, world_size.y * 0.6),
            72.0,
        )
    });
    if let Some(run) = controller.last_run() {
        frame.labels.push(WorldLabel::centered(
            format!("Coins: {}   Deaths: {}", run.score, run.deaths),
            Vec2::new(world_size.x * 0.5, world_size.y * 0.4),
            36.0,
        ));
    }
}

fn push_list(frame: &mut Frame, list: &EntityList, default_texture: Option<&str>, color: [f32; 4]) {
    let texture = list.texture.as_deref().or(default_texture);
    frame
        .sprites
        .extend(list.boxes().iter().map(|aabb| Sprite::rect(texture, color, aabb)));
}

fn draw_level(session: &LevelSession, world_size: Vec2, options: &DrawOptions, frame: &mut Frame) {
    let content = session.content();
    frame
        .sprites
        .push(backdrop(content.background.as_deref(), SKY, world_size));

    push_list(frame, &content.decor, None, DECOR);
    push_list(frame, &content.platforms, None, GROUND);
    push_list(frame, &content.water, None, WATER);
    push_list(frame, &content.spikes, None, SPIKES);
    push_list(frame, &content.portals, Some(PORTAL_TEXTURE), PORTAL);
    push_list(frame, &content.finish, None, FINISH);

    let coin_texture = content.coins.texture.as_deref().unwrap_or(COIN_TEXTURE);
    frame.sprites.extend(session.coins().iter().map(|coin| Sprite {
        shape: Shape::Circle,
        ..Sprite::rect(Some(coin_texture), COIN, &coin.aabb)
    }));

    let pad_texture = content.lily_pad_texture.as_deref();
    for pad in session.pads().draw_states() {
        let mut color = PAD;
        color[3] = f32::from(pad.opacity) / 255.0;
        frame.sprites.push(Sprite::rect(
            pad_texture,
            color,
            &Aabb::new(pad.center_x, pad.center_y, pad.width, pad.height),
        ));
    }

    let player = session.player();
    frame.sprites.push(Sprite {
        shape: Shape::Circle,
        ..Sprite::rect(options.player_texture.as_deref(), PLAYER, &player.aabb)
    });

    if options.show_collision {
        let outline = |color: [f32; 4]| move |aabb: &Aabb| Sprite::rect(None, color, aabb);
        frame
            .sprites
            .extend(session.solids().iter().map(outline([0.1, 1.0, 0.1, 0.35])));
        frame.sprites.extend(
            content
                .spikes
                .boxes()
                .iter()
                .chain(content.water.boxes())
                .map(outline([1.0, 0.1, 0.1, 0.35])),
        );
        frame
            .sprites
            .push(outline([1.0, 1.0, 1.0, 0.35])(&player.aabb));
    }

    frame.labels.push(WorldLabel {
        text: format!(
            "Level {}   Coins: {}   Lives: {}",
            session.level(),
            session.progress().score,
            session.lives_left()
        ),
        pos: Vec2::new(16.0, world_size.y - 16.0),
        size: 24.0,
        color: WHITE_TEXT,
        centered: false,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::mode::FrameInput;
    use crate::testing::MemoryContent;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn intro_lines_fade_in_in_order() {
        let content = MemoryContent::three_levels();
        let mut controller = GameModeController::new(GameConfig::default());
        let click = FrameInput {
            click: Some(Vec2::new(640.0, 384.0)),
            ..Default::default()
        };
        controller.update(DT, &click, &content);
        assert_eq!(controller.mode(), GameMode::Intro);
        let options = DrawOptions::default();
        assert!(build_frame(&controller, &options).labels.is_empty());

        // 1.0 s in: first line fully in, second fading, third not started.
        for _ in 0..60 {
            controller.update(DT, &FrameInput::default(), &content);
        }
        let alphas: Vec<u8> = build_frame(&controller, &options)
            .labels
            .iter()
            .map(|label| label.color[3])
            .collect();
        assert_eq!(alphas.len(), 2);
        assert_eq!(alphas[0], 255);
        assert!(alphas[1] > 0 && alphas[1] < 255);

        for _ in 0..120 {
            controller.update(DT, &FrameInput::default(), &content);
        }
        assert_eq!(controller.mode(), GameMode::Intro);
        let frame = build_frame(&controller, &options);
        assert_eq!(frame.labels.len(), 3);
        assert!(frame.labels.iter().all(|label| label.color[3] == 255));
    }

    fn playing_level(level: u32) -> (GameModeController, MemoryContent) {
        let content = MemoryContent::three_levels();
        let mut controller = GameModeController::new(GameConfig::default());
        controller.update(
            DT,
            &FrameInput {
                click: Some(Vec2::new(640.0, 384.0)),
                ..Default::default()
            },
            &content,
        );
        for _ in 0..250 {
            controller.update(DT, &FrameInput::default(), &content);
        }
        if let Some(session) = controller.session_mut() {
            session.load_level(level, &content);
        }
        (controller, content)
    }

    #[test]
    fn menu_frame_has_tilted_button_and_play_label() {
        let content = MemoryContent::three_levels();
        let mut controller = GameModeController::new(GameConfig::default());
        for _ in 0..30 {
            controller.update(DT, &FrameInput::default(), &content);
        }
        let frame = build_frame(&controller, &DrawOptions::default());
        let button = frame
            .sprites
            .iter()
            .find(|s| s.texture.as_deref() == Some(BUTTON_TEXTURE))
            .expect("button sprite");
        assert!(button.rotation_deg.abs() > 0.1);
        assert!(frame.labels.iter().any(|l| l.text == "Play"));
    }

    #[test]
    fn level_frame_draws_coins_and_hud() {
        let (controller, _) = playing_level(1);
        let frame = build_frame(&controller, &DrawOptions::default());
        let coins = frame
            .sprites
            .iter()
            .filter(|s| s.texture.as_deref() == Some(COIN_TEXTURE))
            .count();
        assert_eq!(coins, 3);
        let hud = frame.labels.last().expect("hud label");
        assert_eq!(hud.text, "Level 1   Coins: 0   Lives: 3");
        // Player comes last among sprites and falls back to a circle.
        let player = frame.sprites.last().expect("player sprite");
        assert_eq!(player.shape, Shape::Circle);
        assert_eq!(player.texture, None);
    }

    #[test]
    fn pad_alpha_follows_opacity() {
        let (mut controller, content) = playing_level(2);
        let drawn_pad = |controller: &GameModeController| {
            build_frame(controller, &DrawOptions::default())
                .sprites
                .into_iter()
                .find(|s| s.texture.as_deref() == Some("images/lilypad.png"))
        };
        assert_eq!(drawn_pad(&controller).map(|s| s.color[3]), Some(1.0));

        if let Some(session) = controller.session_mut() {
            session.player_mut().reset_at(480.0, 281.0);
        }
        // Past the stand threshold, before the player reaches the water.
        for _ in 0..(60 * 2 + 10) {
            controller.update(DT, &FrameInput::default(), &content);
        }
        let alpha = drawn_pad(&controller)
            .map(|s| s.color[3])
            .expect("pad visible while fading");
        assert!(alpha < 1.0);
    }

    #[test]
    fn collision_overlay_adds_boxes() {
        let (controller, _) = playing_level(1);
        let plain = build_frame(&controller, &DrawOptions::default());
        let overlay = build_frame(
            &controller,
            &DrawOptions {
                show_collision: true,
                ..Default::default()
            },
        );
        // 40 floor tiles, one spike box, the player.
        assert_eq!(overlay.sprites.len(), plain.sprites.len() + 42);
    }
}
