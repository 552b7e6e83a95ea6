//! Top-level screens: menu, intro, playing, victory.

use glam::Vec2;

use crate::audio::{AudioQueue, SoundCue};
use crate::config::{GameConfig, MenuConfig};
use crate::controller::PlayerIntent;
use crate::level::ContentSource;
use crate::session::{LevelSession, SessionEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Menu,
    Intro,
    Playing,
    Victory,
}

impl GameMode {
    pub fn label(self) -> &'static str {
        match self {
            GameMode::Menu => "Menu",
            GameMode::Intro => "Intro",
            GameMode::Playing => "Playing",
            GameMode::Victory => "Victory",
        }
    }
}

/// One fixed step's worth of input, already in world coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    pub intent: PlayerIntent,
    /// Left click this step.
    pub click: Option<Vec2>,
}

/// How the last run ended, kept for the menu and victory text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub won: bool,
    pub score: u32,
    pub deaths: u32,
}

/// The wobbling "Play" button.
#[derive(Debug, Clone)]
pub struct MenuButton {
    pub center: Vec2,
    pub size: Vec2,
    config: MenuConfig,
    time: f32,
}

impl MenuButton {
    pub fn new(center: Vec2, config: MenuConfig) -> Self {
        Self {
            center,
            size: Vec2::new(config.button_width, config.button_height),
            config,
            time: 0.0,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.time += dt;
    }

    pub fn angle_degrees(&self) -> f32 {
        self.config.wobble_degrees * (self.config.wobble_speed * self.time).sin()
    }

    /// Undo the current rotation on `point`, then test the unrotated bounds.
    pub fn hit_test(&self, point: Vec2) -> bool {
        let local = Vec2::from_angle(-self.angle_degrees().to_radians()).rotate(point - self.center);
        let half = self.size * 0.5;
        local.x.abs() < half.x && local.y.abs() < half.y
    }
}

pub struct GameModeController {
    config: GameConfig,
    mode: GameMode,
    mode_time: f32,
    button: MenuButton,
    session: Option<LevelSession>,
    last_run: Option<RunSummary>,
    audio: AudioQueue,
}

impl GameModeController {
    pub fn new(config: GameConfig) -> Self {
        let center = Vec2::new(config.world.width * 0.5, config.world.height * 0.5);
        let button = MenuButton::new(center, config.menu);
        let mut audio = AudioQueue::new();
        audio.play_loop(SoundCue::Music);
        Self {
            config,
            mode: GameMode::Menu,
            mode_time: 0.0,
            button,
            session: None,
            last_run: None,
            audio,
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Seconds spent in the current mode.
    pub fn mode_time(&self) -> f32 {
        self.mode_time
    }

    pub fn button(&self) -> &MenuButton {
        &self.button
    }

    pub fn session(&self) -> Option<&LevelSession> {
        self.session.as_ref()
    }

    #[cfg(test)]
    pub fn session_mut(&mut self) -> Option<&mut LevelSession> {
        self.session.as_mut()
    }

    pub fn last_run(&self) -> Option<RunSummary> {
        self.last_run
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn audio_mut(&mut self) -> &mut AudioQueue {
        &mut self.audio
    }

    pub fn update(&mut self, dt: f32, input: &FrameInput, content: &dyn ContentSource) {
        self.mode_time += dt;
        match self.mode {
            GameMode::Menu => {
                self.button.advance(dt);
                if input.click.is_some_and(|p| self.button.hit_test(p)) {
                    self.enter(GameMode::Intro);
                }
            }
            GameMode::Intro => {
                if self.mode_time >= self.config.screens.intro_duration {
                    self.session = Some(LevelSession::start(&self.config, content));
                    self.enter(GameMode::Playing);
                }
            }
            GameMode::Playing => self.update_playing(dt, input, content),
            GameMode::Victory => {
                if self.mode_time >= self.config.screens.victory_duration {
                    self.audio.play_loop(SoundCue::Music);
                    self.enter(GameMode::Menu);
                }
            }
        }
    }

    fn update_playing(&mut self, dt: f32, input: &FrameInput, content: &dyn ContentSource) {
        let Some(session) = self.session.as_mut() else {
            log::warn!("Playing without a session; returning to menu");
            self.enter(GameMode::Menu);
            return;
        };

        let event = session.update(dt, &input.intent, content);
        session.audio_mut().drain_into(&mut self.audio);

        match event {
            SessionEvent::GameOver => self.end_run(false),
            SessionEvent::Victory => self.end_run(true),
            SessionEvent::LevelChanged(level) => log::info!("Entered level {level}"),
            SessionEvent::None | SessionEvent::CoinCollected | SessionEvent::Reloaded => {}
        }
    }

    /// Drop the session, and with it every collected-coin set.
    fn end_run(&mut self, won: bool) {
        if let Some(session) = self.session.take() {
            let progress = session.progress();
            self.last_run = Some(RunSummary {
                won,
                score: progress.score,
                deaths: progress.deaths,
            });
        }
        if won {
            // The victory cue plays over silence.
            self.audio.stop(SoundCue::Music);
            self.enter(GameMode::Victory);
        } else {
            self.enter(GameMode::Menu);
        }
    }

    /// Soft-reload the current level, e.g. after its map file changed.
    pub fn reload_level(&mut self, content: &dyn ContentSource) {
        if let Some(session) = self.session.as_mut() {
            session.reload(content);
        }
    }

    fn enter(&mut self, mode: GameMode) {
        log::info!("Mode: {} -> {}", self.mode.label(), mode.label());
        self.mode = mode;
        self.mode_time = 0.0;
    }
}
