//! Tunables for the whole game, loadable from `config/game.json` under the
//! asset root.
//!
//! Every section defaults independently, so a config file only needs the
//! values it overrides. A missing or invalid file falls back to defaults.

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Relative to the asset root.
pub const CONFIG_FILE: &str = "config/game.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub world: WorldConfig,
    pub physics: PhysicsConfig,
    pub lily_pad: LilyPadConfig,
    pub session: SessionConfig,
    pub menu: MenuConfig,
    pub screens: ScreenConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    /// Levels are `maps/map{n}.json` for n in `1..=level_count`.
    pub level_count: u32,
    pub vsync: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 768.0,
            level_count: 3,
            vsync: true,
        }
    }
}

/// Units are world pixels and seconds.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub run_speed: f32,
    pub jump_speed: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        // 5 px/frame run, 21 px/frame jump, 0.9 px/frame^2 gravity at 60 Hz.
        Self {
            run_speed: 300.0,
            jump_speed: 1260.0,
            gravity: -3240.0,
            max_fall_speed: -1500.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct LilyPadConfig {
    pub stand_threshold: f32,
    pub fade_out: f32,
    pub cooldown: f32,
    pub reappear: f32,
    pub rest_tolerance: f32,
    pub bob_amplitude: f32,
    pub bob_frequency: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for LilyPadConfig {
    fn default() -> Self {
        Self {
            stand_threshold: 2.0,
            fade_out: 1.0,
            cooldown: 3.0,
            reappear: 0.5,
            rest_tolerance: 4.0,
            bob_amplitude: 3.0,
            bob_frequency: 2.0,
            width: 96.0,
            height: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_deaths: u32,
    pub player_size: f32,
    pub start_scale: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub scale_step: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_deaths: 3,
            player_size: 40.0,
            start_scale: 1.0,
            min_scale: 0.6,
            max_scale: 1.4,
            scale_step: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    pub button_width: f32,
    pub button_height: f32,
    /// Peak wobble angle in degrees.
    pub wobble_degrees: f32,
    /// Angular speed of the wobble in radians per second.
    pub wobble_speed: f32,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            button_width: 300.0,
            button_height: 100.0,
            wobble_degrees: 5.0,
            wobble_speed: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub intro_duration: f32,
    pub victory_duration: f32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            intro_duration: 4.0,
            victory_duration: 5.0,
        }
    }
}

pub fn load_config_from_path(path: &Path) -> Result<GameConfig, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let config: GameConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse config JSON {}: {e}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Load the config file, or log why not and use defaults.
pub fn load_or_default(path: &Path) -> GameConfig {
    if !path.exists() {
        log::info!("No config at '{}', using defaults", path.display());
        return GameConfig::default();
    }
    match load_config_from_path(path) {
        Ok(config) => {
            log::info!("Config loaded from '{}'", path.display());
            config
        }
        Err(err) => {
            log::warn!("{err}. Using default config.");
            GameConfig::default()
        }
    }
}

fn validate_config(config: &GameConfig) -> Result<(), String> {
    if config.world.level_count == 0 {
        return Err("Config validation failed: world.level_count must be > 0".to_string());
    }
    if config.world.width <= 0.0 || config.world.height <= 0.0 {
        return Err("Config validation failed: world size must be > 0".to_string());
    }

    let pad = &config.lily_pad;
    for (name, value) in [
        ("lily_pad.stand_threshold", pad.stand_threshold),
        ("lily_pad.fade_out", pad.fade_out),
        ("lily_pad.cooldown", pad.cooldown),
        ("lily_pad.reappear", pad.reappear),
        ("screens.intro_duration", config.screens.intro_duration),
        ("screens.victory_duration", config.screens.victory_duration),
    ] {
        if value <= 0.0 {
            return Err(format!("Config validation failed: {name} must be > 0"));
        }
    }

    let session = &config.session;
    if session.max_deaths == 0 {
        return Err("Config validation failed: session.max_deaths must be > 0".to_string());
    }
    if session.min_scale <= 0.0 || session.min_scale > session.max_scale {
        return Err(format!(
            "Config validation failed: scale bounds [{}, {}] are invalid",
            session.min_scale, session.max_scale
        ));
    }
    if !(session.min_scale..=session.max_scale).contains(&session.start_scale) {
        return Err(format!(
            "Config validation failed: start_scale {} is outside [{}, {}]",
            session.start_scale, session.min_scale, session.max_scale
        ));
    }
    Ok(())
}
