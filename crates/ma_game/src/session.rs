//! One run of the game, from level 1 until victory or the last death.
//!
//! A session owns the player, the loaded level and the lily pads, plus the
//! [`RunProgress`] that survives soft reloads: deaths, score, player scale
//! and the coins already taken on each level. Starting a new session is the
//! only way to reset progress.

use std::collections::{BTreeSet, HashMap};

use crate::audio::{AudioQueue, SoundCue};
use crate::collision::{Aabb, SolidSet};
use crate::config::GameConfig;
use crate::controller::{PlatformerBody, PlayerIntent};
use crate::level::{default_layer_options, ContentSource, LevelContent};
use crate::lilypad::{LilyPadSet, PlayerContact};

pub const DEFAULT_PAD_TEXTURE: &str = "images/lilypad.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    None,
    CoinCollected,
    LevelChanged(u32),
    /// Hazard death with lives left; the level was reloaded in place.
    Reloaded,
    GameOver,
    Victory,
}

#[derive(Debug, Clone)]
pub struct RunProgress {
    pub deaths: u32,
    pub score: u32,
    /// Player size multiplier; also how many hits are left, visually.
    pub scale: f32,
    collected: HashMap<u32, BTreeSet<usize>>,
}

impl RunProgress {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            deaths: 0,
            score: 0,
            scale: config.session.start_scale,
            collected: HashMap::new(),
        }
    }

    pub fn is_collected(&self, level: u32, coin: usize) -> bool {
        self.collected
            .get(&level)
            .is_some_and(|coins| coins.contains(&coin))
    }

    /// Record a pickup. Returns false if this coin was already counted.
    pub fn collect(&mut self, level: u32, coin: usize) -> bool {
        self.collected.entry(level).or_default().insert(coin)
    }

    #[cfg(test)]
    pub fn collected_on(&self, level: u32) -> usize {
        self.collected.get(&level).map_or(0, BTreeSet::len)
    }

    #[cfg(test)]
    pub fn total_collected(&self) -> usize {
        self.collected.values().map(BTreeSet::len).sum()
    }
}

/// A coin still lying in the level. `index` is its stable map index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coin {
    pub index: usize,
    pub aabb: Aabb,
}

pub struct LevelSession {
    config: GameConfig,
    progress: RunProgress,
    level: u32,
    content: LevelContent,
    background_loaded: bool,
    coins: Vec<Coin>,
    player: PlatformerBody,
    pads: LilyPadSet,
    solids: SolidSet,
    /// Set while the player overlaps a hazard; one death per contact.
    hazard_latch: bool,
    audio: AudioQueue,
}

impl LevelSession {
    /// Hard start at level 1 with fresh progress.
    pub fn start(config: &GameConfig, content: &dyn ContentSource) -> Self {
        let progress = RunProgress::new(config);
        let size = config.session.player_size * progress.scale;
        let player = PlatformerBody::new(Aabb::new(0.0, 0.0, size, size), config.physics);
        let mut session = Self {
            config: config.clone(),
            progress,
            level: 1,
            content: LevelContent::default(),
            background_loaded: false,
            coins: Vec::new(),
            player,
            pads: LilyPadSet::default(),
            solids: SolidSet::new(),
            hazard_latch: false,
            audio: AudioQueue::new(),
        };
        log::info!("Starting a new run");
        session.load_level(1, content);
        session
    }

    /// Load `level` in place. Progress is untouched; coins already collected
    /// on that level stay gone. A map that fails to load leaves an empty level.
    pub fn load_level(&mut self, level: u32, content: &dyn ContentSource) {
        log::info!("Loading level {level}");
        self.level = level;
        self.content = match content.level_map(level) {
            Ok(map) => LevelContent::from_file(&map, &default_layer_options()),
            Err(err) => {
                log::error!("{err}");
                LevelContent::empty(level, (100.0, self.config.world.height * 0.5))
            }
        };

        let background = self
            .content
            .background
            .clone()
            .unwrap_or_else(|| format!("images/loc{level}.png"));
        self.background_loaded = content.texture_size(&background).is_some();
        if self.background_loaded {
            self.content.background = Some(background);
        } else {
            log::warn!("Level {level}: background '{background}' not found");
            self.content.background = None;
        }

        self.coins = self
            .content
            .coins
            .boxes()
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.progress.is_collected(level, *index))
            .map(|(index, aabb)| Coin {
                index,
                aabb: *aabb,
            })
            .collect();

        let pad_texture = self
            .content
            .lily_pad_texture
            .get_or_insert_with(|| DEFAULT_PAD_TEXTURE.to_string())
            .clone();
        self.pads = LilyPadSet::from_markers(
            &self.content.lily_pad_markers,
            content.texture_size(&pad_texture),
            self.config.lily_pad,
        );

        let (start_x, start_y) = self.content.player_start;
        let size = self.player_size();
        self.player.resize(size, size);
        self.player.reset_at(start_x, start_y);
        // Spawning on a hazard is not a new contact.
        self.hazard_latch = self.touching_hazard(&self.player.aabb);
        self.rebuild_solids();

        log::info!(
            "Level {level} ready: {} coin(s) left, {} lily pad(s), {} solid(s)",
            self.coins.len(),
            self.pads.len(),
            self.solids.len()
        );
    }

    /// Reload the current level without counting a death.
    pub fn reload(&mut self, content: &dyn ContentSource) {
        self.load_level(self.level, content);
    }

    pub fn update(
        &mut self,
        dt: f32,
        intent: &PlayerIntent,
        content: &dyn ContentSource,
    ) -> SessionEvent {
        if self.player.apply_intent(*intent) {
            self.audio.play_once(SoundCue::Jump);
        }
        self.player.clamp_x(0.0, self.config.world.width);
        self.player.step(dt, &self.solids);

        let contact = PlayerContact {
            aabb: self.player.aabb,
            velocity_y: self.player.velocity_y,
        };
        if self.pads.update(dt, &contact).membership_changed {
            self.rebuild_solids();
        }

        self.resolve_collisions(content)
    }

    fn resolve_collisions(&mut self, content: &dyn ContentSource) -> SessionEvent {
        let player = self.player.aabb;
        let mut event = SessionEvent::None;

        if self.collect_coins(&player) {
            event = SessionEvent::CoinCollected;
        }

        if self.content.portals.overlaps_any(&player) && self.portal_open() {
            self.audio.play_once(SoundCue::Portal);
            if self.is_final_level() {
                log::info!("Portal on the final level reached");
                return self.finish_run();
            }
            let next = self.level + 1;
            self.load_level(next, content);
            return SessionEvent::LevelChanged(next);
        }

        if !self.touching_hazard(&player) {
            self.hazard_latch = false;
        } else if !self.hazard_latch {
            self.hazard_latch = true;
            return self.die(content);
        }

        if self.is_final_level() && self.content.finish.overlaps_any(&player) {
            return self.finish_run();
        }

        event
    }

    fn collect_coins(&mut self, player: &Aabb) -> bool {
        let mut any = false;
        let level = self.level;
        let (touched, kept): (Vec<Coin>, Vec<Coin>) = self
            .coins
            .drain(..)
            .partition(|coin| coin.aabb.overlaps(player));
        self.coins = kept;

        for coin in touched {
            if self.progress.collect(level, coin.index) {
                self.progress.score += 1;
                self.progress.scale = (self.progress.scale + self.config.session.scale_step)
                    .min(self.config.session.max_scale);
                any = true;
                self.audio.play_once(SoundCue::Coin);
                log::debug!("Coin {} collected on level {level}", coin.index);
            }
        }
        if any {
            let size = self.player_size();
            self.player.resize(size, size);
        }
        any
    }

    fn touching_hazard(&self, player: &Aabb) -> bool {
        self.content.spikes.overlaps_any(player) || self.content.water.overlaps_any(player)
    }

    fn portal_open(&self) -> bool {
        !self.content.portal_requires_all_coins || self.coins.is_empty()
    }

    fn die(&mut self, content: &dyn ContentSource) -> SessionEvent {
        self.progress.deaths += 1;
        self.progress.scale = (self.progress.scale - self.config.session.scale_step)
            .max(self.config.session.min_scale);
        self.audio.play_once(SoundCue::Hurt);
        log::info!(
            "Hazard hit on level {} ({} of {} deaths)",
            self.level,
            self.progress.deaths,
            self.config.session.max_deaths
        );

        if self.progress.deaths >= self.config.session.max_deaths {
            return SessionEvent::GameOver;
        }
        self.reload(content);
        SessionEvent::Reloaded
    }

    fn finish_run(&mut self) -> SessionEvent {
        self.audio.play_once(SoundCue::Victory);
        log::info!(
            "Run complete: score {}, deaths {}",
            self.progress.score,
            self.progress.deaths
        );
        SessionEvent::Victory
    }

    fn rebuild_solids(&mut self) {
        self.solids = SolidSet::from_boxes(
            self.content
                .platforms
                .boxes()
                .iter()
                .copied()
                .chain(self.pads.solid_boxes()),
        );
    }

    fn is_final_level(&self) -> bool {
        self.level >= self.config.world.level_count
    }

    fn player_size(&self) -> f32 {
        self.config.session.player_size * self.progress.scale
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn progress(&self) -> &RunProgress {
        &self.progress
    }

    pub fn content(&self) -> &LevelContent {
        &self.content
    }

    pub fn background_loaded(&self) -> bool {
        self.background_loaded
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    pub fn player(&self) -> &PlatformerBody {
        &self.player
    }

    #[cfg(test)]
    pub fn player_mut(&mut self) -> &mut PlatformerBody {
        &mut self.player
    }

    pub fn pads(&self) -> &LilyPadSet {
        &self.pads
    }

    pub fn solids(&self) -> &SolidSet {
        &self.solids
    }

    pub fn lives_left(&self) -> u32 {
        self.config
            .session
            .max_deaths
            .saturating_sub(self.progress.deaths)
    }

    pub fn audio_mut(&mut self) -> &mut AudioQueue {
        &mut self.audio
    }
}
