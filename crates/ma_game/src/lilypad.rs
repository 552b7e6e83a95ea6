//! Lily pads: platforms that sink away after the player stands on them and
//! come back after a cooldown.
//!
//! Geometry and timers live in two parallel vectors joined by [`PadId`]. The
//! rest box never moves; only the drawn position bobs. A pad is collidable
//! exactly while its phase is [`PadPhase::Solid`].

use crate::collision::Aabb;
use crate::config::LilyPadConfig;
use crate::level::MapPoint;

pub const MAX_OPACITY: f32 = 255.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PadId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PadPhase {
    #[default]
    Solid,
    Decaying,
    Hidden,
    Reappearing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PadState {
    pub phase: PadPhase,
    /// 0..=255
    pub opacity: f32,
    /// Continuous resting contact while solid, in seconds.
    pub stand_time: f32,
    /// Time spent in the current decaying or hidden phase.
    pub phase_elapsed: f32,
}

impl Default for PadState {
    fn default() -> Self {
        Self {
            phase: PadPhase::Solid,
            opacity: MAX_OPACITY,
            stand_time: 0.0,
            phase_elapsed: 0.0,
        }
    }
}

impl PadState {
    pub fn is_solid(&self) -> bool {
        self.phase == PadPhase::Solid
    }

    #[cfg(test)]
    pub fn is_decaying(&self) -> bool {
        self.phase == PadPhase::Decaying
    }

    /// Advance one frame. Returns true when the pad crossed between solid
    /// and not solid.
    pub fn advance(&mut self, dt: f32, resting: bool, config: &LilyPadConfig) -> bool {
        let was_solid = self.is_solid();
        match self.phase {
            PadPhase::Solid => {
                if resting {
                    self.stand_time += dt;
                } else {
                    self.stand_time = 0.0;
                }
                if self.stand_time > config.stand_threshold {
                    self.phase = PadPhase::Decaying;
                    self.phase_elapsed = 0.0;
                }
            }
            PadPhase::Decaying => {
                self.phase_elapsed += dt;
                let remaining = 1.0 - self.phase_elapsed / config.fade_out;
                self.opacity = (MAX_OPACITY * remaining).clamp(0.0, MAX_OPACITY);
                if self.opacity <= 0.0 {
                    self.opacity = 0.0;
                    self.phase = PadPhase::Hidden;
                    self.stand_time = 0.0;
                    self.phase_elapsed = 0.0;
                }
            }
            PadPhase::Hidden => {
                self.phase_elapsed += dt;
                if self.phase_elapsed >= config.cooldown {
                    self.phase = PadPhase::Reappearing;
                    self.phase_elapsed = 0.0;
                }
            }
            PadPhase::Reappearing => {
                self.opacity =
                    (self.opacity + MAX_OPACITY * dt / config.reappear).min(MAX_OPACITY);
                if self.opacity >= MAX_OPACITY {
                    self.phase = PadPhase::Solid;
                    self.stand_time = 0.0;
                }
            }
        }
        was_solid != self.is_solid()
    }

    /// Vertical draw offset while the player stands on a solid pad.
    pub fn bob_offset(&self, config: &LilyPadConfig) -> f32 {
        if self.is_solid() && self.stand_time > 0.0 {
            config.bob_amplitude
                * (std::f32::consts::TAU * config.bob_frequency * self.stand_time).sin()
        } else {
            0.0
        }
    }
}

/// The player as the pads see it.
#[derive(Debug, Clone, Copy)]
pub struct PlayerContact {
    pub aabb: Aabb,
    pub velocity_y: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PadSetUpdate {
    pub membership_changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PadDraw {
    pub id: PadId,
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    pub opacity: u8,
}

#[derive(Debug, Clone, Default)]
pub struct LilyPadSet {
    rest_boxes: Vec<Aabb>,
    states: Vec<PadState>,
    config: LilyPadConfig,
}

impl LilyPadSet {
    /// One pad per marker, centered on it. Without a pad texture the level
    /// plays with static platforms only.
    pub fn from_markers(
        markers: &[MapPoint],
        texture_size: Option<(u32, u32)>,
        config: LilyPadConfig,
    ) -> Self {
        if markers.is_empty() {
            return Self {
                config,
                ..Default::default()
            };
        }
        if texture_size.is_none() {
            log::warn!(
                "Lily pad texture unavailable; skipping {} pad(s)",
                markers.len()
            );
            return Self {
                config,
                ..Default::default()
            };
        }

        let rest_boxes: Vec<Aabb> = markers
            .iter()
            .map(|m| Aabb::new(m.x, m.y, config.width, config.height))
            .collect();
        let states = vec![PadState::default(); rest_boxes.len()];
        log::debug!("Built {} lily pad(s)", rest_boxes.len());
        Self {
            rest_boxes,
            states,
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    #[cfg(test)]
    pub fn state(&self, id: PadId) -> Option<&PadState> {
        self.states.get(id.0)
    }

    #[cfg(test)]
    pub fn rest_box(&self, id: PadId) -> Option<&Aabb> {
        self.rest_boxes.get(id.0)
    }

    pub fn solid_count(&self) -> usize {
        self.states.iter().filter(|s| s.is_solid()).count()
    }

    fn is_resting_on(&self, pad: &Aabb, player: &PlayerContact) -> bool {
        let tolerance = self.config.rest_tolerance;
        player.aabb.overlaps(&pad.expanded(0.0, tolerance))
            && player.velocity_y == 0.0
            && (player.aabb.bottom() - pad.top()).abs() <= tolerance
    }

    pub fn update(&mut self, dt: f32, player: &PlayerContact) -> PadSetUpdate {
        let mut membership_changed = false;
        for index in 0..self.states.len() {
            let resting = self.is_resting_on(&self.rest_boxes[index], player);
            let state = &mut self.states[index];
            let before = state.phase;
            if state.advance(dt, resting, &self.config) {
                membership_changed = true;
            }
            if state.phase != before {
                log::debug!("Lily pad {index}: {before:?} -> {:?}", state.phase);
            }
        }
        PadSetUpdate { membership_changed }
    }

    /// Rest boxes of the pads that are solid right now.
    pub fn solid_boxes(&self) -> impl Iterator<Item = Aabb> + '_ {
        self.rest_boxes
            .iter()
            .zip(&self.states)
            .filter(|(_, state)| state.is_solid())
            .map(|(aabb, _)| *aabb)
    }

    pub fn draw_states(&self) -> Vec<PadDraw> {
        self.rest_boxes
            .iter()
            .zip(&self.states)
            .enumerate()
            .filter(|(_, (_, state))| state.opacity > 0.0)
            .map(|(index, (aabb, state))| PadDraw {
                id: PadId(index),
                center_x: aabb.center_x,
                center_y: aabb.center_y + state.bob_offset(&self.config),
                width: aabb.width(),
                height: aabb.height(),
                opacity: state.opacity.round() as u8,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn config() -> LilyPadConfig {
        LilyPadConfig::default()
    }

    fn pad_set() -> LilyPadSet {
        LilyPadSet::from_markers(&[MapPoint { x: 480.0, y: 250.0 }], Some((96, 20)), config())
    }

    /// A 40x40 player whose feet sit on the pad's top edge.
    fn standing_on(set: &LilyPadSet) -> PlayerContact {
        let pad = set.rest_box(PadId(0)).copied().expect("pad exists");
        PlayerContact {
            aabb: Aabb::new(pad.center_x, pad.top() + 20.0, 40.0, 40.0),
            velocity_y: 0.0,
        }
    }

    fn away() -> PlayerContact {
        PlayerContact {
            aabb: Aabb::new(100.0, 600.0, 40.0, 40.0),
            velocity_y: 0.0,
        }
    }

    fn opacity(set: &LilyPadSet) -> f32 {
        set.state(PadId(0)).expect("pad exists").opacity
    }

    fn phase(set: &LilyPadSet) -> PadPhase {
        set.state(PadId(0)).expect("pad exists").phase
    }

    #[test]
    fn standing_still_fades_pad_on_schedule() {
        let mut set = pad_set();
        let player = standing_on(&set);
        let mut t = 0.0f32;
        let mut opacity_at_2_1 = None;
        while t < 3.1 {
            set.update(DT, &player);
            t += DT;
            if opacity_at_2_1.is_none() && t >= 2.1 {
                opacity_at_2_1 = Some(opacity(&set));
            }
        }
        assert!(opacity_at_2_1.expect("sampled at 2.1s") < MAX_OPACITY);
        assert_eq!(opacity(&set), 0.0);
        assert_eq!(phase(&set), PadPhase::Hidden);
    }

    #[test]
    fn decay_starts_within_one_frame_of_threshold() {
        let mut set = pad_set();
        let player = standing_on(&set);
        let threshold = config().stand_threshold;
        let mut t = 0.0f32;
        loop {
            set.update(DT, &player);
            t += DT;
            if set.state(PadId(0)).expect("pad exists").is_decaying() {
                break;
            }
            assert!(t < threshold + 2.0 * DT, "pad never started decaying");
        }
        assert!(t > threshold - DT);
    }

    #[test]
    fn stepping_off_resets_stand_time() {
        let mut set = pad_set();
        let player = standing_on(&set);
        for _ in 0..90 {
            set.update(DT, &player);
        }
        set.update(DT, &away());
        let state = set.state(PadId(0)).expect("pad exists");
        assert_eq!(state.stand_time, 0.0);
        assert!(state.is_solid());
    }

    #[test]
    fn moving_player_does_not_count_as_resting() {
        let mut set = pad_set();
        let mut player = standing_on(&set);
        player.velocity_y = -30.0;
        for _ in 0..300 {
            set.update(DT, &player);
        }
        assert_eq!(phase(&set), PadPhase::Solid);
        assert_eq!(set.state(PadId(0)).expect("pad exists").stand_time, 0.0);
    }

    #[test]
    fn full_cycle_keeps_opacity_rules() {
        let mut set = pad_set();
        let on_pad = standing_on(&set);
        let mut last = (phase(&set), opacity(&set));
        let mut seen = vec![last.0];
        for frame in 0..(60 * 10) {
            // The player drops off once the pad is gone.
            let player = if set.state(PadId(0)).expect("pad").opacity < MAX_OPACITY {
                away()
            } else {
                on_pad
            };
            let update = set.update(DT, &player);
            let now = (phase(&set), opacity(&set));

            assert!((0.0..=MAX_OPACITY).contains(&now.1), "frame {frame}");
            match now.0 {
                PadPhase::Decaying if last.0 == PadPhase::Decaying => assert!(now.1 <= last.1),
                PadPhase::Reappearing if last.0 == PadPhase::Reappearing => {
                    assert!(now.1 >= last.1)
                }
                PadPhase::Solid if last.0 == PadPhase::Solid => assert_eq!(now.1, last.1),
                PadPhase::Hidden if last.0 == PadPhase::Hidden => assert_eq!(now.1, 0.0),
                _ => {}
            }
            assert_eq!(
                update.membership_changed,
                (last.0 == PadPhase::Solid) != (now.0 == PadPhase::Solid)
            );
            let solid: Vec<Aabb> = set.solid_boxes().collect();
            assert_eq!(solid.len() == 1, now.0 == PadPhase::Solid, "frame {frame}");
            if now.0 != last.0 {
                seen.push(now.0);
            }
            last = now;
        }
        assert_eq!(
            &seen[..5],
            &[
                PadPhase::Solid,
                PadPhase::Decaying,
                PadPhase::Hidden,
                PadPhase::Reappearing,
                PadPhase::Solid
            ]
        );
    }

    #[test]
    fn hidden_pad_reappears_after_cooldown() {
        let cfg = config();
        let mut state = PadState {
            phase: PadPhase::Hidden,
            opacity: 0.0,
            stand_time: 0.0,
            phase_elapsed: 0.0,
        };
        let mut t = 0.0f32;
        while state.phase == PadPhase::Hidden {
            state.advance(DT, false, &cfg);
            t += DT;
            assert!(t < cfg.cooldown + 2.0 * DT);
        }
        assert_eq!(state.phase, PadPhase::Reappearing);
        assert_eq!(state.opacity, 0.0, "opacity holds on the transition frame");

        let changed = (0..60).any(|_| state.advance(DT, false, &cfg));
        assert!(changed);
        assert_eq!(state.phase, PadPhase::Solid);
        assert_eq!(state.opacity, MAX_OPACITY);
    }

    #[test]
    fn bob_moves_drawn_pad_but_not_rest_box() {
        let mut set = pad_set();
        let player = standing_on(&set);
        for _ in 0..7 {
            set.update(DT, &player);
        }
        let drawn = set.draw_states();
        assert_eq!(drawn.len(), 1);
        assert!((drawn[0].center_y - 250.0).abs() > 0.01);
        assert!(drawn[0].center_y - 250.0 <= config().bob_amplitude + 0.001);

        let rest = set.solid_boxes().next().expect("still solid");
        assert_eq!(rest.center_y, 250.0);
    }

    #[test]
    fn missing_texture_yields_empty_set() {
        let set =
            LilyPadSet::from_markers(&[MapPoint { x: 480.0, y: 250.0 }], None, config());
        assert!(set.is_empty());
        assert_eq!(set.solid_boxes().count(), 0);
        assert!(set.draw_states().is_empty());
    }

    #[test]
    fn pads_are_independent() {
        let mut set = LilyPadSet::from_markers(
            &[MapPoint { x: 480.0, y: 250.0 }, MapPoint { x: 800.0, y: 250.0 }],
            Some((96, 20)),
            config(),
        );
        let player = standing_on(&set);
        for _ in 0..(60 * 3) {
            set.update(DT, &player);
        }
        assert!(!set.state(PadId(0)).expect("pad 0").is_solid());
        assert!(set.state(PadId(1)).expect("pad 1").is_solid());
        assert_eq!(set.solid_count(), 1);
    }
}
