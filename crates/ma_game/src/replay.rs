use crate::controller::PlayerIntent;
use crate::level::ContentSource;
use crate::session::{LevelSession, SessionEvent};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub fixed_dt: f32,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub move_x: f32,
    #[serde(default)]
    pub jump_pressed: bool,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl ReplaySequence {
    pub fn expanded_inputs(&self) -> Vec<PlayerIntent> {
        self.frames
            .iter()
            .flat_map(|frame| {
                let intent = PlayerIntent {
                    move_x: frame.move_x.clamp(-1.0, 1.0),
                    jump_pressed: frame.jump_pressed,
                };
                std::iter::repeat(intent).take(frame.repeat.max(1) as usize)
            })
            .collect()
    }

    /// Feed every input to `session`, returning the events that fired, tagged
    /// with their step index.
    pub fn run(
        &self,
        session: &mut LevelSession,
        content: &dyn ContentSource,
    ) -> Vec<(usize, SessionEvent)> {
        self.expanded_inputs()
            .iter()
            .enumerate()
            .map(|(step, intent)| (step, session.update(self.fixed_dt, intent, content)))
            .filter(|(_, event)| *event != SessionEvent::None)
            .collect()
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.fixed_dt <= 0.0 {
        return Err("Replay validation failed: fixed_dt must be > 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::testing::MemoryContent;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "ma_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn write_replay(name_hint: &str, raw: &str) -> ReplaySequence {
        let path = temp_file_path(name_hint);
        fs::write(&path, raw).expect("write replay file");
        let replay = load_replay_from_path(&path).expect("replay should load");
        let _ = fs::remove_file(path);
        replay
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let replay = write_replay(
            "parse",
            r#"{
              "fixed_dt": 0.016666667,
              "frames": [
                { "move_x": 2.0, "repeat": 3 },
                { "jump_pressed": true, "repeat": 1 }
              ]
            }"#,
        );
        let expanded = replay.expanded_inputs();
        assert_eq!(expanded.len(), 4);
        assert_eq!(expanded[0].move_x, 1.0, "move_x is clamped");
        assert!(expanded[3].jump_pressed);
    }

    #[test]
    fn empty_replay_is_rejected() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("empty replay should fail");
        assert!(err.contains("frames list is empty"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn walking_right_collects_coins_then_takes_portal() {
        let replay = write_replay(
            "walk",
            r#"{ "frames": [ { "move_x": 1.0, "repeat": 300 } ] }"#,
        );
        let content = MemoryContent::three_levels();
        let mut session = LevelSession::start(&GameConfig::default(), &content);
        let events: Vec<SessionEvent> = replay
            .run(&mut session, &content)
            .into_iter()
            .map(|(_, event)| event)
            .collect();

        let coins = events
            .iter()
            .filter(|e| **e == SessionEvent::CoinCollected)
            .count();
        assert_eq!(coins, 3);
        assert!(events.contains(&SessionEvent::LevelChanged(2)));
        assert_eq!(session.level(), 2);
    }

    #[test]
    fn session_replay_is_deterministic() {
        let replay = write_replay(
            "deterministic",
            r#"{
              "fixed_dt": 0.016666667,
              "frames": [
                { "move_x": 1.0, "repeat": 40 },
                { "move_x": 1.0, "jump_pressed": true, "repeat": 1 },
                { "move_x": 1.0, "repeat": 120 },
                { "move_x": -1.0, "repeat": 45 },
                { "jump_pressed": true, "repeat": 1 },
                { "repeat": 90 }
              ]
            }"#,
        );
        let content = MemoryContent::three_levels();
        let config = GameConfig::default();

        let mut run_a = LevelSession::start(&config, &content);
        let mut run_b = LevelSession::start(&config, &content);
        let events_a = replay.run(&mut run_a, &content);
        let events_b = replay.run(&mut run_b, &content);

        assert_eq!(events_a, events_b);
        assert_eq!(run_a.level(), run_b.level());
        assert_eq!(run_a.player().aabb, run_b.player().aabb);
        assert_eq!(run_a.player().velocity_y, run_b.player().velocity_y);
        assert_eq!(run_a.progress().score, run_b.progress().score);
        assert_eq!(run_a.progress().deaths, run_b.progress().deaths);
    }
}
