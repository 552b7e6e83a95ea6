//! In-memory levels shared by the session, mode and replay tests.

use std::collections::HashMap;

use crate::level::{ContentSource, LevelMapFile};

pub const PAD_TEXTURE: &str = "images/lilypad.png";

/// Level 1: flat floor, three coins in a row, a coin-gated portal at the
/// right edge, spikes floating out of reach.
pub const LEVEL_1: &str = r#"{
  "version": "0.1", "level": 1, "tile_size": 32,
  "player_start": { "x": 100, "y": 52 },
  "portal_requires_all_coins": true,
  "layers": [
    { "name": "Platforms", "tiles": [ { "x": 0, "y": 0, "len": 40 } ] },
    { "name": "Coins", "objects": [ { "x": 200, "y": 52 }, { "x": 300, "y": 52 }, { "x": 400, "y": 52 } ] },
    { "name": "Portal", "objects": [ { "x": 1200, "y": 64 } ] },
    { "name": "Spikes", "objects": [ { "x": 640, "y": 300 } ] }
  ]
}"#;

/// Level 2: water gap spanned by a lily pad at (480, 250), open portal.
pub const LEVEL_2: &str = r#"{
  "version": "0.1", "level": 2, "tile_size": 32,
  "player_start": { "x": 50, "y": 52 },
  "layers": [
    { "name": "platforms", "tiles": [ { "x": 0, "y": 0, "len": 14 }, { "x": 24, "y": 0, "len": 16 } ] },
    { "name": "Water", "tiles": [ { "x": 14, "y": 0, "len": 10 } ] },
    { "name": "LilyPads", "objects": [ { "x": 480, "y": 250 } ] },
    { "name": "Portal", "objects": [ { "x": 1200, "y": 64 } ] }
  ]
}"#;

/// Level 3: floor, finish marker, floating spikes.
pub const LEVEL_3: &str = r#"{
  "version": "0.1", "level": 3, "tile_size": 32,
  "player_start": { "x": 50, "y": 52 },
  "layers": [
    { "name": "Platforms", "tiles": [ { "x": 0, "y": 0, "len": 40 } ] },
    { "name": "Finish", "objects": [ { "x": 1200, "y": 64 } ] },
    { "name": "spikes", "objects": [ { "x": 640, "y": 300 } ] }
  ]
}"#;

#[derive(Debug, Default)]
pub struct MemoryContent {
    maps: HashMap<u32, LevelMapFile>,
    textures: HashMap<String, (u32, u32)>,
}

impl MemoryContent {
    pub fn three_levels() -> Self {
        let mut content = Self::default();
        for raw in [LEVEL_1, LEVEL_2, LEVEL_3] {
            content = content.with_map(raw);
        }
        content.textures.insert(PAD_TEXTURE.to_string(), (96, 20));
        content
    }

    pub fn with_map(mut self, raw: &str) -> Self {
        let map: LevelMapFile = serde_json::from_str(raw).expect("test map parses");
        self.maps.insert(map.level, map);
        self
    }

    pub fn without_texture(mut self, path: &str) -> Self {
        self.textures.remove(path);
        self
    }
}

impl ContentSource for MemoryContent {
    fn level_map(&self, level: u32) -> Result<LevelMapFile, String> {
        self.maps
            .get(&level)
            .cloned()
            .ok_or_else(|| format!("Failed to read map file maps/map{level}.json: not found"))
    }

    fn texture_size(&self, path: &str) -> Option<(u32, u32)> {
        self.textures.get(path).copied()
    }
}
