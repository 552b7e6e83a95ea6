//! Tile-map level files and the entity lists built from them.
//!
//! A map is JSON with named layers. Layer names are matched loosely
//! (case-insensitive substring: "Platforms", "platform_main" and "PLATFORMS"
//! are all platforms), which is how hand-made maps actually name things.
//! Each layer carries tile runs on the map grid and/or free point objects.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::collision::{Aabb, SpatialHash};

#[derive(Debug, Deserialize, Clone)]
pub struct LevelMapFile {
    pub version: String,
    pub level: u32,
    pub tile_size: f32,
    #[serde(default)]
    pub background: Option<String>,
    pub player_start: MapPoint,
    /// The level's portals only open once every coin is collected.
    #[serde(default)]
    pub portal_requires_all_coins: bool,
    pub layers: Vec<MapLayer>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapLayer {
    pub name: String,
    #[serde(default)]
    pub texture: Option<String>,
    #[serde(default)]
    pub tiles: Vec<TileRun>,
    #[serde(default)]
    pub objects: Vec<MapPoint>,
}

/// `len` tiles in a horizontal row starting at grid cell `(x, y)`.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct TileRun {
    pub x: i32,
    pub y: i32,
    #[serde(default = "default_run_len")]
    pub len: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct MapPoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    LilyPads,
    Platforms,
    Decor,
    Spikes,
    Water,
    Portal,
    Coins,
    Finish,
}

impl LayerKind {
    /// Substring match, first hit wins.
    const PATTERNS: &'static [(&'static str, LayerKind)] = &[
        ("lily", LayerKind::LilyPads),
        ("platform", LayerKind::Platforms),
        ("back", LayerKind::Decor),
        ("decor", LayerKind::Decor),
        ("spike", LayerKind::Spikes),
        ("water", LayerKind::Water),
        ("portal", LayerKind::Portal),
        ("coin", LayerKind::Coins),
        ("finish", LayerKind::Finish),
    ];

    pub fn classify(layer_name: &str) -> Option<LayerKind> {
        let lower = layer_name.to_lowercase();
        Self::PATTERNS
            .iter()
            .find(|(pattern, _)| lower.contains(pattern))
            .map(|&(_, kind)| kind)
    }
}

/// Per-layer loading hints.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerOptions {
    /// Build a spatial hash for overlap queries against this layer.
    pub use_spatial_hash: bool,
}

pub fn default_layer_options() -> HashMap<LayerKind, LayerOptions> {
    let hashed = LayerOptions {
        use_spatial_hash: true,
    };
    HashMap::from([
        (LayerKind::Platforms, hashed),
        (LayerKind::Spikes, hashed),
        (LayerKind::Water, hashed),
        (LayerKind::Coins, hashed),
        (LayerKind::Portal, hashed),
        (LayerKind::Decor, LayerOptions::default()),
        (LayerKind::Finish, LayerOptions::default()),
    ])
}

/// One layer's worth of boxes, optionally indexed.
#[derive(Debug, Clone, Default)]
pub struct EntityList {
    boxes: Vec<Aabb>,
    pub texture: Option<String>,
    index: Option<SpatialHash>,
}

impl EntityList {
    pub fn new(boxes: Vec<Aabb>, texture: Option<String>, options: LayerOptions, cell: f32) -> Self {
        let index = options
            .use_spatial_hash
            .then(|| SpatialHash::build(cell * 4.0, &boxes));
        Self {
            boxes,
            texture,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn boxes(&self) -> &[Aabb] {
        &self.boxes
    }

    /// Indices of every box overlapping `probe`, ascending.
    pub fn overlapping(&self, probe: &Aabb) -> Vec<usize> {
        match &self.index {
            Some(index) => index
                .candidates(probe)
                .into_iter()
                .filter(|&i| self.boxes[i].overlaps(probe))
                .collect(),
            None => self
                .boxes
                .iter()
                .enumerate()
                .filter(|(_, b)| b.overlaps(probe))
                .map(|(i, _)| i)
                .collect(),
        }
    }

    pub fn overlaps_any(&self, probe: &Aabb) -> bool {
        !self.overlapping(probe).is_empty()
    }

    fn extend(&mut self, other: EntityList, options: LayerOptions, cell: f32) {
        let mut boxes = std::mem::take(&mut self.boxes);
        boxes.extend(other.boxes);
        let texture = self.texture.take().or(other.texture);
        *self = EntityList::new(boxes, texture, options, cell);
    }
}

/// Everything the session needs from one map, grouped by layer kind.
#[derive(Debug, Clone, Default)]
pub struct LevelContent {
    pub level: u32,
    pub background: Option<String>,
    pub player_start: (f32, f32),
    pub portal_requires_all_coins: bool,
    pub platforms: EntityList,
    pub decor: EntityList,
    pub spikes: EntityList,
    pub water: EntityList,
    pub portals: EntityList,
    /// Box index is the coin's stable key for progress tracking.
    pub coins: EntityList,
    pub finish: EntityList,
    pub lily_pad_markers: Vec<MapPoint>,
    pub lily_pad_texture: Option<String>,
}

impl LevelContent {
    /// A level with no geometry at all: what a failed map load leaves behind.
    pub fn empty(level: u32, player_start: (f32, f32)) -> Self {
        Self {
            level,
            player_start,
            ..Default::default()
        }
    }

    pub fn from_file(file: &LevelMapFile, options: &HashMap<LayerKind, LayerOptions>) -> Self {
        let mut content = Self {
            level: file.level,
            background: file.background.clone(),
            player_start: (file.player_start.x, file.player_start.y),
            portal_requires_all_coins: file.portal_requires_all_coins,
            ..Default::default()
        };

        let ts = file.tile_size;
        for layer in &file.layers {
            let Some(kind) = LayerKind::classify(&layer.name) else {
                log::warn!(
                    "Level {}: ignoring unrecognized layer '{}'",
                    file.level,
                    layer.name
                );
                continue;
            };

            if kind == LayerKind::LilyPads {
                // Pads are points; tile cells contribute their centers.
                content.lily_pad_markers.extend(layer.objects.iter().copied());
                content
                    .lily_pad_markers
                    .extend(layer.tiles.iter().flat_map(|run| run_cells(run, ts)).map(
                        |cell| MapPoint {
                            x: cell.center_x,
                            y: cell.center_y,
                        },
                    ));
                if content.lily_pad_texture.is_none() {
                    content.lily_pad_texture = layer.texture.clone();
                }
                continue;
            }

            let mut boxes: Vec<Aabb> = layer.tiles.iter().flat_map(|run| run_cells(run, ts)).collect();
            boxes.extend(layer.objects.iter().map(|p| Aabb::new(p.x, p.y, ts, ts)));

            let layer_options = options.get(&kind).copied().unwrap_or_default();
            let list = EntityList::new(boxes, layer.texture.clone(), layer_options, ts);
            let slot = match kind {
                LayerKind::Platforms => &mut content.platforms,
                LayerKind::Decor => &mut content.decor,
                LayerKind::Spikes => &mut content.spikes,
                LayerKind::Water => &mut content.water,
                LayerKind::Portal => &mut content.portals,
                LayerKind::Coins => &mut content.coins,
                LayerKind::Finish => &mut content.finish,
                LayerKind::LilyPads => unreachable!("lily pads handled above"),
            };
            slot.extend(list, layer_options, ts);
        }

        log::info!(
            "Level {} content: platforms={} decor={} spikes={} water={} portals={} coins={} finish={} lily_pads={}",
            content.level,
            content.platforms.len(),
            content.decor.len(),
            content.spikes.len(),
            content.water.len(),
            content.portals.len(),
            content.coins.len(),
            content.finish.len(),
            content.lily_pad_markers.len()
        );
        content
    }
}

fn run_cells(run: &TileRun, tile_size: f32) -> impl Iterator<Item = Aabb> {
    let (x, y) = (run.x, run.y);
    (0..run.len as i32).map(move |i| {
        Aabb::new(
            (x + i) as f32 * tile_size + tile_size * 0.5,
            y as f32 * tile_size + tile_size * 0.5,
            tile_size,
            tile_size,
        )
    })
}

pub const MAP_VERSION: &str = "0.1";

/// First candidate directory that holds a `maps/` folder.
pub fn find_asset_root(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .find(|dir| dir.join("maps").is_dir())
        .cloned()
}

pub fn load_level_map(path: &Path) -> Result<LevelMapFile, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read map file {}: {e}", path.display()))?;
    let map: LevelMapFile = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse map JSON {}: {e}", path.display()))?;
    validate_level_map(&map)?;
    Ok(map)
}

fn validate_level_map(map: &LevelMapFile) -> Result<(), String> {
    if map.version != MAP_VERSION {
        return Err(format!(
            "Map validation failed: unsupported version '{}'",
            map.version
        ));
    }
    if map.tile_size <= 0.0 {
        return Err("Map validation failed: tile_size must be > 0".to_string());
    }
    if map.level == 0 {
        return Err("Map validation failed: levels are numbered from 1".to_string());
    }
    for layer in &map.layers {
        if layer.name.trim().is_empty() {
            return Err("Map validation failed: layer with empty name".to_string());
        }
        if let Some(run) = layer.tiles.iter().find(|run| run.len == 0) {
            return Err(format!(
                "Map validation failed: layer '{}' has an empty tile run at ({}, {})",
                layer.name, run.x, run.y
            ));
        }
    }
    Ok(())
}

/// Where levels and texture metadata come from. The game reads the asset
/// directory; tests hand in maps built in memory.
pub trait ContentSource {
    fn level_map(&self, level: u32) -> Result<LevelMapFile, String>;

    /// Pixel size of an image asset, `None` when it can't be read.
    fn texture_size(&self, path: &str) -> Option<(u32, u32)>;

    /// First candidate that resolves to a readable image.
    fn first_available<'a>(&self, candidates: &[&'a str]) -> Option<&'a str> {
        candidates
            .iter()
            .copied()
            .find(|path| self.texture_size(path).is_some())
    }
}

/// Assets under a root directory: `maps/map{n}.json`, `images/...`.
#[derive(Debug, Clone)]
pub struct FsContent {
    root: PathBuf,
}

impl FsContent {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn map_path(&self, level: u32) -> PathBuf {
        self.resolve(&format!("maps/map{level}.json"))
    }
}

impl ContentSource for FsContent {
    fn level_map(&self, level: u32) -> Result<LevelMapFile, String> {
        load_level_map(&self.map_path(level))
    }

    fn texture_size(&self, path: &str) -> Option<(u32, u32)> {
        image::image_dimensions(self.resolve(path)).ok()
    }
}

/// Polls a file's mtime so an edited map can be reloaded in place.
pub struct FileWatcher {
    path: PathBuf,
    last_seen_modified: Option<SystemTime>,
}

impl FileWatcher {
    pub fn new(path: PathBuf) -> Self {
        let last_seen_modified = modified_time(&path);
        Self {
            path,
            last_seen_modified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn should_reload(&mut self) -> bool {
        let current = modified_time(&self.path);
        match (self.last_seen_modified, current) {
            (Some(old), Some(now)) if now > old => {
                self.last_seen_modified = Some(now);
                true
            }
            (None, Some(now)) => {
                self.last_seen_modified = Some(now);
                true
            }
            _ => false,
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}

const fn default_run_len() -> u32 {
    1
}
