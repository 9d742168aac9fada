/// Level descriptions and loading.
///
/// ## Sources
///   1. TOML level files (`.toml`), either cell lists or a text diagram.
///   2. In-memory diagrams (`from_diagram`), used by tests and tooling.
///
/// ## Diagram format
///   ```toml
///   diagram = ["#####", "#@.B#", "#####"]
///   [legend]
///   "B" = "floor dirtBlock"
///   ```
///
/// Every glyph maps to a stack of actor tokens, bottom first. A token is
/// `id[:direction[:custom]]`; directions are `u r d l` or `0..3`. The
/// tokens `wires=N` and `tunnels=N` set the cell's wire masks. Glyphs of
/// the built-in legend need no entry:
///
///   '.' = floor          '#' = wall           '=' = steelWall
///   '@' = chip (up)      'B' = dirtBlock      '~' = water
///   '^' = fire           '_' = ice            'E' = exit
///   'c' = echip          ' ' = floor
///
/// `load` is the only fallible step between a description and a running
/// level; nothing fails once ticking starts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::direction::Direction;
use crate::domain::kind::ActorKind;
use crate::domain::rng::{LevelRng, DEFAULT_BLOB_SEED};
use crate::domain::tile::{Layer, Position};
use super::level::LevelState;
use super::replay::SeedTriple;
use super::wires;

// ══════════════════════════════════════════════════════════════
// Errors
// ══════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level has zero width or height")]
    ZeroSize,
    #[error("expected {expected} cells, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("unknown actor id \"{id}\" at ({x}, {y})")]
    UnknownActor { id: String, x: u32, y: u32 },
    #[error("unknown glyph '{glyph}' at ({x}, {y})")]
    UnknownGlyph { glyph: char, x: u32, y: u32 },
    #[error("bad direction \"{value}\" at ({x}, {y})")]
    BadDirection { value: String, x: u32, y: u32 },
    #[error("bad wire mask \"{value}\" at ({x}, {y})")]
    BadWireMask { value: String, x: u32, y: u32 },
    #[error("malformed custom data \"{custom}\" for {id} at ({x}, {y})")]
    MalformedCustom { id: String, custom: String, x: u32, y: u32 },
    #[error("two {layer:?} actors at ({x}, {y})")]
    LayerConflict { layer: Layer, x: u32, y: u32 },
    #[error("connection ({}, {}) -> ({}, {}) leaves the level", .from.x, .from.y, .to.x, .to.y)]
    ConnectionOutOfBounds { from: Position, to: Position },
    #[error("could not read {path}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

// ══════════════════════════════════════════════════════════════
// Description types
// ══════════════════════════════════════════════════════════════

/// A button at `from` drives the actor at `to`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Connection {
    pub from: Position,
    pub to: Position,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelMetadata {
    pub title: String,
    pub author: String,
    /// Seconds; 0 means untimed.
    pub time_limit: u32,
    /// Chips required beyond the ones placed in the level.
    pub chips_required: u32,
    pub player_count: u32,
    pub hints: Vec<String>,
    pub default_hint: Option<String>,
    /// 1: fixed blob seed. 4: seeded, cycling four patterns. 256: seeded.
    pub blob_mode: u16,
    /// Jetlife runs on subticks that are a multiple of this.
    pub jetlife_interval: Option<u32>,
    /// Playables that must exit; every playable when absent.
    pub required_exits: Option<u32>,
}

impl Default for LevelMetadata {
    fn default() -> Self {
        LevelMetadata {
            title: String::new(),
            author: String::new(),
            time_limit: 0,
            chips_required: 0,
            player_count: 1,
            hints: Vec::new(),
            default_hint: None,
            blob_mode: 1,
            jetlife_interval: None,
            required_exits: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorPlacement {
    pub id: String,
    #[serde(default)]
    pub direction: u8,
    #[serde(default)]
    pub custom: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellDescription {
    /// Bottom first.
    pub actors: Vec<ActorPlacement>,
    pub wires: u8,
    pub wire_tunnels: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDescription {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub metadata: LevelMetadata,
    /// Reading order.
    pub cells: Vec<CellDescription>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl LevelDescription {
    pub fn cell_mut(&mut self, x: u32, y: u32) -> Option<&mut CellDescription> {
        if x >= self.width { return None; }
        self.cells.get_mut((y * self.width + x) as usize)
    }
}

// ══════════════════════════════════════════════════════════════
// Diagrams
// ══════════════════════════════════════════════════════════════

const DEFAULT_LEGEND: &[(char, &str)] = &[
    ('.', "floor"),
    (' ', "floor"),
    ('#', "wall"),
    ('=', "steelWall"),
    ('@', "floor chip"),
    ('B', "floor dirtBlock"),
    ('~', "water"),
    ('^', "fire"),
    ('_', "ice"),
    ('E', "exit"),
    ('c', "floor echip"),
];

fn parse_direction(token: &str, x: u32, y: u32) -> Result<u8, LevelError> {
    match token {
        "" | "u" | "up" | "0" => Ok(0),
        "r" | "right" | "1" => Ok(1),
        "d" | "down" | "2" => Ok(2),
        "l" | "left" | "3" => Ok(3),
        _ => Err(LevelError::BadDirection { value: token.to_string(), x, y }),
    }
}

fn parse_mask(value: &str, x: u32, y: u32) -> Result<u8, LevelError> {
    match value.parse::<u8>() {
        Ok(n) if n <= 0b1111 => Ok(n),
        _ => Err(LevelError::BadWireMask { value: value.to_string(), x, y }),
    }
}

/// Parses a legend entry into a cell.
fn parse_stack(stack: &str, x: u32, y: u32) -> Result<CellDescription, LevelError> {
    let mut cell = CellDescription::default();
    for token in stack.split_whitespace() {
        if let Some(n) = token.strip_prefix("wires=") {
            cell.wires = parse_mask(n, x, y)?;
            continue;
        }
        if let Some(n) = token.strip_prefix("tunnels=") {
            cell.wire_tunnels = parse_mask(n, x, y)?;
            continue;
        }
        let mut parts = token.splitn(3, ':');
        let id = parts.next().unwrap_or_default().to_string();
        let direction = parse_direction(parts.next().unwrap_or_default(), x, y)?;
        let custom = parts.next().unwrap_or_default().to_string();
        cell.actors.push(ActorPlacement { id, direction, custom });
    }
    Ok(cell)
}

/// Builds a description from rows of glyphs. `legend` entries override
/// the built-in legend.
pub fn from_diagram(rows: &[&str], legend: &[(char, &str)]) -> Result<LevelDescription, LevelError> {
    let height = rows.len() as u32;
    let width = rows.first().map_or(0, |r| r.chars().count()) as u32;
    if width == 0 || height == 0 {
        return Err(LevelError::ZeroSize);
    }
    let lookup = |glyph: char| {
        legend
            .iter()
            .chain(DEFAULT_LEGEND)
            .find(|(g, _)| *g == glyph)
            .map(|(_, s)| *s)
    };

    let mut cells = Vec::with_capacity((width * height) as usize);
    for (y, row) in rows.iter().enumerate() {
        let y = y as u32;
        let found = row.chars().count();
        if found as u32 != width {
            return Err(LevelError::DimensionMismatch { expected: width as usize, found });
        }
        for (x, glyph) in row.chars().enumerate() {
            let x = x as u32;
            let stack = lookup(glyph).ok_or(LevelError::UnknownGlyph { glyph, x, y })?;
            cells.push(parse_stack(stack, x, y)?);
        }
    }
    Ok(LevelDescription { width, height, metadata: LevelMetadata::default(), cells, connections: Vec::new() })
}

// ══════════════════════════════════════════════════════════════
// Files
// ══════════════════════════════════════════════════════════════

/// On-disk form: either explicit cells or a diagram with its legend.
#[derive(Deserialize)]
struct LevelFile {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    metadata: LevelMetadata,
    #[serde(default)]
    cells: Vec<CellDescription>,
    #[serde(default)]
    diagram: Vec<String>,
    #[serde(default)]
    legend: BTreeMap<String, String>,
    #[serde(default)]
    connections: Vec<Connection>,
}

pub fn from_toml(text: &str) -> Result<LevelDescription, LevelError> {
    let file: LevelFile = toml::from_str(text)?;
    let mut desc = if file.diagram.is_empty() {
        LevelDescription { width: file.width, height: file.height, cells: file.cells, ..Default::default() }
    } else {
        let legend: Vec<(char, &str)> = file
            .legend
            .iter()
            .filter_map(|(k, v)| k.chars().next().map(|c| (c, v.as_str())))
            .collect();
        let rows: Vec<&str> = file.diagram.iter().map(String::as_str).collect();
        from_diagram(&rows, &legend)?
    };
    desc.metadata = file.metadata;
    desc.connections = file.connections;
    Ok(desc)
}

pub fn from_file(path: &Path) -> Result<LevelDescription, LevelError> {
    let text = std::fs::read_to_string(path).map_err(|source| LevelError::Io { path: path.to_path_buf(), source })?;
    let mut desc = from_toml(&text)?;
    if desc.metadata.title.is_empty() {
        desc.metadata.title = path.file_stem().unwrap_or_default().to_string_lossy().into_owned();
    }
    Ok(desc)
}

/// Level files of a directory, sorted by name.
pub fn scan_dir(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else { return Vec::new() };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|x| x == "toml"))
        .collect();
    files.sort();
    files
}

// ══════════════════════════════════════════════════════════════
// Loading
// ══════════════════════════════════════════════════════════════

struct Resolved {
    kind: ActorKind,
    position: Position,
    direction: Direction,
    custom: String,
}

fn validate(desc: &LevelDescription) -> Result<Vec<Vec<Resolved>>, LevelError> {
    if desc.width == 0 || desc.height == 0 {
        return Err(LevelError::ZeroSize);
    }
    let expected = (desc.width * desc.height) as usize;
    if desc.cells.len() != expected {
        return Err(LevelError::DimensionMismatch { expected, found: desc.cells.len() });
    }
    let in_bounds = |p: Position| p.x < desc.width && p.y < desc.height;
    if let Some(c) = desc.connections.iter().find(|c| !in_bounds(c.from) || !in_bounds(c.to)) {
        return Err(LevelError::ConnectionOutOfBounds { from: c.from, to: c.to });
    }

    let mut resolved = Vec::with_capacity(expected);
    for (idx, cell) in desc.cells.iter().enumerate() {
        let (x, y) = (idx as u32 % desc.width, idx as u32 / desc.width);
        let mut seen: Vec<Layer> = Vec::new();
        let mut actors = Vec::with_capacity(cell.actors.len());
        for p in &cell.actors {
            let kind = ActorKind::from_id(&p.id).ok_or_else(|| LevelError::UnknownActor { id: p.id.clone(), x, y })?;
            if p.direction > 3 {
                return Err(LevelError::BadDirection { value: p.direction.to_string(), x, y });
            }
            if kind.parse_custom(&p.custom).is_none() {
                return Err(LevelError::MalformedCustom { id: p.id.clone(), custom: p.custom.clone(), x, y });
            }
            let layer = kind.layer();
            if seen.contains(&layer) {
                return Err(LevelError::LayerConflict { layer, x, y });
            }
            seen.push(layer);
            actors.push(Resolved {
                kind,
                position: Position::new(x, y),
                direction: Direction::from_index(p.direction as u32),
                custom: p.custom.clone(),
            });
        }
        resolved.push(actors);
    }
    Ok(resolved)
}

fn level_rng(metadata: &LevelMetadata, seed: SeedTriple) -> LevelRng {
    let blob = if metadata.blob_mode > 1 { seed.blob_seed } else { DEFAULT_BLOB_SEED };
    LevelRng::new(seed.rng_seed, blob, metadata.blob_mode == 4)
}

/// Builds a ready-to-tick level. Actors end up in reading order; within a
/// cell the top actor comes first.
pub fn load(desc: &LevelDescription, seed: SeedTriple) -> Result<LevelState, LevelError> {
    let cells = validate(desc)?;
    let rng = level_rng(&desc.metadata, seed);
    let mut level = LevelState::new(desc.width, desc.height, desc.metadata.clone(), rng);
    level.rff_direction = seed.rff_direction;
    level.connections = desc.connections.clone();
    if let Some(n) = desc.metadata.required_exits {
        level.playables_left = n as i32;
    }

    for (idx, cell) in desc.cells.iter().enumerate() {
        if let Some(tile) = level.grid.get_mut(level.grid.position_at(idx)) {
            tile.wires = cell.wires;
            tile.wire_tunnels = cell.wire_tunnels & cell.wires;
        }
    }

    for actors in cells.iter().rev() {
        for r in actors {
            let id = level.spawn(r.kind, r.position, r.direction, &r.custom);
            if r.kind.gate_kind().is_some() {
                if let Some(tile) = level.grid.get_mut(r.position) {
                    tile.wires = crate::domain::wires::WIRES_ALL;
                }
            }
            debug!(id = id.0, kind = r.kind.id(), "placed");
        }
    }
    level.order.reverse();
    level.deciding.reverse();
    level.playables.reverse();

    wires::build(&mut level);
    level.assign_seats();
    info!(
        title = %desc.metadata.title,
        width = desc.width,
        height = desc.height,
        actors = level.order.len(),
        chips = level.chips_left,
        circuits = level.circuits.len(),
        "level loaded"
    );
    Ok(level)
}
