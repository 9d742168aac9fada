/// Layered grid cells.
///
/// A tile holds actor handles in five ordered layer slots plus an
/// "all actors" view kept in insertion order. Properties of the occupants
/// are queried through the arena, never stored here, so the tile stays a
/// plain container with cached wire bits.
///
/// Between ticks every layer holds at most one handle. The lists exist so a
/// transient overlap can be represented while the despawn rules resolve it.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::actor::ActorId;
use super::direction::Direction;

pub const LAYER_COUNT: usize = 5;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Layer {
    /// Floors, walls, water, buttons...
    Terrain = 0,
    Item = 1,
    /// Modifies the item below it (no sign).
    ItemMod = 2,
    Movable = 3,
    /// Thin walls, swivel parts.
    Special = 4,
}

impl Layer {
    pub const ALL: [Layer; LAYER_COUNT] = [Layer::Terrain, Layer::Item, Layer::ItemMod, Layer::Movable, Layer::Special];

    /// Entering-tile collision scan order. The scan stops after an occupied
    /// `Movable` layer, so the trailing `Item` is only reached when no
    /// movable stands on the tile.
    pub const COLLISION_ORDER: [Layer; LAYER_COUNT] = [Layer::ItemMod, Layer::Special, Layer::Terrain, Layer::Movable, Layer::Item];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Grid coordinate. Ordered in reading order (row-major, top to bottom).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    pub const fn new(x: u32, y: u32) -> Self {
        Position { x, y }
    }

    /// Taxicab distance.
    pub fn distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ══════════════════════════════════════════════════════════════
// Tile
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct Tile {
    pub position: Position,
    layers: [SmallVec<[ActorId; 1]>; LAYER_COUNT],
    all: SmallVec<[ActorId; 4]>,

    // ── Wires ──
    /// Wire segments on this tile (UP=1, RIGHT=2, DOWN=4, LEFT=8).
    pub wires: u8,
    /// Tunnel openings, same bit layout.
    pub wire_tunnels: u8,
    /// Edges powered after the last propagation pass.
    pub powered_wires: u8,
    /// `powered_wires` of the pass before that.
    pub was_powered: u8,
    /// Edges this tile drives itself (emitters only).
    pub powering_wires: u8,
    /// Flips once per recalculation; compared against the level parity.
    pub parity: bool,
    /// Member of at least one circuit.
    pub is_wired: bool,
    /// Circuit index per edge, in direction order.
    pub circuits: [Option<usize>; 4],
}

impl Tile {
    pub fn new(position: Position) -> Self {
        Tile { position, ..Default::default() }
    }

    pub fn add_actor(&mut self, id: ActorId, layer: Layer) {
        self.layers[layer.index()].push(id);
        self.all.push(id);
    }

    /// Removes `id` from its layer list and the all-actors view.
    /// Returns false when it was not on this tile.
    pub fn remove_actor(&mut self, id: ActorId, layer: Layer) -> bool {
        let list = &mut self.layers[layer.index()];
        let Some(idx) = list.iter().position(|&a| a == id) else { return false };
        list.remove(idx);
        if let Some(idx) = self.all.iter().position(|&a| a == id) {
            self.all.remove(idx);
        }
        true
    }

    #[inline]
    pub fn layer(&self, layer: Layer) -> &[ActorId] {
        &self.layers[layer.index()]
    }

    /// First occupant of a layer.
    #[inline]
    pub fn top(&self, layer: Layer) -> Option<ActorId> {
        self.layers[layer.index()].first().copied()
    }

    #[inline]
    pub fn has(&self, layer: Layer) -> bool {
        !self.layers[layer.index()].is_empty()
    }

    /// Occupants in insertion order.
    #[inline]
    pub fn all(&self) -> &[ActorId] {
        &self.all
    }

    /// Owned copy of the occupants, for iterating while hooks mutate the tile.
    pub fn occupants(&self) -> SmallVec<[ActorId; 4]> {
        self.all.clone()
    }

    /// Owned copy in reverse insertion order.
    pub fn occupants_reverse(&self) -> SmallVec<[ActorId; 4]> {
        self.all.iter().rev().copied().collect()
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.all.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

// ══════════════════════════════════════════════════════════════
// Grid
// ══════════════════════════════════════════════════════════════

/// Row-major tile storage. Every accessor is bounds-checked; nothing here
/// panics on an out-of-range position.
#[derive(Clone, Debug)]
pub struct Grid {
    pub width: u32,
    pub height: u32,
    tiles: Vec<Tile>,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Self {
        let mut tiles = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                tiles.push(Tile::new(Position::new(x, y)));
            }
        }
        Grid { width, height, tiles }
    }

    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Reading-order index.
    #[inline]
    pub fn index_of(&self, pos: Position) -> usize {
        (pos.y * self.width + pos.x) as usize
    }

    pub fn position_at(&self, index: usize) -> Position {
        let w = self.width.max(1) as usize;
        Position::new((index % w) as u32, (index / w) as u32)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn get(&self, pos: Position) -> Option<&Tile> {
        if !self.contains(pos) { return None; }
        self.tiles.get(self.index_of(pos))
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        if !self.contains(pos) { return None; }
        let idx = self.index_of(pos);
        self.tiles.get_mut(idx)
    }

    /// Tiles in reading order.
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }

    /// Adjacent position, `None` at the edge. No wrapping.
    pub fn neighbor(&self, pos: Position, dir: Direction) -> Option<Position> {
        self.offset(pos, dir.offset())
    }

    pub fn offset(&self, pos: Position, (dx, dy): (i32, i32)) -> Option<Position> {
        let x = pos.x as i64 + dx as i64;
        let y = pos.y as i64 + dy as i64;
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(Position::new(x as u32, y as u32))
    }

    /// In-bounds tiles at taxicab distance `level` from `center`.
    ///
    /// Starts at (+level, 0) and walks counter-clockwise (up-left first, as
    /// y grows downward): right, top, left, bottom corners in that order.
    pub fn diamond_search(&self, center: Position, level: u32) -> Vec<Position> {
        if level == 0 {
            return vec![center];
        }
        let l = level as i32;
        const STEPS: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, 1), (1, -1)];
        let mut out = Vec::with_capacity(4 * level as usize);
        let (mut dx, mut dy) = (l, 0);
        for step in STEPS {
            for _ in 0..l {
                if let Some(p) = self.offset(center, (dx, dy)) {
                    out.push(p);
                }
                dx += step.0;
                dy += step.1;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> ActorId {
        ActorId(n)
    }

    // ── Layer bookkeeping ──

    #[test]
    fn all_view_keeps_insertion_order() {
        let mut t = Tile::new(Position::new(0, 0));
        t.add_actor(id(3), Layer::Movable);
        t.add_actor(id(1), Layer::Terrain);
        t.add_actor(id(2), Layer::Item);
        assert_eq!(t.all(), &[id(3), id(1), id(2)]);
        assert_eq!(t.occupants_reverse().as_slice(), &[id(2), id(1), id(3)]);
        assert_eq!(t.top(Layer::Terrain), Some(id(1)));
    }

    #[test]
    fn remove_drops_from_both_views() {
        let mut t = Tile::new(Position::new(0, 0));
        t.add_actor(id(1), Layer::Terrain);
        t.add_actor(id(2), Layer::Movable);
        assert!(t.remove_actor(id(2), Layer::Movable));
        assert!(!t.has(Layer::Movable));
        assert_eq!(t.all(), &[id(1)]);
        // Wrong layer or absent: no-op
        assert!(!t.remove_actor(id(1), Layer::Movable));
        assert!(!t.remove_actor(id(9), Layer::Terrain));
        assert_eq!(t.all(), &[id(1)]);
    }

    // ── Grid ──

    #[test]
    fn neighbor_stops_at_edges() {
        let g = Grid::new(3, 2);
        let corner = Position::new(0, 0);
        assert_eq!(g.neighbor(corner, Direction::Up), None);
        assert_eq!(g.neighbor(corner, Direction::Left), None);
        assert_eq!(g.neighbor(corner, Direction::Right), Some(Position::new(1, 0)));
        assert_eq!(g.neighbor(Position::new(2, 1), Direction::Down), None);
        assert!(g.get(Position::new(3, 0)).is_none());
        assert!(g.get(Position::new(0, 7)).is_none());
    }

    #[test]
    fn diamond_search_order() {
        let g = Grid::new(5, 5);
        let c = Position::new(2, 2);
        assert_eq!(
            g.diamond_search(c, 1),
            vec![Position::new(3, 2), Position::new(2, 1), Position::new(1, 2), Position::new(2, 3)]
        );
        let ring2 = g.diamond_search(c, 2);
        assert_eq!(ring2.len(), 8);
        assert_eq!(ring2[0], Position::new(4, 2));
        assert_eq!(ring2[1], Position::new(3, 1));
        assert_eq!(ring2[2], Position::new(2, 0));
        assert!(ring2.iter().all(|p| p.distance(c) == 2));
    }

    #[test]
    fn diamond_search_clips_out_of_bounds() {
        let g = Grid::new(2, 2);
        let ring = g.diamond_search(Position::new(0, 0), 1);
        assert_eq!(ring, vec![Position::new(1, 0), Position::new(0, 1)]);
    }

    #[test]
    fn positions_sort_in_reading_order() {
        let mut ps = vec![Position::new(1, 1), Position::new(2, 0), Position::new(0, 1)];
        ps.sort();
        assert_eq!(ps, vec![Position::new(2, 0), Position::new(0, 1), Position::new(1, 1)]);
    }
}
