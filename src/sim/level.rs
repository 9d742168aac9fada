/// LevelState: everything a running level owns.
///
/// ## Arena
///
/// Actors live in a flat `Vec` indexed by `ActorId`. Handles are never
/// reused, so a destroyed actor keeps its slot with `exists = false` and
/// stale handles stay harmless. Tiles store handles only.
///
/// ## Orders
///
///   - `order`: every live actor. Reading order at load, runtime spawns go
///     to the front.
///   - `deciding`: the subset that runs decide/move/cooldown each subtick.
///   - `despawned`: live actors currently missing from their tile.
///
/// ## Lifecycle
///
/// All creation and removal goes through `spawn`, `place`, `destroy`,
/// `replace_with`, `despawn` and `respawn`. They keep the orders, the tile
/// lists and the glitch log consistent with each other.

use serde::Serialize;
use tracing::{debug, trace};

use crate::domain::actor::{Actor, ActorId};
use crate::domain::direction::Direction;
use crate::domain::input::{Debounce, KeyInputs};
use crate::domain::kind::{ActorKind, CustomState};
use crate::domain::rng::LevelRng;
use crate::domain::tags::TagRule;
use crate::domain::tile::{Grid, Layer, Position, Tile};
use super::event::{DespawnSpecifier, GameEvent, Glitch, GlitchKind};
use super::hooks;
use super::loader::{Connection, LevelMetadata};
use super::replay::ReplayCursor;
use super::wires::CircuitCity;

/// Subticks an animation stays before its queued despawn fires.
pub const ANIMATION_DURATION: u8 = 16;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum GameState {
    Playing,
    Won,
    Lost,
    Timeout,
    /// A crashing glitch happened; nothing moves after this.
    Crash,
}

/// One input slot controlling one playable.
#[derive(Clone, Debug, Default)]
pub struct Seat {
    pub playable: Option<ActorId>,
    pub input: KeyInputs,
    pub debounce: Debounce,
}

/// Work deferred to the end of the subtick, drained in registration order.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum AfterTick {
    /// Flip everything that listens to green buttons.
    GreenToggle,
    BlueTankTurn,
    YellowTank(Direction),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct QueuedDespawn {
    pub position: Position,
    pub remaining: u8,
    /// Decided after the first subtick: whether the tile held an animation.
    pub animation_only: Option<bool>,
}

pub struct LevelState {
    pub grid: Grid,
    actors: Vec<Actor>,
    pub order: Vec<ActorId>,
    pub deciding: Vec<ActorId>,
    pub despawned: Vec<ActorId>,
    /// Reading order at load.
    pub playables: Vec<ActorId>,
    pub seats: Vec<Seat>,

    // ── Time ──
    pub current_tick: u64,
    pub subtick: u8,
    /// Subticks left; 0 when untimed.
    pub time_left: u32,
    pub level_started: bool,
    pub game_state: GameState,

    // ── Randomness ──
    pub rng: LevelRng,
    pub rff_direction: Direction,

    // ── Counters ──
    pub chips_left: u32,
    pub chips_total: u32,
    pub chips_required: u32,
    pub bonus_points: u64,
    pub playables_left: i32,
    pub hints: Vec<String>,
    pub default_hint: Option<String>,
    pub hints_in_level: u32,

    // ── Deferred work ──
    pub after_tick: Vec<AfterTick>,
    pub swap_pending: bool,
    pub queued_despawns: Vec<QueuedDespawn>,

    // ── Wires ──
    pub circuits: Vec<CircuitCity>,
    pub wire_consumers: Vec<ActorId>,
    pub wire_parity: bool,

    pub connections: Vec<Connection>,
    pub metadata: LevelMetadata,
    pub replay: Option<ReplayCursor>,
    pub glitches: Vec<Glitch>,
    events: Vec<GameEvent>,
}

impl LevelState {
    pub fn new(width: u32, height: u32, metadata: LevelMetadata, rng: LevelRng) -> Self {
        let seats = (0..metadata.player_count.max(1)).map(|_| Seat::default()).collect();
        LevelState {
            grid: Grid::new(width, height),
            actors: Vec::new(),
            order: Vec::new(),
            deciding: Vec::new(),
            despawned: Vec::new(),
            playables: Vec::new(),
            seats,
            current_tick: 0,
            subtick: 0,
            time_left: metadata.time_limit.saturating_mul(60),
            level_started: false,
            game_state: GameState::Playing,
            rng,
            rff_direction: Direction::Up,
            chips_left: 0,
            chips_total: 0,
            chips_required: metadata.chips_required,
            bonus_points: 0,
            playables_left: 0,
            hints: metadata.hints.clone(),
            default_hint: metadata.default_hint.clone(),
            hints_in_level: 0,
            after_tick: Vec::new(),
            swap_pending: false,
            queued_despawns: Vec::new(),
            circuits: Vec::new(),
            wire_consumers: Vec::new(),
            wire_parity: false,
            connections: Vec::new(),
            metadata,
            replay: None,
            glitches: Vec::new(),
            events: Vec::new(),
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Queries
    // ══════════════════════════════════════════════════════════════

    #[inline]
    pub fn actor(&self, id: ActorId) -> &Actor {
        &self.actors[id.0 as usize]
    }

    #[inline]
    pub fn actor_mut(&mut self, id: ActorId) -> &mut Actor {
        &mut self.actors[id.0 as usize]
    }

    /// Every actor ever created, destroyed ones included.
    pub fn arena(&self) -> &[Actor] {
        &self.actors
    }

    #[inline]
    pub fn exists(&self, id: ActorId) -> bool {
        self.actor(id).exists
    }

    #[inline]
    pub fn kind(&self, id: ActorId) -> ActorKind {
        self.actor(id).kind
    }

    pub fn tile(&self, pos: Position) -> Option<&Tile> {
        self.grid.get(pos)
    }

    /// Tile of an actor. Positions are always in bounds.
    pub fn tile_of(&self, id: ActorId) -> Option<&Tile> {
        self.grid.get(self.actor(id).position)
    }

    pub fn top(&self, pos: Position, layer: Layer) -> Option<ActorId> {
        self.grid.get(pos).and_then(|t| t.top(layer))
    }

    #[inline]
    pub fn has_movable(&self, pos: Position) -> bool {
        self.grid.get(pos).is_some_and(|t| t.has(Layer::Movable))
    }

    /// First terrain occupant of a tile, if of `kind`.
    pub fn terrain_is(&self, pos: Position, kind: ActorKind) -> bool {
        self.top(pos, Layer::Terrain).is_some_and(|t| self.kind(t) == kind)
    }

    /// Follows replacement links to the current incarnation.
    pub fn follow(&self, mut id: ActorId) -> ActorId {
        while let Some(next) = self.actor(id).new_actor {
            id = next;
        }
        id
    }

    /// Playable controlled by seat 0.
    pub fn selected_playable(&self) -> Option<ActorId> {
        self.seats.first().and_then(|s| s.playable)
    }

    pub fn seat_of(&self, id: ActorId) -> Option<usize> {
        self.seats.iter().position(|s| s.playable == Some(id))
    }

    /// `tick * 3 + subtick`.
    #[inline]
    pub fn time(&self) -> u64 {
        self.current_tick * 3 + self.subtick as u64
    }

    // ── Tag relations ──

    /// Either actor refuses to interact with the other.
    pub fn ignores(&self, a: ActorId, b: ActorId) -> bool {
        let (a, b) = (&self.actor(a).tags, &self.actor(b).tags);
        b.ignore.matches(a.tags) || a.ignore.matches(b.tags)
    }

    /// `b` refuses to be blocked by `a`.
    pub fn collision_ignores(&self, a: ActorId, b: ActorId) -> bool {
        self.actor(b).tags.collision_ignore.matches(self.actor(a).tags.tags)
    }

    pub fn should_die(&self, victim: ActorId, killer: ActorId) -> bool {
        let immune: TagRule = self.actor(victim).tags.immune;
        !(self.ignores(victim, killer)
            || immune.matches(self.actor(killer).tags.tags)
            || !hooks::should_die(self, victim, killer))
    }

    // ══════════════════════════════════════════════════════════════
    // Events and glitches
    // ══════════════════════════════════════════════════════════════

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn add_glitch(&mut self, kind: GlitchKind, position: Position) {
        let glitch = Glitch { kind, position, subtick: self.time() };
        debug!(?kind, x = position.x, y = position.y, at = glitch.subtick, "glitch");
        self.glitches.push(glitch);
        self.emit(GameEvent::Glitch(glitch));
        if kind.is_crashing() {
            self.game_state = GameState::Crash;
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Creation
    // ══════════════════════════════════════════════════════════════

    /// Creates an actor and places it. Custom data must already be valid
    /// for `kind`; malformed data falls back to the default state.
    pub fn spawn(&mut self, kind: ActorKind, position: Position, direction: Direction, custom: &str) -> ActorId {
        let state = kind.parse_custom(custom).unwrap_or_default();
        self.spawn_with(kind, position, direction, custom.to_string(), state)
    }

    pub fn spawn_with(
        &mut self,
        kind: ActorKind,
        position: Position,
        direction: Direction,
        custom: String,
        state: CustomState,
    ) -> ActorId {
        let id = ActorId(self.actors.len() as u32);
        let actor = Actor::new(id, kind, position, direction, custom, state);
        let deciding = actor.is_deciding;
        self.actors.push(actor);

        if self.level_started {
            self.order.insert(0, id);
            if deciding { self.deciding.insert(0, id); }
            if kind.is_playable() { self.playables.insert(0, id); }
        } else {
            self.order.push(id);
            if deciding { self.deciding.push(id); }
            if kind.is_playable() { self.playables.push(id); }
        }
        self.place(id);
        if kind.is_animation() {
            self.actor_mut(id).counter = ANIMATION_DURATION as u32;
            self.queued_despawns.push(QueuedDespawn { position, remaining: ANIMATION_DURATION, animation_only: None });
        }
        hooks::created(self, id);
        trace!(kind = kind.id(), x = position.x, y = position.y, "spawn");
        id
    }

    /// Puts an actor into its tile's layer slot, resolving overlap.
    pub fn place(&mut self, id: ActorId) {
        let (pos, layer, kind) = {
            let a = self.actor(id);
            (a.position, a.layer(), a.kind)
        };
        let occupant = self.grid.get(pos).and_then(|t| t.layer(layer).iter().copied().find(|&o| o != id));
        if let Some(occupant) = occupant {
            if self.kind(occupant).is_animation() {
                self.destroy(occupant, None, None);
            } else if kind == ActorKind::TntLit && layer == Layer::Movable {
                self.despawn(occupant);
                self.add_glitch(GlitchKind::DynamiteSneaking, pos);
            } else {
                self.despawn(occupant);
                self.add_glitch(GlitchKind::Despawn(DespawnSpecifier::Replace), pos);
            }
        }
        if let Some(tile) = self.grid.get_mut(pos) {
            if !tile.contains(id) {
                tile.add_actor(id, layer);
            }
        }
    }

    /// Takes an actor off `pos`. When the actor is not there but something
    /// else holds its slot, that occupant is despawned instead.
    pub fn remove_from_tile(&mut self, id: ActorId, pos: Position, was_despawned: bool) {
        let layer = self.actor(id).layer();
        let Some(tile) = self.grid.get_mut(pos) else { return };
        if tile.remove_actor(id, layer) { return; }
        if !was_despawned { return; }
        if let Some(occupant) = tile.top(layer) {
            self.despawn(occupant);
            self.add_glitch(GlitchKind::Despawn(DespawnSpecifier::Remove), pos);
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Despawn / respawn
    // ══════════════════════════════════════════════════════════════

    /// Removes an actor from its tile while it stays in the actor list.
    pub fn despawn(&mut self, id: ActorId) {
        if self.actor(id).despawned { return; }
        let (pos, layer) = {
            let a = self.actor(id);
            (a.position, a.layer())
        };
        self.actor_mut(id).despawned = true;
        self.despawned.push(id);
        if let Some(tile) = self.grid.get_mut(pos) {
            tile.remove_actor(id, layer);
        }
        debug!(kind = self.kind(id).id(), x = pos.x, y = pos.y, "despawn");
    }

    pub fn respawn(&mut self, id: ActorId, put_on_tile: bool) {
        if !self.actor(id).despawned { return; }
        self.actor_mut(id).despawned = false;
        self.despawned.retain(|&d| d != id);
        if put_on_tile {
            self.place(id);
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Destruction
    // ══════════════════════════════════════════════════════════════

    /// Destroys an actor. With a killer, refuses when the victim may not be
    /// killed by it. With an animation kind, leaves that animation behind
    /// when the tile has no movable. Returns whether the actor died.
    pub fn destroy(&mut self, id: ActorId, killer: Option<ActorId>, anim: Option<ActorKind>) -> bool {
        if !self.exists(id) { return false; }
        if let Some(killer) = killer {
            if !self.should_die(id, killer) { return false; }
        }
        let (pos, layer, kind) = {
            let a = self.actor(id);
            (a.position, a.layer(), a.kind)
        };

        self.order.retain(|&a| a != id);
        let deciding_pos = self.deciding.iter().position(|&a| a == id);
        if let Some(idx) = deciding_pos {
            self.deciding.remove(idx);
        }
        self.despawned.retain(|&a| a != id);
        self.wire_consumers.retain(|&a| a != id);
        if let Some(tile) = self.grid.get_mut(pos) {
            tile.remove_actor(id, layer);
        }
        self.actor_mut(id).exists = false;

        if let Some(anim_kind) = anim {
            if !self.has_movable(pos) {
                let (direction, cooldown, speed, inventory) = {
                    let a = self.actor(id);
                    (a.direction, a.cooldown, a.current_move_speed, a.inventory.clone())
                };
                let anim_id = self.spawn(anim_kind, pos, direction, "");
                if let Some(idx) = deciding_pos {
                    self.deciding.retain(|&a| a != anim_id);
                    let idx = idx.min(self.deciding.len());
                    self.deciding.insert(idx, anim_id);
                }
                let a = self.actor_mut(anim_id);
                a.direction = direction;
                a.cooldown = cooldown;
                a.current_move_speed = speed;
                a.inventory = inventory;
                self.actor_mut(id).new_actor = Some(anim_id);
            }
        }

        let witnesses = self.grid.get(pos).map(|t| t.occupants()).unwrap_or_default();
        for other in witnesses {
            hooks::actor_destroyed(self, other, id);
        }

        if kind.is_playable() {
            self.playables.retain(|&p| p != id);
            for seat in self.seats.iter_mut().filter(|s| s.playable == Some(id)) {
                seat.playable = None;
            }
            self.set_game_state(GameState::Lost);
        }
        self.emit(GameEvent::ActorDestroyed { kind, position: pos });
        trace!(kind = kind.id(), x = pos.x, y = pos.y, "destroy");
        true
    }

    /// Swaps an actor for a new kind on the same tile, keeping direction,
    /// inventory, custom data and deciding position.
    pub fn replace_with(&mut self, id: ActorId, kind: ActorKind) -> ActorId {
        let deciding_pos = self.deciding.iter().position(|&a| a == id);
        let (pos, direction, custom, inventory) = {
            let a = self.actor(id);
            (a.position, a.direction, a.custom.clone(), a.inventory.clone())
        };
        self.destroy(id, None, None);
        let state = kind.parse_custom(&custom).unwrap_or_default();
        let new_id = self.spawn_with(kind, pos, direction, custom, state);
        if self.actor(new_id).is_deciding {
            if let Some(idx) = deciding_pos {
                self.deciding.retain(|&a| a != new_id);
                let idx = idx.min(self.deciding.len());
                self.deciding.insert(idx, new_id);
            }
        }
        let new_actor = self.actor_mut(new_id);
        new_actor.inventory = inventory;
        new_actor.recompute_tags();
        self.actor_mut(id).new_actor = Some(new_id);
        new_id
    }

    /// Drops the oldest carried item onto the carrier's tile. Refused when
    /// the item layer is occupied.
    pub fn drop_item(&mut self, id: ActorId) -> bool {
        let (pos, despawned) = {
            let a = self.actor(id);
            (a.position, a.despawned)
        };
        let Some(item) = self.actor(id).inventory.last_item() else { return false };
        // Pocketed yellow teleports go back into the terrain, over floor only
        let floor = if item.layer() == Layer::Terrain {
            match self.top(pos, Layer::Terrain) {
                Some(t) if self.kind(t) == ActorKind::Floor => Some(t),
                _ => return false,
            }
        } else {
            if self.grid.get(pos).is_some_and(|t| t.has(item.layer())) { return false; }
            None
        };
        self.actor_mut(id).inventory.pop_last();
        if despawned {
            self.add_glitch(GlitchKind::DroppingWhileDespawned, pos);
        }
        if let Some(floor) = floor {
            self.replace_with(floor, item);
            self.actor_mut(id).recompute_tags();
            return true;
        }
        let direction = self.actor(id).direction;
        self.spawn(item, pos, direction, "");
        self.actor_mut(id).recompute_tags();
        true
    }

    // ══════════════════════════════════════════════════════════════
    // Game state and seats
    // ══════════════════════════════════════════════════════════════

    pub fn set_game_state(&mut self, state: GameState) {
        if self.game_state == GameState::Crash { return; }
        self.game_state = state;
    }

    /// Seat 0 takes the last playable in reading order, seat 1 the one
    /// before it, and so on.
    pub fn assign_seats(&mut self) {
        let n = self.playables.len();
        for (i, seat) in self.seats.iter_mut().enumerate() {
            seat.playable = if i < n { Some(self.playables[n - 1 - i]) } else { None };
        }
    }

    /// Moves seat 0 to the next playable. A vacant seat moves to the first.
    pub fn swap_playables(&mut self) {
        if self.playables.is_empty() { return; }
        let current = self.selected_playable();
        let idx = current.and_then(|c| self.playables.iter().position(|&p| p == c));
        let next = match idx {
            Some(i) => (i + 1) % self.playables.len(),
            None => 0,
        };
        if let Some(seat) = self.seats.first_mut() {
            seat.playable = Some(self.playables[next]);
        }
        self.emit(GameEvent::PlayablesSwapped);
    }
}
