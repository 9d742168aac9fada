/// Snapshots of the observable level state.
///
/// A snapshot holds everything a replay verifier compares between two runs:
/// time, counters, RNG state, every live actor and the powered wire mask of
/// every tile. Internal bookkeeping (hook scratch flags, queues drained
/// within a subtick) is left out.
///
/// Snapshots are written as JSON.

use std::path::Path;

use serde::Serialize;

use crate::domain::actor::SlidingState;
use crate::domain::direction::Direction;
use crate::domain::inventory::Inventory;
use crate::domain::kind::ActorKind;
use crate::domain::rng::LevelRng;
use crate::domain::tile::Position;
use super::event::Glitch;
use super::level::{GameState, LevelState};

// ══════════════════════════════════════════════════════════════
// Public types
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub subtick: u8,
    pub state: GameState,
    pub time_left: u32,
    pub chips_left: u32,
    pub bonus_points: u64,
    pub rng: LevelRng,
    pub rff_direction: Direction,
    pub selected: Option<usize>,
    /// Live actors in actor order.
    pub actors: Vec<ActorSnapshot>,
    /// `powered_wires` per tile in reading order.
    pub powered: Vec<u8>,
    pub glitches: Vec<Glitch>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActorSnapshot {
    pub kind: ActorKind,
    pub position: Position,
    pub direction: Direction,
    pub cooldown: u32,
    pub sliding: SlidingState,
    pub toggled: bool,
    pub counter: u32,
    pub despawned: bool,
    #[serde(skip_serializing_if = "Inventory::is_empty")]
    pub inventory: Inventory,
}

// ══════════════════════════════════════════════════════════════
// Capture
// ══════════════════════════════════════════════════════════════

pub fn capture(level: &LevelState) -> Snapshot {
    let actors = level
        .order
        .iter()
        .map(|&id| {
            let a = level.actor(id);
            ActorSnapshot {
                kind: a.kind,
                position: a.position,
                direction: a.direction,
                cooldown: a.cooldown,
                sliding: a.sliding,
                toggled: a.toggled,
                counter: a.counter,
                despawned: a.despawned,
                inventory: a.inventory.clone(),
            }
        })
        .collect();
    let selected = level.selected_playable().and_then(|p| level.order.iter().position(|&a| a == p));
    Snapshot {
        tick: level.current_tick,
        subtick: level.subtick,
        state: level.game_state,
        time_left: level.time_left,
        chips_left: level.chips_left,
        bonus_points: level.bonus_points,
        rng: level.rng.clone(),
        rff_direction: level.rff_direction,
        selected,
        actors,
        powered: level.grid.iter().map(|t| t.powered_wires).collect(),
        glitches: level.glitches.clone(),
    }
}

impl Snapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let text = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::input::KeyInputs;
    use crate::sim::loader;
    use crate::sim::replay::SeedTriple;
    use crate::sim::step;

    fn corridor() -> LevelState {
        let desc = loader::from_diagram(&["P.B.#"], &[('P', "floor chip:r")]).expect("diagram");
        loader::load(&desc, SeedTriple::default()).expect("load")
    }

    #[test]
    fn capture_lists_live_actors() {
        let level = corridor();
        let snap = capture(&level);
        assert_eq!(snap.actors.len(), 7);
        assert_eq!(snap.actors[0].kind, ActorKind::Chip);
        assert_eq!(snap.selected, Some(0));
        assert_eq!(snap.powered.len(), 5);
    }

    #[test]
    fn snapshots_diverge_with_input() {
        let mut a = corridor();
        let mut b = corridor();
        for _ in 0..3 {
            a.seats[0].input = KeyInputs::toward(Direction::Right);
            step::tick(&mut a);
            step::tick(&mut b);
        }
        assert_ne!(capture(&a), capture(&b));
        assert_eq!(capture(&a).tick, capture(&b).tick);
    }

    #[test]
    fn json_names_kinds_by_id() {
        let json = capture(&corridor()).to_json().expect("json");
        assert!(json.contains("\"chip\""));
        assert!(json.contains("\"dirtBlock\""));
        assert!(!json.contains("\"items\""));
    }
}
