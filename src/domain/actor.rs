/// Actor records.
///
/// An actor is a plain record in the level's arena. Everything that needs
/// the rest of the level (collision, hooks, lifecycle) lives in `sim`; here
/// are only the fields, the handle type and the tag recomputation.

use serde::Serialize;

use super::direction::Direction;
use super::inventory::Inventory;
use super::kind::{ActorKind, CustomState};
use super::tags::{Tag, TagRules};
use super::tile::{Layer, Position};
use super::wires::GateMemory;

/// Stable handle into the level's actor arena. Never reused within a level.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize)]
pub struct ActorId(pub u32);

/// Sliding state. Playables can steer out of weak sliding.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
pub enum SlidingState {
    #[default]
    None,
    /// Force floors, traps, red and yellow teleports.
    Weak,
    /// Ice, clone machines, blue and green teleports.
    Strong,
}

#[derive(Clone, Debug)]
pub struct Actor {
    pub id: ActorId,
    pub kind: ActorKind,
    pub position: Position,
    pub old_position: Option<Position>,
    pub direction: Direction,

    // ── Per-kind state ──
    pub custom: String,
    pub toggled: bool,
    pub counter: u32,
    /// Button target, or the rotating part of a swivel.
    pub link: Option<ActorId>,
    pub hint: Option<String>,
    pub gate: GateMemory,

    // ── Movement ──
    pub tags: TagRules,
    pub sliding: SlidingState,
    pub cooldown: u32,
    pub current_move_speed: Option<u32>,
    pub move_decision: Option<Direction>,
    pub pending_decision: Option<Direction>,
    pub pending_decision_locked_in: bool,
    pub bonked: bool,
    pub is_pushing: bool,
    pub is_pulled: bool,
    /// Playables only: may steer out of weak sliding.
    pub has_override: bool,

    // ── Lifecycle ──
    pub despawned: bool,
    pub exists: bool,
    pub is_deciding: bool,
    pub inventory: Inventory,
    /// Set when this actor was replaced or left an animation behind; hook
    /// loops continue with the replacement.
    pub new_actor: Option<ActorId>,
    pub created_n: u32,
}

impl Actor {
    pub fn new(id: ActorId, kind: ActorKind, position: Position, direction: Direction, custom: String, state: CustomState) -> Self {
        let mut actor = Actor {
            id,
            kind,
            position,
            old_position: None,
            direction,
            custom,
            toggled: state.toggled,
            counter: state.counter,
            link: None,
            hint: None,
            gate: GateMemory::default(),
            tags: kind.tag_rules(),
            sliding: SlidingState::None,
            cooldown: 0,
            current_move_speed: None,
            move_decision: None,
            pending_decision: None,
            pending_decision_locked_in: false,
            bonked: false,
            is_pushing: false,
            is_pulled: false,
            has_override: false,
            despawned: false,
            exists: true,
            is_deciding: kind.is_deciding(),
            inventory: Inventory::default(),
            new_actor: None,
            created_n: id.0,
        };
        if kind == ActorKind::GateCounter {
            actor.gate.value = state.counter.min(9) as u8;
        }
        actor.recompute_tags();
        actor
    }

    #[inline]
    pub fn layer(&self) -> Layer {
        self.kind.layer()
    }

    #[inline]
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.tags.contains(tag)
    }

    #[inline]
    pub fn move_speed(&self) -> u32 {
        self.kind.move_speed()
    }

    /// Mid-move: still travelling between tiles.
    #[inline]
    pub fn is_moving(&self) -> bool {
        self.cooldown > 0 && self.move_speed() > 0
    }

    /// Own kind rules plus everything carried.
    pub fn recompute_tags(&mut self) {
        let mut rules = self.kind.tag_rules().union(self.inventory.carrier_rules());
        if self.kind == ActorKind::FlameJet && self.toggled {
            rules.tags.insert(Tag::Fire);
        }
        self.tags = rules;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(kind: ActorKind, custom: &str) -> Actor {
        let state = kind.parse_custom(custom).unwrap_or_default();
        Actor::new(ActorId(0), kind, Position::new(0, 0), Direction::Up, custom.to_string(), state)
    }

    #[test]
    fn boots_change_complete_tags() {
        let mut chip = make(ActorKind::Chip, "");
        assert!(!chip.tags.ignore.matches(ActorKind::Water.tag_rules().tags));
        chip.inventory.push_item(ActorKind::BootWater);
        chip.recompute_tags();
        assert!(chip.tags.ignore.matches(ActorKind::Water.tag_rules().tags));
        assert!(chip.has_tag(Tag::Playable));
    }

    #[test]
    fn lit_flame_jet_burns() {
        let on = make(ActorKind::FlameJet, "on");
        let off = make(ActorKind::FlameJet, "off");
        assert!(on.has_tag(Tag::Fire));
        assert!(!off.has_tag(Tag::Fire));
    }

    #[test]
    fn counter_gate_starts_from_custom_value() {
        let gate = make(ActorKind::GateCounter, "7");
        assert_eq!(gate.gate.value, 7);
    }

    #[test]
    fn resting_actor_is_not_moving() {
        let mut chip = make(ActorKind::Chip, "");
        assert!(!chip.is_moving());
        chip.cooldown = 3;
        assert!(chip.is_moving());
    }
}
