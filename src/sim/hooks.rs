/// Per-kind hook dispatch.
///
/// Every hook is a free function taking the level and the handle of the
/// actor whose behaviour runs (`me`). Each one matches on `me`'s kind and
/// forwards to the behaviour module owning that kind; kinds without an
/// implementation fall through to the default (no-op, `false`, or `1`).
///
/// Hooks never hold a borrow of an actor across a call back into the level:
/// any hook may destroy or replace actors, so callers re-check `exists` and
/// follow `new_actor` afterwards.

use smallvec::SmallVec;

use crate::domain::actor::ActorId;
use crate::domain::direction::Direction;
use crate::domain::kind::{ActorKind, ButtonColor};
use super::behavior::{animations, blocks, buttons, items, monsters, playables, teleports, terrain, walls};
use super::level::LevelState;

/// Candidate directions, most preferred first.
pub type Candidates = SmallVec<[Direction; 4]>;

/// What an occupant does to a direction an actor tries to leave in.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Redirect {
    Pass,
    To(Direction),
    /// Exit-blocks on this side, even for redirect-only checks.
    Block,
}

// ══════════════════════════════════════════════════════════════
// Collision queries (read-only)
// ══════════════════════════════════════════════════════════════

/// Does `me` block `other` entering its tile in `dir`?
pub fn blocks(level: &LevelState, me: ActorId, other: ActorId, dir: Direction) -> bool {
    use ActorKind::*;
    let kind = level.kind(me);
    if kind.blocks_everything() {
        return true;
    }
    match kind {
        IceCorner => terrain::ice_corner_blocks(level, me, dir),
        EChipGate => level.chips_left != 0,
        CloneMachine => level.has_movable(level.actor(me).position),
        ThinWall | SwivelRotatingPart | ToggleWall | BlueWall | GreenWall => walls::blocks(level, me, other, dir),
        DoorRed | DoorBlue | DoorYellow | DoorGreen => walls::door_blocks(level, me, other),
        NoSign => items::no_sign_blocks(level, me, other, dir),
        k if k.is_pickup_item() => items::item_blocks(level, me, other),
        _ => false,
    }
}

/// Does `me` stop `other` from leaving its tile in `dir`?
pub fn exit_blocks(level: &LevelState, me: ActorId, _other: ActorId, dir: Direction) -> bool {
    match level.kind(me) {
        ActorKind::Trap => !terrain::trap_is_open(level, me),
        ActorKind::CloneMachine => !level.actor(me).toggled,
        ActorKind::ThinWall => dir == level.actor(me).direction,
        _ => false,
    }
}

pub fn redirect(level: &LevelState, me: ActorId, _other: ActorId, dir: Direction) -> Redirect {
    match level.kind(me) {
        ActorKind::IceCorner => terrain::ice_corner_redirect(level, me, dir),
        _ => Redirect::Pass,
    }
}

/// May `me` be pushed by `pusher`?
pub fn can_be_pushed(level: &LevelState, me: ActorId, _pusher: ActorId, _dir: Direction) -> bool {
    !terrain::on_closed_trap(level, me)
}

/// Returns false when `me` refuses to be killed by `killer`.
pub fn should_die(level: &LevelState, me: ActorId, killer: ActorId) -> bool {
    playables::should_die(level, me, killer)
}

/// Speed divisor `me` applies to `other` entering its tile.
pub fn speed_mod(level: &LevelState, me: ActorId, _other: ActorId) -> u32 {
    match level.kind(me) {
        ActorKind::Ice | ActorKind::IceCorner | ActorKind::ForceFloor | ActorKind::ForceFloorRandom => 2,
        _ => 1,
    }
}

/// Closed traps stop whoever stands on them from deciding.
pub fn vetoes_decision(level: &LevelState, me: ActorId, _other: ActorId) -> bool {
    level.kind(me) == ActorKind::Trap && !terrain::trap_is_open(level, me)
}

// ══════════════════════════════════════════════════════════════
// Collision notifications
// ══════════════════════════════════════════════════════════════

/// `other` bumped into `me`.
pub fn bumped(level: &mut LevelState, me: ActorId, other: ActorId, _dir: Direction) {
    use ActorKind::*;
    match level.kind(me) {
        k if k.is_monster() => monsters::bumped(level, me, other),
        InvisibleWall | AppearingWall | BlueWall => walls::bumped(level, me, other),
        IceBlock => blocks::melt(level, me, other),
        _ => {}
    }
}

/// `me` bumped into `other`.
pub fn bumped_actor(level: &mut LevelState, me: ActorId, other: ActorId, _dir: Direction) {
    let kind = level.kind(me);
    if kind.is_monster() || kind.is_block() {
        monsters::bumped(level, me, other);
    }
}

// ══════════════════════════════════════════════════════════════
// Tile membership
// ══════════════════════════════════════════════════════════════

/// `other` started leaving `me`'s tile.
pub fn actor_left(level: &mut LevelState, me: ActorId, other: ActorId) {
    use ActorKind::*;
    match level.kind(me) {
        PopupWall | Turtle => terrain::actor_left(level, me, other),
        ButtonRed | ButtonBrown | ButtonOrange => buttons::released(level, me),
        Tnt => items::tnt_left(level, me, other),
        SwivelRotatingPart => walls::swivel_turn(level, me, other),
        _ => {}
    }
}

/// `other` started entering `me`'s tile.
pub fn actor_joined(level: &mut LevelState, me: ActorId, other: ActorId) {
    use crate::domain::actor::SlidingState;
    if matches!(level.kind(me), ActorKind::Ice | ActorKind::IceCorner | ActorKind::TeleportBlue) {
        level.actor_mut(other).sliding = SlidingState::Strong;
    }
}

/// `other` finished entering `me`'s tile.
pub fn actor_completely_joined(level: &mut LevelState, me: ActorId, other: ActorId) {
    use ActorKind::*;
    match level.kind(me) {
        DoorRed | DoorBlue | DoorYellow | DoorGreen => walls::open_door(level, me, other),
        k if k.button_color().is_some() || k == ToggleSwitch => buttons::pressed(level, me, other),
        k if k.is_teleport() => teleports::arrive(level, me, other),
        k if k.is_pickup_item() => items::pick_up(level, me, other),
        Bomb | GreenBomb => items::bomb_joined(level, me, other),
        _ => terrain::actor_completely_joined(level, me, other),
    }
}

/// `other` finished leaving `me`'s tile. No kind reacts to this yet.
pub fn actor_completely_left(_level: &mut LevelState, _me: ActorId, _other: ActorId) {}

/// `other` finished entering `me`'s tile but ignores `me`. No kind reacts
/// to this yet.
pub fn actor_completely_joined_ignored(_level: &mut LevelState, _me: ActorId, _other: ActorId) {}

/// `other` rests on `me`'s tile (every settle subtick, and on arrival).
pub fn actor_on_tile(level: &mut LevelState, me: ActorId, other: ActorId) {
    if level.kind(me) == ActorKind::FlameJet {
        terrain::flame_jet_burn(level, me, other);
    }
}

/// `me` started entering a new tile.
pub fn new_tile_joined(level: &mut LevelState, me: ActorId) {
    if level.kind(me) == ActorKind::Blob {
        monsters::blob_spread(level, me);
    }
}

/// `me` finished entering a new tile.
pub fn new_tile_completely_joined(level: &mut LevelState, me: ActorId) {
    if level.kind(me).is_block() {
        blocks::settle(level, me);
    }
}

/// `destroyed` was removed from `me`'s tile.
pub fn actor_destroyed(level: &mut LevelState, me: ActorId, destroyed: ActorId) {
    if level.kind(me) == ActorKind::SwivelRotatingPart && level.kind(destroyed) == ActorKind::Swivel {
        level.destroy(me, None, None);
    }
}

/// A sliding `other` bonked while on `me`'s tile.
pub fn on_member_slide_bonked(level: &mut LevelState, me: ActorId, other: ActorId) {
    use crate::domain::actor::SlidingState;
    match level.kind(me) {
        ActorKind::Ice | ActorKind::IceCorner | ActorKind::ForceFloor | ActorKind::ForceFloorRandom => {
            terrain::slide_bonked(level, me, other)
        }
        k if k.is_teleport() => level.actor_mut(other).sliding = SlidingState::None,
        _ => {}
    }
}

/// Present at level start or on arrival of `other` before the first tick.
pub fn new_actor_on_tile(level: &mut LevelState, me: ActorId, other: ActorId) {
    use ActorKind::*;
    match level.kind(me) {
        ForceFloor | ForceFloorRandom | Trap | CloneMachine => terrain::new_actor_on_tile(level, me, other),
        Bomb => items::bomb_joined(level, me, other),
        _ => {}
    }
}

// ══════════════════════════════════════════════════════════════
// Carried items
// ══════════════════════════════════════════════════════════════
//
// Items in an inventory are kinds, not actors, so these dispatch on the
// item kind and hand over the carrier. No item overrides them yet.

/// Multiplier a carried `item` adds to its carrier's speed divisor.
pub fn carrier_speed_mod(_level: &LevelState, _item: ActorKind, _carrier: ActorId, _mult: u32) -> u32 {
    1
}

/// `carrier` bumped into `other` while holding `item`.
pub fn carrier_bump(_level: &mut LevelState, _item: ActorKind, _carrier: ActorId, _other: ActorId, _dir: Direction) {}

/// `carrier` finished entering a new tile while holding `item`.
pub fn carrier_completely_joined(_level: &mut LevelState, _item: ActorKind, _carrier: ActorId) {}

// ══════════════════════════════════════════════════════════════
// Decisions
// ══════════════════════════════════════════════════════════════

pub fn on_each_decision(level: &mut LevelState, me: ActorId, _forced_only: bool) {
    match level.kind(me) {
        k if k.is_animation() => animations::on_each_decision(level, me),
        ActorKind::TntLit => monsters::tnt_fuse(level, me),
        ActorKind::InvisibleWall => walls::fade(level, me),
        _ => {}
    }
}

pub fn decide_movement(level: &mut LevelState, me: ActorId) -> Candidates {
    if level.kind(me).is_monster() {
        return monsters::decide_movement(level, me);
    }
    Candidates::new()
}

// ══════════════════════════════════════════════════════════════
// Lifecycle
// ══════════════════════════════════════════════════════════════

/// Runs once per actor when the level starts.
pub fn level_started(level: &mut LevelState, me: ActorId) {
    use ActorKind::*;
    match level.kind(me) {
        ButtonRed | ButtonBrown | ButtonOrange => buttons::connect(level, me),
        Hint => terrain::assign_hint(level, me),
        Swivel => walls::attach_swivel_part(level, me),
        TeleportYellow => teleports::yellow_started(level, me),
        k if k.is_playable() => playables::level_started(level, me),
        _ => {}
    }
}

/// Runs on every spawn, at load and at runtime.
pub fn created(level: &mut LevelState, me: ActorId) {
    match level.kind(me) {
        ActorKind::EChip => {
            level.chips_left += 1;
            level.chips_total += 1;
            level.chips_required += 1;
        }
        ActorKind::EChipPlus => level.chips_total += 1,
        ActorKind::GreenBomb => {
            level.chips_left += 1;
            level.chips_total += 1;
            level.chips_required += 1;
        }
        ActorKind::Hint => level.hints_in_level += 1,
        _ => {}
    }
}

// ══════════════════════════════════════════════════════════════
// Buttons and wires
// ══════════════════════════════════════════════════════════════

pub fn button_pressed(level: &mut LevelState, me: ActorId, _color: ButtonColor, dir: Direction) {
    use ActorKind::*;
    match level.kind(me) {
        ToggleWall | GreenBomb | FlameJet => {
            let a = level.actor_mut(me);
            a.toggled = !a.toggled;
            a.recompute_tags();
        }
        TankBlue | TankYellow => monsters::tank_button(level, me, dir),
        CloneMachine => terrain::clone(level, me),
        Trap => level.actor_mut(me).counter += 1,
        _ => {}
    }
}

pub fn button_unpressed(level: &mut LevelState, me: ActorId, _color: ButtonColor) {
    match level.kind(me) {
        ActorKind::Trap => terrain::trap_release(level, me),
        ActorKind::FlameJet => {
            let a = level.actor_mut(me);
            a.toggled = !a.toggled;
            a.recompute_tags();
        }
        _ => {}
    }
}

/// Power state of `me`'s tile after a propagation pass.
pub fn receive_power(level: &mut LevelState, me: ActorId, powered: u8) {
    if level.kind(me) == ActorKind::Trap {
        terrain::trap_powered(level, me, powered != 0);
    }
}

pub fn on_wire_high(level: &mut LevelState, me: ActorId) {
    match level.kind(me) {
        ActorKind::CloneMachine => terrain::clone(level, me),
        ActorKind::FlameJet => {
            let a = level.actor_mut(me);
            a.toggled = !a.toggled;
            a.recompute_tags();
        }
        _ => {}
    }
}

pub fn on_wire_low(level: &mut LevelState, me: ActorId) {
    if level.kind(me) == ActorKind::FlameJet {
        let a = level.actor_mut(me);
        a.toggled = !a.toggled;
        a.recompute_tags();
    }
}
