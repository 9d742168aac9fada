/// Teleports.
///
/// Destinations are found by scanning the grid in reading order from the
/// source, wrapping at the end; blue teleports scan backwards. Reaching the
/// source again means no other teleport qualified and the actor comes out
/// where it went in.
///
/// | Colour | Scan     | Exit sliding | Notes                                  |
/// |--------|----------|--------------|----------------------------------------|
/// | Blue   | backward | strong       | wired ones only reach their circuit    |
/// | Red    | forward  | weak         | idle while wired and unpowered         |
/// | Green  | random   | strong       | random start, random exit direction    |
/// | Yellow | forward  | weak         | picked up when no other one qualifies  |

use std::collections::HashSet;

use crate::domain::actor::{ActorId, SlidingState};
use crate::domain::direction::Direction;
use crate::domain::kind::ActorKind;
use crate::domain::tags::Tag;
use crate::domain::tile::{Layer, Position};
use crate::sim::event::GameEvent;
use crate::sim::level::LevelState;
use crate::sim::movement::{self, CheckMode};

// ══════════════════════════════════════════════════════════════
// Search
// ══════════════════════════════════════════════════════════════

/// Every other teleport of `me`'s kind, in scan order from `me`.
fn scan(level: &LevelState, me: ActorId, forward: bool) -> Vec<ActorId> {
    let (kind, pos) = {
        let a = level.actor(me);
        (a.kind, a.position)
    };
    let n = level.grid.len();
    let start = level.grid.index_of(pos);
    let mut found = Vec::new();
    for step in 1..n {
        let idx = if forward { (start + step) % n } else { (start + n - step) % n };
        let Some(tile) = level.tile(level.grid.position_at(idx)) else { continue };
        if let Some(&tp) = tile.all().iter().find(|&&a| level.kind(a) == kind) {
            found.push(tp);
        }
    }
    found
}

fn find_next(
    level: &mut LevelState,
    me: ActorId,
    forward: bool,
    mut valid: impl FnMut(&mut LevelState, ActorId) -> bool,
) -> ActorId {
    for tp in scan(level, me, forward) {
        if valid(level, tp) {
            return tp;
        }
    }
    me
}

/// Can `other` leave `tp` the way it faces?
fn exit_clear(level: &mut LevelState, other: ActorId, tp: Position) -> bool {
    if level.has_movable(tp) { return false; }
    let dir = level.actor(other).direction;
    movement::check_collision(level, other, tp, dir, CheckMode::QUERY).0
}

/// Turns `other` clockwise until it can leave `tp`. Restores the facing
/// when no side is open.
fn rotate_until_clear(level: &mut LevelState, other: ActorId, tp: Position) -> bool {
    for _ in 0..4 {
        let dir = level.actor(other).direction;
        if movement::check_collision(level, other, tp, dir, CheckMode::QUERY).0 {
            return true;
        }
        level.actor_mut(other).direction = dir.right();
    }
    false
}

#[inline]
fn wired(level: &LevelState, tp: ActorId) -> bool {
    level.tile_of(tp).is_some_and(|t| t.is_wired)
}

#[inline]
fn powered(level: &LevelState, tp: ActorId) -> bool {
    level.tile_of(tp).is_some_and(|t| t.powered_wires != 0)
}

fn circuits_of(level: &LevelState, tp: ActorId) -> HashSet<usize> {
    level.tile_of(tp).map(|t| t.circuits.iter().flatten().copied().collect()).unwrap_or_default()
}

/// Moves `other` onto the destination teleport's tile.
fn teleport_to(level: &mut LevelState, other: ActorId, dest: ActorId) {
    let to = level.actor(dest).position;
    let from = level.actor(other).position;
    {
        let a = level.actor_mut(other);
        a.old_position = Some(from);
        a.position = to;
    }
    movement::update_tile_states(level, other, Some(from));
    level.emit(GameEvent::Teleported { from, to });
}

// ══════════════════════════════════════════════════════════════
// Arrival
// ══════════════════════════════════════════════════════════════

pub fn arrive(level: &mut LevelState, me: ActorId, other: ActorId) {
    match level.kind(me) {
        ActorKind::TeleportBlue => blue(level, me, other),
        ActorKind::TeleportRed => red(level, me, other),
        ActorKind::TeleportGreen => green(level, me, other),
        ActorKind::TeleportYellow => yellow(level, me, other),
        _ => {}
    }
}

fn blue(level: &mut LevelState, me: ActorId, other: ActorId) {
    let network = wired(level, me).then(|| circuits_of(level, me));
    let dest = find_next(level, me, false, |level, tp| {
        let same_network = match &network {
            Some(mine) => circuits_of(level, tp).iter().any(|c| mine.contains(c)),
            None => !wired(level, tp),
        };
        let pos = level.actor(tp).position;
        same_network && exit_clear(level, other, pos)
    });
    teleport_to(level, other, dest);
    let a = level.actor_mut(other);
    a.sliding = SlidingState::Strong;
    a.pending_decision = Some(a.direction);
}

fn red(level: &mut LevelState, me: ActorId, other: ActorId) {
    if wired(level, me) && !powered(level, me) { return; }
    let dest = find_next(level, me, true, |level, tp| {
        if wired(level, tp) && !powered(level, tp) { return false; }
        let pos = level.actor(tp).position;
        !level.has_movable(pos) && rotate_until_clear(level, other, pos)
    });
    teleport_to(level, other, dest);
    let a = level.actor_mut(other);
    a.sliding = SlidingState::Weak;
    if a.kind.is_playable() {
        a.has_override = true;
    }
}

fn green(level: &mut LevelState, me: ActorId, other: ActorId) {
    let others = scan(level, me, true);
    let mut target = me;
    if !others.is_empty() {
        let mut valid: Vec<ActorId> = vec![me];
        valid.extend(others.iter().copied().filter(|&tp| !level.has_movable(level.actor(tp).position)));
        let idx = (level.rng.random() as usize % others.len()) % valid.len();
        valid.rotate_left(idx + 1);
        let facing = Direction::from_index(level.rng.random() as u32);
        level.actor_mut(other).direction = facing;
        for tp in valid {
            let pos = level.actor(tp).position;
            if rotate_until_clear(level, other, pos) {
                target = tp;
                break;
            }
        }
    }
    teleport_to(level, other, target);
    level.actor_mut(other).sliding = SlidingState::Strong;
}

fn yellow(level: &mut LevelState, me: ActorId, other: ActorId) {
    let dest = find_next(level, me, true, |level, tp| {
        let pos = level.actor(tp).position;
        exit_clear(level, other, pos)
    });
    if dest == me && level.actor(me).toggled {
        pick_up(level, me, other);
        return;
    }
    teleport_to(level, other, dest);
    let a = level.actor_mut(other);
    a.sliding = SlidingState::Weak;
    if a.kind.is_playable() {
        a.has_override = true;
    }
}

/// A stranded yellow teleport goes into the arriving actor's pocket.
fn pick_up(level: &mut LevelState, me: ActorId, other: ActorId) {
    if level.actor(other).has_tag(Tag::CanStandOnItems) { return; }
    let pos = level.actor(me).position;
    level.replace_with(me, ActorKind::Floor);
    if level.actor_mut(other).inventory.push_item(ActorKind::TeleportYellow) {
        level.drop_item(other);
    }
    level.actor_mut(other).recompute_tags();
    level.emit(GameEvent::ItemPicked { kind: ActorKind::TeleportYellow, position: pos });
}

/// Only pocketable when another yellow teleport exists at start.
pub fn yellow_started(level: &mut LevelState, me: ActorId) {
    let alone = scan(level, me, true).is_empty();
    level.actor_mut(me).toggled = !alone;
}

/// Whether the terrain at `pos` is a teleport of `kind`.
pub fn is_teleport_tile(level: &LevelState, pos: Position, kind: ActorKind) -> bool {
    level.top(pos, Layer::Terrain).is_some_and(|t| level.kind(t) == kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rng::LevelRng;
    use crate::sim::loader::LevelMetadata;

    fn row(kinds: &[ActorKind]) -> LevelState {
        let mut level = LevelState::new(kinds.len() as u32, 1, LevelMetadata::default(), LevelRng::default());
        for (x, &k) in kinds.iter().enumerate() {
            level.spawn(k, Position::new(x as u32, 0), Direction::Up, "");
        }
        level.level_started = true;
        level
    }

    #[test]
    fn blue_goes_backward_in_reading_order() {
        use ActorKind::*;
        let mut level = row(&[TeleportBlue, Floor, TeleportBlue, Floor, TeleportBlue, Floor]);
        let source = level.top(Position::new(4, 0), Layer::Terrain).expect("tp");
        let chip = level.spawn(Chip, Position::new(4, 0), Direction::Right, "");
        arrive(&mut level, source, chip);
        assert_eq!(level.actor(chip).position, Position::new(2, 0));
        assert_eq!(level.actor(chip).sliding, SlidingState::Strong);
        assert_eq!(level.actor(chip).pending_decision, Some(Direction::Right));
    }

    #[test]
    fn red_skips_blocked_exits() {
        use ActorKind::*;
        let mut level = row(&[TeleportRed, Floor, TeleportRed, Wall]);
        let source = level.top(Position::new(0, 0), Layer::Terrain).expect("tp");
        let chip = level.spawn(Chip, Position::new(0, 0), Direction::Right, "");
        arrive(&mut level, source, chip);
        // (2,0) faces a wall to the right; it rotates until it finds the open left side
        assert_eq!(level.actor(chip).position, Position::new(2, 0));
        assert_eq!(level.actor(chip).direction, Direction::Left);
        assert!(level.actor(chip).has_override);
    }

    #[test]
    fn lone_yellow_is_not_pocketed() {
        use ActorKind::*;
        let mut level = row(&[TeleportYellow, Floor]);
        let tp = level.top(Position::new(0, 0), Layer::Terrain).expect("tp");
        yellow_started(&mut level, tp);
        let chip = level.spawn(Chip, Position::new(0, 0), Direction::Right, "");
        arrive(&mut level, tp, chip);
        assert!(level.exists(tp));
        assert!(!level.actor(chip).inventory.has_item(TeleportYellow));
    }

    #[test]
    fn stranded_yellow_is_pocketed() {
        use ActorKind::*;
        let mut level = row(&[TeleportYellow, Wall, TeleportYellow, Wall]);
        let tp = level.top(Position::new(0, 0), Layer::Terrain).expect("tp");
        yellow_started(&mut level, tp);
        let chip = level.spawn(Chip, Position::new(0, 0), Direction::Right, "");
        arrive(&mut level, tp, chip);
        assert!(level.actor(chip).inventory.has_item(TeleportYellow));
        assert!(level.terrain_is(Position::new(0, 0), Floor));
        assert!(is_teleport_tile(&level, Position::new(2, 0), TeleportYellow));
    }
}
