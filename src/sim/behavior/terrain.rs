/// Floors and hazards: ice, force floors, water, fire, traps, clone
/// machines, exits, thieves, slime, flame jets and friends.

use tracing::debug;

use crate::domain::actor::{ActorId, SlidingState};
use crate::domain::direction::Direction;
use crate::domain::kind::ActorKind;
use crate::domain::tags::{Tag, TagRule};
use crate::domain::tile::Layer;
use crate::sim::event::GameEvent;
use crate::sim::hooks::Redirect;
use crate::sim::level::{GameState, LevelState};
use crate::sim::movement::{self, CheckMode};

// ══════════════════════════════════════════════════════════════
// Ice
// ══════════════════════════════════════════════════════════════

/// Corners only let actors in moving along their facing or one turn right.
pub fn ice_corner_blocks(level: &LevelState, me: ActorId, dir: Direction) -> bool {
    let facing = level.actor(me).direction;
    !(dir == facing || dir == facing.right())
}

/// The two walled sides of a corner stop exits through them.
pub fn ice_corner_redirect(level: &LevelState, me: ActorId, dir: Direction) -> Redirect {
    let facing = level.actor(me).direction;
    if dir == facing || dir == facing.right() {
        return Redirect::Block;
    }
    Redirect::Pass
}

/// `(facing - dir) * 2 + offset`, turned onto the compass.
fn corner_turn(facing: Direction, dir: Direction, offset: i32) -> Direction {
    let (f, d) = (facing.index() as i32, dir.index() as i32);
    let turned = (d + (f - d) * 2 + offset).rem_euclid(4);
    Direction::from_index(turned as u32)
}

pub fn slide_bonked(level: &mut LevelState, me: ActorId, other: ActorId) {
    let facing = level.actor(me).direction;
    let kind = level.kind(me);
    let a = level.actor_mut(other);
    match kind {
        ActorKind::Ice => a.direction = a.direction.back(),
        // o - ((f - o) * 2 - 5)
        ActorKind::IceCorner => {
            let (f, o) = (facing.index() as i32, a.direction.index() as i32);
            a.direction = Direction::from_index((o - (f - o) * 2 + 5).rem_euclid(4) as u32);
        }
        // One extra subtick of cooldown per bonk
        _ => a.cooldown += 1,
    }
}

// ══════════════════════════════════════════════════════════════
// Traps and clone machines
// ══════════════════════════════════════════════════════════════

/// Open while any linked button is held or its tile is powered.
#[inline]
pub fn trap_is_open(level: &LevelState, me: ActorId) -> bool {
    let trap = level.actor(me);
    trap.counter > 0 || trap.toggled
}

/// Is `me` a movable held by a closed trap?
pub fn on_closed_trap(level: &LevelState, me: ActorId) -> bool {
    let a = level.actor(me);
    if a.layer() != Layer::Movable { return false; }
    level
        .top(a.position, Layer::Terrain)
        .is_some_and(|t| level.kind(t) == ActorKind::Trap && !trap_is_open(level, t))
}

fn trap_hold(level: &mut LevelState, me: ActorId) {
    if trap_is_open(level, me) { return; }
    let pos = level.actor(me).position;
    let held: Vec<ActorId> = level.tile(pos).map(|t| t.layer(Layer::Movable).to_vec()).unwrap_or_default();
    for m in held {
        level.actor_mut(m).sliding = SlidingState::Weak;
    }
}

pub fn trap_release(level: &mut LevelState, me: ActorId) {
    let t = level.actor_mut(me);
    t.counter = t.counter.saturating_sub(1);
    trap_hold(level, me);
}

pub fn trap_powered(level: &mut LevelState, me: ActorId, powered: bool) {
    level.actor_mut(me).toggled = powered;
    trap_hold(level, me);
}

/// Clones every movable on the machine that can step out.
pub fn clone(level: &mut LevelState, me: ActorId) {
    let pos = level.actor(me).position;
    level.actor_mut(me).toggled = true;
    let clonees: Vec<ActorId> = level.tile(pos).map(|t| t.layer(Layer::Movable).to_vec()).unwrap_or_default();
    for clonee in clonees {
        let (kind, dir, custom) = {
            let c = level.actor(clonee);
            (c.kind, c.direction, c.custom.clone())
        };
        if !movement::check_collision(level, clonee, pos, dir, CheckMode::PUSH).0 { continue; }
        if !movement::step(level, clonee, dir) { continue; }
        let copy = level.spawn(kind, pos, dir, &custom);
        level.actor_mut(copy).direction = dir;
        debug!(kind = kind.id(), x = pos.x, y = pos.y, "cloned");
    }
    level.actor_mut(me).toggled = false;
}

// ══════════════════════════════════════════════════════════════
// Arrival
// ══════════════════════════════════════════════════════════════

/// On-start and completely-joined behaviour shared by force floors, traps
/// and clone machines.
pub fn new_actor_on_tile(level: &mut LevelState, me: ActorId, other: ActorId) {
    match level.kind(me) {
        ActorKind::ForceFloor | ActorKind::ForceFloorRandom => {
            if level.actor(other).layer() != Layer::Movable { return; }
            let dir = if level.kind(me) == ActorKind::ForceFloorRandom {
                let d = level.rff_direction;
                level.rff_direction = d.right();
                d
            } else {
                level.actor(me).direction
            };
            let a = level.actor_mut(other);
            a.sliding = SlidingState::Weak;
            a.direction = dir;
        }
        ActorKind::Trap => {
            if !trap_is_open(level, me) {
                level.actor_mut(other).sliding = SlidingState::Weak;
            }
        }
        ActorKind::CloneMachine => level.actor_mut(other).sliding = SlidingState::Strong,
        _ => {}
    }
}

pub fn actor_completely_joined(level: &mut LevelState, me: ActorId, other: ActorId) {
    use ActorKind::*;
    let kind = level.kind(me);
    let pos = level.actor(me).position;
    match kind {
        IceCorner => {
            let facing = level.actor(me).direction;
            let a = level.actor_mut(other);
            a.direction = corner_turn(facing, a.direction, 3);
        }
        ForceFloor | ForceFloorRandom | Trap | CloneMachine => new_actor_on_tile(level, me, other),
        Void => {
            level.destroy(other, Some(me), None);
        }
        Water => {
            if !level.actor(other).has_tag(Tag::Block) {
                level.destroy(other, Some(me), Some(Splash));
            }
        }
        Fire => {
            if !level.actor(other).has_tag(Tag::Block) {
                level.destroy(other, Some(me), Some(Explosion));
            }
        }
        Dirt => {
            level.replace_with(me, Floor);
        }
        Exit => {
            if !level.kind(other).is_playable() { return; }
            level.destroy(other, None, None);
            level.set_game_state(GameState::Playing);
            level.playables_left -= 1;
            level.swap_pending = true;
            level.emit(GameEvent::PlayableExited { position: pos });
            if level.playables_left <= 0 {
                level.set_game_state(GameState::Won);
            }
        }
        EChipGate => {
            if level.chips_left == 0 {
                level.replace_with(me, Floor);
            }
        }
        Hint => {
            if !level.kind(other).is_playable() { return; }
            if let Some(text) = level.actor(me).hint.clone() {
                level.emit(GameEvent::HintShown { position: pos, text });
            }
        }
        ThiefTool | ThiefKey => {
            if !level.kind(other).is_playable() { return; }
            let a = level.actor_mut(other);
            if kind == ThiefTool {
                a.inventory.clear_items();
                a.recompute_tags();
            } else {
                a.inventory.clear_keys();
            }
            level.bonus_points /= 2;
        }
        Slime => {
            const SURVIVES: TagRule = TagRule::any(&[Tag::Block, Tag::ClearsSlime]);
            let tags = level.actor(other).tags.tags;
            if tags.contains(Tag::DiesInSlime) || !SURVIVES.matches(tags) {
                level.destroy(other, Some(me), Some(Splash));
            } else {
                level.replace_with(me, Floor);
            }
        }
        _ => {}
    }
}

pub fn actor_left(level: &mut LevelState, me: ActorId, _other: ActorId) {
    match level.kind(me) {
        ActorKind::PopupWall => {
            level.replace_with(me, ActorKind::Wall);
        }
        ActorKind::Turtle => {
            let pos = level.actor(me).position;
            level.destroy(me, None, Some(ActorKind::Splash));
            level.spawn(ActorKind::Water, pos, Direction::Up, "");
        }
        _ => {}
    }
}

pub fn assign_hint(level: &mut LevelState, me: ActorId) {
    level.hints_in_level = level.hints_in_level.saturating_sub(1);
    let idx = level.hints_in_level as usize;
    let hint = level.hints.get(idx).cloned().or_else(|| level.default_hint.clone());
    level.actor_mut(me).hint = hint;
}

// ══════════════════════════════════════════════════════════════
// Flame jets
// ══════════════════════════════════════════════════════════════

pub fn flame_jet_burn(level: &mut LevelState, me: ActorId, other: ActorId) {
    if !level.actor(me).toggled { return; }
    if level.actor(other).layer() != Layer::Movable { return; }
    level.destroy(other, Some(me), Some(ActorKind::Explosion));
}

/// Game-of-life step over every flame jet: three burning neighbours light
/// a jet, two keep it, anything else puts it out.
pub fn jetlife(level: &mut LevelState) {
    let jets: Vec<ActorId> = level.order.iter().copied().filter(|&a| level.kind(a) == ActorKind::FlameJet).collect();
    let mut updates = Vec::new();
    for jet in jets {
        let pos = level.actor(jet).position;
        let mut neighbours = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 { continue; }
                let Some(n) = level.grid.offset(pos, (dx, dy)) else { continue };
                let Some(tile) = level.tile(n) else { continue };
                neighbours += tile.all().iter().filter(|&&a| level.actor(a).has_tag(Tag::Fire)).count();
            }
        }
        match neighbours {
            3 => updates.push((jet, true)),
            2 => {}
            _ => updates.push((jet, false)),
        }
    }
    for (jet, on) in updates {
        let a = level.actor_mut(jet);
        a.toggled = on;
        a.recompute_tags();
    }
}
