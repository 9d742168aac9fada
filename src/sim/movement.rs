/// Actor state machine: decide, collide, step, settle.
///
/// ## Collision modes
///
/// | Mode       | exit phase | enter phase | pushes | pulls |
/// |------------|------------|-------------|--------|-------|
/// | `QUERY`    | yes        | yes         | no     | no    |
/// | `PUSH`     | yes        | yes         | yes    | no    |
/// | `STEP`     | yes        | yes         | yes    | yes   |
/// | `REDIRECT` | redirects  | no          | no     | no    |
///
/// A query still fires bump hooks and still queues pushes onto sliding
/// blocks; it only refrains from moving anything.
///
/// ## Hook re-entry
///
/// Every hook may destroy or replace actors, including the one moving.
/// After each hook call the mover is re-checked with `exists` and its
/// replacement followed with `LevelState::follow`.

use smallvec::SmallVec;
use tracing::trace;

use crate::domain::actor::{ActorId, SlidingState};
use crate::domain::direction::Direction;
use crate::domain::tags::Tag;
use crate::domain::tile::{Layer, Position};
use super::behavior::playables;
use super::hooks::{self, Redirect};
use super::level::LevelState;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CheckMode {
    /// Only run exit-tile redirects.
    pub redirect_only: bool,
    /// Actually step pushed blocks.
    pub push: bool,
    /// Pull the block behind (hook carriers).
    pub pull: bool,
}

impl CheckMode {
    pub const QUERY: CheckMode = CheckMode { redirect_only: false, push: false, pull: false };
    pub const PUSH: CheckMode = CheckMode { redirect_only: false, push: true, pull: false };
    pub const STEP: CheckMode = CheckMode { redirect_only: false, push: true, pull: true };
    pub const REDIRECT: CheckMode = CheckMode { redirect_only: true, push: false, pull: false };
}

// ══════════════════════════════════════════════════════════════
// Relations
// ══════════════════════════════════════════════════════════════

/// Does `blocker` stop `mover` entering its tile in `dir`?
pub fn blocks(level: &LevelState, blocker: ActorId, mover: ActorId, dir: Direction) -> bool {
    if blocker == mover { return false; }
    let b = level.actor(blocker);
    // Anything mid-move occupies its destination
    if b.cooldown > 0 && b.move_speed() > 0 {
        return true;
    }
    if level.collision_ignores(blocker, mover) { return false; }
    let a = level.actor(mover);
    hooks::blocks(level, blocker, mover, dir) || b.tags.block.matches(a.tags.tags) || a.tags.blocked_by.matches(b.tags.tags)
}

/// May `pusher` push `target` in `dir`?
pub fn can_push(level: &mut LevelState, pusher: ActorId, target: ActorId, dir: Direction) -> bool {
    {
        let (p, t) = (level.actor(pusher), level.actor(target));
        if !p.tags.push.matches(t.tags.tags) { return false; }
        if t.pending_decision_locked_in { return false; }
    }
    if !hooks::can_be_pushed(level, target, pusher, dir) { return false; }
    let from = level.actor(target).position;
    check_collision(level, target, from, dir, CheckMode::REDIRECT).0
}

/// Product of the speed divisors of everything on `pos` that `mover`
/// does not ignore.
pub fn speed_mod(level: &LevelState, pos: Position, mover: ActorId) -> u32 {
    let Some(tile) = level.tile(pos) else { return 1 };
    tile.all()
        .iter()
        .filter(|&&o| o != mover && !level.ignores(mover, o))
        .map(|&o| hooks::speed_mod(level, o, mover))
        .product::<u32>()
        .max(1)
}

/// Folds the carrier's items into the tile divisor `mult`.
pub fn carried_speed_mod(level: &LevelState, carrier: ActorId, mult: u32) -> u32 {
    level
        .actor(carrier)
        .inventory
        .items
        .iter()
        .fold(mult, |m, &item| m * hooks::carrier_speed_mod(level, item, carrier, m))
        .max(1)
}

// ══════════════════════════════════════════════════════════════
// Collision
// ══════════════════════════════════════════════════════════════

/// Can `id` leave `from` in `dir`? Returns the outcome and the direction
/// after redirects.
pub fn check_collision(
    level: &mut LevelState,
    id: ActorId,
    from: Position,
    dir: Direction,
    mode: CheckMode,
) -> (bool, Direction) {
    let mut dir = dir;

    // ── Exit phase ──
    let leaving = level.tile(from).map(|t| t.occupants_reverse()).unwrap_or_default();
    for occ in leaving {
        if !level.exists(occ) { continue; }
        if !mode.redirect_only && !level.collision_ignores(occ, id) && hooks::exit_blocks(level, occ, id, dir) {
            hooks::bumped(level, occ, id, dir);
            if level.exists(id) {
                hooks::bumped_actor(level, id, occ, dir);
            }
            return (false, dir);
        }
        if level.ignores(id, occ) { continue; }
        match hooks::redirect(level, occ, id, dir) {
            Redirect::Pass => {}
            Redirect::To(d) => dir = d,
            Redirect::Block => return (false, dir),
        }
    }
    if mode.redirect_only {
        return (true, dir);
    }
    let Some(to) = level.grid.neighbor(from, dir) else { return (false, dir) };

    // ── Enter phase ──
    let mut to_push: SmallVec<[ActorId; 2]> = SmallVec::new();
    for layer in Layer::COLLISION_ORDER {
        let occupants: SmallVec<[ActorId; 2]> = level.tile(to).map(|t| t.layer(layer).into()).unwrap_or_default();
        let occupied = !occupants.is_empty();
        for occ in occupants {
            if !level.exists(occ) { continue; }
            let mut occ = occ;
            let carried = level.actor(id).inventory.items.clone();
            for item in carried {
                hooks::carrier_bump(level, item, id, occ, dir);
                if !level.exists(id) { return (false, dir); }
                occ = level.follow(occ);
            }
            if !level.exists(occ) { continue; }
            hooks::bumped(level, occ, id, dir);
            if !level.exists(id) { return (false, dir); }
            let occ = level.follow(occ);
            if !level.exists(occ) { continue; }
            hooks::bumped_actor(level, id, occ, dir);
            if !level.exists(id) { return (false, dir); }
            let occ = level.follow(occ);
            if !level.exists(occ) || !blocks(level, occ, id, dir) { continue; }
            if can_push(level, id, occ, dir) {
                to_push.push(occ);
            } else {
                return (false, dir);
            }
        }
        // An occupied movable layer ends the scan; the item layer is only
        // consulted under an empty one
        if occupied && layer == Layer::Movable { break; }
    }

    // ── Pushing ──
    for &p in &to_push {
        if !level.exists(p) { return (false, dir); }
        if level.actor(p).sliding != SlidingState::None {
            let b = level.actor_mut(p);
            if !b.pending_decision_locked_in {
                b.pending_decision = Some(dir);
                b.move_decision = Some(dir);
            }
            return (false, dir);
        }
        if level.actor(p).cooldown > 0 { return (false, dir); }
        let p_from = level.actor(p).position;
        if !check_collision(level, p, p_from, dir, mode).0 { return (false, dir); }
        if mode.push && step(level, p, dir) {
            let b = level.actor_mut(p);
            b.cooldown = b.cooldown.saturating_sub(1);
        }
    }
    if !level.exists(id) { return (false, dir); }
    if !to_push.is_empty() && mode.push {
        level.actor_mut(id).is_pushing = true;
    }

    // ── Pulling ──
    if mode.pull && level.actor(id).has_tag(Tag::Pulling) {
        return (pull(level, id, dir), dir);
    }
    (true, dir)
}

/// The block behind a hook carrier follows it. Returns false when the
/// block behind is still moving.
fn pull(level: &mut LevelState, id: ActorId, dir: Direction) -> bool {
    let pos = level.actor(id).position;
    let Some(back) = level.grid.neighbor(pos, dir.back()) else { return true };
    let Some(pulled) = level.top(back, Layer::Movable) else { return true };
    {
        let b = level.actor(pulled);
        if b.cooldown > 0 && b.move_speed() > 0 { return false; }
    }
    let refuses = {
        let b = level.actor(pulled);
        (b.pending_decision_locked_in && b.is_pulled) || !b.has_tag(Tag::Block)
    } || !hooks::can_be_pushed(level, pulled, id, dir);
    let b = level.actor_mut(pulled);
    b.is_pulled = true;
    if refuses { return true; }
    b.direction = dir;
    b.pending_decision = Some(dir);
    b.move_decision = Some(dir);
    true
}

// ══════════════════════════════════════════════════════════════
// Decide
// ══════════════════════════════════════════════════════════════

/// Any other occupant freezes `id` in place.
fn vetoed(level: &LevelState, id: ActorId) -> bool {
    let Some(tile) = level.tile_of(id) else { return false };
    tile.all().iter().any(|&o| o != id && hooks::vetoes_decision(level, o, id))
}

pub fn decide(level: &mut LevelState, id: ActorId, forced_only: bool) {
    if !level.exists(id) { return; }
    if level.kind(id).is_playable() {
        playables::decide(level, id, forced_only);
        return;
    }
    {
        let a = level.actor_mut(id);
        a.bonked = false;
        a.move_decision = None;
        if a.cooldown > 0 { return; }
        a.current_move_speed = None;
        a.is_pushing = false;
        if let Some(pending) = a.pending_decision.take() {
            a.move_decision = Some(pending);
            a.pending_decision_locked_in = true;
            return;
        }
    }
    if vetoed(level, id) { return; }
    {
        let a = level.actor_mut(id);
        if a.sliding != SlidingState::None {
            a.move_decision = Some(a.direction);
            return;
        }
    }
    hooks::on_each_decision(level, id, forced_only);
    if forced_only || !level.exists(id) { return; }

    let candidates = hooks::decide_movement(level, id);
    let Some(&last) = candidates.last() else { return };
    for dir in candidates {
        if !level.exists(id) { return; }
        let from = level.actor(id).position;
        if check_collision(level, id, from, dir, CheckMode::PUSH).0 {
            if level.exists(id) {
                level.actor_mut(id).move_decision = Some(dir);
            }
            return;
        }
    }
    // Everything failed: commit to the last candidate anyway
    if level.exists(id) {
        level.actor_mut(id).move_decision = Some(last);
    }
}

// ══════════════════════════════════════════════════════════════
// Move
// ══════════════════════════════════════════════════════════════

/// Moves one tile in `dir` if the way is clear. Pushes and pulls.
pub fn step(level: &mut LevelState, id: ActorId, dir: Direction) -> bool {
    {
        let a = level.actor(id);
        if a.cooldown > 0 || a.move_speed() == 0 { return false; }
    }
    level.actor_mut(id).direction = dir;
    let from = level.actor(id).position;
    let (ok, resolved) = check_collision(level, id, from, dir, CheckMode::STEP);
    if !level.exists(id) { return false; }
    {
        let a = level.actor_mut(id);
        a.bonked = !ok;
        a.direction = resolved;
    }
    if !ok {
        trace!(kind = level.kind(id).id(), x = from.x, y = from.y, dir = ?resolved, "bonk");
        return false;
    }

    if !level.actor(id).is_deciding {
        level.deciding.push(id);
        level.actor_mut(id).is_deciding = true;
    }
    let from = level.actor(id).position;
    let Some(to) = level.grid.neighbor(from, resolved) else { return false };
    let mult = carried_speed_mod(level, id, speed_mod(level, to, id));
    let length = level.actor(id).move_speed() * 3 / mult;
    {
        let a = level.actor_mut(id);
        a.pending_decision = None;
        a.move_decision = None;
        a.current_move_speed = Some(length);
        a.cooldown = length;
        a.old_position = Some(from);
        a.position = to;
    }
    update_tile_states(level, id, Some(from));
    true
}

/// Moves `id` from `old` onto the tile named by its position and fires the
/// leave/join hooks.
pub fn update_tile_states(level: &mut LevelState, id: ActorId, old: Option<Position>) {
    let was_despawned = level.actor(id).despawned;
    level.respawn(id, false);
    if let Some(old) = old {
        level.remove_from_tile(id, old, was_despawned);
        level.actor_mut(id).sliding = SlidingState::None;
        let left = level.tile(old).map(|t| t.occupants_reverse()).unwrap_or_default();
        for occ in left {
            if !level.exists(occ) || level.ignores(id, occ) { continue; }
            hooks::actor_left(level, occ, id);
        }
    }
    if !level.exists(id) { return; }
    level.place(id);

    let pos = level.actor(id).position;
    let joined = level.tile(pos).map(|t| t.occupants_reverse()).unwrap_or_default();
    for occ in joined {
        if occ == id || !level.exists(occ) || level.ignores(id, occ) { continue; }
        hooks::actor_joined(level, occ, id);
    }
    if level.exists(id) {
        hooks::new_tile_joined(level, id);
    }
}

pub fn do_move(level: &mut LevelState, id: ActorId) {
    if !level.exists(id) { return; }
    let (cooldown, decision, sliding) = {
        let a = level.actor(id);
        (a.cooldown, a.move_decision, a.sliding)
    };
    if cooldown > 0 {
        let a = level.actor_mut(id);
        a.is_pulled = false;
        a.move_decision = None;
        return;
    }
    let Some(dir) = decision else {
        level.actor_mut(id).is_pulled = false;
        return;
    };
    {
        let a = level.actor_mut(id);
        a.pending_decision = None;
        a.pending_decision_locked_in = false;
    }
    let moved = step(level, id, dir);
    if !level.exists(id) { return; }
    level.actor_mut(id).is_pulled = false;
    if moved || sliding == SlidingState::None { return; }

    let pos = level.actor(id).position;
    let members = level.tile(pos).map(|t| t.occupants_reverse()).unwrap_or_default();
    for occ in members {
        if occ == id || !level.exists(occ) || level.ignores(id, occ) { continue; }
        hooks::on_member_slide_bonked(level, occ, id);
    }
}

// ══════════════════════════════════════════════════════════════
// Settle
// ══════════════════════════════════════════════════════════════

pub fn do_cooldown(level: &mut LevelState, id: ActorId) {
    if !level.exists(id) { return; }
    let cooldown = level.actor(id).cooldown;
    if cooldown == 1 {
        let a = level.actor_mut(id);
        if a.pending_decision.is_some() {
            a.pending_decision_locked_in = true;
        }
        enter_tile(level, id, false);
    } else if cooldown > 1 {
        level.actor_mut(id).cooldown -= 1;
    } else {
        let mut me = id;
        let resting = level.tile_of(id).map(|t| t.occupants()).unwrap_or_default();
        for occ in resting {
            if occ == me || !level.exists(occ) { continue; }
            hooks::actor_on_tile(level, occ, me);
            me = level.follow(me);
            if !level.exists(me) { break; }
        }
    }
    if level.exists(id) {
        level.actor_mut(id).bonked = false;
    }
}

/// Finishes a move: completely-left hooks on the old tile, completely-joined
/// and on-tile hooks on the new one, then the mover's own hooks and those of
/// its items.
pub fn enter_tile(level: &mut LevelState, id: ActorId, no_on_tile: bool) {
    let mut me = id;
    if let Some(old) = level.actor(id).old_position {
        let left = level.tile(old).map(|t| t.occupants_reverse()).unwrap_or_default();
        for occ in left {
            if !level.exists(me) { break; }
            if occ == me || !level.exists(occ) || level.ignores(me, occ) { continue; }
            hooks::actor_completely_left(level, occ, me);
            me = level.follow(me);
        }
    }
    let pos = level.actor(me).position;
    let members = level.tile(pos).map(|t| t.occupants_reverse()).unwrap_or_default();
    for occ in members {
        if !level.exists(me) { break; }
        if occ == me || !level.exists(occ) { continue; }
        if level.ignores(me, occ) {
            hooks::actor_completely_joined_ignored(level, occ, me);
        } else {
            hooks::actor_completely_joined(level, occ, me);
        }
        me = level.follow(me);
        if !level.exists(me) { break; }
        if !no_on_tile && level.exists(occ) {
            hooks::actor_on_tile(level, occ, me);
            me = level.follow(me);
            if !level.exists(me) { break; }
        }
    }
    if level.exists(id) {
        hooks::new_tile_completely_joined(level, id);
        let carried = level.actor(id).inventory.items.clone();
        for item in carried {
            if !level.exists(id) { break; }
            hooks::carrier_completely_joined(level, item, id);
        }
    }
    level.actor_mut(id).cooldown = 0;
}
