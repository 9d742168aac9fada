/// Monster decisions, monster kills, blob slime and lit dynamite.

use crate::domain::actor::ActorId;
use crate::domain::direction::{Direction, Relative};
use crate::domain::kind::ActorKind;
use crate::domain::tags::Tag;
use crate::domain::tile::{Layer, Position};
use crate::sim::hooks::{self, Candidates};
use crate::sim::level::LevelState;
use crate::sim::movement::{self, CheckMode};

/// Decisions a lit stick of dynamite waits before blowing up.
const FUSE_LENGTH: u32 = 250;
/// Explosion reach from the dynamite, per axis.
const BLAST_RADIUS: u32 = 3;

/// Monsters kill playables they touch, both ways round.
pub fn bumped(level: &mut LevelState, me: ActorId, other: ActorId) {
    if level.kind(other).is_playable() {
        level.destroy(other, Some(me), Some(ActorKind::Explosion));
    }
}

pub fn decide_movement(level: &mut LevelState, me: ActorId) -> Candidates {
    use ActorKind::*;
    let (kind, facing, pos) = {
        let a = level.actor(me);
        (a.kind, a.direction, a.position)
    };
    let rel = Relative::from(facing);
    match kind {
        Centipede => Candidates::from_slice(&[rel.right, rel.forward, rel.left, rel.backward]),
        Ant => Candidates::from_slice(&[rel.left, rel.forward, rel.right, rel.backward]),
        Glider => Candidates::from_slice(&[rel.forward, rel.left, rel.right, rel.backward]),
        Fireball => Candidates::from_slice(&[rel.forward, rel.right, rel.left, rel.backward]),
        Ball => Candidates::from_slice(&[rel.forward, rel.backward]),
        TeethRed => teeth(level, pos),
        TankBlue => {
            let tank = level.actor_mut(me);
            if tank.toggled {
                tank.toggled = false;
                return Candidates::from_slice(&[rel.backward]);
            }
            Candidates::from_slice(&[rel.forward])
        }
        TankYellow => {
            let tank = level.actor_mut(me);
            if !tank.toggled { return Candidates::new(); }
            tank.toggled = false;
            Candidates::from_slice(&[tank.direction])
        }
        Blob => {
            let n = level.rng.random() as u32 + level.rng.blob_mod() as u32;
            Candidates::from_slice(&[Direction::from_index(n)])
        }
        Walker => {
            if movement::check_collision(level, me, pos, facing, CheckMode::QUERY).0 {
                return Candidates::from_slice(&[facing]);
            }
            let n = level.rng.random() as u32 + facing.index() as u32;
            Candidates::from_slice(&[Direction::from_index(n)])
        }
        _ => Candidates::new(),
    }
}

/// Chase the selected playable on alternate half-cycles, along the longer
/// axis first. Flees playables that scare it.
fn teeth(level: &LevelState, pos: Position) -> Candidates {
    let mut dirs = Candidates::new();
    let Some(target) = level.selected_playable() else { return dirs };
    if (level.current_tick + 1) % 8 >= 4 { return dirs; }
    let p = level.actor(target).position;
    let dx = pos.x as i64 - p.x as i64;
    let dy = pos.y as i64 - p.y as i64;
    if dx != 0 {
        dirs.push(if dx > 0 { Direction::Left } else { Direction::Right });
    }
    if dy != 0 {
        dirs.push(if dy > 0 { Direction::Up } else { Direction::Down });
    }
    if dy.abs() >= dx.abs() {
        dirs.reverse();
    }
    if level.actor(target).has_tag(Tag::ScaresTeethRed) {
        for d in dirs.iter_mut() {
            *d = d.back();
        }
    }
    dirs
}

pub fn tank_button(level: &mut LevelState, me: ActorId, dir: Direction) {
    let tank = level.actor_mut(me);
    if tank.kind == ActorKind::TankYellow {
        tank.direction = dir;
    }
    tank.toggled = true;
}

// ══════════════════════════════════════════════════════════════
// Blob
// ══════════════════════════════════════════════════════════════

/// Carries slime from the tile just left onto the new one, when that
/// layer is free there.
pub fn blob_spread(level: &mut LevelState, me: ActorId) {
    let (old, new) = {
        let a = level.actor(me);
        (a.old_position, a.position)
    };
    let Some(old) = old else { return };
    let slime = level
        .tile(old)
        .and_then(|t| t.all().iter().copied().find(|&a| level.actor(a).has_tag(Tag::Slime)));
    let Some(slime) = slime else { return };
    let (kind, layer, dir, custom) = {
        let s = level.actor(slime);
        (s.kind, s.layer(), s.direction, s.custom.clone())
    };
    if level.tile(new).is_some_and(|t| t.has(layer)) { return; }
    level.spawn(kind, new, dir, &custom);
}

// ══════════════════════════════════════════════════════════════
// Lit dynamite
// ══════════════════════════════════════════════════════════════

pub fn tnt_fuse(level: &mut LevelState, me: ActorId) {
    let stage = {
        let tnt = level.actor_mut(me);
        tnt.counter += 1;
        tnt.counter.saturating_sub(FUSE_LENGTH)
    };
    if stage == 0 { return; }
    let center = level.actor(me).position;
    level.actor_mut(me).tags.tags.insert(Tag::Melting);
    for pos in level.grid.diamond_search(center, stage) {
        if pos.x.abs_diff(center.x) < BLAST_RADIUS && pos.y.abs_diff(center.y) < BLAST_RADIUS {
            nuke_tile(level, me, center, pos);
        }
    }
    if stage == BLAST_RADIUS {
        nuke_tile(level, me, center, center);
    }
    level.actor_mut(me).tags.tags.remove(Tag::Melting);
}

/// Blows up a tile. Terrain survives when a movable was there to take the
/// blast; a movable that died leaves fire behind on bare ground.
fn nuke_tile(level: &mut LevelState, tnt: ActorId, center: Position, pos: Position) {
    let Some(tile) = level.tile(pos) else { return };
    let had_movable = tile.has(Layer::Movable);
    let victims = tile.occupants();
    let (dx, dy) = (pos.x as i64 - center.x as i64, pos.y as i64 - center.y as i64);
    let dir = if dx.abs() > dy.abs() {
        Direction::from_index((2 + dx.signum()) as u32)
    } else {
        Direction::from_index((1 + dy.signum()) as u32)
    };
    let mut movable_died = false;
    for victim in victims {
        let layer = level.actor(victim).layer();
        if had_movable && layer == Layer::Terrain { continue; }
        hooks::bumped(level, victim, tnt, dir);
        if level.destroy(victim, Some(tnt), Some(ActorKind::Explosion)) && layer == Layer::Movable {
            movable_died = true;
        }
    }
    if had_movable && movable_died && !level.tile(pos).is_some_and(|t| t.has(Layer::Terrain)) {
        level.spawn(ActorKind::Fire, pos, Direction::Up, "");
    }
}
