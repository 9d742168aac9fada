/// Explosion and splash animations and their queued despawns.
///
/// Every animation queues a despawn for its tile when spawned. When the
/// timer runs out the queue removes whatever movable stands there, which is
/// not always the animation: if the tile held no animation at the end of
/// the spawning subtick, the first movable there gets despawned instead.

use crate::domain::actor::ActorId;
use crate::domain::tile::Layer;
use crate::sim::level::LevelState;

pub fn on_each_decision(level: &mut LevelState, me: ActorId) {
    let a = level.actor_mut(me);
    a.counter = a.counter.saturating_sub(1);
    if a.cooldown > 0 {
        a.cooldown += 1;
    }
}

/// Counts queued despawns down and fires the expired ones.
pub fn tick_queued_despawns(level: &mut LevelState) {
    let mut i = 0;
    while i < level.queued_despawns.len() {
        let q = &mut level.queued_despawns[i];
        q.remaining = q.remaining.saturating_sub(1);
        if q.remaining > 0 {
            i += 1;
            continue;
        }
        let q = level.queued_despawns.remove(i);
        let movables: Vec<ActorId> = level.tile(q.position).map(|t| t.layer(Layer::Movable).to_vec()).unwrap_or_default();
        let target = if q.animation_only == Some(true) {
            movables.into_iter().find(|&m| level.kind(m).is_animation())
        } else {
            movables.first().copied()
        };
        let Some(target) = target else { continue };
        if level.kind(target).is_animation() {
            level.destroy(target, None, None);
        } else {
            level.despawn(target);
        }
    }
}

/// Settles, once, whether each new queue entry belongs to an animation.
pub fn mark_animation_only(level: &mut LevelState) {
    for i in 0..level.queued_despawns.len() {
        if level.queued_despawns[i].animation_only.is_some() { continue; }
        let pos = level.queued_despawns[i].position;
        let has_animation = level
            .tile(pos)
            .is_some_and(|t| t.layer(Layer::Movable).iter().any(|&m| level.kind(m).is_animation()));
        level.queued_despawns[i].animation_only = Some(has_animation);
    }
}
