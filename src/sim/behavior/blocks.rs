/// Pushable blocks: filling water and melting.

use crate::domain::actor::ActorId;
use crate::domain::direction::Direction;
use crate::domain::kind::ActorKind;
use crate::domain::tags::Tag;
use crate::domain::tile::Layer;
use crate::sim::level::LevelState;

/// A block that came to rest on water fills it and sinks. Ice blocks also
/// melt on hot terrain.
pub fn settle(level: &mut LevelState, me: ActorId) {
    let (kind, pos) = {
        let a = level.actor(me);
        (a.kind, a.position)
    };
    let terrain: Vec<ActorId> = level.tile(pos).map(|t| t.layer(Layer::Terrain).to_vec()).unwrap_or_default();
    if let Some(&water) = terrain.iter().find(|&&t| level.actor(t).has_tag(Tag::Water)) {
        let fill = if kind == ActorKind::IceBlock { ActorKind::Ice } else { ActorKind::Dirt };
        level.replace_with(water, fill);
        level.destroy(me, None, None);
        return;
    }
    if kind != ActorKind::IceBlock { return; }
    for t in terrain {
        if !level.exists(me) { return; }
        melt(level, me, t);
    }
}

/// Ice blocks melt when touched by something melting. Melting terrain is
/// used up, and the tile is left as water.
pub fn melt(level: &mut LevelState, me: ActorId, other: ActorId) {
    if !level.actor(other).has_tag(Tag::Melting) { return; }
    let pos = level.actor(me).position;
    level.destroy(me, None, None);
    if level.actor(other).layer() == Layer::Terrain {
        level.destroy(other, None, None);
    }
    if !level.tile(pos).is_some_and(|t| t.has(Layer::Terrain)) {
        level.spawn(ActorKind::Water, pos, Direction::Up, "");
    }
}
