/// Pickups, bombs, dynamite and the no sign.

use crate::domain::actor::ActorId;
use crate::domain::direction::Direction;
use crate::domain::kind::{ActorKind, CustomState, ItemDestination};
use crate::domain::tags::{Tag, TagRule};
use crate::domain::tile::Layer;
use crate::sim::event::GameEvent;
use crate::sim::level::LevelState;
use crate::sim::movement;

/// Carrier tags that let an actor walk onto items.
const WALKS_ON_ITEMS: TagRule = TagRule::any(&[Tag::CanPickupItems, Tag::CanStandOnItems, Tag::Playable]);

/// Items stop everything that can neither pick them up nor stand on them,
/// unless an item modifier shares the tile. Blue keys never block.
pub fn item_blocks(level: &LevelState, me: ActorId, other: ActorId) -> bool {
    let item = level.actor(me);
    if item.kind == ActorKind::KeyBlue { return false; }
    let modded = level.tile(item.position).is_some_and(|t| t.has(Layer::ItemMod));
    !modded && !WALKS_ON_ITEMS.matches(level.actor(other).tags.tags)
}

/// Keeps out carriers already holding the item under the sign, and
/// otherwise defers to whatever else the tile has.
pub fn no_sign_blocks(level: &LevelState, me: ActorId, other: ActorId, dir: Direction) -> bool {
    let pos = level.actor(me).position;
    let Some(tile) = level.tile(pos) else { return false };
    let carrier = &level.actor(other).inventory;
    for &item in tile.layer(Layer::Item) {
        let kind = level.kind(item);
        let held = match kind.key_color() {
            Some(color) => carrier.has_key(color),
            None => carrier.has_item(kind),
        };
        if held { return true; }
    }
    tile.layer(Layer::Special)
        .iter()
        .chain(tile.layer(Layer::Terrain))
        .any(|&b| movement::blocks(level, b, other, dir))
}

pub fn pick_up(level: &mut LevelState, me: ActorId, other: ActorId) {
    let (kind, pos, state) = {
        let item = level.actor(me);
        (item.kind, item.position, CustomState { toggled: item.toggled, counter: item.counter })
    };
    if level.actor(other).has_tag(Tag::CanStandOnItems) { return; }
    if level.tile(pos).is_some_and(|t| t.has(Layer::ItemMod)) { return; }
    let Some(destination) = kind.item_destination() else { return };
    if !level.destroy(me, Some(other), None) { return; }

    match destination {
        ItemDestination::Key(color) => level.actor_mut(other).inventory.add_key(color),
        ItemDestination::Inventory => {
            if level.actor_mut(other).inventory.push_item(kind) {
                level.drop_item(other);
            }
        }
        ItemDestination::Consumed => match kind {
            ActorKind::EChip | ActorKind::EChipPlus => level.chips_left = level.chips_left.saturating_sub(1),
            ActorKind::BonusFlag if level.kind(other).is_playable() => {
                let value = state.counter as u64;
                if state.toggled {
                    level.bonus_points = level.bonus_points.saturating_mul(value);
                } else {
                    level.bonus_points = level.bonus_points.saturating_add(value);
                }
            }
            _ => {}
        },
    }
    level.actor_mut(other).recompute_tags();
    level.emit(GameEvent::ItemPicked { kind, position: pos });
}

/// Bombs take whatever movable lands on them along with themselves. Green
/// bombs in chip mode count as a chip for playables.
pub fn bomb_joined(level: &mut LevelState, me: ActorId, other: ActorId) {
    let bomb = level.actor(me);
    let armed = bomb.kind == ActorKind::Bomb || bomb.toggled;
    if armed {
        if level.actor(other).layer() != Layer::Movable { return; }
        level.destroy(other, Some(me), None);
        level.destroy(me, Some(other), Some(ActorKind::Explosion));
    } else if level.kind(other).is_playable() {
        level.destroy(me, None, None);
        level.chips_left = level.chips_left.saturating_sub(1);
    }
}

/// Dropped dynamite lights once its owner walks off it.
pub fn tnt_left(level: &mut LevelState, me: ActorId, other: ActorId) {
    if !level.kind(other).is_playable() { return; }
    let pos = level.actor(me).position;
    let inventory = level.actor(other).inventory.clone();
    level.destroy(me, None, None);
    let lit = level.spawn(ActorKind::TntLit, pos, Direction::Up, "");
    let a = level.actor_mut(lit);
    a.inventory = inventory;
    a.recompute_tags();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::kind::KeyColor;
    use crate::domain::rng::LevelRng;
    use crate::domain::tile::Position;
    use crate::sim::loader::LevelMetadata;

    fn level() -> LevelState {
        let mut level = LevelState::new(2, 1, LevelMetadata::default(), LevelRng::default());
        for x in 0..2 {
            level.spawn(ActorKind::Floor, Position::new(x, 0), Direction::Up, "");
        }
        level
    }

    #[test]
    fn chips_count_down() {
        let mut level = level();
        let p = Position::new(0, 0);
        let chip_item = level.spawn(ActorKind::EChip, p, Direction::Up, "");
        assert_eq!(level.chips_left, 1);
        let chip = level.spawn(ActorKind::Chip, p, Direction::Up, "");
        pick_up(&mut level, chip_item, chip);
        assert_eq!(level.chips_left, 0);
        assert!(!level.exists(chip_item));
    }

    #[test]
    fn fifth_item_drops_the_oldest() {
        let mut level = level();
        let p = Position::new(0, 0);
        let chip = level.spawn(ActorKind::Chip, p, Direction::Up, "");
        for k in [ActorKind::BootWater, ActorKind::BootFire, ActorKind::BootIce, ActorKind::Helmet] {
            level.actor_mut(chip).inventory.push_item(k);
        }
        let hook = level.spawn(ActorKind::Hook, p, Direction::Up, "");
        pick_up(&mut level, hook, chip);
        let top = level.top(p, Layer::Item).expect("dropped item");
        assert_eq!(level.kind(top), ActorKind::BootWater);
        assert!(level.actor(chip).has_tag(Tag::Pulling));
        assert_eq!(level.actor(chip).inventory.items.len(), 4);
    }

    #[test]
    fn bonus_flags_add_and_multiply() {
        let mut level = level();
        let p = Position::new(0, 0);
        let chip = level.spawn(ActorKind::Chip, p, Direction::Up, "");
        let add = level.spawn(ActorKind::BonusFlag, p, Direction::Up, "100");
        pick_up(&mut level, add, chip);
        let mul = level.spawn(ActorKind::BonusFlag, p, Direction::Up, "*3");
        pick_up(&mut level, mul, chip);
        assert_eq!(level.bonus_points, 300);
    }

    #[test]
    fn no_sign_keeps_out_key_holders() {
        let mut level = level();
        let p = Position::new(1, 0);
        level.spawn(ActorKind::KeyRed, p, Direction::Up, "");
        let sign = level.spawn(ActorKind::NoSign, p, Direction::Up, "");
        let chip = level.spawn(ActorKind::Chip, Position::new(0, 0), Direction::Right, "");
        assert!(!no_sign_blocks(&level, sign, chip, Direction::Right));
        level.actor_mut(chip).inventory.add_key(KeyColor::Red);
        assert!(no_sign_blocks(&level, sign, chip, Direction::Right));
    }

    #[test]
    fn monsters_stopped_by_items() {
        let mut level = level();
        let boot = level.spawn(ActorKind::BootFire, Position::new(1, 0), Direction::Up, "");
        let ant = level.spawn(ActorKind::Ant, Position::new(0, 0), Direction::Right, "");
        assert!(item_blocks(&level, boot, ant));
    }
}
