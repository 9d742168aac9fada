/// Walls that are not always walls: thin, toggle, blue, green, invisible,
/// appearing, swivels and doors.

use crate::domain::actor::ActorId;
use crate::domain::direction::Direction;
use crate::domain::kind::ActorKind;
use crate::domain::tags::{Tag, TagRule};
use crate::sim::event::GameEvent;
use crate::sim::level::LevelState;

/// Subticks an invisible wall stays revealed after a playable bumps it.
const REVEAL_DURATION: u32 = 36;

const SOLID_TO_BLUE: TagRule = TagRule::any(&[Tag::Cc1Block, Tag::NormalMonster]);

pub fn blocks(level: &LevelState, me: ActorId, other: ActorId, dir: Direction) -> bool {
    let wall = level.actor(me);
    let other_tags = level.actor(other).tags.tags;
    match wall.kind {
        ActorKind::ThinWall => dir == wall.direction.back(),
        ActorKind::SwivelRotatingPart => dir == wall.direction.back() || dir == wall.direction.left(),
        ActorKind::ToggleWall => wall.toggled,
        ActorKind::BlueWall => wall.toggled || SOLID_TO_BLUE.matches(other_tags),
        ActorKind::GreenWall => wall.toggled || other_tags.contains(Tag::Block),
        _ => false,
    }
}

pub fn bumped(level: &mut LevelState, me: ActorId, other: ActorId) {
    match level.kind(me) {
        ActorKind::InvisibleWall => {
            if level.kind(other).is_playable() {
                level.actor_mut(me).counter = REVEAL_DURATION;
            }
        }
        ActorKind::AppearingWall => {
            if level.kind(other).is_playable() {
                level.replace_with(me, ActorKind::Wall);
            }
        }
        ActorKind::BlueWall => {
            if SOLID_TO_BLUE.matches(level.actor(other).tags.tags) { return; }
            let real = level.actor(me).toggled;
            level.replace_with(me, if real { ActorKind::Wall } else { ActorKind::Floor });
        }
        _ => {}
    }
}

/// Revealed invisible walls fade back out.
pub fn fade(level: &mut LevelState, me: ActorId) {
    let wall = level.actor_mut(me);
    wall.counter = wall.counter.saturating_sub(1);
}

// ── Swivels ──

pub fn attach_swivel_part(level: &mut LevelState, me: ActorId) {
    let (pos, dir) = {
        let s = level.actor(me);
        (s.position, s.direction)
    };
    let part = level.spawn(ActorKind::SwivelRotatingPart, pos, dir, "");
    level.actor_mut(me).link = Some(part);
}

pub fn swivel_turn(level: &mut LevelState, me: ActorId, other: ActorId) {
    let leaving = level.actor(other).direction;
    let part = level.actor_mut(me);
    if leaving == part.direction {
        part.direction = part.direction.right();
    } else if leaving == part.direction.right() {
        part.direction = part.direction.left();
    }
}

// ── Doors ──

pub fn door_blocks(level: &LevelState, me: ActorId, other: ActorId) -> bool {
    let Some(color) = level.kind(me).door_color() else { return false };
    !level.actor(other).inventory.has_key(color)
}

/// Spends a key (unless the opener reuses that colour) and opens the door.
pub fn open_door(level: &mut LevelState, me: ActorId, other: ActorId) {
    let (kind, pos) = {
        let d = level.actor(me);
        (d.kind, d.position)
    };
    let Some(color) = kind.door_color() else { return };
    let opener = level.actor_mut(other);
    if !opener.inventory.take_key(color) { return; }
    if opener.has_tag(color.reuse_tag()) {
        opener.inventory.add_key(color);
    }
    level.replace_with(me, ActorKind::Floor);
    level.emit(GameEvent::DoorOpened { kind, position: pos });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::kind::KeyColor;
    use crate::domain::rng::LevelRng;
    use crate::domain::tile::{Layer, Position};
    use crate::sim::loader::LevelMetadata;

    fn level() -> LevelState {
        LevelState::new(2, 1, LevelMetadata::default(), LevelRng::default())
    }

    #[test]
    fn green_key_survives_for_chip() {
        let mut level = level();
        let p = Position::new(0, 0);
        let door = level.spawn(ActorKind::DoorGreen, p, Direction::Up, "");
        let chip = level.spawn(ActorKind::Chip, p, Direction::Up, "");
        level.actor_mut(chip).inventory.add_key(KeyColor::Green);
        open_door(&mut level, door, chip);
        assert_eq!(level.actor(chip).inventory.keys_of(KeyColor::Green), 1);
        assert!(level.terrain_is(p, ActorKind::Floor));
    }

    #[test]
    fn red_key_is_spent() {
        let mut level = level();
        let p = Position::new(0, 0);
        let door = level.spawn(ActorKind::DoorRed, p, Direction::Up, "");
        let chip = level.spawn(ActorKind::Chip, p, Direction::Up, "");
        level.actor_mut(chip).inventory.add_key(KeyColor::Red);
        assert!(!door_blocks(&level, door, chip));
        open_door(&mut level, door, chip);
        assert!(!level.actor(chip).inventory.has_key(KeyColor::Red));
        assert!(level.take_events().contains(&GameEvent::DoorOpened { kind: ActorKind::DoorRed, position: p }));
    }

    #[test]
    fn swivel_rotates_with_leaver() {
        let mut level = level();
        let p = Position::new(0, 0);
        let swivel = level.spawn(ActorKind::Swivel, p, Direction::Up, "");
        attach_swivel_part(&mut level, swivel);
        let part = level.top(p, Layer::Special).expect("part");
        let chip = level.spawn(ActorKind::Chip, p, Direction::Up, "");
        swivel_turn(&mut level, part, chip);
        assert_eq!(level.actor(part).direction, Direction::Right);
        level.actor_mut(chip).direction = Direction::Down;
        swivel_turn(&mut level, part, chip);
        assert_eq!(level.actor(part).direction, Direction::Up);
    }

    #[test]
    fn fake_blue_wall_crumbles() {
        let mut level = level();
        let p = Position::new(1, 0);
        let wall = level.spawn(ActorKind::BlueWall, p, Direction::Up, "fake");
        let chip = level.spawn(ActorKind::Chip, Position::new(0, 0), Direction::Right, "");
        assert!(!blocks(&level, wall, chip, Direction::Right));
        bumped(&mut level, wall, chip);
        assert!(level.terrain_is(p, ActorKind::Floor));
    }
}
