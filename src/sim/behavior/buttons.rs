/// Buttons and toggle switches.
///
/// Green, blue and yellow buttons act on every listener of their colour at
/// the end of the subtick. Red, brown and orange buttons are linked to one
/// target when the level starts.

use crate::domain::actor::ActorId;
use crate::domain::kind::{ActorKind, ButtonColor};
use crate::domain::tile::{Layer, Position};
use crate::sim::event::GameEvent;
use crate::sim::hooks;
use crate::sim::level::{AfterTick, LevelState};

/// `other` finished entering the button's tile.
pub fn pressed(level: &mut LevelState, me: ActorId, other: ActorId) {
    let (kind, pos) = {
        let a = level.actor(me);
        (a.kind, a.position)
    };
    if kind == ActorKind::ToggleSwitch {
        let a = level.actor_mut(me);
        a.toggled = !a.toggled;
        return;
    }
    let Some(color) = kind.button_color() else { return };
    match color {
        ButtonColor::Green => level.after_tick.push(AfterTick::GreenToggle),
        ButtonColor::Blue => level.after_tick.push(AfterTick::BlueTankTurn),
        ButtonColor::Yellow => {
            let dir = level.actor(other).direction;
            level.after_tick.push(AfterTick::YellowTank(dir));
        }
        ButtonColor::Red | ButtonColor::Brown | ButtonColor::Orange => press_link(level, me, color),
    }
    level.emit(GameEvent::ButtonPressed { color, position: pos });
}

/// `other` started leaving the button's tile.
pub fn released(level: &mut LevelState, me: ActorId) {
    let Some(color) = level.kind(me).button_color() else { return };
    let Some(target) = linked(level, me) else { return };
    hooks::button_unpressed(level, target, color);
}

fn press_link(level: &mut LevelState, me: ActorId, color: ButtonColor) {
    let Some(target) = linked(level, me) else { return };
    let dir = level.actor(me).direction;
    hooks::button_pressed(level, target, color, dir);
}

/// Current incarnation of the button's target, if it still exists.
fn linked(level: &LevelState, me: ActorId) -> Option<ActorId> {
    let target = level.follow(level.actor(me).link?);
    level.exists(target).then_some(target)
}

// ══════════════════════════════════════════════════════════════
// Linking
// ══════════════════════════════════════════════════════════════

/// Finds the button's target at level start. Brown buttons already held
/// down press their target right away.
pub fn connect(level: &mut LevelState, me: ActorId) {
    let (kind, pos) = {
        let a = level.actor(me);
        (a.kind, a.position)
    };
    let Some(color) = kind.button_color() else { return };
    let explicit = level.connections.iter().find(|c| c.from == pos).map(|c| c.to);

    let target = match (color, explicit) {
        (_, Some(to)) => caring_on(level, to, color),
        (ButtonColor::Orange, None) => diamond_target(level, pos, color),
        (_, None) => None,
    };
    let target = match (color, target) {
        (ButtonColor::Red | ButtonColor::Brown, None) => reading_order_target(level, pos, color),
        (_, t) => t,
    };
    level.actor_mut(me).link = target;

    if color == ButtonColor::Brown && is_held(level, me) {
        press_link(level, me, color);
    }
}

/// Last listener of `color` on a tile.
fn caring_on(level: &LevelState, pos: Position, color: ButtonColor) -> Option<ActorId> {
    let tile = level.tile(pos)?;
    tile.all().iter().rev().copied().find(|&a| level.kind(a).cares_about(color))
}

/// First listener after the button in reading order, wrapping around.
fn reading_order_target(level: &LevelState, from: Position, color: ButtonColor) -> Option<ActorId> {
    let n = level.grid.len();
    let start = level.grid.index_of(from);
    (1..=n)
        .map(|step| level.grid.position_at((start + step) % n))
        .find_map(|pos| {
            let tile = level.tile(pos)?;
            tile.all().iter().copied().find(|&a| level.kind(a).cares_about(color))
        })
}

/// Nearest listener by taxicab rings. Gives up when only the last two
/// tiles of the level would remain unchecked.
fn diamond_target(level: &LevelState, from: Position, color: ButtonColor) -> Option<ActorId> {
    let total = level.grid.len();
    let mut checked = 0usize;
    for ring in 1..=(level.grid.width + level.grid.height) {
        for pos in level.grid.diamond_search(from, ring) {
            checked += 1;
            if total.saturating_sub(checked) <= 2 {
                return None;
            }
            let Some(tile) = level.tile(pos) else { continue };
            if let Some(&a) = tile.all().iter().find(|&&a| level.kind(a).cares_about(color)) {
                return Some(a);
            }
        }
    }
    None
}

/// Whether a movable holds the button down.
#[inline]
pub fn is_held(level: &LevelState, me: ActorId) -> bool {
    level.tile_of(me).is_some_and(|t| t.has(Layer::Movable))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::direction::Direction;
    use crate::domain::rng::LevelRng;
    use crate::sim::loader::{Connection, LevelMetadata};

    fn row(kinds: &[ActorKind]) -> LevelState {
        let mut level = LevelState::new(kinds.len() as u32, 1, LevelMetadata::default(), LevelRng::default());
        for (x, &k) in kinds.iter().enumerate() {
            level.spawn(k, Position::new(x as u32, 0), Direction::Up, "");
        }
        level
    }

    fn at(level: &LevelState, x: u32) -> ActorId {
        level.top(Position::new(x, 0), Layer::Terrain).expect("terrain")
    }

    #[test]
    fn red_links_forward_with_wrap() {
        use ActorKind::*;
        let mut level = row(&[CloneMachine, Floor, ButtonRed, Floor]);
        let button = at(&level, 2);
        connect(&mut level, button);
        assert_eq!(level.actor(button).link, Some(at(&level, 0)));

        let mut level = row(&[CloneMachine, ButtonRed, Floor, CloneMachine]);
        let button = at(&level, 1);
        connect(&mut level, button);
        assert_eq!(level.actor(button).link, Some(at(&level, 3)));
    }

    #[test]
    fn explicit_connection_wins() {
        use ActorKind::*;
        let mut level = row(&[CloneMachine, ButtonRed, CloneMachine]);
        level.connections.push(Connection { from: Position::new(1, 0), to: Position::new(0, 0) });
        let button = at(&level, 1);
        connect(&mut level, button);
        assert_eq!(level.actor(button).link, Some(at(&level, 0)));
    }

    #[test]
    fn held_brown_button_presses_at_start() {
        use ActorKind::*;
        let mut level = row(&[ButtonBrown, Trap]);
        level.spawn(DirtBlock, Position::new(0, 0), Direction::Up, "");
        let button = at(&level, 0);
        connect(&mut level, button);
        assert!(is_held(&level, button));
        assert_eq!(level.actor(at(&level, 1)).counter, 1);
    }

    #[test]
    fn orange_takes_nearest_ring() {
        use ActorKind::*;
        let mut level = row(&[FlameJet, Floor, Floor, ButtonOrange, FlameJet, Floor, Floor]);
        let button = at(&level, 3);
        connect(&mut level, button);
        assert_eq!(level.actor(button).link, Some(at(&level, 4)));
    }

    #[test]
    fn global_buttons_queue_after_tick() {
        use ActorKind::*;
        let mut level = row(&[ButtonGreen, ButtonYellow]);
        let chip = level.spawn(Chip, Position::new(0, 0), Direction::Left, "");
        let (green, yellow) = (at(&level, 0), at(&level, 1));
        pressed(&mut level, green, chip);
        pressed(&mut level, yellow, chip);
        assert_eq!(level.after_tick, vec![AfterTick::GreenToggle, AfterTick::YellowTank(Direction::Left)]);
        let events = level.take_events();
        assert_eq!(events.len(), 2);
    }
}
