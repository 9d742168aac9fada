/// The tick function: advances a level by one subtick.
///
/// Processing order:
///   0. Level start (first call only)
///   1. Replay input for seat 0, once per tick
///   2. Jetlife, queued animation despawns
///   3. Decision phase (forced moves only on subticks 0 and 1)
///   4. Wire phase: propagation, then consumer notification
///   5. Move phase
///   6. Cooldown phase
///   7. Time, timer, debounce, after-tick queue, player swap, animation marks
///   8. Game state change events
///
/// Phases 3, 5 and 6 walk a snapshot of the deciding list taken when the
/// phase starts; actors destroyed mid-phase are skipped.

use tracing::{debug, info};

use crate::domain::actor::ActorId;
use crate::domain::direction::Direction;
use crate::domain::kind::ButtonColor;
use super::behavior::{animations, terrain};
use super::event::GameEvent;
use super::hooks;
use super::level::{AfterTick, GameState, LevelState};
use super::movement;
use super::wires;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn tick(level: &mut LevelState) -> Vec<GameEvent> {
    let state_before = level.game_state;
    if !level.level_started {
        start(level);
    }
    feed_replay(level);

    // ── Pre-decision ──
    if let Some(interval) = level.metadata.jetlife_interval.filter(|&n| n > 0) {
        if level.time() % interval as u64 == 0 {
            terrain::jetlife(level);
        }
    }
    animations::tick_queued_despawns(level);

    // ── Phases ──
    let forced_only = level.subtick != 2;
    for id in level.deciding.clone() {
        if !level.exists(id) { continue; }
        movement::decide(level, id, forced_only);
    }
    wires::propagate(level);
    for id in level.deciding.clone() {
        if !level.exists(id) { continue; }
        movement::do_move(level, id);
    }
    for id in level.deciding.clone() {
        if !level.exists(id) { continue; }
        movement::do_cooldown(level, id);
    }

    // ── Bookkeeping ──
    advance_time(level);
    for seat in level.seats.iter_mut() {
        let input = seat.input;
        seat.debounce.advance(input);
    }
    drain_after_tick(level);
    if level.swap_pending {
        level.swap_pending = false;
        level.swap_playables();
    }
    animations::mark_animation_only(level);

    report_state(level, state_before);
    level.take_events()
}

/// Runs the level-start hooks. Called by the first `tick`.
pub fn start(level: &mut LevelState) {
    level.level_started = true;
    for id in level.order.clone() {
        if !level.exists(id) { continue; }
        hooks::level_started(level, id);
    }
    for id in level.order.clone() {
        if !level.exists(id) { continue; }
        let others = level.tile_of(id).map(|t| t.occupants()).unwrap_or_default();
        for other in others {
            if other == id || !level.exists(id) || !level.exists(other) || level.ignores(id, other) { continue; }
            hooks::new_actor_on_tile(level, id, other);
        }
    }
    debug!(actors = level.order.len(), playables_left = level.playables_left, "level started");
}

// ══════════════════════════════════════════════════════════════
// Input and time
// ══════════════════════════════════════════════════════════════

fn feed_replay(level: &mut LevelState) {
    if level.subtick != 0 { return; }
    let Some(cursor) = level.replay.as_mut() else { return };
    let input = cursor.next_tick();
    if let Some(seat) = level.seats.first_mut() {
        seat.input = input;
    }
}

fn advance_time(level: &mut LevelState) {
    if level.subtick == 2 {
        level.current_tick += 1;
        level.subtick = 0;
    } else {
        level.subtick += 1;
    }
    if level.time_left != 0 {
        level.time_left -= 1;
        if level.time_left == 0 {
            level.set_game_state(GameState::Timeout);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// After-tick queue
// ══════════════════════════════════════════════════════════════

/// Every live actor listening to `color`, in actor order.
fn listeners(level: &LevelState, color: ButtonColor) -> Vec<ActorId> {
    level.order.iter().copied().filter(|&a| level.kind(a).cares_about(color)).collect()
}

fn drain_after_tick(level: &mut LevelState) {
    let queued = std::mem::take(&mut level.after_tick);
    for event in queued {
        let (color, dir) = match event {
            AfterTick::GreenToggle => (ButtonColor::Green, Direction::Up),
            AfterTick::BlueTankTurn => (ButtonColor::Blue, Direction::Up),
            AfterTick::YellowTank(dir) => (ButtonColor::Yellow, dir),
        };
        for id in listeners(level, color) {
            if !level.exists(id) { continue; }
            hooks::button_pressed(level, id, color, dir);
        }
    }
}

fn report_state(level: &mut LevelState, before: GameState) {
    let now = level.game_state;
    if now == before { return; }
    let event = match now {
        GameState::Playing => return,
        GameState::Won => GameEvent::Won,
        GameState::Lost => GameEvent::Lost,
        GameState::Timeout => GameEvent::TimedOut,
        GameState::Crash => GameEvent::Crashed,
    };
    info!(state = ?now, tick = level.current_tick, subtick = level.subtick, "game state changed");
    level.emit(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::SlidingState;
    use crate::domain::input::KeyInputs;
    use crate::domain::kind::ActorKind;
    use crate::domain::tile::{Layer, Position};
    use crate::sim::loader::{self, Connection};
    use crate::sim::replay::SeedTriple;
    use proptest::prelude::*;

    fn level(rows: &[&str], legend: &[(char, &str)]) -> LevelState {
        let desc = loader::from_diagram(rows, legend).expect("diagram");
        loader::load(&desc, SeedTriple::default()).expect("load")
    }

    fn run(level: &mut LevelState, input: KeyInputs, subticks: u32) {
        for _ in 0..subticks {
            level.seats[0].input = input;
            tick(level);
        }
    }

    fn first(level: &LevelState, kind: ActorKind) -> ActorId {
        level.order.iter().copied().find(|&a| level.kind(a) == kind).expect("actor of kind")
    }

    fn pos(x: u32, y: u32) -> Position {
        Position::new(x, y)
    }

    // ── Movement ──

    #[test]
    fn walks_until_the_wall() {
        let mut level = level(&["P.#"], &[('P', "floor chip:r")]);
        let chip = first(&level, ActorKind::Chip);
        run(&mut level, KeyInputs::toward(Direction::Right), 12);
        assert_eq!(level.actor(chip).position, pos(1, 0));
        run(&mut level, KeyInputs::toward(Direction::Right), 24);
        assert_eq!(level.actor(chip).position, pos(1, 0));
        assert_eq!(level.game_state, GameState::Playing);
    }

    #[test]
    fn moves_only_start_on_the_third_subtick() {
        let mut level = level(&["P."], &[('P', "floor chip:r")]);
        let chip = first(&level, ActorKind::Chip);
        run(&mut level, KeyInputs::toward(Direction::Right), 2);
        assert_eq!(level.actor(chip).position, pos(0, 0));
        run(&mut level, KeyInputs::toward(Direction::Right), 1);
        assert_eq!(level.actor(chip).position, pos(1, 0));
        assert_eq!((level.current_tick, level.subtick), (1, 0));
    }

    #[test]
    fn pushes_a_block() {
        let mut level = level(&["PB."], &[('P', "floor chip:r")]);
        let chip = first(&level, ActorKind::Chip);
        let block = first(&level, ActorKind::DirtBlock);
        run(&mut level, KeyInputs::toward(Direction::Right), 12);
        assert_eq!(level.actor(chip).position, pos(1, 0));
        assert_eq!(level.actor(block).position, pos(2, 0));
    }

    #[test]
    fn ice_bonk_reverses() {
        let mut level = level(&["P__#"], &[('P', "floor chip:r")]);
        let chip = first(&level, ActorKind::Chip);
        run(&mut level, KeyInputs::toward(Direction::Right), 3);
        run(&mut level, KeyInputs::default(), 13);
        // Bonked off the wall on subtick 14, now sliding back
        assert_eq!(level.actor(chip).direction, Direction::Left);
        assert_eq!(level.actor(chip).sliding, SlidingState::Strong);
        run(&mut level, KeyInputs::default(), 30);
        assert_eq!(level.actor(chip).position, pos(0, 0));
        assert_eq!(level.actor(chip).sliding, SlidingState::None);
    }

    // ── Items ──

    #[test]
    fn items_stop_monsters() {
        let mut level = level(&["A+.", "###", "@.."], &[('A', "floor ant:r"), ('+', "floor bootFire")]);
        let ant = first(&level, ActorKind::Ant);
        run(&mut level, KeyInputs::default(), 36);
        assert_eq!(level.actor(ant).position, pos(0, 0));
        assert!(level.top(pos(1, 0), Layer::Item).is_some());
    }

    #[test]
    fn dirt_blocks_cannot_be_pushed_onto_items() {
        let mut level = level(&["PB+"], &[('P', "floor chip:r"), ('+', "floor bootFire")]);
        let chip = first(&level, ActorKind::Chip);
        let block = first(&level, ActorKind::DirtBlock);
        run(&mut level, KeyInputs::toward(Direction::Right), 12);
        assert_eq!(level.actor(chip).position, pos(0, 0));
        assert_eq!(level.actor(block).position, pos(1, 0));
    }

    #[test]
    fn ice_blocks_slide_over_items() {
        let mut level = level(&["PI+"], &[('P', "floor chip:r"), ('I', "floor iceBlock"), ('+', "floor bootFire")]);
        let chip = first(&level, ActorKind::Chip);
        let block = first(&level, ActorKind::IceBlock);
        run(&mut level, KeyInputs::toward(Direction::Right), 12);
        assert_eq!(level.actor(chip).position, pos(1, 0));
        assert_eq!(level.actor(block).position, pos(2, 0));
        assert!(level.top(pos(2, 0), Layer::Item).is_some());
    }

    #[test]
    fn no_sign_guards_its_item_but_not_its_block() {
        use crate::domain::kind::KeyColor;
        let legend = [('P', "floor chip:r"), ('K', "floor keyRed noSign")];

        // Holding the key under the sign keeps the chip out
        let mut held = level(&["PK"], &legend);
        let chip = first(&held, ActorKind::Chip);
        held.actor_mut(chip).inventory.add_key(KeyColor::Red);
        held.actor_mut(chip).recompute_tags();
        run(&mut held, KeyInputs::toward(Direction::Right), 12);
        assert_eq!(held.actor(chip).position, pos(0, 0));

        // Without it the chip walks on and leaves the key
        let mut free = level(&["PK"], &legend);
        let chip = first(&free, ActorKind::Chip);
        run(&mut free, KeyInputs::toward(Direction::Right), 15);
        assert_eq!(free.actor(chip).position, pos(1, 0));
        assert!(!free.actor(chip).inventory.has_key(KeyColor::Red));
        assert!(free.top(pos(1, 0), Layer::Item).is_some());

        // A block resting on a sign is still pushed
        let mut pushed = level(&["PN."], &[('P', "floor chip:r"), ('N', "floor noSign dirtBlock")]);
        let chip = first(&pushed, ActorKind::Chip);
        let block = first(&pushed, ActorKind::DirtBlock);
        run(&mut pushed, KeyInputs::toward(Direction::Right), 12);
        assert_eq!(pushed.actor(chip).position, pos(1, 0));
        assert_eq!(pushed.actor(block).position, pos(2, 0));
    }

    // ── Terrain ──

    #[test]
    fn random_force_floors_take_turns() {
        let mut level = level(&["RRRRR"], &[('R', "forceFloorRandom dirtBlock")]);
        start(&mut level);
        let dirs: Vec<Direction> = (0..5)
            .map(|x| level.top(pos(x, 0), Layer::Movable).map(|b| level.actor(b).direction).expect("block"))
            .collect();
        use Direction::*;
        assert_eq!(dirs, vec![Up, Right, Down, Left, Up]);
        assert_eq!(level.rff_direction, Right);
    }

    #[test]
    fn trap_holds_until_button_pressed() {
        let mut level = level(&["K..", "Pb."], &[('K', "trap ball:r"), ('P', "floor chip:r"), ('b', "buttonBrown")]);
        let ball = first(&level, ActorKind::Ball);
        let trap = first(&level, ActorKind::Trap);
        let right = KeyInputs::toward(Direction::Right);
        run(&mut level, right, 3);
        // The chip is on its way to the button; the ball stays put
        assert_eq!(level.actor(ball).position, pos(0, 0));
        // Pressed on subtick 13, the second subtick of tick 4
        run(&mut level, right, 11);
        assert_eq!(level.actor(trap).counter, 1);
        assert_eq!(level.actor(ball).position, pos(0, 0));
        // Released on the last subtick of the same tick
        run(&mut level, right, 1);
        assert_eq!(level.actor(ball).position, pos(1, 0));
        assert_eq!((level.current_tick, level.subtick), (5, 0));
    }

    #[test]
    fn red_button_clones() {
        let mut level = level(&["M..", "Pr."], &[('M', "cloneMachine ball:r"), ('P', "floor chip:r"), ('r', "buttonRed")]);
        run(&mut level, KeyInputs::toward(Direction::Right), 14);
        let balls: Vec<Position> = level
            .order
            .iter()
            .filter(|&&a| level.kind(a) == ActorKind::Ball)
            .map(|&a| level.actor(a).position)
            .collect();
        assert_eq!(balls.len(), 2);
        assert!(balls.contains(&pos(0, 0)));
        assert!(balls.contains(&pos(1, 0)));
    }

    #[test]
    fn explicit_connection_drives_trap() {
        let mut desc = loader::from_diagram(&["KT.", "Pb."], &[('K', "trap ball:r"), ('T', "trap"), ('P', "floor chip:r"), ('b', "buttonBrown")])
            .expect("diagram");
        desc.connections.push(Connection { from: pos(1, 1), to: pos(1, 0) });
        let mut level = loader::load(&desc, SeedTriple::default()).expect("load");
        let ball = first(&level, ActorKind::Ball);
        run(&mut level, KeyInputs::toward(Direction::Right), 30);
        // The other trap was opened; this one never was
        assert_eq!(level.actor(ball).position, pos(0, 0));
    }

    // ── Game state ──

    #[test]
    fn exit_wins_and_reports() {
        let mut level = level(&["PE"], &[('P', "floor chip:r")]);
        let mut events = Vec::new();
        for _ in 0..20 {
            level.seats[0].input = KeyInputs::toward(Direction::Right);
            events.extend(tick(&mut level));
        }
        assert_eq!(level.game_state, GameState::Won);
        assert!(events.contains(&GameEvent::Won));
        assert!(events.iter().any(|e| matches!(e, GameEvent::PlayableExited { .. })));
    }

    #[test]
    fn timer_runs_out() {
        let mut desc = loader::from_diagram(&["@"], &[]).expect("diagram");
        desc.metadata.time_limit = 1;
        let mut level = loader::load(&desc, SeedTriple::default()).expect("load");
        run(&mut level, KeyInputs::default(), 59);
        assert_eq!(level.game_state, GameState::Playing);
        assert_eq!(level.time_left, 1);
        let events = tick(&mut level);
        assert_eq!(level.game_state, GameState::Timeout);
        assert!(events.contains(&GameEvent::TimedOut));
    }

    #[test]
    fn drowning_loses() {
        let mut level = level(&["P~"], &[('P', "floor chip:r")]);
        run(&mut level, KeyInputs::toward(Direction::Right), 15);
        assert_eq!(level.game_state, GameState::Lost);
        assert!(level.playables.is_empty());
    }

    #[test]
    fn green_button_toggles_after_the_subtick() {
        let mut level = level(&["Pgw"], &[('P', "floor chip:r"), ('g', "buttonGreen"), ('w', "toggleWall")]);
        let wall = first(&level, ActorKind::ToggleWall);
        run(&mut level, KeyInputs::toward(Direction::Right), 14);
        assert!(level.actor(wall).toggled);
        assert!(level.after_tick.is_empty());
    }

    // ── Properties ──

    const ARENA: &[&str] = &[
        "#########",
        "#..B..b.#",
        "#.RR_.a.#",
        "#.@..~.c#",
        "#G..G..E#",
        "#########",
    ];
    const ARENA_LEGEND: &[(char, &str)] = &[
        ('R', "forceFloorRandom"),
        ('b', "floor blob:d"),
        ('a', "floor walker:l"),
        ('G', "teleportGreen"),
    ];

    fn arena(seed: SeedTriple) -> LevelState {
        let mut desc = loader::from_diagram(ARENA, ARENA_LEGEND).expect("diagram");
        desc.metadata.blob_mode = 256;
        loader::load(&desc, seed).expect("load")
    }

    fn layers_exclusive(level: &LevelState) -> bool {
        level.grid.iter().all(|t| Layer::ALL.iter().all(|&l| t.layer(l).len() <= 1))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn runs_are_deterministic(inputs in prop::collection::vec(0u8..0x80, 1..40), rng_seed: u16, blob_seed: u8) {
            let seed = SeedTriple { rng_seed, blob_seed, rff_direction: Direction::Up };
            let mut a = arena(seed);
            let mut b = arena(seed);
            for &byte in &inputs {
                for _ in 0..3 {
                    a.seats[0].input = KeyInputs::from_byte(byte);
                    b.seats[0].input = KeyInputs::from_byte(byte);
                    let ea = tick(&mut a);
                    let eb = tick(&mut b);
                    prop_assert_eq!(ea, eb);
                }
            }
            prop_assert_eq!(crate::sim::save::capture(&a), crate::sim::save::capture(&b));
            prop_assert_eq!(a.rng.random(), b.rng.random());
        }

        #[test]
        fn one_actor_per_layer_between_ticks(inputs in prop::collection::vec(0u8..0x10, 1..40), rng_seed: u16) {
            let mut level = arena(SeedTriple { rng_seed, ..SeedTriple::default() });
            for &byte in &inputs {
                for _ in 0..3 {
                    level.seats[0].input = KeyInputs::from_byte(byte);
                    tick(&mut level);
                    prop_assert!(layers_exclusive(&level));
                }
            }
        }
    }
}
