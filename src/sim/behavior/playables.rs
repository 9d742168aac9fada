/// Player-controlled actors: input-driven decisions, item keys, swapping.

use crate::domain::actor::{ActorId, SlidingState};
use crate::domain::direction::Direction;
use crate::domain::input::Action;
use crate::domain::tags::{Tag, TagRule};
use crate::sim::event::GlitchKind;
use crate::sim::level::LevelState;
use crate::sim::movement::{self, CheckMode};

const MONSTER_KILLERS: TagRule = TagRule::any(&[Tag::NormalMonster, Tag::AutonomousMonster]);

/// Helmets turn away monster kills.
pub fn should_die(level: &LevelState, me: ActorId, killer: ActorId) -> bool {
    let victim = level.actor(me);
    !(victim.has_tag(Tag::IgnoreDefaultMonsterKill) && MONSTER_KILLERS.matches(level.actor(killer).tags.tags))
}

/// Every playable has to reach an exit unless the level sets a count.
pub fn level_started(level: &mut LevelState, _me: ActorId) {
    if level.metadata.required_exits.is_none() {
        level.playables_left += 1;
    }
}

pub fn decide(level: &mut LevelState, me: ActorId, forced_only: bool) {
    if !level.exists(me) { return; }
    level.actor_mut(me).move_decision = None;
    let seat = level.seat_of(me);
    let (sliding, cooldown) = {
        let a = level.actor(me);
        (a.sliding, a.cooldown)
    };

    // ── Switching ──
    let mut switched = false;
    if seat == Some(0) && (sliding != SlidingState::None || cooldown == 0) {
        let s = &mut level.seats[0];
        if s.input.switch && s.debounce.ready(Action::Switch) {
            s.debounce.fire(Action::Switch);
            level.swap_pending = true;
            switched = true;
        }
    }

    if cooldown > 0 { return; }

    let has_override = level.actor(me).has_override;
    let can_move = seat.is_some()
        && (sliding == SlidingState::None || (sliding == SlidingState::Weak && has_override))
        && !forced_only;

    let (vert, horiz) = match seat {
        Some(s) => level.seats[s].input.movement_directions(),
        None => (None, None),
    };

    if can_move {
        if let Some(s) = seat {
            let seat = &mut level.seats[s];
            if seat.input.cycle && seat.debounce.ready(Action::Cycle) {
                seat.debounce.fire(Action::Cycle);
                level.actor_mut(me).inventory.cycle();
            }
            let seat = &mut level.seats[s];
            if seat.input.drop && seat.debounce.ready(Action::Drop) {
                seat.debounce.fire(Action::Drop);
                level.drop_item(me);
            }
        }
    }

    let idle = vert.is_none() && horiz.is_none();
    if sliding != SlidingState::None && (!can_move || idle) {
        // Forced along, or happy to be
        let a = level.actor_mut(me);
        a.move_decision = Some(a.direction);
        if sliding == SlidingState::Weak {
            a.has_override = true;
        }
        return;
    }
    if !can_move || idle { return; }

    if switched {
        let pos = level.actor(me).position;
        level.add_glitch(GlitchKind::SimultaneousCharacterMovement, pos);
    }

    let from = level.actor(me).position;
    let (decision, bonked) = match (vert, horiz) {
        (Some(d), None) | (None, Some(d)) => {
            let (ok, resolved) = movement::check_collision(level, me, from, d, CheckMode::QUERY);
            (resolved, !ok)
        }
        (Some(v), Some(h)) => {
            let (can_h, h) = movement::check_collision(level, me, from, h, CheckMode::QUERY);
            let (can_v, v) = movement::check_collision(level, me, from, v, CheckMode::QUERY);
            let facing = level.actor(me).direction;
            let pick = match (can_h, can_v) {
                (true, false) => h,
                (false, true) => v,
                // Both blocked: always horizontal
                (false, false) => h,
                (true, true) => prefer_facing(facing, h, v),
            };
            (pick, !can_h && !can_v)
        }
        (None, None) => return,
    };
    if !level.exists(me) { return; }
    let a = level.actor_mut(me);
    a.move_decision = Some(decision);
    a.has_override = bonked;
}

/// Keep going the way we face if either option allows it, else horizontal.
fn prefer_facing(facing: Direction, h: Direction, v: Direction) -> Direction {
    if h == facing { h } else if v == facing { v } else { h }
}
