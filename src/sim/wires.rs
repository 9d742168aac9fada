/// Circuit building and power propagation.
///
/// ## Building
///
/// At load, every wired edge not yet in a circuit is traced into a new
/// [`CircuitCity`]. Tracing walks wire segments tile to tile; a tunnel
/// edge on a floor jumps to the matching tunnel further along the same
/// line, counting nested tunnels. Which edges of a tile join each other is
/// decided by its terrain's [`WireOverlapMode`].
///
/// ## Propagation
///
/// Once per subtick each circuit asks its emitters whether they drive any
/// of their member edges. Every touched tile recomputes exactly once per
/// pass, guarded by a parity bit: it stores what it drives now (computed
/// from last pass's `powered_wires`), moves `powered_wires` to
/// `was_powered`, and starts over from zero. Gates therefore answer one
/// pass late.

use serde::Serialize;
use tracing::debug;

use crate::domain::actor::ActorId;
use crate::domain::direction::Direction;
use crate::domain::kind::ActorKind;
use crate::domain::tile::{Layer, Position};
use crate::domain::wires::{gate_output, WireOverlapMode, WIRES_ALL};
use super::hooks;
use super::level::LevelState;

/// A maximal group of wire edges sharing one power state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CircuitCity {
    /// Member tiles and the edges they contribute, in reading order.
    pub members: Vec<(Position, u8)>,
    /// Members whose terrain drives power.
    pub emitters: Vec<(Position, u8)>,
}

impl CircuitCity {
    #[inline]
    pub fn contains(&self, pos: Position, wires: u8) -> bool {
        self.members.iter().any(|&(p, w)| p == pos && w & wires != 0)
    }

    fn member_mut(list: &mut Vec<(Position, u8)>, pos: Position) -> &mut u8 {
        let idx = match list.iter().position(|&(p, _)| p == pos) {
            Some(i) => i,
            None => {
                list.push((pos, 0));
                list.len() - 1
            }
        };
        &mut list[idx].1
    }
}

// ══════════════════════════════════════════════════════════════
// Topology
// ══════════════════════════════════════════════════════════════

fn mode_at(level: &LevelState, pos: Position) -> WireOverlapMode {
    level.top(pos, Layer::Terrain).map_or(WireOverlapMode::None, |t| level.kind(t).wire_mode())
}

/// Edges of `pos` joined to the wire entering through `edge`.
fn connected(level: &LevelState, pos: Position, edge: Direction, allow_tunnel: bool) -> u8 {
    let Some(tile) = level.tile(pos) else { return 0 };
    let mode = mode_at(level, pos);
    let exposed = if allow_tunnel { tile.wires } else { tile.wires & !tile.wire_tunnels };
    if !mode.accepts(exposed, edge) {
        return 0;
    }
    mode.connected_edges(tile.wires, edge)
}

/// The tunnel exit matching an entrance at `from` heading `dir`.
fn matching_tunnel(level: &LevelState, from: Position, dir: Direction) -> Option<Position> {
    let open = dir.wire_bit();
    let close = dir.back().wire_bit();
    let mut depth = 0u32;
    let mut pos = from;
    while let Some(next) = level.grid.neighbor(pos, dir) {
        pos = next;
        let tunnels = level.tile(pos).map_or(0, |t| t.wire_tunnels);
        if tunnels & close != 0 {
            if depth == 0 {
                return Some(pos);
            }
            depth -= 1;
        }
        if tunnels & open != 0 {
            depth += 1;
        }
    }
    None
}

/// Traces the circuit reached through `edge` of `start`. Empty when that
/// edge carries nothing.
fn trace(level: &mut LevelState, start: Position, edge: Direction, consumers: &mut Vec<Position>) -> CircuitCity {
    let mut city = CircuitCity::default();
    // (position, travel direction, arrived through a tunnel)
    let mut stack = vec![(start, edge.back(), true)];
    let mut initial = true;

    while let Some((pos, travel, allow_tunnel)) = stack.pop() {
        let wires = connected(level, pos, travel.back(), allow_tunnel);
        if wires == 0 {
            if initial { return city; }
            continue;
        }
        // A reader alone does not make a circuit; its neighbour must carry wire
        if initial && mode_at(level, pos) == WireOverlapMode::Read {
            let real = level.grid.neighbor(pos, travel.back()).is_some_and(|n| {
                !matches!(mode_at(level, n), WireOverlapMode::None | WireOverlapMode::Read)
                    && connected(level, n, travel, false) != 0
            });
            if !real { return city; }
        }
        initial = false;

        if let Some(tile) = level.grid.get_mut(pos) {
            tile.is_wired = true;
        }
        *CircuitCity::member_mut(&mut city.members, pos) |= wires;
        if let Some(t) = level.top(pos, Layer::Terrain) {
            let kind = level.kind(t);
            if kind.provides_power() {
                *CircuitCity::member_mut(&mut city.emitters, pos) |= wires;
            }
            if kind.is_wire_consumer() && !consumers.contains(&pos) {
                consumers.push(pos);
            }
        }

        let tunnels = level.tile(pos).map_or(0, |t| t.wire_tunnels);
        for dir in Direction::ALL {
            let bit = dir.wire_bit();
            if wires & bit == 0 { continue; }
            let through_tunnel = tunnels & bit != 0;
            let next = if through_tunnel { matching_tunnel(level, pos, dir) } else { level.grid.neighbor(pos, dir) };
            let Some(next) = next else { continue };
            if city.contains(next, dir.back().wire_bit()) { continue; }
            stack.push((next, dir, through_tunnel));
        }
    }
    city.members.sort_by_key(|&(p, _)| (p.y, p.x));
    city
}

/// Builds every circuit of the level and records membership on tiles.
pub fn build(level: &mut LevelState) {
    let mut circuits: Vec<CircuitCity> = Vec::new();
    let mut consumers: Vec<Position> = Vec::new();
    for idx in 0..level.grid.len() {
        let pos = level.grid.position_at(idx);
        if mode_at(level, pos) == WireOverlapMode::None { continue; }
        for dir in Direction::ALL {
            if circuits.iter().any(|c| c.contains(pos, dir.wire_bit())) { continue; }
            let city = trace(level, pos, dir, &mut consumers);
            if city.members.is_empty() { continue; }
            circuits.push(city);
        }
    }

    for (ci, city) in circuits.iter().enumerate() {
        for &(pos, wires) in &city.members {
            let Some(tile) = level.grid.get_mut(pos) else { continue };
            for dir in Direction::ALL {
                if wires & dir.wire_bit() != 0 {
                    tile.circuits[dir.index() as usize] = Some(ci);
                }
            }
        }
    }

    consumers.sort_by_key(|&p| std::cmp::Reverse((p.y, p.x)));
    level.wire_consumers = consumers
        .into_iter()
        .filter_map(|p| level.top(p, Layer::Terrain))
        .filter(|&t| level.kind(t).is_wire_consumer())
        .collect();
    debug!(circuits = circuits.len(), consumers = level.wire_consumers.len(), "circuits built");
    level.circuits = circuits;
}

// ══════════════════════════════════════════════════════════════
// Propagation
// ══════════════════════════════════════════════════════════════

/// What the terrain on `pos` drives this pass.
fn give_power(level: &mut LevelState, pos: Position) -> u8 {
    let Some(t) = level.top(pos, Layer::Terrain) else { return 0 };
    match level.kind(t) {
        ActorKind::ButtonPink => {
            if level.has_movable(pos) { WIRES_ALL } else { 0 }
        }
        ActorKind::ToggleSwitch => {
            if level.actor(t).toggled { WIRES_ALL } else { 0 }
        }
        kind => {
            let Some(gate) = kind.gate_kind() else { return 0 };
            let Some(tile) = level.tile(pos) else { return 0 };
            let (powered, was) = (tile.powered_wires, tile.was_powered);
            let a = level.actor_mut(t);
            gate_output(gate, a.direction, powered, was, &mut a.gate)
        }
    }
}

fn recalculate(level: &mut LevelState, pos: Position, parity: bool) {
    if level.tile(pos).is_some_and(|t| t.parity == parity) { return; }
    let powering = give_power(level, pos);
    if let Some(tile) = level.grid.get_mut(pos) {
        tile.parity = parity;
        tile.powering_wires = powering;
        tile.was_powered = tile.powered_wires;
        tile.powered_wires = 0;
    }
}

/// One propagation pass followed by consumer notification.
pub fn propagate(level: &mut LevelState) {
    level.wire_parity = !level.wire_parity;
    let parity = level.wire_parity;

    for ci in 0..level.circuits.len() {
        let mut powered = false;
        for ei in 0..level.circuits[ci].emitters.len() {
            let (pos, wires) = level.circuits[ci].emitters[ei];
            recalculate(level, pos, parity);
            if level.tile(pos).is_some_and(|t| t.powering_wires & wires != 0) {
                powered = true;
                break;
            }
        }
        for mi in 0..level.circuits[ci].members.len() {
            let (pos, wires) = level.circuits[ci].members[mi];
            recalculate(level, pos, parity);
            if !powered { continue; }
            if let Some(tile) = level.grid.get_mut(pos) {
                tile.powered_wires |= wires;
            }
        }
    }
    notify(level);
}

fn notify(level: &mut LevelState) {
    let consumers: Vec<ActorId> = level.wire_consumers.clone();
    for id in consumers {
        if !level.exists(id) { continue; }
        let Some((powered, was)) = level.tile_of(id).map(|t| (t.powered_wires, t.was_powered)) else { continue };
        hooks::receive_power(level, id, powered);
        if !level.exists(id) { continue; }
        if powered != 0 && was == 0 {
            hooks::on_wire_high(level, id);
        } else if powered == 0 && was != 0 {
            hooks::on_wire_low(level, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rng::LevelRng;
    use crate::domain::wires::{WIRE_DOWN, WIRE_LEFT, WIRE_RIGHT, WIRE_UP};
    use crate::sim::loader::LevelMetadata;

    fn place(level: &mut LevelState, kind: ActorKind, x: u32, y: u32, dir: Direction, wires: u8) -> ActorId {
        let pos = Position::new(x, y);
        let id = level.spawn(kind, pos, dir, "");
        if let Some(tile) = level.grid.get_mut(pos) {
            tile.wires = wires;
        }
        id
    }

    #[test]
    fn gate_output_lags_one_pass() {
        let mut level = LevelState::new(2, 2, LevelMetadata::default(), LevelRng::default());
        let switch = place(&mut level, ActorKind::ToggleSwitch, 0, 0, Direction::Up, WIRE_RIGHT);
        // Facing down: the switch feeds its left-hand side, output goes down
        place(&mut level, ActorKind::GateOr, 1, 0, Direction::Down, WIRES_ALL);
        place(&mut level, ActorKind::Floor, 0, 1, Direction::Up, 0);
        place(&mut level, ActorKind::Floor, 1, 1, Direction::Up, WIRE_UP);
        level.actor_mut(switch).toggled = true;
        build(&mut level);

        let gate = Position::new(1, 0);
        let out = Position::new(1, 1);
        assert!(level.tile(out).is_some_and(|t| t.is_wired));

        propagate(&mut level);
        assert_eq!(level.tile(gate).map(|t| t.powered_wires & WIRE_LEFT), Some(WIRE_LEFT));
        assert_eq!(level.tile(out).map(|t| t.powered_wires), Some(0));

        propagate(&mut level);
        assert_eq!(level.tile(out).map(|t| t.powered_wires), Some(WIRE_UP));
        assert_eq!(level.tile(gate).map(|t| t.powered_wires & WIRE_DOWN), Some(WIRE_DOWN));
    }

    #[test]
    fn full_cross_floor_makes_two_circuits() {
        let mut level = LevelState::new(3, 3, LevelMetadata::default(), LevelRng::default());
        for y in 0..3 {
            for x in 0..3 {
                let wires = match (x, y) {
                    (1, 1) => WIRES_ALL,
                    (1, _) => WIRE_UP | WIRE_DOWN,
                    (_, 1) => WIRE_LEFT | WIRE_RIGHT,
                    _ => 0,
                };
                place(&mut level, ActorKind::Floor, x, y, Direction::Up, wires);
            }
        }
        build(&mut level);
        assert_eq!(level.circuits.len(), 2);
        let centre = level.tile(Position::new(1, 1)).map(|t| t.circuits).unwrap_or_default();
        assert_eq!(centre[0], centre[2]);
        assert_eq!(centre[1], centre[3]);
        assert_ne!(centre[0], centre[1]);
    }

    #[test]
    fn tunnels_jump_to_matching_exit() {
        let mut level = LevelState::new(5, 1, LevelMetadata::default(), LevelRng::default());
        for x in 0..5 {
            place(&mut level, ActorKind::Floor, x, 0, Direction::Up, 0);
        }
        for (x, wires) in [(0, WIRE_RIGHT), (4, WIRE_LEFT)] {
            if let Some(t) = level.grid.get_mut(Position::new(x, 0)) {
                t.wires = wires;
                t.wire_tunnels = wires;
            }
        }
        build(&mut level);
        assert_eq!(level.circuits.len(), 1);
        assert_eq!(level.circuits[0].members, vec![(Position::new(0, 0), WIRE_RIGHT), (Position::new(4, 0), WIRE_LEFT)]);
        assert!(!level.tile(Position::new(2, 0)).is_some_and(|t| t.is_wired));
    }

    #[test]
    fn powered_trap_opens() {
        let mut level = LevelState::new(2, 1, LevelMetadata::default(), LevelRng::default());
        let switch = place(&mut level, ActorKind::ToggleSwitch, 0, 0, Direction::Up, WIRE_RIGHT);
        let trap = place(&mut level, ActorKind::Trap, 1, 0, Direction::Up, 0);
        build(&mut level);
        assert_eq!(level.wire_consumers, vec![trap]);
        propagate(&mut level);
        assert!(!level.actor(trap).toggled);
        level.actor_mut(switch).toggled = true;
        propagate(&mut level);
        assert!(level.actor(trap).toggled);
    }
}
