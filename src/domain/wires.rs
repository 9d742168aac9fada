/// Wire topology rules and logic gate evaluation.
///
/// Pure functions only: which edges of a tile conduct into which, and what a
/// gate drives given its inputs. Circuit building and propagation live in
/// `sim::wires`.

use serde::Serialize;

use super::direction::Direction;

pub const WIRE_UP: u8 = 0b0001;
pub const WIRE_RIGHT: u8 = 0b0010;
pub const WIRE_DOWN: u8 = 0b0100;
pub const WIRE_LEFT: u8 = 0b1000;
pub const WIRES_ALL: u8 = 0b1111;
const WIRES_VERTICAL: u8 = WIRE_UP | WIRE_DOWN;
const WIRES_HORIZONTAL: u8 = WIRE_RIGHT | WIRE_LEFT;

/// How a terrain kind treats the wires drawn on its tile.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum WireOverlapMode {
    /// Wires are ignored entirely.
    None,
    /// Listens to adjacent wires through every edge without carrying them.
    Read,
    /// Passes through; a full cross keeps vertical and horizontal apart.
    Cross,
    /// Vertical and horizontal are always kept apart.
    AlwaysCross,
    /// Every edge is its own circuit.
    Overlap,
    /// Every wired edge is joined.
    Everywhere,
}

impl WireOverlapMode {
    /// Edges of the same tile joined to `entry`, including `entry` itself.
    /// `wires` is the tile's wire mask.
    pub fn connected_edges(self, wires: u8, entry: Direction) -> u8 {
        let e = entry.wire_bit();
        let axis = if entry.is_horizontal() { WIRES_HORIZONTAL } else { WIRES_VERTICAL };
        match self {
            WireOverlapMode::None => 0,
            WireOverlapMode::Read | WireOverlapMode::Overlap => e,
            WireOverlapMode::Cross if wires == WIRES_ALL => (axis & wires) | e,
            WireOverlapMode::Cross | WireOverlapMode::Everywhere => wires | e,
            WireOverlapMode::AlwaysCross => (axis & wires) | e,
        }
    }

    /// Can a wire from a neighbour enter through this edge?
    pub fn accepts(self, wires: u8, edge: Direction) -> bool {
        match self {
            WireOverlapMode::None => false,
            WireOverlapMode::Read => true,
            _ => wires & edge.wire_bit() != 0,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Logic gates
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum GateKind {
    Not,
    And,
    Or,
    Xor,
    Nand,
    Latch,
    LatchMirror,
    Counter,
}

/// Per-gate memory. Latches use `latched`; the counter uses `value` and
/// `underflow`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct GateMemory {
    pub latched: bool,
    pub value: u8,
    pub underflow: bool,
}

/// Edge masks relative to a gate's facing.
struct GateEdges {
    front: u8,
    back: u8,
    left: u8,
    right: u8,
}

impl From<Direction> for GateEdges {
    fn from(facing: Direction) -> Self {
        GateEdges {
            front: facing.wire_bit(),
            back: facing.back().wire_bit(),
            left: facing.left().wire_bit(),
            right: facing.right().wire_bit(),
        }
    }
}

/// Output edges of a gate facing `facing`.
///
/// `powered` is the tile's powered mask from the previous pass and
/// `was_powered` the one before it; rising edges are `powered & !was_powered`.
pub fn gate_output(kind: GateKind, facing: Direction, powered: u8, was_powered: u8, mem: &mut GateMemory) -> u8 {
    let e = GateEdges::from(facing);
    let on = |mask: u8| powered & mask != 0;
    let rose = |mask: u8| powered & mask != 0 && was_powered & mask == 0;
    let out = |b: bool| if b { e.front } else { 0 };

    match kind {
        GateKind::Not => out(!on(e.back)),
        GateKind::And => out(on(e.left) && on(e.right)),
        GateKind::Or => out(on(e.left) || on(e.right)),
        GateKind::Xor => out(on(e.left) != on(e.right)),
        GateKind::Nand => out(!(on(e.left) && on(e.right))),
        GateKind::Latch => {
            if on(e.right) {
                mem.latched = on(e.left);
            }
            out(mem.latched)
        }
        GateKind::LatchMirror => {
            if on(e.left) {
                mem.latched = on(e.right);
            }
            out(mem.latched)
        }
        GateKind::Counter => {
            let mut output = 0;
            if rose(e.back) {
                mem.underflow = false;
                if mem.value >= 9 {
                    mem.value = 0;
                    output |= e.front;
                } else {
                    mem.value += 1;
                }
            }
            if rose(e.left) {
                if mem.value == 0 {
                    mem.value = 9;
                    mem.underflow = true;
                } else {
                    mem.value -= 1;
                }
            }
            if mem.underflow {
                output |= e.right;
            }
            output
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Facing UP: front=UP, back=DOWN, left=LEFT, right=RIGHT
    const F: Direction = Direction::Up;

    fn eval(kind: GateKind, powered: u8) -> u8 {
        gate_output(kind, F, powered, 0, &mut GateMemory::default())
    }

    #[test]
    fn two_input_truth_tables() {
        let cases = [(0, 0), (WIRE_LEFT, 0), (WIRE_RIGHT, 0), (WIRE_LEFT | WIRE_RIGHT, 0)];
        let expect = |kind, table: [bool; 4]| {
            for (i, (p, _)) in cases.iter().enumerate() {
                let got = eval(kind, *p) == WIRE_UP;
                assert_eq!(got, table[i], "{:?} with inputs {:#06b}", kind, p);
            }
        };
        expect(GateKind::And, [false, false, false, true]);
        expect(GateKind::Or, [false, true, true, true]);
        expect(GateKind::Xor, [false, true, true, false]);
        expect(GateKind::Nand, [true, true, true, false]);
    }

    #[test]
    fn not_reads_back_edge_only() {
        assert_eq!(eval(GateKind::Not, 0), WIRE_UP);
        assert_eq!(eval(GateKind::Not, WIRE_DOWN), 0);
        assert_eq!(eval(GateKind::Not, WIRE_LEFT | WIRE_RIGHT), WIRE_UP);
    }

    #[test]
    fn gates_rotate_with_facing() {
        // Facing RIGHT: back is LEFT, output is RIGHT
        let out = gate_output(GateKind::Not, Direction::Right, 0, 0, &mut GateMemory::default());
        assert_eq!(out, WIRE_RIGHT);
        let out = gate_output(GateKind::Not, Direction::Right, WIRE_LEFT, 0, &mut GateMemory::default());
        assert_eq!(out, 0);
    }

    #[test]
    fn latch_holds_data_while_clock_low() {
        let mut mem = GateMemory::default();
        // Clock high, data high: store
        assert_eq!(gate_output(GateKind::Latch, F, WIRE_LEFT | WIRE_RIGHT, 0, &mut mem), WIRE_UP);
        // Clock low, data low: hold
        assert_eq!(gate_output(GateKind::Latch, F, 0, 0, &mut mem), WIRE_UP);
        // Clock high, data low: clear
        assert_eq!(gate_output(GateKind::Latch, F, WIRE_RIGHT, 0, &mut mem), 0);
    }

    #[test]
    fn mirrored_latch_swaps_sides() {
        let mut mem = GateMemory::default();
        assert_eq!(gate_output(GateKind::LatchMirror, F, WIRE_LEFT | WIRE_RIGHT, 0, &mut mem), WIRE_UP);
        // Right high alone does not clock a mirrored latch
        assert_eq!(gate_output(GateKind::LatchMirror, F, WIRE_RIGHT, WIRE_LEFT | WIRE_RIGHT, &mut mem), WIRE_UP);
    }

    #[test]
    fn counter_wraps_and_underflows() {
        let mut mem = GateMemory { value: 8, ..Default::default() };
        // Rising back edge: 8 -> 9, no output
        assert_eq!(gate_output(GateKind::Counter, F, WIRE_DOWN, 0, &mut mem), 0);
        assert_eq!(mem.value, 9);
        // Held high: no new edge
        assert_eq!(gate_output(GateKind::Counter, F, WIRE_DOWN, WIRE_DOWN, &mut mem), 0);
        // Next rising edge wraps to 0 and pulses the front
        assert_eq!(gate_output(GateKind::Counter, F, WIRE_DOWN, 0, &mut mem), WIRE_UP);
        assert_eq!(mem.value, 0);
        // Pulse lasts one pass
        assert_eq!(gate_output(GateKind::Counter, F, 0, WIRE_DOWN, &mut mem), 0);
        // Decrement from 0 underflows and holds the right edge
        assert_eq!(gate_output(GateKind::Counter, F, WIRE_LEFT, 0, &mut mem), WIRE_RIGHT);
        assert_eq!(mem.value, 9);
        assert_eq!(gate_output(GateKind::Counter, F, 0, WIRE_LEFT, &mut mem), WIRE_RIGHT);
    }

    // ── Topology ──

    #[test]
    fn full_cross_keeps_axes_apart() {
        let m = WireOverlapMode::Cross;
        assert_eq!(m.connected_edges(WIRES_ALL, Direction::Left), WIRES_HORIZONTAL);
        assert_eq!(m.connected_edges(WIRES_ALL, Direction::Up), WIRES_VERTICAL);
        // A T-junction joins everything
        let t = WIRE_LEFT | WIRE_RIGHT | WIRE_DOWN;
        assert_eq!(m.connected_edges(t, Direction::Left), t);
    }

    #[test]
    fn overlap_and_read_isolate_edges() {
        assert_eq!(WireOverlapMode::Overlap.connected_edges(WIRES_ALL, Direction::Down), WIRE_DOWN);
        assert!(WireOverlapMode::Read.accepts(0, Direction::Up));
        assert!(!WireOverlapMode::None.accepts(WIRES_ALL, Direction::Up));
        assert!(!WireOverlapMode::Cross.accepts(WIRE_UP, Direction::Down));
    }
}
