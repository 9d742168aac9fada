/// Cardinal directions and relative turns.
///
/// Directions are numbered clockwise from UP (0..=3). Relative turns are
/// computed modulo 4, so `right()` of LEFT is UP.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Wraps any integer into a direction (`n mod 4`).
    #[inline]
    pub fn from_index(n: u32) -> Direction {
        Self::ALL[(n % 4) as usize]
    }

    #[inline]
    pub fn right(self) -> Direction { Self::from_index(self.index() as u32 + 1) }
    #[inline]
    pub fn back(self) -> Direction { Self::from_index(self.index() as u32 + 2) }
    #[inline]
    pub fn left(self) -> Direction { Self::from_index(self.index() as u32 + 3) }

    /// Rotates by `quarter_turns` clockwise.
    #[inline]
    pub fn rotate(self, quarter_turns: u32) -> Direction {
        Self::from_index(self.index() as u32 + quarter_turns)
    }

    /// (dx, dy) in grid space; y grows downward.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }

    #[inline]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Right | Direction::Left)
    }

    /// Single wire bit for this edge (UP=1, RIGHT=2, DOWN=4, LEFT=8).
    #[inline]
    pub fn wire_bit(self) -> u8 {
        1 << self.index()
    }
}

/// Directions relative to a facing, as used by monster decision lists.
#[derive(Clone, Copy, Debug)]
pub struct Relative {
    pub forward: Direction,
    pub right: Direction,
    pub backward: Direction,
    pub left: Direction,
}

impl From<Direction> for Relative {
    fn from(facing: Direction) -> Self {
        Relative {
            forward: facing,
            right: facing.right(),
            backward: facing.back(),
            left: facing.left(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_wrap_around() {
        assert_eq!(Direction::Left.right(), Direction::Up);
        assert_eq!(Direction::Up.left(), Direction::Left);
        assert_eq!(Direction::Right.back(), Direction::Left);
        assert_eq!(Direction::Down.rotate(7), Direction::Right);
    }

    #[test]
    fn relative_from_facing() {
        let rel = Relative::from(Direction::Down);
        assert_eq!(rel.forward, Direction::Down);
        assert_eq!(rel.right, Direction::Left);
        assert_eq!(rel.backward, Direction::Up);
        assert_eq!(rel.left, Direction::Right);
    }

    #[test]
    fn wire_bits_are_clockwise_powers() {
        let bits: Vec<u8> = Direction::ALL.iter().map(|d| d.wire_bit()).collect();
        assert_eq!(bits, vec![1, 2, 4, 8]);
    }
}
