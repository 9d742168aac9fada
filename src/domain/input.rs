/// Per-seat key state and its byte encoding.
///
/// Input byte bits: up=0x01, right=0x02, down=0x04, left=0x08,
/// drop=0x10, cycle=0x20, switch=0x40.
///
/// Drop / cycle / switch are edge-like actions: they are debounced so a held
/// key fires once, then auto-repeats every subtick after `DEBOUNCE_PERIOD`
/// subticks of holding.

use serde::{Deserialize, Serialize};

use super::direction::Direction;

pub const INPUT_UP: u8 = 0x01;
pub const INPUT_RIGHT: u8 = 0x02;
pub const INPUT_DOWN: u8 = 0x04;
pub const INPUT_LEFT: u8 = 0x08;
pub const INPUT_DROP: u8 = 0x10;
pub const INPUT_CYCLE: u8 = 0x20;
pub const INPUT_SWITCH: u8 = 0x40;

/// Subticks a held action key waits before auto-repeating.
pub const DEBOUNCE_PERIOD: i32 = 50;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct KeyInputs {
    pub up: bool,
    pub right: bool,
    pub down: bool,
    pub left: bool,
    pub drop: bool,
    pub cycle: bool,
    pub switch: bool,
}

impl KeyInputs {
    pub fn from_byte(b: u8) -> Self {
        KeyInputs {
            up: b & INPUT_UP != 0,
            right: b & INPUT_RIGHT != 0,
            down: b & INPUT_DOWN != 0,
            left: b & INPUT_LEFT != 0,
            drop: b & INPUT_DROP != 0,
            cycle: b & INPUT_CYCLE != 0,
            switch: b & INPUT_SWITCH != 0,
        }
    }

    pub fn to_byte(self) -> u8 {
        let mut b = 0;
        if self.up { b |= INPUT_UP; }
        if self.right { b |= INPUT_RIGHT; }
        if self.down { b |= INPUT_DOWN; }
        if self.left { b |= INPUT_LEFT; }
        if self.drop { b |= INPUT_DROP; }
        if self.cycle { b |= INPUT_CYCLE; }
        if self.switch { b |= INPUT_SWITCH; }
        b
    }

    /// Single held direction, for tests and simple drivers.
    pub fn toward(dir: Direction) -> Self {
        let mut k = KeyInputs::default();
        match dir {
            Direction::Up => k.up = true,
            Direction::Right => k.right = true,
            Direction::Down => k.down = true,
            Direction::Left => k.left = true,
        }
        k
    }

    /// (vertical, horizontal) movement. Opposing keys on one axis cancel
    /// that axis only.
    pub fn movement_directions(self) -> (Option<Direction>, Option<Direction>) {
        let vert = match (self.up, self.down) {
            (true, false) => Some(Direction::Up),
            (false, true) => Some(Direction::Down),
            _ => None,
        };
        let horiz = match (self.right, self.left) {
            (true, false) => Some(Direction::Right),
            (false, true) => Some(Direction::Left),
            _ => None,
        };
        (vert, horiz)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Drop,
    Cycle,
    Switch,
}

/// Debounce counters for the three action keys.
///
/// 0 = ready, >0 = waiting, -1 = auto-repeating.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
pub struct Debounce {
    drop: i32,
    cycle: i32,
    switch: i32,
}

impl Debounce {
    fn slot(&mut self, action: Action) -> &mut i32 {
        match action {
            Action::Drop => &mut self.drop,
            Action::Cycle => &mut self.cycle,
            Action::Switch => &mut self.switch,
        }
    }

    pub fn ready(&self, action: Action) -> bool {
        let v = match action {
            Action::Drop => self.drop,
            Action::Cycle => self.cycle,
            Action::Switch => self.switch,
        };
        v <= 0
    }

    /// Marks an action as just fired.
    pub fn fire(&mut self, action: Action) {
        let slot = self.slot(action);
        if *slot != -1 {
            *slot = DEBOUNCE_PERIOD;
        }
    }

    /// Advances the counters after a subtick.
    pub fn advance(&mut self, input: KeyInputs) {
        for (held, action) in [(input.drop, Action::Drop), (input.cycle, Action::Cycle), (input.switch, Action::Switch)] {
            let slot = self.slot(action);
            if !held {
                *slot = 0;
            } else if *slot == 0 {
                *slot = DEBOUNCE_PERIOD;
            } else if *slot != -1 {
                if *slot == 1 {
                    *slot -= 1;
                }
                *slot -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_encoding_matches_bits() {
        let k = KeyInputs { up: true, left: true, drop: true, ..Default::default() };
        assert_eq!(k.to_byte(), 0x01 | 0x08 | 0x10);
        assert_eq!(KeyInputs::from_byte(0x19), k);
        assert_eq!(KeyInputs::from_byte(0x7f).to_byte(), 0x7f);
    }

    #[test]
    fn opposing_keys_cancel_per_axis() {
        let k = KeyInputs { up: true, down: true, right: true, ..Default::default() };
        assert_eq!(k.movement_directions(), (None, Some(Direction::Right)));
        let k = KeyInputs { left: true, down: true, ..Default::default() };
        assert_eq!(k.movement_directions(), (Some(Direction::Down), Some(Direction::Left)));
    }

    #[test]
    fn held_action_fires_once_then_repeats() {
        let held = KeyInputs { drop: true, ..Default::default() };
        let mut d = Debounce::default();
        assert!(d.ready(Action::Drop));
        d.fire(Action::Drop);
        d.advance(held);
        let mut waited = 1;
        while !d.ready(Action::Drop) {
            d.advance(held);
            waited += 1;
        }
        assert_eq!(waited, DEBOUNCE_PERIOD as usize);
        // Auto-repeat: firing no longer re-arms the wait
        d.fire(Action::Drop);
        assert!(d.ready(Action::Drop));
    }

    #[test]
    fn releasing_resets() {
        let mut d = Debounce::default();
        d.fire(Action::Switch);
        d.advance(KeyInputs::default());
        assert!(d.ready(Action::Switch));
    }
}
