/// Recorded solutions and headless simulation.
///
/// A replay is a seed triple plus run-length encoded input: pairs of
/// `(input byte, tick count)`. Each decoded input holds for the three
/// subticks of every tick it covers; once the stream runs out the last
/// input stays held.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::domain::direction::Direction;
use crate::domain::input::KeyInputs;
use crate::domain::rng::DEFAULT_BLOB_SEED;
use super::event::Glitch;
use super::level::{GameState, LevelState};
use super::loader::{self, LevelDescription, LevelError};
use super::step;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("input stream has odd length {0}")]
    OddLength(usize),
    #[error("run {index} has a zero tick count")]
    ZeroCount { index: usize },
    #[error("could not read replay {path}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SimulateError {
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

/// Everything random about a run that is not derived from the level.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedTriple {
    pub rng_seed: u16,
    pub blob_seed: u8,
    pub rff_direction: Direction,
}

impl Default for SeedTriple {
    fn default() -> Self {
        SeedTriple { rng_seed: 0, blob_seed: DEFAULT_BLOB_SEED, rff_direction: Direction::Up }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// File stem of the level this replay solves.
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub seed: SeedTriple,
    /// Flat `(input, ticks)` pairs.
    pub inputs: Vec<u8>,
}

impl Replay {
    pub fn from_json(text: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ReplayError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ReplayError::Io { path: path.display().to_string(), source })?;
        Self::from_json(&text)
    }

    /// Decodes the input stream into runs.
    pub fn decode(&self) -> Result<Vec<(KeyInputs, u32)>, ReplayError> {
        decode_rle(&self.inputs)
    }

    pub fn cursor(&self) -> Result<ReplayCursor, ReplayError> {
        Ok(ReplayCursor::new(self.decode()?))
    }
}

pub fn decode_rle(bytes: &[u8]) -> Result<Vec<(KeyInputs, u32)>, ReplayError> {
    if bytes.len() % 2 != 0 {
        return Err(ReplayError::OddLength(bytes.len()));
    }
    bytes
        .chunks_exact(2)
        .enumerate()
        .map(|(index, pair)| match pair[1] {
            0 => Err(ReplayError::ZeroCount { index }),
            n => Ok((KeyInputs::from_byte(pair[0]), n as u32)),
        })
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Cursor
// ══════════════════════════════════════════════════════════════

/// Position inside a decoded replay, advanced once per tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayCursor {
    runs: Vec<(KeyInputs, u32)>,
    run: usize,
    used: u32,
    last: KeyInputs,
}

impl ReplayCursor {
    pub fn new(runs: Vec<(KeyInputs, u32)>) -> Self {
        ReplayCursor { runs, run: 0, used: 0, last: KeyInputs::default() }
    }

    /// Input for the next tick.
    pub fn next_tick(&mut self) -> KeyInputs {
        while self.runs.get(self.run).is_some_and(|&(_, n)| self.used >= n) {
            self.run += 1;
            self.used = 0;
        }
        if let Some(&(input, _)) = self.runs.get(self.run) {
            self.used += 1;
            self.last = input;
        }
        self.last
    }

    pub fn total_ticks(&self) -> u64 {
        self.runs.iter().map(|&(_, n)| n as u64).sum()
    }

    /// Ticks not yet handed out.
    pub fn remaining(&self) -> u64 {
        let Some(&(_, n)) = self.runs.get(self.run) else { return 0 };
        let later: u64 = self.runs[self.run + 1..].iter().map(|&(_, n)| n as u64).sum();
        (n - self.used.min(n)) as u64 + later
    }

    #[inline]
    pub fn finished(&self) -> bool {
        self.remaining() == 0
    }
}

// ══════════════════════════════════════════════════════════════
// Simulation
// ══════════════════════════════════════════════════════════════

/// How a run ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub state: GameState,
    pub ticks: u64,
    /// `tick * 3 + subtick` at the end.
    pub subticks: u64,
    pub time_left: u32,
    pub chips_left: u32,
    pub bonus_points: u64,
    pub glitches: Vec<Glitch>,
}

impl Outcome {
    pub fn of(level: &LevelState) -> Self {
        Outcome {
            state: level.game_state,
            ticks: level.current_tick,
            subticks: level.time(),
            time_left: level.time_left,
            chips_left: level.chips_left,
            bonus_points: level.bonus_points,
            glitches: level.glitches.clone(),
        }
    }
}

pub struct Simulation {
    pub level: LevelState,
    pub outcome: Outcome,
}

/// Ticks a level until it ends or `max_subticks` have run.
pub fn run(level: &mut LevelState, max_subticks: u64) -> Outcome {
    while level.game_state == GameState::Playing && level.time() < max_subticks {
        step::tick(level);
    }
    Outcome::of(level)
}

/// Loads `desc` with the replay's seeds and plays the replay through.
pub fn simulate(desc: &LevelDescription, replay: &Replay, max_subticks: u64) -> Result<Simulation, SimulateError> {
    let cursor = replay.cursor()?;
    let mut level = loader::load(desc, replay.seed)?;
    level.replay = Some(cursor);
    let outcome = run(&mut level, max_subticks);
    info!(
        title = %desc.metadata.title,
        state = ?outcome.state,
        subticks = outcome.subticks,
        glitches = outcome.glitches.len(),
        "replay finished"
    );
    Ok(Simulation { level, outcome })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rle_decoding() {
        let runs = decode_rle(&[0x02, 3, 0x00, 1]).expect("decode");
        assert_eq!(runs, vec![(KeyInputs::toward(Direction::Right), 3), (KeyInputs::default(), 1)]);
        assert!(matches!(decode_rle(&[0x02]), Err(ReplayError::OddLength(1))));
        assert!(matches!(decode_rle(&[0x02, 2, 0x01, 0]), Err(ReplayError::ZeroCount { index: 1 })));
    }

    #[test]
    fn cursor_holds_last_input() {
        let mut cursor = ReplayCursor::new(decode_rle(&[0x01, 2, 0x04, 1]).expect("decode"));
        assert_eq!(cursor.total_ticks(), 3);
        let up = KeyInputs::toward(Direction::Up);
        let down = KeyInputs::toward(Direction::Down);
        assert_eq!(cursor.next_tick(), up);
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(cursor.next_tick(), up);
        assert_eq!(cursor.next_tick(), down);
        assert!(cursor.finished());
        assert_eq!(cursor.next_tick(), down);
        assert_eq!(cursor.next_tick(), down);
    }

    #[test]
    fn replay_json_defaults() {
        let replay = Replay::from_json(r#"{ "inputs": [2, 4] }"#).expect("json");
        assert_eq!(replay.seed, SeedTriple::default());
        let replay = Replay::from_json(r#"{ "seed": { "rng_seed": 9, "rff_direction": "Down" }, "inputs": [] }"#)
            .expect("json");
        assert_eq!(replay.seed.rng_seed, 9);
        assert_eq!(replay.seed.blob_seed, DEFAULT_BLOB_SEED);
        assert_eq!(replay.seed.rff_direction, Direction::Down);
        assert!(matches!(Replay::from_json("{"), Err(ReplayError::Json(_))));
    }

    #[test]
    fn replay_walks_to_the_exit() {
        let desc = loader::from_diagram(&["@.E"], &[('@', "floor chip:r")]).expect("diagram");
        // Right held long enough for both moves
        let replay = Replay { level: None, seed: SeedTriple::default(), inputs: vec![0x02, 8] };
        let sim = simulate(&desc, &replay, 300).expect("simulate");
        assert_eq!(sim.outcome.state, GameState::Won);
        assert!(sim.outcome.glitches.is_empty());
        assert!(sim.level.replay.as_ref().is_some_and(|c| c.total_ticks() == 8));
    }

    #[test]
    fn bad_replay_is_reported_before_loading() {
        let desc = loader::from_diagram(&["."], &[]).expect("diagram");
        let replay = Replay { level: None, seed: SeedTriple::default(), inputs: vec![1] };
        assert!(matches!(simulate(&desc, &replay, 10), Err(SimulateError::Replay(ReplayError::OddLength(1)))));
    }
}
