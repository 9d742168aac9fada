/// The simulation: level state, hook dispatch, the subtick loop, wire
/// circuits, level loading, replays and snapshots.

pub mod behavior;
pub mod event;
pub mod hooks;
pub mod level;
pub mod loader;
pub mod movement;
pub mod replay;
pub mod save;
pub mod step;
pub mod wires;
