/// Events emitted during a subtick, plus the glitch log records.
/// Drivers consume events for presentation; glitches are kept on the level
/// for replay verification.

use serde::Serialize;

use crate::domain::kind::{ActorKind, ButtonColor};
use crate::domain::tile::Position;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum GameEvent {
    ActorDestroyed { kind: ActorKind, position: Position },
    ItemPicked { kind: ActorKind, position: Position },
    DoorOpened { kind: ActorKind, position: Position },
    HintShown { position: Position, text: String },
    Teleported { from: Position, to: Position },
    ButtonPressed { color: ButtonColor, position: Position },
    PlayableExited { position: Position },
    PlayablesSwapped,
    Glitch(Glitch),
    Won,
    Lost,
    TimedOut,
    Crashed,
}

/// Which despawn path produced a despawn glitch.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum DespawnSpecifier {
    /// An actor was placed over another on the same layer.
    Replace,
    /// An actor left a tile whose slot had already been taken.
    Remove,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum GlitchKind {
    Despawn(DespawnSpecifier),
    /// Lit dynamite spawned over a movable.
    DynamiteSneaking,
    /// A swap left the previous playable mid-move.
    SimultaneousCharacterMovement,
    DroppingWhileDespawned,
}

impl GlitchKind {
    /// Ends the run in `GameState::Crash`.
    pub fn is_crashing(self) -> bool {
        matches!(self, GlitchKind::DroppingWhileDespawned)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct Glitch {
    pub kind: GlitchKind,
    pub position: Position,
    /// `tick * 3 + subtick` when it happened.
    pub subtick: u64,
}
