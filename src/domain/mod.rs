/// Pure value types: directions, tags, tiles, actor records and the actor
/// catalogue. Nothing here looks at more than one tile.

pub mod actor;
pub mod direction;
pub mod input;
pub mod inventory;
pub mod kind;
pub mod rng;
pub mod tags;
pub mod tile;
pub mod wires;
