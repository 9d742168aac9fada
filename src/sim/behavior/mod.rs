/// Per-kind behaviour, grouped by family. `sim::hooks` routes every hook
/// call to one of these modules.

pub mod animations;
pub mod blocks;
pub mod buttons;
pub mod items;
pub mod monsters;
pub mod playables;
pub mod teleports;
pub mod terrain;
pub mod walls;
