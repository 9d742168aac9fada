/// Deterministic tick-based simulation of layered tile-grid puzzle levels.
///
/// `domain` holds value types, `sim` runs levels, `config` reads the
/// verifier's settings file.

pub mod config;
pub mod domain;
pub mod sim;
