//! Shared foundations for the orrery crates: constants, coordinate frames,
//! Julian-date helpers and the orbit capability the body graph consumes.

pub mod constants;
pub mod coordinates;
pub mod orbit;
pub mod time;

pub use coordinates::{EquatorialCoordinate, HorizontalCoordinate, SphericalPosition};
pub use orbit::OrbitModel;

#[cfg(test)]
mod tests;
