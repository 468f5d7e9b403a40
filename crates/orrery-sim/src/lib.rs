pub mod elements;
pub mod models;
pub mod planets;
pub mod time_controller;

pub use elements::{OrbitalElements, SecularRates};
pub use models::{CircularOrbit, FixedOrbit, KeplerOrbit};
pub use planets::Planet;
pub use time_controller::{epoch_to_jd, jd_to_epoch, rates, TimeController};
