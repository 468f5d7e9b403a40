//! Julian date helpers shared by the orbit models and the body graph.
//!
//! The graph runs on plain `f64` Julian days; conversions to and from
//! calendar epochs live with the time controller in `orrery-sim`.

use crate::constants::{DAYS_PER_JULIAN_CENTURY, J2000_JD, SECONDS_PER_DAY};

/// Julian centuries elapsed since J2000 for a Julian date
pub fn jd_to_jc(jd: f64) -> f64 {
    (jd - J2000_JD) / DAYS_PER_JULIAN_CENTURY
}

/// Julian date for Julian centuries since J2000
pub fn jc_to_jd(jc: f64) -> f64 {
    jc * DAYS_PER_JULIAN_CENTURY + J2000_JD
}

/// Convert a duration in seconds to days
pub fn seconds_to_days(seconds: f64) -> f64 {
    seconds / SECONDS_PER_DAY
}

/// Greenwich mean sidereal time (radians, [0, 2π)) for a Julian date.
///
/// IAU 1982 expression, accurate to a fraction of a second over centuries.
pub fn greenwich_sidereal_time(jd: f64) -> f64 {
    let d = jd - J2000_JD;
    let t = d / DAYS_PER_JULIAN_CENTURY;
    let deg = 280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * t * t
        - t * t * t / 38_710_000.0;
    deg.rem_euclid(360.0).to_radians()
}
