/// Astronomical unit in meters
pub const AU: f64 = 1.495978707e11;

/// Parsec in meters
pub const PARSEC: f64 = 3.0856775814913673e16;

/// Light year in meters
pub const LIGHT_YEAR: f64 = 9.4607304725808e15;

/// Speed of light in m/s
pub const C: f64 = 299_792_458.0;

/// Julian Date of J2000.0 (2000-01-01T12:00:00 TT)
pub const J2000_JD: f64 = 2451545.0;

/// Seconds in one day
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// Days in one Julian century
pub const DAYS_PER_JULIAN_CENTURY: f64 = 36525.0;

/// Mean obliquity of the ecliptic at J2000 (radians)
pub const OBLIQUITY_J2000: f64 = 23.439_291_1 * std::f64::consts::PI / 180.0;
