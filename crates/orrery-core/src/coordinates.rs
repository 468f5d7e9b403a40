use crate::constants::{AU, OBLIQUITY_J2000};
use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Build an ecliptic position from components given in AU
pub fn from_au(x: f64, y: f64, z: f64) -> DVec3 {
    DVec3::new(x * AU, y * AU, z * AU)
}

/// Spherical coordinates (r in meters, angles in radians)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SphericalPosition {
    pub r: f64,      // radial distance [0, ∞)
    pub theta: f64,  // azimuth [-π, π]
    pub phi: f64,    // polar [0, π]
}

impl SphericalPosition {
    pub fn from_cartesian(pos: DVec3) -> Self {
        let r = pos.length();
        let theta = pos.y.atan2(pos.x);
        let phi = if r > 0.0 { (pos.z / r).clamp(-1.0, 1.0).acos() } else { 0.0 };
        Self { r, theta, phi }
    }

    pub fn to_cartesian(&self) -> DVec3 {
        let sin_phi = self.phi.sin();
        DVec3::new(
            self.r * sin_phi * self.theta.cos(),
            self.r * sin_phi * self.theta.sin(),
            self.r * self.phi.cos(),
        )
    }
}

/// Point on the celestial sphere in the equatorial frame
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquatorialCoordinate {
    /// Right ascension in radians [0, 2π)
    pub ra: f64,
    /// Declination in radians [-π/2, π/2]
    pub dec: f64,
}

impl EquatorialCoordinate {
    /// Direction of an ecliptic J2000 vector expressed as RA/Dec
    pub fn from_ecliptic(v: DVec3) -> Self {
        let eq = ecliptic_to_equatorial(v);
        let r = eq.length();
        if r == 0.0 {
            return Self { ra: 0.0, dec: 0.0 };
        }
        Self {
            ra: eq.y.atan2(eq.x).rem_euclid(std::f64::consts::TAU),
            dec: (eq.z / r).clamp(-1.0, 1.0).asin(),
        }
    }

    /// Unit vector in the ecliptic J2000 frame
    pub fn to_ecliptic(&self) -> DVec3 {
        let (sin_dec, cos_dec) = self.dec.sin_cos();
        let (sin_ra, cos_ra) = self.ra.sin_cos();
        equatorial_to_ecliptic(DVec3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec))
    }
}

/// Local sky position measured from a surface vertical
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HorizontalCoordinate {
    /// Azimuth in radians, from north through east [0, 2π)
    pub azimuth: f64,
    /// Altitude above the horizon in radians [-π/2, π/2]
    pub altitude: f64,
}

impl HorizontalCoordinate {
    /// Horizontal direction of `v` for an observer whose local vertical is
    /// `up` on a body spinning about `pole`.
    ///
    /// Returns `None` when `up` is parallel to the pole, where north is undefined.
    pub fn from_vector(v: DVec3, up: DVec3, pole: DVec3) -> Option<Self> {
        let up = up.try_normalize()?;
        let east = pole.cross(up).try_normalize()?;
        let north = up.cross(east);
        let dir = v.try_normalize()?;
        Some(Self {
            azimuth: dir.dot(east).atan2(dir.dot(north)).rem_euclid(std::f64::consts::TAU),
            altitude: dir.dot(up).clamp(-1.0, 1.0).asin(),
        })
    }

    /// Unit vector for this horizontal direction, given the same local frame
    pub fn to_vector(&self, up: DVec3, pole: DVec3) -> Option<DVec3> {
        let up = up.try_normalize()?;
        let east = pole.cross(up).try_normalize()?;
        let north = up.cross(east);
        let (sin_alt, cos_alt) = self.altitude.sin_cos();
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        Some(north * (cos_alt * cos_az) + east * (cos_alt * sin_az) + up * sin_alt)
    }
}

/// Rotate an ecliptic J2000 vector into the equatorial J2000 frame
pub fn ecliptic_to_equatorial(v: DVec3) -> DVec3 {
    DQuat::from_rotation_x(OBLIQUITY_J2000) * v
}

/// Rotate an equatorial J2000 vector into the ecliptic J2000 frame
pub fn equatorial_to_ecliptic(v: DVec3) -> DVec3 {
    DQuat::from_rotation_x(-OBLIQUITY_J2000) * v
}
