//! Keplerian orbital elements and conversions

use nalgebra::{Matrix3, Vector3};
use orrery_core::constants::{DAYS_PER_JULIAN_CENTURY, SECONDS_PER_DAY};
use std::f64::consts::{PI, TAU};

/// Classical Keplerian orbital elements
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrbitalElements {
    /// Semi-major axis (meters)
    pub a: f64,
    /// Eccentricity (dimensionless, 0 = circular, < 1)
    pub e: f64,
    /// Inclination to the ecliptic (radians)
    pub i: f64,
    /// Longitude of ascending node (radians)
    pub omega_big: f64,
    /// Argument of periapsis (radians)
    pub omega_small: f64,
    /// Mean anomaly at epoch (radians)
    pub m0: f64,
    /// Reference epoch (Julian centuries from J2000)
    pub epoch_jc: f64,
    /// Gravitational parameter μ of the primary (m³/s²)
    pub mu: f64,
}

impl OrbitalElements {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        a: f64, e: f64, i: f64,
        omega_big: f64, omega_small: f64,
        m0: f64, epoch_jc: f64, mu: f64,
    ) -> Self {
        Self { a, e, i, omega_big, omega_small, m0, epoch_jc, mu }
    }

    /// μ that makes an orbit of semi-major axis `a` take `period_days`
    pub fn mu_for_period(a: f64, period_days: f64) -> f64 {
        let period = period_days * SECONDS_PER_DAY;
        TAU * TAU * a.powi(3) / (period * period)
    }

    /// Mean motion (radians per second)
    pub fn mean_motion(&self) -> f64 {
        (self.mu / self.a.powi(3)).sqrt()
    }

    /// Orbital period (seconds)
    pub fn period(&self) -> f64 {
        TAU / self.mean_motion()
    }

    /// Farthest distance from the focus (meters)
    pub fn apoapsis(&self) -> f64 {
        self.a * (1.0 + self.e)
    }

    /// Mean anomaly at given Julian centuries from J2000
    pub fn mean_anomaly_at(&self, jc: f64) -> f64 {
        let dt_seconds = (jc - self.epoch_jc) * DAYS_PER_JULIAN_CENTURY * SECONDS_PER_DAY;
        normalize_angle(self.m0 + self.mean_motion() * dt_seconds)
    }

    /// Solve Kepler's equation M = E - e·sin(E) for the eccentric anomaly
    pub fn eccentric_anomaly(&self, mean_anomaly: f64) -> f64 {
        let m = normalize_angle(mean_anomaly);
        let e = self.e;

        // Newton-Raphson
        let mut ea = if e < 0.8 { m } else { PI };
        for _ in 0..50 {
            let delta = (ea - e * ea.sin() - m) / (1.0 - e * ea.cos());
            ea -= delta;
            if delta.abs() < 1e-12 {
                break;
            }
        }
        ea
    }

    /// True anomaly from eccentric anomaly
    pub fn true_anomaly(&self, eccentric_anomaly: f64) -> f64 {
        let e = self.e;
        let half_nu = ((1.0 + e) / (1.0 - e)).sqrt() * (eccentric_anomaly / 2.0).tan();
        2.0 * half_nu.atan()
    }

    /// Rotation matrix from the perifocal frame to ecliptic J2000
    pub fn perifocal_to_ecliptic(&self) -> Matrix3<f64> {
        let (sin_o, cos_o) = self.omega_big.sin_cos();
        let (sin_i, cos_i) = self.i.sin_cos();
        let (sin_w, cos_w) = self.omega_small.sin_cos();

        // R_z(Ω) · R_x(i) · R_z(ω)
        Matrix3::new(
            cos_o * cos_w - sin_o * sin_w * cos_i,
            -cos_o * sin_w - sin_o * cos_w * cos_i,
            sin_o * sin_i,

            sin_o * cos_w + cos_o * sin_w * cos_i,
            -sin_o * sin_w + cos_o * cos_w * cos_i,
            -cos_o * sin_i,

            sin_w * sin_i,
            cos_w * sin_i,
            cos_i,
        )
    }

    /// Position relative to the primary in ecliptic J2000 (meters)
    pub fn position_ecliptic(&self, jc: f64) -> Vector3<f64> {
        let ea = self.eccentric_anomaly(self.mean_anomaly_at(jc));
        let nu = self.true_anomaly(ea);
        let r = self.a * (1.0 - self.e * self.e) / (1.0 + self.e * nu.cos());
        self.perifocal_to_ecliptic() * Vector3::new(r * nu.cos(), r * nu.sin(), 0.0)
    }

    /// Apply secular drift of the elements up to `target_jc`
    pub fn propagate(&self, target_jc: f64, rates: &SecularRates) -> OrbitalElements {
        let dt = target_jc - self.epoch_jc;

        OrbitalElements {
            a: self.a + rates.da * dt,
            e: (self.e + rates.de * dt).clamp(0.0, 0.99),
            i: self.i + rates.di * dt,
            omega_big: normalize_angle(self.omega_big + rates.d_omega_big * dt),
            omega_small: normalize_angle(self.omega_small + rates.d_omega_small * dt),
            ..self.clone()
        }
    }
}

/// Normalize angle to [0, 2π)
fn normalize_angle(angle: f64) -> f64 {
    angle.rem_euclid(TAU)
}

/// Secular drift of the elements (per Julian century)
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SecularRates {
    /// Semi-major axis rate (m/century)
    pub da: f64,
    /// Eccentricity rate (1/century)
    pub de: f64,
    /// Inclination rate (rad/century)
    pub di: f64,
    /// Node precession rate (rad/century)
    pub d_omega_big: f64,
    /// Argument of periapsis rate (rad/century)
    pub d_omega_small: f64,
}

impl SecularRates {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}
