//! Orbit models the body graph can attach to a body.

use crate::elements::{OrbitalElements, SecularRates};
use glam::{DQuat, DVec3};
use orrery_core::time::jd_to_jc;
use orrery_core::OrbitModel;
use std::f64::consts::TAU;

/// Keplerian ellipse with optional secular drift of the elements
#[derive(Clone, Debug)]
pub struct KeplerOrbit {
    elements: OrbitalElements,
    rates: SecularRates,
}

impl KeplerOrbit {
    pub fn new(elements: OrbitalElements) -> Self {
        Self::with_rates(elements, SecularRates::default())
    }

    pub fn with_rates(elements: OrbitalElements, rates: SecularRates) -> Self {
        Self { elements, rates }
    }

    pub fn elements(&self) -> &OrbitalElements {
        &self.elements
    }
}

impl OrbitModel for KeplerOrbit {
    fn position_at(&self, jd: f64) -> DVec3 {
        let jc = jd_to_jc(jd);
        let p = if self.rates.is_zero() {
            self.elements.position_ecliptic(jc)
        } else {
            self.elements.propagate(jc, &self.rates).position_ecliptic(jc)
        };
        DVec3::new(p.x, p.y, p.z)
    }

    fn bounding_radius(&self) -> f64 {
        // Eccentricity drift is clamped below 0.99 by propagation
        if self.rates.is_zero() {
            self.elements.apoapsis()
        } else {
            self.elements.a * 1.99
        }
    }

    fn kind(&self) -> &'static str {
        "kepler"
    }
}

/// Uniform circular motion on an inclined plane
#[derive(Clone, Debug, PartialEq)]
pub struct CircularOrbit {
    /// Orbit radius (meters)
    pub radius: f64,
    /// Period (days); negative runs retrograde
    pub period_days: f64,
    /// Angle along the orbit at `epoch_jd` (radians)
    pub phase: f64,
    /// Inclination to the ecliptic (radians)
    pub inclination: f64,
    /// Longitude of ascending node (radians)
    pub ascending_node: f64,
    /// Julian date at which the body sits at `phase`
    pub epoch_jd: f64,
}

impl CircularOrbit {
    pub fn new(radius: f64, period_days: f64) -> Self {
        Self {
            radius,
            period_days,
            phase: 0.0,
            inclination: 0.0,
            ascending_node: 0.0,
            epoch_jd: orrery_core::constants::J2000_JD,
        }
    }

    fn plane(&self) -> DQuat {
        DQuat::from_rotation_z(self.ascending_node) * DQuat::from_rotation_x(self.inclination)
    }
}

impl OrbitModel for CircularOrbit {
    fn position_at(&self, jd: f64) -> DVec3 {
        let angle = if self.period_days == 0.0 {
            self.phase
        } else {
            self.phase + TAU * (jd - self.epoch_jd) / self.period_days
        };
        let (sin, cos) = angle.sin_cos();
        self.plane() * DVec3::new(self.radius * cos, self.radius * sin, 0.0)
    }

    fn bounding_radius(&self) -> f64 {
        self.radius
    }

    fn is_static(&self) -> bool {
        self.period_days == 0.0
    }

    fn kind(&self) -> &'static str {
        "circular"
    }
}

/// A body pinned at a constant offset from its parent
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedOrbit {
    pub position: DVec3,
}

impl FixedOrbit {
    pub fn new(position: DVec3) -> Self {
        Self { position }
    }
}

impl OrbitModel for FixedOrbit {
    fn position_at(&self, _jd: f64) -> DVec3 {
        self.position
    }

    fn bounding_radius(&self) -> f64 {
        self.position.length()
    }

    fn is_static(&self) -> bool {
        true
    }

    fn kind(&self) -> &'static str {
        "fixed"
    }
}
