//! Built-in J2000 mean elements for the major planets and the Moon.
//!
//! Planet elements are heliocentric; the Moon's are geocentric, so a Moon
//! body belongs under Earth in the graph.
//! Source: JPL "Keplerian Elements for Approximate Positions of the Major Planets".

use crate::elements::{OrbitalElements, SecularRates};
use crate::models::KeplerOrbit;

/// Gravitational parameter of the Sun (m³/s²)
pub const MU_SUN: f64 = 1.32712440018e20;

/// Gravitational parameter of the Earth (m³/s²)
pub const MU_EARTH: f64 = 3.986004418e14;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Planet {
    Mercury,
    Venus,
    Earth,
    Moon,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
}

/// Row layout: a (m), e, i, Ω, ω, M₀ (degrees), μ, mean radius (m)
type ElementRow = (f64, f64, f64, f64, f64, f64, f64, f64);

/// Row layout: de, di, dΩ, dω (degrees) per Julian century
type RateRow = (f64, f64, f64, f64);

impl Planet {
    pub const ALL: [Planet; 10] = [
        Planet::Mercury, Planet::Venus, Planet::Earth, Planet::Moon, Planet::Mars,
        Planet::Jupiter, Planet::Saturn, Planet::Uranus, Planet::Neptune, Planet::Pluto,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mercury => "Mercury",
            Self::Venus => "Venus",
            Self::Earth => "Earth",
            Self::Moon => "Moon",
            Self::Mars => "Mars",
            Self::Jupiter => "Jupiter",
            Self::Saturn => "Saturn",
            Self::Uranus => "Uranus",
            Self::Neptune => "Neptune",
            Self::Pluto => "Pluto",
        }
    }

    /// Case-insensitive lookup by English name
    pub fn from_name(name: &str) -> Option<Planet> {
        Self::ALL.into_iter().find(|p| p.name().eq_ignore_ascii_case(name.trim()))
    }

    #[rustfmt::skip]
    fn element_row(&self) -> ElementRow {
        match self {
            Self::Mercury => (57.909e9, 0.20563, 7.005, 48.331, 29.124, 174.796, MU_SUN, 2.4397e6),
            Self::Venus => (108.21e9, 0.00677, 3.3946, 76.680, 54.884, 50.115, MU_SUN, 6.0518e6),
            Self::Earth => (149.598e9, 0.01671, 0.00005, -11.26064, 114.20783, -2.48284, MU_SUN, 6.371e6),
            Self::Moon => (384.4e6, 0.0549, 5.145, 125.08, 318.15, 135.27, MU_EARTH, 1.7374e6),
            Self::Mars => (227.956e9, 0.0934, 1.850, 49.558, 286.502, 19.373, MU_SUN, 3.3895e6),
            Self::Jupiter => (778.479e9, 0.0489, 1.303, 100.464, 273.867, 20.020, MU_SUN, 6.9911e7),
            Self::Saturn => (1432.041e9, 0.0565, 2.485, 113.665, 339.392, 317.020, MU_SUN, 5.8232e7),
            Self::Uranus => (2867.043e9, 0.0457, 0.773, 74.006, 96.998857, 142.2386, MU_SUN, 2.5362e7),
            Self::Neptune => (4514.953e9, 0.0113, 1.770, 131.784, 273.187, 256.228, MU_SUN, 2.4622e7),
            Self::Pluto => (5869.656e9, 0.2488, 17.16, 110.299, 113.834, 14.53, MU_SUN, 1.188e6),
        }
    }

    fn rate_row(&self) -> RateRow {
        match self {
            Self::Mercury => (0.00002123, -0.00590, -0.12534, 0.16047),
            Self::Venus => (-0.00004938, -0.00078, -0.27769, 0.00268),
            Self::Earth => (-0.00004392, -0.01337, -0.18047, 0.32327),
            // 18.6 year nodal regression, 8.85 year apsidal advance
            Self::Moon => (0.0, 0.0, -1935.48, 4067.80),
            Self::Mars => (0.00007882, -0.00813, -0.29257, 0.44106),
            Self::Jupiter => (-0.00012880, -0.00242, 0.18966, 0.17693),
            Self::Saturn => (-0.00050991, 0.00193, -0.26731, -0.42568),
            Self::Uranus => (-0.00020455, 0.00041, 0.01140, 0.02768),
            Self::Neptune => (0.00006171, -0.00333, -0.01022, -0.01043),
            Self::Pluto => (0.0, 0.0, 0.0, 0.0),
        }
    }

    /// Mean radius in meters
    pub fn radius(&self) -> f64 {
        self.element_row().7
    }

    /// Mean elements at J2000
    pub fn j2000_elements(&self) -> OrbitalElements {
        let (a, e, i, node, peri, m0, mu, _) = self.element_row();
        OrbitalElements::new(
            a,
            e,
            i.to_radians(),
            node.to_radians(),
            peri.to_radians(),
            m0.to_radians(),
            0.0,
            mu,
        )
    }

    /// Secular drift of the elements
    pub fn secular_rates(&self) -> SecularRates {
        let (de, di, d_node, d_peri) = self.rate_row();
        SecularRates {
            da: 0.0,
            de,
            di: di.to_radians(),
            d_omega_big: d_node.to_radians(),
            d_omega_small: d_peri.to_radians(),
        }
    }

    /// Orbit model relative to this body's primary
    pub fn orbit(&self) -> KeplerOrbit {
        KeplerOrbit::with_rates(self.j2000_elements(), self.secular_rates())
    }
}
