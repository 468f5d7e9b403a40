//! Graph tuning, flat body records and the JSON system file format.

use crate::error::{ConfigError, GraphResult};
use glam::{DVec3, Vec3};
use orrery_core::constants::SECONDS_PER_DAY;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Tuning for traversal, visibility and reference switching
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Simulated seconds between two orbit evaluations of the same body
    pub cadence_seconds: f64,
    /// Fraction of the half field of view below which a subtree that was
    /// visible last frame is dropped
    pub subtree_hysteresis: f64,
    /// Factor on a body's area of influence before the observer is handed
    /// back to the parent
    pub influence_hysteresis: f64,
    /// Screen radius (pixels) from which a body gets its own depth range
    pub notable_screen_size: f64,
    /// Screen radius (pixels) from which near-tier modules are drawn
    pub near_tier_screen_size: f64,
    /// Minimum pick radius around a body (pixels)
    pub pick_radius: f64,
    /// Default area of influence, in body radii
    pub influence_factor: f64,
    /// Upper bound on chained reference switches in one frame
    pub max_switches_per_frame: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            cadence_seconds: 1.0,
            subtree_hysteresis: 0.3,
            influence_hysteresis: 1.02,
            notable_screen_size: 5.0,
            near_tier_screen_size: 2.0,
            pick_radius: 10.0,
            influence_factor: 100.0,
            max_switches_per_frame: 8,
        }
    }
}

impl GraphConfig {
    pub fn cadence_days(&self) -> f64 {
        self.cadence_seconds / SECONDS_PER_DAY
    }
}

/// One body's declarative record: a flat string-keyed map.
///
/// Values are kept as text and parsed on access so a malformed field only
/// affects the record that carries it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BodyConfig {
    values: BTreeMap<String, String>,
}

impl BodyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.values.insert(key.to_string(), value.to_string());
    }

    /// Trimmed value; empty strings count as missing
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingField(key.into()))
    }

    pub fn name(&self) -> Result<&str, ConfigError> {
        self.require("name")
    }

    pub fn f64(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        self.get(key)
            .map(|v| match v.parse::<f64>() {
                Ok(x) if x.is_finite() => Ok(x),
                _ => Err(ConfigError::invalid(key, v)),
            })
            .transpose()
    }

    pub fn f64_or(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        Ok(self.f64(key)?.unwrap_or(default))
    }

    pub fn require_f64(&self, key: &str) -> Result<f64, ConfigError> {
        self.f64(key)?.ok_or_else(|| ConfigError::MissingField(key.into()))
    }

    /// Angle given in degrees, returned in radians
    pub fn angle_or(&self, key: &str, default_deg: f64) -> Result<f64, ConfigError> {
        Ok(self.f64_or(key, default_deg)?.to_radians())
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::invalid(key, v)),
            },
        }
    }

    /// Three comma-separated numbers
    pub fn vec3(&self, key: &str) -> Result<Option<DVec3>, ConfigError> {
        let Some(v) = self.get(key) else {
            return Ok(None);
        };
        let parts: Vec<f64> = v
            .split(',')
            .map(|s| s.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| ConfigError::invalid(key, v))?;
        match parts.as_slice() {
            [x, y, z] if parts.iter().all(|p| p.is_finite()) => Ok(Some(DVec3::new(*x, *y, *z))),
            _ => Err(ConfigError::invalid(key, v)),
        }
    }

    pub fn color_or(&self, key: &str, default: Vec3) -> Result<Vec3, ConfigError> {
        Ok(self.vec3(key)?.map(|c| c.as_vec3()).unwrap_or(default))
    }
}

impl<'de> Deserialize<'de> for BodyConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = serde_json::Map::<String, Value>::deserialize(deserializer)?;
        let values = map.into_iter().map(|(k, v)| (k, flatten_value(&v))).collect();
        Ok(BodyConfig { values })
    }
}

impl<K: ToString, V: ToString> FromIterator<(K, V)> for BodyConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let values = iter.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        BodyConfig { values }
    }
}

fn flatten_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(flatten_value).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// One self-contained system file
#[derive(Clone, Debug, Deserialize)]
pub struct SystemConfig {
    /// Name of the isolated root node
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Existing body the whole system hangs under
    #[serde(default)]
    pub parent: Option<String>,
    /// Offset of the root from its parent (meters)
    #[serde(default)]
    pub position: Option<[f64; 3]>,
    #[serde(default)]
    pub radius: f64,
    #[serde(default)]
    pub influence_radius: Option<f64>,
    #[serde(default)]
    pub bodies: Vec<BodyConfig>,
}

impl SystemConfig {
    pub fn from_json(text: &str) -> GraphResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> GraphResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
