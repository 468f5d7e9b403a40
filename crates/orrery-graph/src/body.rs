//! Body nodes: identity, orbital cache, rotation and per-frame state.

use crate::arena::BodyId;
use crate::config::BodyConfig;
use crate::error::ConfigError;
use crate::module::ModuleTiers;
use crate::system::SystemIndex;
use glam::{DMat4, DQuat, DVec2, DVec3, Mat4, Vec3};
use orrery_core::constants::{DAYS_PER_JULIAN_CENTURY, J2000_JD};
use orrery_core::OrbitModel;
use std::f64::consts::TAU;
use std::rc::Rc;

/// Body whose spin follows Greenwich sidereal time instead of its elements
pub const TIME_REFERENCE_BODY: &str = "Earth";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BodyKind {
    Star,
    Planet,
    Moon,
    DwarfPlanet,
    Asteroid,
    Comet,
    Artificial,
    Barycenter,
    System,
}

impl BodyKind {
    pub fn parse(s: &str) -> Option<BodyKind> {
        match s.trim().to_ascii_lowercase().as_str() {
            "star" | "sun" => Some(Self::Star),
            "planet" => Some(Self::Planet),
            "moon" | "satellite" => Some(Self::Moon),
            "dwarf" | "dwarf_planet" | "dwarf planet" => Some(Self::DwarfPlanet),
            "asteroid" => Some(Self::Asteroid),
            "comet" => Some(Self::Comet),
            "artificial" | "spacecraft" => Some(Self::Artificial),
            "barycenter" | "center" => Some(Self::Barycenter),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Star => "star",
            Self::Planet => "planet",
            Self::Moon => "moon",
            Self::DwarfPlanet => "dwarf_planet",
            Self::Asteroid => "asteroid",
            Self::Comet => "comet",
            Self::Artificial => "artificial",
            Self::Barycenter => "barycenter",
            Self::System => "system",
        }
    }
}

/// Spin axis and rate of a body
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RotationElements {
    /// Sidereal rotation period (days); 0 means no spin
    pub period_days: f64,
    /// Tilt of the pole from the ecliptic pole (radians)
    pub obliquity: f64,
    /// Ecliptic longitude of the equator's ascending node (radians)
    pub ascending_node: f64,
    /// Node drift (radians per Julian century)
    pub precession_rate: f64,
    /// Julian date at which the spin angle equals `offset`
    pub epoch_jd: f64,
    /// Spin angle at epoch (radians)
    pub offset: f64,
}

impl Default for RotationElements {
    fn default() -> Self {
        Self {
            period_days: 0.0,
            obliquity: 0.0,
            ascending_node: 0.0,
            precession_rate: 0.0,
            epoch_jd: J2000_JD,
            offset: 0.0,
        }
    }
}

impl RotationElements {
    /// Reads `rotation_period` (hours), `rotation_obliquity`,
    /// `rotation_ascending_node`, `rotation_offset` (degrees),
    /// `rotation_precession_rate` (degrees per century) and `rotation_epoch` (JD)
    pub fn from_config(record: &BodyConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            period_days: record.f64_or("rotation_period", 0.0)? / 24.0,
            obliquity: record.angle_or("rotation_obliquity", 0.0)?,
            ascending_node: record.angle_or("rotation_ascending_node", 0.0)?,
            precession_rate: record.angle_or("rotation_precession_rate", 0.0)?,
            epoch_jd: record.f64_or("rotation_epoch", J2000_JD)?,
            offset: record.angle_or("rotation_offset", 0.0)?,
        })
    }

    fn node_at(&self, jd: f64) -> f64 {
        self.ascending_node + self.precession_rate * (jd - self.epoch_jd) / DAYS_PER_JULIAN_CENTURY
    }

    /// Spin angle about the pole, [0, 2π)
    pub fn spin_angle(&self, jd: f64) -> f64 {
        if self.period_days == 0.0 {
            return self.offset.rem_euclid(TAU);
        }
        (self.offset + TAU * (jd - self.epoch_jd) / self.period_days).rem_euclid(TAU)
    }

    /// Equator orientation without spin
    pub fn equator(&self, jd: f64) -> DQuat {
        DQuat::from_rotation_z(self.node_at(jd)) * DQuat::from_rotation_x(self.obliquity)
    }

    /// Unit rotation pole in the ecliptic frame
    pub fn pole(&self, jd: f64) -> DVec3 {
        self.equator(jd) * DVec3::Z
    }

    /// Full body orientation for a given spin angle
    pub fn orientation(&self, jd: f64, spin: f64) -> DQuat {
        self.equator(jd) * DQuat::from_rotation_z(spin)
    }
}

/// Anchored orbit sample plus linear velocity.
///
/// Valid on `[computed_jd, computed_jd + cadence]`; inside that window the
/// working position is `computed_pos + delta_pos * (jd - computed_jd)`.
#[derive(Clone, Debug, Default)]
pub struct OrbitCache {
    anchor: i64,
    computed_jd: f64,
    computed_pos: DVec3,
    delta_pos: DVec3,
    next_pos: DVec3,
    valid: bool,
    evaluations: u64,
}

impl OrbitCache {
    pub fn computed_jd(&self) -> f64 {
        self.computed_jd
    }

    pub fn computed_pos(&self) -> DVec3 {
        self.computed_pos
    }

    /// Velocity in meters per day
    pub fn delta_pos(&self) -> DVec3 {
        self.delta_pos
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Number of orbit model evaluations so far
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn covers(&self, jd: f64, cadence: f64) -> bool {
        self.valid && jd >= self.computed_jd && jd <= self.computed_jd + cadence
    }

    pub fn extrapolate(&self, jd: f64) -> DVec3 {
        self.computed_pos + self.delta_pos * (jd - self.computed_jd)
    }

    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }

    pub(crate) fn position(&mut self, orbit: &dyn OrbitModel, jd: f64, cadence: f64) -> DVec3 {
        if !self.covers(jd, cadence) {
            self.refresh(orbit, jd, cadence);
        }
        self.extrapolate(jd)
    }

    fn refresh(&mut self, orbit: &dyn OrbitModel, jd: f64, cadence: f64) {
        let mut anchor = (jd / cadence).floor() as i64;
        if anchor as f64 * cadence > jd {
            anchor -= 1;
        }
        let start_jd = anchor as f64 * cadence;
        let end_jd = (anchor + 1) as f64 * cadence;

        // Stepping into the next window reuses the sample already taken at its start
        let start = if self.valid && anchor == self.anchor + 1 {
            self.next_pos
        } else {
            self.evaluations += 1;
            orbit.position_at(start_jd)
        };
        let end = if orbit.is_static() {
            start
        } else {
            self.evaluations += 1;
            orbit.position_at(end_jd)
        };

        self.anchor = anchor;
        self.computed_jd = start_jd;
        self.computed_pos = start;
        self.next_pos = end;
        self.delta_pos = (end - start) / (end_jd - start_jd);
        self.valid = true;
    }
}

/// What the last traversal computed for a body.
///
/// Only meaningful when `stamp` equals the current frame.
#[derive(Clone, Debug, Default)]
pub struct FrameState {
    pub stamp: u64,
    /// Body frame to observer frame
    pub matrix: DMat4,
    /// Single-precision model-view including the body's orientation
    pub model_view: Mat4,
    /// Distance from the observer (meters)
    pub distance: f64,
    pub half_angular_size: f64,
    pub visible: bool,
    pub subtree_visible: bool,
    /// Pixel position, `None` when behind the observer
    pub screen_pos: Option<DVec2>,
    /// Radius on screen (pixels)
    pub screen_size: f64,
    pub spin: f64,
    pub is_light: bool,
}

impl FrameState {
    /// Body origin in observer space
    pub fn position(&self) -> DVec3 {
        self.matrix.w_axis.truncate()
    }
}

pub struct BodyNode {
    pub(crate) name: String,
    pub(crate) display_name: Option<String>,
    pub(crate) kind: BodyKind,
    pub(crate) parent: Option<BodyId>,
    pub(crate) children: Vec<BodyId>,
    /// Nearest isolated ancestor
    pub(crate) system: Option<BodyId>,
    /// Present only on isolated system roots
    pub(crate) index: Option<SystemIndex>,
    pub(crate) orbit: Option<Rc<dyn OrbitModel>>,
    pub(crate) cache: OrbitCache,
    pub(crate) rotation: RotationElements,
    pub(crate) radius: f64,
    pub(crate) influence_radius: f64,
    /// Reach of the active subtree measured from this body's center
    pub(crate) extent: f64,
    pub(crate) min_half_angle: f64,
    pub(crate) color: Vec3,
    pub(crate) halo: bool,
    pub(crate) modules: ModuleTiers,
    pub(crate) module_bounds: Option<f64>,
    pub(crate) loaded_modules: usize,
    pub(crate) frame: FrameState,
    pub(crate) hidden: bool,
    pub(crate) live_handles: u32,
}

impl BodyNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Localized name, falling back to the registry name
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn parent(&self) -> Option<BodyId> {
        self.parent
    }

    pub fn children(&self) -> &[BodyId] {
        &self.children
    }

    pub fn system(&self) -> Option<BodyId> {
        self.system
    }

    pub fn is_isolated(&self) -> bool {
        self.index.is_some()
    }

    pub fn system_index(&self) -> Option<&SystemIndex> {
        self.index.as_ref()
    }

    pub fn orbit(&self) -> Option<&dyn OrbitModel> {
        self.orbit.as_deref()
    }

    pub fn orbit_cache(&self) -> &OrbitCache {
        &self.cache
    }

    pub fn rotation(&self) -> &RotationElements {
        &self.rotation
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn influence_radius(&self) -> f64 {
        self.influence_radius
    }

    pub fn extent(&self) -> f64 {
        self.extent
    }

    /// Area of influence grown to cover every active satellite's own area
    pub fn effective_influence(&self) -> f64 {
        self.influence_radius.max(self.extent).max(self.radius)
    }

    /// Radius enclosing the body and whatever modules have loaded
    pub fn bounding_radius(&self) -> f64 {
        self.radius.max(self.module_bounds.unwrap_or(0.0))
    }

    /// Radius enclosing the body and its active subtree
    pub fn subtree_radius(&self) -> f64 {
        self.bounding_radius().max(self.extent)
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn has_halo(&self) -> bool {
        self.halo
    }

    pub fn modules(&self) -> &ModuleTiers {
        &self.modules
    }

    pub fn frame(&self) -> &FrameState {
        &self.frame
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn live_handles(&self) -> u32 {
        self.live_handles
    }
}

impl std::fmt::Debug for BodyNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyNode")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("isolated", &self.is_isolated())
            .field("hidden", &self.hidden)
            .finish()
    }
}

/// Everything needed to create a body node
pub struct BodySpec {
    pub name: String,
    pub display_name: Option<String>,
    pub kind: BodyKind,
    pub parent: Option<BodyId>,
    pub isolated: bool,
    pub orbit: Option<Rc<dyn OrbitModel>>,
    pub rotation: RotationElements,
    pub radius: f64,
    /// `None` uses `radius * influence_factor`
    pub influence_radius: Option<f64>,
    /// Smallest angular diameter (radians) at which the body is drawn
    pub min_angular_size: f64,
    pub color: Vec3,
    pub halo: bool,
    pub modules: ModuleTiers,
    pub hidden: bool,
}

impl BodySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            kind: BodyKind::Planet,
            parent: None,
            isolated: false,
            orbit: None,
            rotation: RotationElements::default(),
            radius: 0.0,
            influence_radius: None,
            min_angular_size: 0.0,
            color: Vec3::ONE,
            halo: true,
            modules: ModuleTiers::new(),
            hidden: false,
        }
    }

    /// Isolated root of a self-contained system
    pub fn system(name: impl Into<String>) -> Self {
        Self { kind: BodyKind::System, isolated: true, halo: false, ..Self::new(name) }
    }

    pub fn with_kind(mut self, kind: BodyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_parent(mut self, parent: BodyId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_orbit(mut self, orbit: Rc<dyn OrbitModel>) -> Self {
        self.orbit = Some(orbit);
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_influence(mut self, influence_radius: f64) -> Self {
        self.influence_radius = Some(influence_radius);
        self
    }

    pub fn with_rotation(mut self, rotation: RotationElements) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_modules(mut self, modules: ModuleTiers) -> Self {
        self.modules = modules;
        self
    }

    pub(crate) fn into_node(self, system: Option<BodyId>, influence_factor: f64) -> BodyNode {
        BodyNode {
            influence_radius: self.influence_radius.unwrap_or(self.radius * influence_factor),
            name: self.name,
            display_name: self.display_name,
            kind: self.kind,
            parent: self.parent,
            children: Vec::new(),
            system,
            index: self.isolated.then(SystemIndex::default),
            orbit: self.orbit,
            cache: OrbitCache::default(),
            rotation: self.rotation,
            radius: self.radius,
            extent: 0.0,
            min_half_angle: self.min_angular_size / 2.0,
            color: self.color,
            halo: self.halo,
            modules: self.modules,
            module_bounds: None,
            loaded_modules: 0,
            frame: FrameState::default(),
            hidden: self.hidden,
            live_handles: 0,
        }
    }
}
