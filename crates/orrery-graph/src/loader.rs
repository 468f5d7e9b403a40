//! Config-driven construction: orbit and module loader registries and the
//! system loader that turns flat records into bodies.

use crate::arena::BodyId;
use crate::body::{BodyKind, BodySpec, RotationElements};
use crate::config::{BodyConfig, SystemConfig};
use crate::error::{ConfigError, GraphError, GraphResult};
use crate::graph::BodyGraph;
use crate::module::{
    AtmosphereModule, BodyModule, DrawTier, ModelModule, ModuleSlot, ModuleTiers, RingModule,
    SphereModule,
};
use glam::{DVec3, Vec3};
use orrery_core::constants::J2000_JD;
use orrery_core::time::jd_to_jc;
use orrery_core::OrbitModel;
use orrery_sim::{CircularOrbit, FixedOrbit, KeplerOrbit, OrbitalElements, Planet};
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info, warn};

pub type OrbitBuilder = fn(&BodyConfig) -> Result<Rc<dyn OrbitModel>, ConfigError>;

/// Builds an orbit model from a record, selected by the record's `orbit` key
#[derive(Clone, Copy)]
pub struct OrbitLoader {
    pub key: &'static str,
    /// Whether the record carries what this loader needs
    pub applies: fn(&BodyConfig) -> bool,
    pub build: OrbitBuilder,
}

/// What a module loader sees of the body being built
pub struct ModuleInput<'a> {
    pub record: &'a BodyConfig,
    pub kind: BodyKind,
    pub radius: f64,
}

/// Candidate for one module slot. The highest non-zero score wins.
#[derive(Clone, Copy)]
pub struct ModuleLoader {
    pub name: &'static str,
    pub slot: ModuleSlot,
    pub tier: DrawTier,
    pub score: fn(&ModuleInput) -> u32,
    pub build: fn(&ModuleInput) -> Result<Box<dyn BodyModule>, ConfigError>,
}

pub struct LoaderRegistry {
    orbits: Vec<OrbitLoader>,
    modules: Vec<ModuleLoader>,
}

impl LoaderRegistry {
    /// Registry without any loaders
    pub fn new() -> Self {
        Self { orbits: Vec::new(), modules: Vec::new() }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for loader in BUILTIN_ORBITS {
            registry.register_orbit(loader);
        }
        for loader in BUILTIN_MODULES {
            registry.register_module(loader);
        }
        registry
    }

    /// Later registrations with the same key shadow earlier ones
    pub fn register_orbit(&mut self, loader: OrbitLoader) {
        self.orbits.insert(0, loader);
    }

    /// Ties on score go to the earlier registration
    pub fn register_module(&mut self, loader: ModuleLoader) {
        self.modules.push(loader);
    }

    /// First loader whose requirements the record meets, newest registration first
    pub fn default_orbit(&self, record: &BodyConfig) -> Option<&OrbitLoader> {
        self.orbits.iter().find(|l| (l.applies)(record))
    }

    /// Orbit for a record. An unknown `orbit` key falls back to the default
    /// loader; without any key the body gets an orbit only if a loader applies.
    pub fn resolve_orbit(
        &self,
        record: &BodyConfig,
    ) -> Result<Option<Rc<dyn OrbitModel>>, ConfigError> {
        let loader = match record.get("orbit") {
            Some(key) => match self.orbits.iter().find(|l| l.key.eq_ignore_ascii_case(key)) {
                Some(loader) => loader,
                None => {
                    let fallback = self
                        .default_orbit(record)
                        .ok_or_else(|| ConfigError::UnknownOrbit(key.to_string()))?;
                    debug!(key, fallback = fallback.key, "unknown orbit type, using default");
                    fallback
                }
            },
            None => match self.default_orbit(record) {
                Some(loader) => loader,
                None => return Ok(None),
            },
        };
        (loader.build)(record).map(Some)
    }

    pub fn select_module(&self, input: &ModuleInput, slot: ModuleSlot) -> Option<&ModuleLoader> {
        let mut best: Option<(u32, &ModuleLoader)> = None;
        for loader in self.modules.iter().filter(|l| l.slot == slot) {
            let score = (loader.score)(input);
            if score > 0 && best.map_or(true, |(s, _)| score > s) {
                best = Some((score, loader));
            }
        }
        best.map(|(_, loader)| loader)
    }

    pub fn build_modules(&self, input: &ModuleInput) -> Result<ModuleTiers, ConfigError> {
        let mut tiers = ModuleTiers::new();
        for slot in [ModuleSlot::Body, ModuleSlot::Rings, ModuleSlot::Atmosphere] {
            if let Some(loader) = self.select_module(input, slot) {
                tiers.push(loader.tier, (loader.build)(input)?);
            }
        }
        Ok(tiers)
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

const BUILTIN_ORBITS: [OrbitLoader; 4] = [
    OrbitLoader {
        key: "fixed",
        applies: |r| r.contains("position"),
        build: fixed_orbit,
    },
    OrbitLoader {
        key: "circular",
        applies: |r| r.contains("orbit_radius"),
        build: circular_orbit,
    },
    OrbitLoader {
        key: "kepler",
        applies: |r| r.contains("orbit_semi_major_axis"),
        build: kepler_orbit,
    },
    OrbitLoader {
        key: "planet",
        applies: |r| r.contains("orbit_body"),
        build: planet_orbit,
    },
];

fn planet_orbit(record: &BodyConfig) -> Result<Rc<dyn OrbitModel>, ConfigError> {
    let name = record.require("orbit_body")?;
    let planet = Planet::from_name(name).ok_or_else(|| ConfigError::invalid("orbit_body", name))?;
    Ok(Rc::new(planet.orbit()))
}

fn kepler_orbit(record: &BodyConfig) -> Result<Rc<dyn OrbitModel>, ConfigError> {
    let a = record.require_f64("orbit_semi_major_axis")?;
    let e = record.f64_or("orbit_eccentricity", 0.0)?;
    if a <= 0.0 {
        return Err(ConfigError::invalid("orbit_semi_major_axis", &a.to_string()));
    }
    if !(0.0..1.0).contains(&e) {
        return Err(ConfigError::invalid("orbit_eccentricity", &e.to_string()));
    }
    let mu = match (record.f64("orbit_mu")?, record.f64("orbit_period")?) {
        (Some(mu), _) if mu > 0.0 => mu,
        (_, Some(period)) if period > 0.0 => OrbitalElements::mu_for_period(a, period),
        _ => return Err(ConfigError::MissingField("orbit_period".into())),
    };
    let elements = OrbitalElements::new(
        a,
        e,
        record.angle_or("orbit_inclination", 0.0)?,
        record.angle_or("orbit_ascending_node", 0.0)?,
        record.angle_or("orbit_periapsis", 0.0)?,
        record.angle_or("orbit_mean_anomaly", 0.0)?,
        jd_to_jc(record.f64_or("orbit_epoch", J2000_JD)?),
        mu,
    );
    Ok(Rc::new(KeplerOrbit::new(elements)))
}

fn circular_orbit(record: &BodyConfig) -> Result<Rc<dyn OrbitModel>, ConfigError> {
    let radius = record.require_f64("orbit_radius")?;
    if radius < 0.0 {
        return Err(ConfigError::invalid("orbit_radius", &radius.to_string()));
    }
    let mut orbit = CircularOrbit::new(radius, record.f64_or("orbit_period", 0.0)?);
    orbit.phase = record.angle_or("orbit_phase", 0.0)?;
    orbit.inclination = record.angle_or("orbit_inclination", 0.0)?;
    orbit.ascending_node = record.angle_or("orbit_ascending_node", 0.0)?;
    orbit.epoch_jd = record.f64_or("orbit_epoch", J2000_JD)?;
    Ok(Rc::new(orbit))
}

fn fixed_orbit(record: &BodyConfig) -> Result<Rc<dyn OrbitModel>, ConfigError> {
    let position = record
        .vec3("position")?
        .ok_or_else(|| ConfigError::MissingField("position".into()))?;
    Ok(Rc::new(FixedOrbit::new(position)))
}

const BUILTIN_MODULES: [ModuleLoader; 5] = [
    ModuleLoader {
        name: "star",
        slot: ModuleSlot::Body,
        tier: DrawTier::Far,
        score: |m| if m.kind == BodyKind::Star && m.radius > 0.0 { 15 } else { 0 },
        build: sphere_module,
    },
    ModuleLoader {
        name: "model",
        slot: ModuleSlot::Body,
        tier: DrawTier::Near,
        score: |m| if m.record.contains("model") { 20 } else { 0 },
        build: model_module,
    },
    ModuleLoader {
        name: "sphere",
        slot: ModuleSlot::Body,
        tier: DrawTier::Near,
        score: |m| if m.radius > 0.0 { 10 } else { 0 },
        build: sphere_module,
    },
    ModuleLoader {
        name: "rings",
        slot: ModuleSlot::Rings,
        tier: DrawTier::Near,
        score: |m| {
            if m.record.contains("rings_inner") && m.record.contains("rings_outer") {
                10
            } else {
                0
            }
        },
        build: ring_module,
    },
    ModuleLoader {
        name: "atmosphere",
        slot: ModuleSlot::Atmosphere,
        tier: DrawTier::Inner,
        score: |m| if m.record.contains("atmosphere_height") { 10 } else { 0 },
        build: atmosphere_module,
    },
];

fn sphere_module(m: &ModuleInput) -> Result<Box<dyn BodyModule>, ConfigError> {
    Ok(Box::new(SphereModule {
        radius: m.radius,
        oblateness: m.record.f64_or("oblateness", 0.0)?,
        texture: m.record.get("texture").map(str::to_string),
    }))
}

fn model_module(m: &ModuleInput) -> Result<Box<dyn BodyModule>, ConfigError> {
    let path = m.record.require("model")?;
    let scale = m.record.f64_or("model_scale", m.radius.max(1.0))?;
    Ok(Box::new(ModelModule::new(path, scale)))
}

fn ring_module(m: &ModuleInput) -> Result<Box<dyn BodyModule>, ConfigError> {
    let inner = m.record.require_f64("rings_inner")?;
    let outer = m.record.require_f64("rings_outer")?;
    if !(0.0 <= inner && inner < outer) {
        return Err(ConfigError::invalid("rings_outer", &outer.to_string()));
    }
    let texture = m.record.get("rings_texture").map(str::to_string);
    Ok(Box::new(RingModule { inner, outer, texture }))
}

fn atmosphere_module(m: &ModuleInput) -> Result<Box<dyn BodyModule>, ConfigError> {
    Ok(Box::new(AtmosphereModule {
        radius: m.radius,
        height: m.record.require_f64("atmosphere_height")?,
        color: m.record.color_or("atmosphere_color", Vec3::new(0.4, 0.6, 1.0))?,
    }))
}

/// Outcome of loading one system file
#[derive(Debug, Default)]
pub struct LoadReport {
    pub root: Option<BodyId>,
    pub loaded: usize,
    pub skipped: usize,
    /// Records that re-registered an existing name
    pub replaced: usize,
    /// Skipped record names with the reason
    pub problems: Vec<(String, ConfigError)>,
}

/// Parent named by a record; absent, empty or `none` means the system root
fn parent_of(graph: &BodyGraph, record: &BodyConfig, root: BodyId) -> Result<BodyId, ConfigError> {
    match record.get("parent") {
        None => Ok(root),
        Some(name) if name.eq_ignore_ascii_case("none") => Ok(root),
        Some(name) => graph
            .find_body_once(name)
            .ok_or_else(|| ConfigError::UnknownParent(name.to_string())),
    }
}

/// Builds one body from its record under `root`
pub fn load_body(
    graph: &mut BodyGraph,
    registry: &LoaderRegistry,
    root: BodyId,
    record: &BodyConfig,
) -> Result<BodyId, ConfigError> {
    let name = record.name()?;
    let kind = match record.get("type") {
        Some(t) => BodyKind::parse(t).ok_or_else(|| ConfigError::UnknownKind(t.to_string()))?,
        None => BodyKind::Planet,
    };
    let parent = parent_of(graph, record, root)?;
    let orbit = registry.resolve_orbit(record)?;

    let default_radius =
        record.get("orbit_body").and_then(Planet::from_name).map_or(0.0, |p| p.radius());
    let radius = record.f64_or("radius", default_radius)?;
    if radius < 0.0 {
        return Err(ConfigError::invalid("radius", &radius.to_string()));
    }

    let modules = registry.build_modules(&ModuleInput { record, kind, radius })?;
    let spec = BodySpec {
        name: name.to_string(),
        display_name: record.get("display_name").map(str::to_string),
        kind,
        parent: Some(parent),
        isolated: record.bool_or("isolated", false)?,
        orbit,
        rotation: RotationElements::from_config(record)?,
        radius,
        influence_radius: record.f64("influence_radius")?,
        min_angular_size: record.angle_or("min_angular_size", 0.0)?,
        color: record.color_or("color", Vec3::ONE)?,
        halo: record.bool_or("halo", true)?,
        modules,
        hidden: record.bool_or("hidden", false)?,
    };
    Ok(graph.add_body(spec))
}

/// Adds a whole system: its isolated root, then each record in order.
/// Bad records are skipped with a warning.
pub fn load_system(
    graph: &mut BodyGraph,
    registry: &LoaderRegistry,
    system: &SystemConfig,
) -> GraphResult<LoadReport> {
    let outer_parent = match system.parent.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(p) if p.eq_ignore_ascii_case("none") => None,
        Some(p) => Some(graph.find_body_once(p).ok_or_else(|| GraphError::System {
            name: system.name.clone(),
            source: ConfigError::UnknownParent(p.to_string()),
        })?),
    };

    let mut report = LoadReport::default();
    if graph.exists(&system.name) {
        report.replaced += 1;
    }

    let mut spec = BodySpec::system(system.name.clone()).with_radius(system.radius);
    spec.display_name = system.display_name.clone();
    spec.parent = outer_parent;
    spec.influence_radius = system.influence_radius;
    if let Some([x, y, z]) = system.position {
        spec.orbit = Some(Rc::new(FixedOrbit::new(DVec3::new(x, y, z))));
    }
    let root = graph.add_body(spec);
    report.root = Some(root);

    for record in &system.bodies {
        let label = record.get("name").unwrap_or("<unnamed>").to_string();
        let replacing = graph.exists(&label);
        match load_body(graph, registry, root, record) {
            Ok(id) => {
                report.loaded += 1;
                if replacing {
                    report.replaced += 1;
                }
                let light = match record.bool_or("light", false) {
                    Ok(flag) => flag,
                    Err(e) => {
                        warn!(body = %label, error = %e, "ignoring light flag");
                        false
                    }
                };
                let is_star = graph.body(id).is_some_and(|b| b.kind() == BodyKind::Star);
                if light || (is_star && graph.light(root).is_none()) {
                    graph.set_light(root, id);
                }
            }
            Err(e) => {
                warn!(system = %system.name, body = %label, error = %e, "skipping body record");
                report.skipped += 1;
                report.problems.push((label, e));
            }
        }
    }

    info!(
        system = %system.name,
        loaded = report.loaded,
        skipped = report.skipped,
        replaced = report.replaced,
        "loaded system"
    );
    Ok(report)
}

pub fn load_system_file(
    graph: &mut BodyGraph,
    registry: &LoaderRegistry,
    path: impl AsRef<Path>,
) -> GraphResult<LoadReport> {
    let system = SystemConfig::from_path(path)?;
    load_system(graph, registry, &system)
}
