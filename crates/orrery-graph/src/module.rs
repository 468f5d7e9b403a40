//! Drawable modules attached to a body, split into draw tiers.
//!
//! Modules are descriptors; meshes, textures and shaders belong to the
//! renderer. Asset-backed modules expose a shared [`AssetSlot`] that the
//! external loader flips, and the graph polls [`BodyModule::is_loaded`] every
//! frame without blocking.

use glam::Vec3;
use std::cell::Cell;
use std::rc::Rc;

/// When a module is drawn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawTier {
    /// Whenever the body is visible
    Far,
    /// When the body covers enough pixels
    Near,
    /// When the observer is inside the body's area of influence
    Inner,
}

impl DrawTier {
    pub const ALL: [DrawTier; 3] = [DrawTier::Far, DrawTier::Near, DrawTier::Inner];
}

/// Which part of a body a module fills; one module per slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModuleSlot {
    Body,
    Rings,
    Atmosphere,
}

pub trait BodyModule {
    fn kind(&self) -> &'static str;

    /// Radius of the sphere enclosing the module, body-local meters
    fn bounding_radius(&self) -> f64;

    fn is_loaded(&self) -> bool {
        true
    }

    /// Asset path and load flag for modules the external loader must fill
    fn asset(&self) -> Option<(&str, &AssetSlot)> {
        None
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssetState {
    #[default]
    Pending,
    Ready,
    Failed,
}

/// Load state shared between a module and whoever loads its asset
#[derive(Clone, Debug, Default)]
pub struct AssetSlot(Rc<Cell<AssetState>>);

impl AssetSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AssetState {
        self.0.get()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == AssetState::Ready
    }

    pub fn mark_ready(&self) {
        self.0.set(AssetState::Ready);
    }

    pub fn mark_failed(&self) {
        self.0.set(AssetState::Failed);
    }
}

/// A body's modules, owned per tier
#[derive(Default)]
pub struct ModuleTiers {
    far: Vec<Box<dyn BodyModule>>,
    near: Vec<Box<dyn BodyModule>>,
    inner: Vec<Box<dyn BodyModule>>,
}

impl ModuleTiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tier: DrawTier, module: Box<dyn BodyModule>) {
        match tier {
            DrawTier::Far => self.far.push(module),
            DrawTier::Near => self.near.push(module),
            DrawTier::Inner => self.inner.push(module),
        }
    }

    pub fn tier(&self, tier: DrawTier) -> &[Box<dyn BodyModule>] {
        match tier {
            DrawTier::Far => &self.far,
            DrawTier::Near => &self.near,
            DrawTier::Inner => &self.inner,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (DrawTier, &dyn BodyModule)> {
        DrawTier::ALL
            .into_iter()
            .flat_map(move |tier| self.tier(tier).iter().map(move |m| (tier, m.as_ref())))
    }

    pub fn len(&self) -> usize {
        self.far.len() + self.near.len() + self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn loaded_count(&self) -> usize {
        self.iter().filter(|(_, m)| m.is_loaded()).count()
    }

    /// Largest bounding radius among loaded modules
    pub fn bounding_radius(&self) -> f64 {
        self.iter()
            .filter(|(_, m)| m.is_loaded())
            .map(|(_, m)| m.bounding_radius())
            .fold(0.0, f64::max)
    }
}

impl std::fmt::Debug for ModuleTiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds = |v: &[Box<dyn BodyModule>]| v.iter().map(|m| m.kind()).collect::<Vec<_>>();
        f.debug_struct("ModuleTiers")
            .field("far", &kinds(&self.far))
            .field("near", &kinds(&self.near))
            .field("inner", &kinds(&self.inner))
            .finish()
    }
}

/// Procedural sphere, optionally flattened at the poles
#[derive(Clone, Debug, PartialEq)]
pub struct SphereModule {
    pub radius: f64,
    pub oblateness: f64,
    pub texture: Option<String>,
}

impl BodyModule for SphereModule {
    fn kind(&self) -> &'static str {
        "sphere"
    }

    fn bounding_radius(&self) -> f64 {
        self.radius
    }
}

/// Mesh loaded from disk by the renderer's asset pipeline
#[derive(Clone, Debug)]
pub struct ModelModule {
    pub path: String,
    /// Meters per model unit
    pub scale: f64,
    asset: AssetSlot,
}

impl ModelModule {
    pub fn new(path: impl Into<String>, scale: f64) -> Self {
        Self { path: path.into(), scale, asset: AssetSlot::new() }
    }

    pub fn slot(&self) -> AssetSlot {
        self.asset.clone()
    }
}

impl BodyModule for ModelModule {
    fn kind(&self) -> &'static str {
        "model"
    }

    fn bounding_radius(&self) -> f64 {
        self.scale
    }

    fn is_loaded(&self) -> bool {
        self.asset.is_ready()
    }

    fn asset(&self) -> Option<(&str, &AssetSlot)> {
        Some((&self.path, &self.asset))
    }
}

/// Flat ring system in the body's equatorial plane
#[derive(Clone, Debug, PartialEq)]
pub struct RingModule {
    pub inner: f64,
    pub outer: f64,
    pub texture: Option<String>,
}

impl BodyModule for RingModule {
    fn kind(&self) -> &'static str {
        "rings"
    }

    fn bounding_radius(&self) -> f64 {
        self.outer
    }
}

/// Scattering shell drawn from inside the body's neighbourhood
#[derive(Clone, Debug, PartialEq)]
pub struct AtmosphereModule {
    pub radius: f64,
    pub height: f64,
    pub color: Vec3,
}

impl BodyModule for AtmosphereModule {
    fn kind(&self) -> &'static str {
        "atmosphere"
    }

    fn bounding_radius(&self) -> f64 {
        self.radius + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_only_count_loaded_modules() {
        let model = ModelModule::new("ship.obj", 500.0);
        let slot = model.slot();

        let mut tiers = ModuleTiers::new();
        let sphere = SphereModule { radius: 10.0, oblateness: 0.0, texture: None };
        tiers.push(DrawTier::Near, Box::new(sphere));
        tiers.push(DrawTier::Near, Box::new(model));

        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers.loaded_count(), 1);
        assert_eq!(tiers.bounding_radius(), 10.0);

        slot.mark_ready();
        assert_eq!(tiers.loaded_count(), 2);
        assert_eq!(tiers.bounding_radius(), 500.0);
    }

    #[test]
    fn test_iter_walks_tiers_in_order() {
        let mut tiers = ModuleTiers::new();
        let atmosphere = AtmosphereModule { radius: 1.0, height: 0.1, color: Vec3::ONE };
        tiers.push(DrawTier::Inner, Box::new(atmosphere));
        tiers.push(DrawTier::Far, Box::new(RingModule { inner: 2.0, outer: 3.0, texture: None }));
        let order: Vec<_> = tiers.iter().map(|(t, m)| (t, m.kind())).collect();
        assert_eq!(order, vec![(DrawTier::Far, "rings"), (DrawTier::Inner, "atmosphere")]);
    }
}
