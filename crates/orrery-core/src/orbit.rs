use glam::DVec3;

/// Capability to place a body relative to its parent at a given time.
///
/// Positions are meters in the shared ecliptic J2000 frame, centered on the
/// parent body. Implementations must be pure: the same `jd` always yields the
/// same position, since callers cache and extrapolate between evaluations.
pub trait OrbitModel {
    /// Position relative to the parent at Julian date `jd`
    fn position_at(&self, jd: f64) -> DVec3;

    /// Largest distance from the parent the orbit ever reaches (meters)
    fn bounding_radius(&self) -> f64;

    /// True when the position never changes with time
    fn is_static(&self) -> bool {
        false
    }

    /// Short identifier for logs and listings
    fn kind(&self) -> &'static str;
}

impl std::fmt::Debug for dyn OrbitModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrbitModel({})", self.kind())
    }
}
