//! The observer: owns the floating origin and drives each frame.

use crate::arena::BodyId;
use crate::graph::BodyGraph;
use crate::handle::BodyRef;
use crate::traversal::FrameContext;
use crate::view::ViewParams;
use glam::{DMat4, DVec3};
use orrery_core::{EquatorialCoordinate, HorizontalCoordinate};
use tracing::{debug, info, warn};

pub struct Observer {
    reference: BodyRef,
    /// Body the position is expressed in, as last seen by the observer
    anchor: BodyId,
    /// Observer position in the reference body's frame (meters)
    position: DVec3,
    /// Position used by the last traversal
    last_position: DVec3,
    pub view: ViewParams,
    switches: usize,
    last_system: Option<BodyId>,
}

impl Observer {
    pub fn new(
        graph: &mut BodyGraph,
        reference: BodyId,
        position: DVec3,
        view: ViewParams,
    ) -> Option<Self> {
        let reference = BodyRef::acquire(graph, reference)?;
        let anchor = reference.resolve_id(graph)?;
        Some(Self {
            reference,
            anchor,
            position,
            last_position: position,
            view,
            switches: 0,
            last_system: None,
        })
    }

    pub fn reference_body(&self, graph: &BodyGraph) -> Option<BodyId> {
        self.reference.resolve_id(graph)
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn set_position(&mut self, position: DVec3) {
        self.position = position;
    }

    pub fn translate(&mut self, delta: DVec3) {
        self.position += delta;
    }

    /// Reference switches performed so far
    pub fn switch_count(&self) -> usize {
        self.switches
    }

    /// Isolated root reached by the last update
    pub fn last_system(&self) -> Option<BodyId> {
        self.last_system
    }

    /// Re-roots on `target`, carrying the observer's position over so that
    /// nothing on screen moves
    pub fn set_reference(&mut self, graph: &mut BodyGraph, target: BodyId, jd: f64) -> bool {
        let Some(current) = self.follow_redirect(graph) else {
            return false;
        };
        if current == target {
            return true;
        }
        let Some(compensation) = graph.calculate_switch_compensation(current, target, jd) else {
            warn!(from = %current, to = %target, "no common ancestor, reference unchanged");
            return false;
        };
        if !self.reference.redirect(graph, target) {
            return false;
        }
        self.anchor = target;
        self.position = compensation.transform_point3(self.position);
        self.switches += 1;
        info!(
            from = graph.body(current).map_or("?", |b| b.name()),
            to = graph.body(target).map_or("?", |b| b.name()),
            "switched reference body"
        );
        true
    }

    /// Picks a better reference if needed, then runs the frame's traversal and
    /// sorts the system it ended in
    pub fn update(&mut self, graph: &mut BodyGraph, jd: f64) -> Option<FrameContext> {
        let mut reference = self.follow_redirect(graph)?;
        for _ in 0..graph.config().max_switches_per_frame {
            let Some(next) = graph.find_better_reference(reference, self.position, jd) else {
                break;
            };
            if !self.set_reference(graph, next, jd) {
                break;
            }
            reference = next;
        }

        let mut ctx = graph.begin_frame(jd, self.view);
        let matrix = DMat4::from_translation(-self.position);
        self.last_position = self.position;
        let system = graph.dispatch_update(reference, matrix, &mut ctx)?;
        graph.update_system(system, &ctx);
        if self.last_system != Some(system) {
            debug!(system = %system, "observer entered system");
        }
        self.last_system = Some(system);
        Some(ctx)
    }

    /// Moves up to `distance` meters toward `target`'s center. Returns the
    /// distance left between observer and center.
    pub fn move_toward(
        &mut self,
        graph: &mut BodyGraph,
        target: BodyId,
        distance: f64,
        jd: f64,
    ) -> Option<f64> {
        let reference = self.reference_body(graph)?;
        let goal = graph.relative_position(reference, target, jd)?;
        let offset = goal - self.position;
        let remaining = offset.length();
        if remaining == 0.0 {
            return Some(0.0);
        }
        let step = distance.min(remaining);
        self.position += offset / remaining * step;
        Some(remaining - step)
    }

    /// Jumps next to `target`, `standoff` meters from its center, and faces it
    pub fn go_to(&mut self, graph: &mut BodyGraph, target: BodyId, standoff: f64, jd: f64) -> bool {
        if !self.set_reference(graph, target, jd) {
            return false;
        }
        let direction = self.position.try_normalize().unwrap_or(DVec3::Y);
        self.position = direction * standoff;
        self.view.look_at(-direction);
        true
    }

    /// Position of `body` relative to the observer
    pub fn body_position(&self, graph: &mut BodyGraph, body: BodyId, jd: f64) -> Option<DVec3> {
        let reference = self.reference_body(graph)?;
        Some(graph.relative_position(reference, body, jd)? - self.position)
    }

    /// Converts an observer-space point to `body`'s local frame
    pub fn observer_to_body(
        &self,
        graph: &mut BodyGraph,
        body: BodyId,
        point: DVec3,
        jd: f64,
    ) -> Option<DVec3> {
        let reference = self.reference_body(graph)?;
        let m = graph.calculate_switch_compensation(reference, body, jd)?;
        Some(m.transform_point3(point + self.position))
    }

    /// Sky direction of an observer-space vector as right ascension and declination
    pub fn to_equatorial(&self, direction: DVec3) -> EquatorialCoordinate {
        EquatorialCoordinate::from_ecliptic(direction)
    }

    /// Sky direction of an observer-space vector for someone standing on the
    /// reference body below the observer. `None` at the poles.
    pub fn to_horizontal(
        &self,
        graph: &BodyGraph,
        direction: DVec3,
        jd: f64,
    ) -> Option<HorizontalCoordinate> {
        let body = self.reference.resolve(graph)?;
        HorizontalCoordinate::from_vector(direction, self.position, body.rotation().pole(jd))
    }

    /// Resolves the reference handle. When the body was removed underneath
    /// the observer, the position moves into the substitute's frame using
    /// where the last frame placed it.
    fn follow_redirect(&mut self, graph: &BodyGraph) -> Option<BodyId> {
        let current = self.reference.resolve_id(graph)?;
        if current == self.anchor {
            return Some(current);
        }
        let stamp = graph.stamp();
        match graph.body(current).map(|b| b.frame()) {
            Some(frame) if stamp > 0 && frame.stamp == stamp => {
                // Old origin sat at -last_position in observer space
                self.position += -self.last_position - frame.position();
                let from = self.anchor;
                warn!(%from, to = %current, "reference body removed, moved to substitute");
            }
            _ => debug!(from = %self.anchor, to = %current, "reference body replaced"),
        }
        self.anchor = current;
        Some(current)
    }

    pub fn release(self, graph: &mut BodyGraph) {
        self.reference.release(graph);
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("reference", &self.reference)
            .field("position", &self.position)
            .field("switches", &self.switches)
            .finish()
    }
}
