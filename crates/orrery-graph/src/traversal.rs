//! Per-frame traversal.
//!
//! `dispatch_update` descends the visible subtree of the observer's reference
//! body, then climbs through its ancestors, re-rooting the matrix at each
//! level, until it reaches an isolated system root. Matrices map a body's
//! frame to observer space, so their translations stay small near the viewer.

use crate::arena::BodyId;
use crate::body::TIME_REFERENCE_BODY;
use crate::graph::BodyGraph;
use crate::view::ViewParams;
use glam::{DMat4, DQuat};
use orrery_core::time::greenwich_sidereal_time;
use std::f64::consts::{PI, TAU};

/// State shared by every body update in one frame
#[derive(Clone, Debug)]
pub struct FrameContext {
    pub jd: f64,
    pub stamp: u64,
    pub view: ViewParams,
    /// Bodies large enough on screen to get their own depth range
    pub notable: Vec<BodyId>,
    /// Bodies that ran `update` this frame, in traversal order
    pub updated: Vec<BodyId>,
    /// Observer inside a body's own area of influence
    pub inside: Vec<BodyId>,
}

impl FrameContext {
    pub fn is_notable(&self, id: BodyId) -> bool {
        self.notable.contains(&id)
    }
}

impl BodyGraph {
    pub fn begin_frame(&mut self, jd: f64, view: ViewParams) -> FrameContext {
        self.stamp += 1;
        FrameContext {
            jd,
            stamp: self.stamp,
            view,
            notable: Vec::new(),
            updated: Vec::new(),
            inside: Vec::new(),
        }
    }

    /// Distance and visibility from the incoming body-to-observer matrix
    pub fn pre_update(&mut self, id: BodyId, matrix: DMat4, ctx: &FrameContext) {
        let hysteresis = self.config.subtree_hysteresis;
        let view = ctx.view;
        let Some(node) = self.node_mut(id) else {
            return;
        };

        let was_subtree_visible = node.frame.stamp + 1 == ctx.stamp && node.frame.subtree_visible;
        let pos = matrix.w_axis.truncate();
        let distance = pos.length();

        let half = half_angle(node.bounding_radius(), distance).max(node.min_half_angle);
        let visible = view.in_cone(pos, half);

        let subtree_visible = if node.children.is_empty() {
            visible
        } else {
            let sub_half = half_angle(node.subtree_radius(), distance).max(half);
            let held = was_subtree_visible && sub_half >= hysteresis * view.half_fov();
            view.in_cone(pos, sub_half) || held
        };

        let frame = &mut node.frame;
        frame.stamp = ctx.stamp;
        frame.matrix = matrix;
        frame.distance = distance;
        frame.half_angular_size = half;
        frame.visible = visible;
        frame.subtree_visible = subtree_visible;
        frame.is_light = false;
        frame.screen_pos = None;
        frame.screen_size = 0.0;
    }

    /// Screen placement, spin, module state and the notable list
    pub fn update(&mut self, id: BodyId, ctx: &mut FrameContext) {
        let notable_size = self.config.notable_screen_size;
        let jd = ctx.jd;
        let view = ctx.view;
        let Some(node) = self.node_mut(id) else {
            return;
        };

        let loaded = node.modules.loaded_count();
        if node.module_bounds.is_none() || loaded != node.loaded_modules {
            node.module_bounds = Some(node.modules.bounding_radius());
            node.loaded_modules = loaded;
        }

        let spin = if node.name == TIME_REFERENCE_BODY {
            (greenwich_sidereal_time(jd) + node.rotation.offset).rem_euclid(TAU)
        } else {
            node.rotation.spin_angle(jd)
        };
        let orientation: DQuat = node.rotation.orientation(jd, spin);

        let frame = &mut node.frame;
        frame.spin = spin;
        let model_view = view.view_rotation() * frame.matrix * DMat4::from_quat(orientation);
        frame.model_view = model_view.as_mat4();
        frame.screen_pos = view.project(frame.position());
        frame.screen_size = view.angular_to_pixels(frame.half_angular_size);

        if frame.screen_size >= notable_size {
            ctx.notable.push(id);
        }
        if frame.distance < node.influence_radius {
            ctx.inside.push(id);
        }
        ctx.updated.push(id);
    }

    /// Updates `id` and, while its subtree is visible, its active children.
    /// Nested isolated roots are updated as single bodies.
    pub fn recursive_update(&mut self, id: BodyId, matrix: DMat4, ctx: &mut FrameContext) {
        self.pre_update(id, matrix, ctx);
        let Some(node) = self.body(id) else {
            return;
        };
        let (visible, subtree_visible) = (node.frame.visible, node.frame.subtree_visible);
        let children = if subtree_visible { node.children.clone() } else { Vec::new() };
        if visible {
            self.update(id, ctx);
        }
        for child in children {
            let child_matrix = matrix * self.transform_body_to_parent(child, ctx.jd);
            self.update_child(child, child_matrix, ctx);
        }
    }

    fn update_child(&mut self, child: BodyId, matrix: DMat4, ctx: &mut FrameContext) {
        if self.body(child).is_some_and(|c| c.is_isolated()) {
            self.pre_update(child, matrix, ctx);
            if self.body(child).is_some_and(|c| c.frame.visible) {
                self.update(child, ctx);
            }
        } else {
            self.recursive_update(child, matrix, ctx);
        }
    }

    /// Traversal entry point. Returns the isolated root that bounded the climb
    /// (or the topmost ancestor when no root is isolated).
    pub fn dispatch_update(
        &mut self,
        start: BodyId,
        matrix: DMat4,
        ctx: &mut FrameContext,
    ) -> Option<BodyId> {
        self.body(start)?;
        self.recursive_update(start, matrix, ctx);

        let mut current = start;
        let mut matrix = matrix;
        loop {
            let node = self.body(current)?;
            if node.is_isolated() {
                return Some(current);
            }
            let Some(parent) = node.parent else {
                return Some(current);
            };

            let parent_matrix = matrix * self.transform_parent_to_body(current, ctx.jd);
            self.pre_update(parent, parent_matrix, ctx);
            if self.body(parent).is_some_and(|p| p.frame.visible) {
                self.update(parent, ctx);
            }

            let siblings = self.body(parent).map(|p| p.children.clone()).unwrap_or_default();
            for sibling in siblings.into_iter().filter(|s| *s != current) {
                let sibling_matrix = parent_matrix * self.transform_body_to_parent(sibling, ctx.jd);
                self.update_child(sibling, sibling_matrix, ctx);
            }

            current = parent;
            matrix = parent_matrix;
        }
    }
}

/// Half the angle a sphere of `radius` subtends at `distance`. From inside the
/// sphere it fills the whole sky.
pub fn half_angle(radius: f64, distance: f64) -> f64 {
    if distance <= radius {
        PI
    } else {
        (radius / distance).asin()
    }
}
