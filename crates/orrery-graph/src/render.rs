//! Render boundary. The graph decides what to draw with which matrix; the
//! renderer behind [`Renderer`] owns GPU state and assets.

use crate::arena::BodyId;
use crate::body::BodyNode;
use crate::graph::BodyGraph;
use crate::module::{BodyModule, DrawTier};
use crate::traversal::FrameContext;
use glam::{Mat4, Vec2, Vec3};

pub trait Renderer {
    fn begin_body_draw(&mut self, body: &BodyNode);
    fn end_body_draw(&mut self, body: &BodyNode);
    /// Start a fresh depth range for a body large on screen
    fn clear_depth(&mut self);
    fn draw(&mut self, module: &dyn BodyModule, model_view: &Mat4);
    fn draw_halo(&mut self, screen_pos: Vec2, color: Vec3, radius: f32);
}

pub const INSTANCE_VISIBLE: u32 = 1;
pub const INSTANCE_NOTABLE: u32 = 1 << 1;
pub const INSTANCE_LIGHT: u32 = 1 << 2;

/// Per-body record for instanced drawing
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BodyInstance {
    pub model_view: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub screen: [f32; 2],
    pub screen_radius: f32,
    pub flags: u32,
}

impl BodyGraph {
    /// Draws one body updated this frame. Returns whether anything was submitted.
    pub fn draw(&self, id: BodyId, renderer: &mut dyn Renderer, ctx: &FrameContext) -> bool {
        let Some(body) = self.body(id) else {
            return false;
        };
        let frame = &body.frame;
        if frame.stamp != ctx.stamp || !frame.visible {
            return false;
        }

        if ctx.is_notable(id) {
            renderer.clear_depth();
        }
        renderer.begin_body_draw(body);

        let near = frame.screen_size >= self.config.near_tier_screen_size;
        let inner = ctx.inside.contains(&id);
        let mut drawn = 0;
        for (tier, module) in body.modules.iter() {
            let wanted = match tier {
                DrawTier::Far => true,
                DrawTier::Near => near,
                DrawTier::Inner => inner,
            };
            if wanted && module.is_loaded() {
                renderer.draw(module, &frame.model_view);
                drawn += 1;
            }
        }

        if drawn == 0 && body.halo {
            if let Some(pos) = frame.screen_pos {
                renderer.draw_halo(pos.as_vec2(), body.color, frame.screen_size.max(1.0) as f32);
                drawn += 1;
            }
        }

        renderer.end_body_draw(body);
        drawn > 0
    }

    /// Draws a system's bodies far to near, in the order of the last `update_system`
    pub fn draw_system(
        &self,
        root: BodyId,
        renderer: &mut dyn Renderer,
        ctx: &FrameContext,
    ) -> usize {
        let Some(index) = self.body(root).and_then(|b| b.system_index()) else {
            return 0;
        };
        index.entries().filter(|id| self.draw(*id, renderer, ctx)).count()
    }

    /// Instance records for every body updated this frame
    pub fn instances(&self, ctx: &FrameContext) -> Vec<BodyInstance> {
        ctx.updated
            .iter()
            .filter_map(|id| self.body(*id).map(|b| (*id, b)))
            .filter(|(_, b)| b.frame.stamp == ctx.stamp)
            .map(|(id, b)| {
                let frame = &b.frame;
                let mut flags = 0;
                if frame.visible {
                    flags |= INSTANCE_VISIBLE;
                }
                if ctx.is_notable(id) {
                    flags |= INSTANCE_NOTABLE;
                }
                if frame.is_light {
                    flags |= INSTANCE_LIGHT;
                }
                BodyInstance {
                    model_view: frame.model_view.to_cols_array_2d(),
                    color: b.color.extend(1.0).to_array(),
                    screen: frame.screen_pos.map_or([0.0; 2], |p| p.as_vec2().to_array()),
                    screen_radius: frame.screen_size as f32,
                    flags,
                }
            })
            .collect()
    }
}
