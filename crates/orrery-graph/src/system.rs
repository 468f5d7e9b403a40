//! Isolated system roots: the distance-sorted descendant index, light
//! designation and screen picking.

use crate::arena::BodyId;
use crate::graph::BodyGraph;
use crate::traversal::FrameContext;
use glam::{DVec2, DVec3};

/// Draw-order index owned by an isolated system root.
///
/// Destroyed bodies leave a `None` behind; holes are compacted before the
/// next sort.
#[derive(Clone, Debug, Default)]
pub struct SystemIndex {
    entries: Vec<Option<BodyId>>,
    has_holes: bool,
    pub(crate) light: Option<BodyId>,
    light_position: Option<DVec3>,
}

impl SystemIndex {
    pub fn entries(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.entries.iter().flatten().copied()
    }

    /// Slots including holes
    pub fn slots(&self) -> usize {
        self.entries.len()
    }

    pub fn has_holes(&self) -> bool {
        self.has_holes
    }

    pub fn light(&self) -> Option<BodyId> {
        self.light
    }

    /// Observer-space position of the light body as of the last update
    pub fn light_position(&self) -> Option<DVec3> {
        self.light_position
    }

    pub(crate) fn push(&mut self, id: BodyId) {
        if !self.entries.contains(&Some(id)) {
            self.entries.push(Some(id));
        }
    }

    pub(crate) fn null(&mut self, id: BodyId) {
        for entry in self.entries.iter_mut().filter(|e| **e == Some(id)) {
            *entry = None;
            self.has_holes = true;
        }
    }

    pub(crate) fn compact(&mut self) {
        if self.has_holes {
            self.entries.retain(Option::is_some);
            self.has_holes = false;
        }
    }
}

/// Cocktail-shaker pass ordering `items` by descending key.
///
/// Frame-to-frame order barely changes, so this runs close to linear.
fn shaker_sort_desc<T>(items: &mut [T], key: impl Fn(&T) -> f64) {
    if items.len() < 2 {
        return;
    }
    let (mut lo, mut hi) = (0, items.len() - 1);
    while lo < hi {
        let mut last_swap = lo;
        for i in lo..hi {
            if key(&items[i]) < key(&items[i + 1]) {
                items.swap(i, i + 1);
                last_swap = i;
            }
        }
        hi = last_swap;
        for i in (lo..hi).rev() {
            if key(&items[i]) < key(&items[i + 1]) {
                items.swap(i, i + 1);
                last_swap = i + 1;
            }
        }
        lo = last_swap;
    }
}

impl BodyGraph {
    /// Marks the light body, compacts the index and re-sorts it far to near.
    /// Bodies the frame did not reach sort as distance 0.
    pub fn update_system(&mut self, root: BodyId, ctx: &FrameContext) {
        let Some(mut index) = self.node_mut(root).and_then(|n| n.index.take()) else {
            return;
        };

        index.light_position = None;
        if let Some(light) = index.light {
            if let Some(node) = self.node_mut(light) {
                if node.frame.stamp == ctx.stamp {
                    node.frame.is_light = true;
                    index.light_position = Some(node.frame.position());
                }
            }
        }

        index.compact();
        let stamp = ctx.stamp;
        shaker_sort_desc(&mut index.entries, |entry| {
            entry
                .and_then(|id| self.body(id))
                .filter(|b| b.frame.stamp == stamp)
                .map_or(0.0, |b| b.frame.distance)
        });

        if let Some(node) = self.node_mut(root) {
            node.index = Some(index);
        }
    }

    /// Body under a screen point, scored by size-weighted proximity
    pub fn find_body_at(&self, root: BodyId, screen: DVec2, ctx: &FrameContext) -> Option<BodyId> {
        let index = self.body(root)?.system_index()?;
        let pick_radius = self.config.pick_radius;

        let mut best: Option<(f64, BodyId)> = None;
        for id in index.entries() {
            let Some(body) = self.body(id) else {
                continue;
            };
            let frame = &body.frame;
            if frame.stamp != ctx.stamp || !frame.visible {
                continue;
            }
            let Some(pos) = frame.screen_pos else {
                continue;
            };
            let reach = frame.screen_size.max(pick_radius);
            let d = pos.distance(screen);
            if d > reach {
                continue;
            }
            let score = reach / (d + 1.0);
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, id));
            }
        }
        best.map(|(_, id)| id)
    }
}
