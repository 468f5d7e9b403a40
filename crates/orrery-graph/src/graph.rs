//! The body graph: arena-owned nodes, name registry, hidden list and the
//! per-level transforms that make the floating origin work.

use crate::arena::{Arena, BodyId};
use crate::body::{BodyNode, BodySpec};
use crate::config::GraphConfig;
use crate::system::SystemIndex;
use glam::{DMat4, DVec3};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};


pub struct BodyGraph {
    pub(crate) config: GraphConfig,
    pub(crate) bodies: Arena<BodyNode>,
    names: HashMap<String, BodyId>,
    pub(crate) hidden: Vec<BodyId>,
    redirects: HashMap<BodyId, BodyId>,
    last_lookup: RefCell<Option<(String, BodyId)>>,
    pub(crate) stamp: u64,
}

impl BodyGraph {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            bodies: Arena::new(),
            names: HashMap::new(),
            hidden: Vec::new(),
            redirects: HashMap::new(),
            last_lookup: RefCell::new(None),
            stamp: 0,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn body(&self, id: BodyId) -> Option<&BodyNode> {
        self.bodies.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: BodyId) -> Option<&mut BodyNode> {
        self.bodies.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.len() == 0
    }

    pub fn ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.bodies.iter().map(|(id, _)| id)
    }

    /// Bodies without a parent
    pub fn roots(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.bodies.iter().filter(|(_, b)| b.parent.is_none()).map(|(id, _)| id)
    }

    pub fn hidden(&self) -> &[BodyId] {
        &self.hidden
    }

    /// Current frame counter
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    pub fn exists(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Name lookup that remembers the last hit
    pub fn find_body(&self, name: &str) -> Option<BodyId> {
        if let Some((cached, id)) = self.last_lookup.borrow().as_ref() {
            if cached == name && self.bodies.contains(*id) {
                return Some(*id);
            }
        }
        let id = self.find_body_once(name)?;
        *self.last_lookup.borrow_mut() = Some((name.to_string(), id));
        Some(id)
    }

    /// Name lookup that leaves the lookup cache alone
    pub fn find_body_once(&self, name: &str) -> Option<BodyId> {
        self.names.get(name).copied()
    }

    /// Case-insensitive scan over display names, then registry names
    pub fn find_body_name_i18n(&self, display_name: &str) -> Option<BodyId> {
        let wanted = display_name.trim().to_lowercase();
        self.bodies
            .iter()
            .find(|(_, b)| b.display_name().to_lowercase() == wanted)
            .or_else(|| self.bodies.iter().find(|(_, b)| b.name.to_lowercase() == wanted))
            .map(|(id, _)| id)
    }

    /// Id remembered by the last successful `find_body`
    pub fn cached_lookup(&self) -> Option<BodyId> {
        self.last_lookup.borrow().as_ref().map(|(_, id)| *id)
    }

    /// Follow redirects from a possibly stale id to a live body
    pub fn resolve_id(&self, id: BodyId) -> Option<BodyId> {
        if self.bodies.contains(id) {
            return Some(id);
        }
        self.redirects.get(&id).copied().filter(|to| self.bodies.contains(*to))
    }

    /// Every redirect target is a live body, so stale ids resolve in one hop
    pub(crate) fn redirect(&mut self, from: BodyId, to: BodyId) {
        for target in self.redirects.values_mut() {
            if *target == from {
                *target = to;
            }
        }
        self.redirects.insert(from, to);
    }

    /// Creates a body. A body already registered under the same name is
    /// replaced: children and handles move to the new node.
    pub fn add_body(&mut self, spec: BodySpec) -> BodyId {
        let previous = self.names.get(&spec.name).copied();
        let mut spec = spec;
        if let Some(parent) = spec.parent {
            if let Some(old) = previous.filter(|old| self.ancestors(parent).contains(old)) {
                // Hanging the replacement below the node it replaces would close a cycle
                spec.parent = self.bodies.get(old).and_then(|b| b.parent);
            } else if !self.bodies.contains(parent) {
                warn!(body = %spec.name, %parent, "parent no longer exists, adding as a root");
                spec.parent = None;
            }
        }

        if spec.parent.is_none() {
            // Roots cannot be hidden
            spec.hidden = false;
        }

        let system = spec.parent.and_then(|p| self.system_for_children(p));
        let node = spec.into_node(system, self.config.influence_factor);
        let (parent, hidden) = (node.parent, node.hidden);
        let name = node.name.clone();
        let id = self.bodies.insert(node);

        if let Some(p) = parent {
            if hidden {
                self.hidden.push(id);
            } else if let Some(parent_node) = self.bodies.get_mut(p) {
                parent_node.children.push(id);
            }
        }
        self.index_insert(system, id);

        match previous {
            Some(old) => self.migrate(old, id),
            None => {
                self.names.insert(name, id);
            }
        }

        self.refresh_extents(id);
        id
    }

    /// Moves everything hanging off `old` onto `new` and drops `old`
    fn migrate(&mut self, old: BodyId, new: BodyId) {
        let Some(old_node) = self.bodies.get_mut(old) else {
            return;
        };
        let children = std::mem::take(&mut old_node.children);
        let index = old_node.index.take();
        let handles = old_node.live_handles;
        let old_parent = old_node.parent;
        let old_system = old_node.system;
        let name = old_node.name.clone();

        let hidden_children: Vec<BodyId> = self
            .hidden
            .iter()
            .copied()
            .filter(|h| self.bodies.get(*h).is_some_and(|b| b.parent == Some(old)))
            .collect();
        for child in children.iter().chain(hidden_children.iter()) {
            if let Some(node) = self.bodies.get_mut(*child) {
                node.parent = Some(new);
            }
        }

        if let Some(node) = self.bodies.get_mut(new) {
            node.children.extend(children.iter().copied());
            node.live_handles += handles;
            if let (Some(target), Some(old_index)) = (node.index.as_mut(), index) {
                target.light = target.light.or(old_index.light);
            }
        }

        // Detach the old node
        if let Some(p) = old_parent {
            if let Some(parent) = self.bodies.get_mut(p) {
                parent.children.retain(|c| *c != old);
            }
        }
        self.hidden.retain(|h| *h != old);
        self.index_remove(old_system, old);
        self.replace_light(old, new);

        // Descendants may now belong to a different system
        let system = self.system_for_children(new);
        for child in children.iter().chain(hidden_children.iter()) {
            self.assign_system(*child, system);
        }

        self.redirect(old, new);
        self.names.insert(name.clone(), new);
        self.clear_lookup_of(old);
        self.bodies.remove(old);
        if let Some(p) = old_parent {
            self.refresh_extents(p);
        }
        debug!(body = %name, %old, %new, "re-registered body");
    }

    /// Destroys a body with its whole subtree, hidden descendants included.
    /// Handles to any of them are redirected to the removed body's parent.
    pub fn remove_body(&mut self, id: BodyId) -> usize {
        let Some(node) = self.bodies.get(id) else {
            return 0;
        };
        let parent = node.parent;
        let doomed = self.subtree(id);

        if let Some(p) = parent {
            if let Some(parent_node) = self.bodies.get_mut(p) {
                parent_node.children.retain(|c| *c != id);
            }
        }

        let mut moved_handles = 0;
        for body in &doomed {
            let Some(node) = self.bodies.remove(*body) else {
                continue;
            };
            moved_handles += node.live_handles;
            self.names.remove(&node.name);
            self.index_remove(node.system, *body);
            self.clear_light(*body);
            self.clear_lookup_of(*body);
            if let Some(p) = parent {
                self.redirect(*body, p);
            }
        }
        let removed: HashSet<BodyId> = doomed.iter().copied().collect();
        self.hidden.retain(|h| !removed.contains(h));

        if let Some(p) = parent {
            if let Some(parent_node) = self.bodies.get_mut(p) {
                parent_node.live_handles += moved_handles;
            }
            self.refresh_extents(p);
        }
        debug!(%id, count = doomed.len(), "removed bodies");
        doomed.len()
    }

    /// Takes a body out of its parent's active children. Roots cannot be hidden.
    pub fn hide(&mut self, id: BodyId) -> bool {
        let Some(node) = self.bodies.get_mut(id) else {
            return false;
        };
        let Some(parent) = node.parent else {
            return false;
        };
        if node.hidden {
            return false;
        }
        node.hidden = true;
        if let Some(parent_node) = self.bodies.get_mut(parent) {
            parent_node.children.retain(|c| *c != id);
        }
        self.hidden.push(id);
        self.refresh_extents(parent);
        true
    }

    pub fn show(&mut self, id: BodyId) -> bool {
        let Some(node) = self.bodies.get_mut(id) else {
            return false;
        };
        if !node.hidden {
            return false;
        }
        node.hidden = false;
        node.cache.invalidate();
        let parent = node.parent;
        self.hidden.retain(|h| *h != id);
        if let Some(p) = parent {
            if let Some(parent_node) = self.bodies.get_mut(p) {
                parent_node.children.push(id);
            }
            self.refresh_extents(p);
        }
        true
    }

    /// Destroys hidden bodies that nobody holds a handle to
    pub fn purge_hidden(&mut self) -> usize {
        let candidates: Vec<BodyId> = self.hidden.clone();
        let mut purged = 0;
        for id in candidates {
            if !self.bodies.contains(id) {
                continue;
            }
            let held = self
                .subtree(id)
                .iter()
                .filter_map(|b| self.bodies.get(*b))
                .any(|b| b.live_handles > 0);
            if !held {
                purged += self.remove_body(id);
            }
        }
        purged
    }

    /// `id` and every descendant, active or hidden, parents first
    pub fn subtree(&self, id: BodyId) -> Vec<BodyId> {
        let mut hidden_by_parent: HashMap<BodyId, Vec<BodyId>> = HashMap::new();
        for h in &self.hidden {
            if let Some(p) = self.bodies.get(*h).and_then(|b| b.parent) {
                hidden_by_parent.entry(p).or_default().push(*h);
            }
        }

        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.bodies.get(current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
            if let Some(hidden) = hidden_by_parent.get(&current) {
                stack.extend(hidden.iter().copied());
            }
        }
        out
    }

    /// Ancestors of `id`, nearest first, `id` included
    pub fn ancestors(&self, id: BodyId) -> Vec<BodyId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            let Some(node) = self.bodies.get(c) else {
                break;
            };
            if chain.contains(&c) {
                break;
            }
            chain.push(c);
            current = node.parent;
        }
        chain
    }

    /// System index that children of `parent` register in
    fn system_for_children(&self, parent: BodyId) -> Option<BodyId> {
        let node = self.bodies.get(parent)?;
        if node.is_isolated() {
            Some(parent)
        } else {
            node.system
        }
    }

    fn assign_system(&mut self, id: BodyId, system: Option<BodyId>) {
        let Some(node) = self.bodies.get_mut(id) else {
            return;
        };
        let previous = node.system;
        let isolated = node.is_isolated();
        node.system = system;
        if previous != system {
            self.index_remove(previous, id);
            self.index_insert(system, id);
        }
        if isolated {
            return;
        }
        let mut below: Vec<BodyId> =
            self.bodies.get(id).map(|b| b.children.clone()).unwrap_or_default();
        below.extend(
            self.hidden
                .iter()
                .copied()
                .filter(|h| self.bodies.get(*h).is_some_and(|b| b.parent == Some(id))),
        );
        for child in below {
            self.assign_system(child, system);
        }
    }

    fn index_mut(&mut self, system: Option<BodyId>) -> Option<&mut SystemIndex> {
        self.bodies.get_mut(system?)?.index.as_mut()
    }

    fn index_insert(&mut self, system: Option<BodyId>, id: BodyId) {
        if let Some(index) = self.index_mut(system) {
            index.push(id);
        }
    }

    fn index_remove(&mut self, system: Option<BodyId>, id: BodyId) {
        if let Some(index) = self.index_mut(system) {
            index.null(id);
        }
    }

    fn replace_light(&mut self, old: BodyId, new: BodyId) {
        for (_, node) in self.bodies.iter_mut() {
            if let Some(index) = node.index.as_mut() {
                if index.light == Some(old) {
                    index.light = Some(new);
                }
            }
        }
    }

    fn clear_light(&mut self, id: BodyId) {
        for (_, node) in self.bodies.iter_mut() {
            if let Some(index) = node.index.as_mut() {
                if index.light == Some(id) {
                    index.light = None;
                }
            }
        }
    }

    fn clear_lookup_of(&self, id: BodyId) {
        let mut cache = self.last_lookup.borrow_mut();
        if cache.as_ref().is_some_and(|(_, cached)| *cached == id) {
            *cache = None;
        }
    }

    /// Designates the light-emitting body of an isolated system
    pub fn set_light(&mut self, system: BodyId, light: BodyId) -> bool {
        if !self.bodies.contains(light) {
            return false;
        }
        match self.bodies.get_mut(system).and_then(|n| n.index.as_mut()) {
            Some(index) => {
                index.light = Some(light);
                true
            }
            None => false,
        }
    }

    pub fn light(&self, system: BodyId) -> Option<BodyId> {
        self.bodies.get(system)?.index.as_ref()?.light
    }

    /// Distance reached by a body's active subtree, or by its own sphere of influence
    pub(crate) fn outer_radius(&self, id: BodyId) -> f64 {
        self.bodies.get(id).map_or(0.0, |b| b.effective_influence())
    }

    fn compute_extent(&self, id: BodyId) -> f64 {
        let Some(node) = self.bodies.get(id) else {
            return 0.0;
        };
        node.children
            .iter()
            .filter_map(|c| self.bodies.get(*c).map(|child| (c, child)))
            .map(|(c, child)| {
                child.orbit().map_or(0.0, |o| o.bounding_radius()) + self.outer_radius(*c)
            })
            .fold(0.0, f64::max)
    }

    /// Recomputes the subtree extent of `id` and every ancestor
    pub(crate) fn refresh_extents(&mut self, id: BodyId) {
        for ancestor in self.ancestors(id) {
            let extent = self.compute_extent(ancestor);
            if let Some(node) = self.bodies.get_mut(ancestor) {
                node.extent = extent;
            }
        }
    }

    /// Position of a body's origin in its parent's frame at `jd`
    pub fn local_position(&mut self, id: BodyId, jd: f64) -> DVec3 {
        let cadence = self.config.cadence_days();
        let Some(node) = self.bodies.get_mut(id) else {
            return DVec3::ZERO;
        };
        match node.orbit.clone() {
            Some(orbit) => node.cache.position(orbit.as_ref(), jd, cadence),
            None => DVec3::ZERO,
        }
    }

    /// Body frame to parent frame. Frames share axes, so this is a translation.
    pub fn transform_body_to_parent(&mut self, id: BodyId, jd: f64) -> DMat4 {
        DMat4::from_translation(self.local_position(id, jd))
    }

    pub fn transform_parent_to_body(&mut self, id: BodyId, jd: f64) -> DMat4 {
        DMat4::from_translation(-self.local_position(id, jd))
    }

    pub fn body_to_parent_pos(&mut self, id: BodyId, pos: DVec3, jd: f64) -> DVec3 {
        pos + self.local_position(id, jd)
    }

    pub fn parent_to_body_pos(&mut self, id: BodyId, pos: DVec3, jd: f64) -> DVec3 {
        pos - self.local_position(id, jd)
    }

    /// Corrective transform taking coordinates in `from`'s frame to `to`'s frame,
    /// composed through the nearest common ancestor. `None` for disjoint trees.
    pub fn calculate_switch_compensation(
        &mut self,
        from: BodyId,
        to: BodyId,
        jd: f64,
    ) -> Option<DMat4> {
        let up_chain = self.ancestors(from);
        let down_chain = self.ancestors(to);
        let common = *up_chain.iter().find(|a| down_chain.contains(a))?;

        let mut m_up = DMat4::IDENTITY;
        for body in up_chain.iter().take_while(|b| **b != common) {
            m_up = self.transform_body_to_parent(*body, jd) * m_up;
        }

        let mut m_down = DMat4::IDENTITY;
        for body in down_chain.iter().take_while(|b| **b != common) {
            m_down *= self.transform_parent_to_body(*body, jd);
        }
        Some(m_down * m_up)
    }

    /// Position of `target`'s origin in `frame`'s coordinates
    pub fn relative_position(&mut self, frame: BodyId, target: BodyId, jd: f64) -> Option<DVec3> {
        Some(self.calculate_switch_compensation(target, frame, jd)?.transform_point3(DVec3::ZERO))
    }

    /// Body the observer at `pos` (in `id`'s frame) should be referenced to instead
    ///
    /// Children are checked first; among children whose outer radius contains
    /// the observer the nearest center wins, earlier children on exact ties.
    /// Otherwise an observer beyond the outer radius (with hysteresis) goes
    /// back to the parent. Isolated roots never hand the observer upward.
    pub fn find_better_reference(&mut self, id: BodyId, pos: DVec3, jd: f64) -> Option<BodyId> {
        let node = self.bodies.get(id)?;
        let children = node.children.clone();
        let parent = if node.is_isolated() { None } else { node.parent };

        let mut best: Option<(f64, BodyId)> = None;
        for child in children {
            let dist = pos.distance(self.local_position(child, jd));
            if dist < self.outer_radius(child) && best.map_or(true, |(d, _)| dist < d) {
                best = Some((dist, child));
            }
        }
        if let Some((_, child)) = best {
            return Some(child);
        }

        let leave_at = self.outer_radius(id) * self.config.influence_hysteresis;
        match parent {
            Some(p) if pos.length() > leave_at => Some(p),
            _ => None,
        }
    }
}

impl Default for BodyGraph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}
