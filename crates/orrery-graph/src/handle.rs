//! Long-lived references to bodies.
//!
//! A `BodyRef` holds the id it was issued for. Replacement and deletion leave
//! a redirect behind, so resolving walks to the substitute; the live-handle
//! count travels with the redirect and keeps hidden bodies from being purged.

use crate::arena::BodyId;
use crate::graph::BodyGraph;
use std::cell::Cell;

/// Counted handle to a body. Deliberately not `Clone`: use [`BodyRef::duplicate`]
/// so the count stays right.
#[derive(Debug)]
pub struct BodyRef {
    id: Cell<BodyId>,
}

impl BodyRef {
    pub fn acquire(graph: &mut BodyGraph, id: BodyId) -> Option<BodyRef> {
        let id = graph.resolve_id(id)?;
        graph.node_mut(id)?.live_handles += 1;
        Some(BodyRef { id: Cell::new(id) })
    }

    pub fn duplicate(&self, graph: &mut BodyGraph) -> Option<BodyRef> {
        Self::acquire(graph, self.resolve_id(graph)?)
    }

    /// Id this handle currently points at, following redirects
    pub fn resolve_id(&self, graph: &BodyGraph) -> Option<BodyId> {
        let id = graph.resolve_id(self.id.get())?;
        self.id.set(id);
        Some(id)
    }

    pub fn resolve<'g>(&self, graph: &'g BodyGraph) -> Option<&'g crate::body::BodyNode> {
        graph.body(self.resolve_id(graph)?)
    }

    pub fn release(self, graph: &mut BodyGraph) {
        if let Some(node) = self.resolve_id(graph).and_then(|id| graph.node_mut(id)) {
            node.live_handles = node.live_handles.saturating_sub(1);
        }
    }

    /// Points the handle at another body, moving its count along
    pub fn redirect(&mut self, graph: &mut BodyGraph, to: BodyId) -> bool {
        let Some(to) = graph.resolve_id(to) else {
            return false;
        };
        if let Some(node) = self.resolve_id(graph).and_then(|id| graph.node_mut(id)) {
            node.live_handles = node.live_handles.saturating_sub(1);
        }
        if let Some(node) = graph.node_mut(to) {
            node.live_handles += 1;
        }
        self.id.set(to);
        true
    }
}
