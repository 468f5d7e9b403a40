//! Hierarchical celestial body graph with a floating-origin update engine.
//!
//! Bodies live in an arena and form trees under isolated system roots. Each
//! frame the [`Observer`] picks the body it is nearest to as the coordinate
//! origin and runs [`BodyGraph::dispatch_update`] from there, so matrices stay
//! small wherever the viewer is.

mod arena;
pub mod body;
pub mod config;
pub mod error;
pub mod graph;
pub mod handle;
pub mod loader;
pub mod module;
pub mod observer;
pub mod render;
pub mod system;
pub mod traversal;
pub mod view;

pub use arena::BodyId;
pub use body::{BodyKind, BodyNode, BodySpec, FrameState, OrbitCache, RotationElements};
pub use config::{BodyConfig, GraphConfig, SystemConfig};
pub use error::{ConfigError, GraphError, GraphResult};
pub use graph::BodyGraph;
pub use handle::BodyRef;
pub use loader::{
    load_body, load_system, load_system_file, LoadReport, LoaderRegistry, ModuleInput,
    ModuleLoader, OrbitLoader,
};
pub use module::{AssetSlot, AssetState, BodyModule, DrawTier, ModuleSlot, ModuleTiers};
pub use observer::Observer;
pub use render::{BodyInstance, Renderer};
pub use system::SystemIndex;
pub use traversal::FrameContext;
pub use view::ViewParams;

#[cfg(test)]
mod tests;
