//! Hook system: lifecycle points, the shared context, the binding registry, and the dispatcher.

pub mod context;
pub mod definitions;
pub mod dispatcher;
pub mod registry;
