//! Element tree: the scoped builder API application code constructs nodes
//! with, and the conversion into the layout and render trees.

mod node;
mod scope;

pub use node::Element;
pub use scope::ScopeGuard;
