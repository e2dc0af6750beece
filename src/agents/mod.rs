//! The four processing stages and the node that runs them.

pub mod stage;
pub mod stage_node;

pub use stage::Stage;
pub use stage_node::StageNode;
