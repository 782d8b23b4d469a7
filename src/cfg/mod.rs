//! Control-flow graph construction and liveness analysis.

pub mod flowgraph;
pub mod liveness;

pub use flowgraph::{build, BasicBlock, BlockId, Cfg, CfgNode, CfgNodeId, CfgReg, CfgRegId};
