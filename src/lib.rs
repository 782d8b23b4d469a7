//! Compiler backend core for a small C-like language targeting a 32-bit RISC
//! instruction set.
//!
//! The pipeline, in order: [`lower`] rewrites out-of-range immediates,
//! [`cfg`] builds the control-flow graph and computes liveness, [`regalloc`]
//! extracts live intervals and runs linear-scan allocation, [`spill`]
//! materialises spilled temporaries and rewrites physical bindings, and
//! [`emit`] renders the finalised [`ir::Program`] as assembly text.
//! [`context`] strings these together behind one entry point.

pub mod cfg;
pub mod context;
pub mod debug_log;
pub mod emit;
pub mod error;
pub mod frontend;
pub mod ir;
pub mod lower;
pub mod regalloc;
pub mod spill;
pub mod target;
