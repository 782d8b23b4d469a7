//! The in-memory intermediate representation.

pub mod instr;
pub mod label;
pub mod list;
pub mod program;

pub use instr::{InstrArg, Instruction, Opcode, RegId, REG_INVALID, REG_ZERO, SPILL_REQUIRED};
pub use label::{Label, LabelHandle, LabelTable};
pub use list::{DList, NodeId};
pub use program::{DataHandle, DirectiveKind, GlobalDirective, Program, Symbol, SymbolKind};
