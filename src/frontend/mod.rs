//! A minimal demo front end.
//!
//! Grounded in `original_source/acse/parser.h`'s grammar shape (scalar
//! declarations, assignment, `+`/`-`, `read`/`print`, `while`/`if`), trimmed
//! to the operators this backend's [`crate::ir::Opcode`] enumeration can
//! actually lower: there is no multiply/divide opcode here (this target is
//! RV32I-shaped, not RV32IM, despite the reference target's name), so the
//! expression grammar below only has `+` and `-`. This module exists only
//! to hand the CLI and integration tests a producer of [`Program`] values;
//! it carries none of the invariants documented for the backend core.

mod ast;
mod lexer;
mod parser;

use crate::error::CompileResult;
use crate::ir::Program;

/// Parse `source` and lower it directly into a [`Program`].
pub fn compile_source(path: &std::path::Path, source: &str) -> CompileResult<Program> {
    let tokens = lexer::lex(path, source)?;
    let items = parser::parse(path, tokens)?;
    let mut program = Program::new();
    let mut codegen = parser::Codegen::new(&mut program, path);
    for item in &items {
        codegen.emit_item(item)?;
    }
    let last_line = codegen.last_line();
    program.program_epilog(last_line + 1);
    Ok(program)
}

pub use ast::{BinOp, Cond, Expr, Item, Rel, Stmt};
