//! The compilation pipeline, strung together in one place.
//!
//! Mirrors `cranelift-codegen`'s top-level `Context::compile`: a single
//! entry point that threads a `Program` through lowering, CFG construction,
//! liveness, register allocation and spill materialisation, logging a
//! `debug!` line at each phase boundary so a `RUST_LOG=debug` run narrates
//! the whole pipeline without needing a debugger.

use std::path::Path;

use log::debug;

use crate::cfg;
use crate::debug_log;
use crate::emit;
use crate::error::CompileResult;
use crate::ir::Program;
use crate::lower::lower_program;
use crate::regalloc;
use crate::spill::materialize_spills;
use crate::target::Target;

/// Everything the pipeline needs beyond the `Program` itself. Carried
/// explicitly rather than as global state, so compiling several programs
/// against different targets in the same process never interferes.
pub struct CompilationContext {
    pub target: Target,
}

impl CompilationContext {
    pub fn new(target: Target) -> Self {
        CompilationContext { target }
    }

    /// Run the full backend over `program` and render the result as
    /// assembly text. `log_output_path`, if given, is used to derive the
    /// sibling `_frontend.log`/`_controlFlow.log`/`_regAlloc.log` dump paths
    /// (debug builds only; see [`crate::debug_log`]).
    pub fn compile(&self, mut program: Program, log_output_path: Option<&Path>) -> CompileResult<String> {
        debug!("lowering out-of-range immediates");
        lower_program(&mut program, &self.target);

        debug!("building control-flow graph");
        let mut graph = cfg::build(&program);

        debug!("computing liveness");
        cfg::liveness::compute(&mut graph);

        debug!("extracting live intervals");
        let mut intervals = regalloc::extract_intervals(&graph);

        debug!("deriving register constraints for {} intervals", intervals.len());
        regalloc::derive_constraints(&mut intervals, &graph, &self.target);

        debug!("running linear-scan allocation");
        let allocation = regalloc::allocate(&intervals, &self.target);

        if let Some(path) = log_output_path {
            debug_log::write_all(path, &program, &graph, &intervals, &allocation)?;
        }

        debug!("materialising spills and rewriting physical registers");
        materialize_spills(&mut program, &graph, &intervals, &allocation, &self.target)?;

        debug!("emitting assembly");
        Ok(emit::emit(&program, &self.target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InstrArg, Instruction, Opcode};

    #[test]
    fn compiles_a_straight_line_program_to_assembly_text() {
        let mut p = Program::new();
        p.add_instruction(
            Instruction::new(Opcode::AddI)
                .with_dest(InstrArg::new(1))
                .with_src1(InstrArg::new(0))
                .with_immediate(5),
            1,
        );
        p.program_epilog(2);

        let ctx = CompilationContext::new(Target::riscv32_reference());
        let asm = ctx.compile(p, None).unwrap();
        assert!(asm.contains(".text"));
        assert!(asm.contains("addi"));
        assert!(asm.contains("exit"));
    }

    #[test]
    fn compiles_a_spilling_program_without_error() {
        let target = Target::riscv32_reference();
        let mut p = Program::new();
        let n = target.num_gp_regs() as i32 + 1;
        for i in 1..=n {
            p.add_instruction(
                Instruction::new(Opcode::AddI)
                    .with_dest(InstrArg::new(i))
                    .with_src1(InstrArg::new(0))
                    .with_immediate(i),
                i as u32,
            );
        }
        let acc = 1;
        for i in 2..=n {
            p.add_instruction(
                Instruction::new(Opcode::Add)
                    .with_dest(InstrArg::new(acc))
                    .with_src1(InstrArg::new(acc))
                    .with_src2(InstrArg::new(i)),
                (n + i) as u32,
            );
        }
        p.program_epilog((2 * n + 1) as u32);

        let ctx = CompilationContext::new(target);
        let asm = ctx.compile(p, None).unwrap();
        assert!(asm.contains(".data"));
    }
}
