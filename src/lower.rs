//! Target lowering: rewrite out-of-range immediates into two-instruction
//! load sequences.
//!
//! Grounded in `original_source/acse/axe_target_transform.c`'s
//! `fixLargeImmediates`/`genLoweredImmediateMove`: split an immediate into a
//! 16-bit low half (sign-extended) and a high half, and materialise it with
//! `ADDI; SHLI; ADDI`, omitting phases that contribute nothing.

use log::debug;

use crate::ir::program::zero_arg;
use crate::ir::{InstrArg, Instruction, NodeId, Opcode, Program, REG_ZERO};
use crate::target::Target;

/// Rewrite every immediate-arithmetic instruction whose immediate doesn't
/// fit `target`'s field width into a lowered two/three-instruction
/// sequence. Idempotent: running this twice is a no-op the second time,
/// since every rewritten instruction either disappears (pure-move case) or
/// ends up with `immediate == 0`, which always fits.
pub fn lower_program(program: &mut Program, target: &Target) {
    let ids: Vec<NodeId> = program.instructions.iter_ids().collect();
    for node in ids {
        let instr = program.instructions.get(node).clone();
        if !instr.opcode.is_immediate_arith() || target.fits_immediate(instr.immediate) {
            continue;
        }
        lower_one(program, node, &instr);
    }
}

fn lower_one(program: &mut Program, node: NodeId, instr: &Instruction) {
    let is_pure_move =
        instr.opcode == Opcode::AddI && instr.src1.as_ref().map(|s| s.reg) == Some(REG_ZERO);

    let dest_reg = instr
        .dest
        .as_ref()
        .expect("immediate-arithmetic instruction has a destination")
        .reg;
    let rtmp = if is_pure_move {
        dest_reg
    } else {
        program.new_register()
    };

    // Sign-extend the low 16 bits, then arithmetic-shift the remainder.
    let imm = instr.immediate;
    let lo = imm as i16 as i32;
    let hi = (imm - lo) >> 16;

    debug!(
        "lowering immediate {imm:#x} into hi={hi:#x} lo={lo:#x} via r{rtmp}"
    );

    let mut seq = Vec::new();
    if hi != 0 {
        seq.push(
            Instruction::new(Opcode::AddI)
                .with_dest(InstrArg::new(rtmp))
                .with_src1(zero_arg())
                .with_immediate(hi),
        );
        seq.push(
            Instruction::new(Opcode::ShlI)
                .with_dest(InstrArg::new(rtmp))
                .with_src1(InstrArg::new(rtmp))
                .with_immediate(16),
        );
    }
    if lo != 0 || hi == 0 {
        let base = if hi != 0 { rtmp } else { REG_ZERO };
        seq.push(
            Instruction::new(Opcode::AddI)
                .with_dest(InstrArg::new(rtmp))
                .with_src1(InstrArg::new(base))
                .with_immediate(lo),
        );
    }

    // The lowered sequence's first instruction inherits the label/comment.
    let label = program.instructions.get(node).label;
    let comment = program.instructions.get(node).comment.clone();
    if let Some(first) = seq.first_mut() {
        first.label = label;
        first.comment = comment;
    }

    for ins in seq {
        program.instructions.insert_before(node, ins);
    }

    if is_pure_move {
        program.instructions.remove(node);
    } else {
        let rewritten = program.instructions.get_mut(node);
        rewritten.label = None;
        rewritten.comment = None;
        rewritten.opcode = instr.opcode.to_register_form();
        rewritten.src2 = Some(InstrArg::new(rtmp));
        rewritten.immediate = 0;
    }
}
