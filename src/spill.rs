//! Spill materialisation (spec.md §4.7): replace spilled temporaries with
//! loads/stores against dedicated spill-slot globals, then re-serialise the
//! CFG back into the program's linear instruction stream.
//!
//! A spill load/store addresses its global directly rather than through a
//! base register: `Lw`/`Sw` already carry an optional `address_label` (used
//! elsewhere for branch targets), so a spill load is
//! `Lw spill_reg, .t<id>` with no `src1`, and a spill store is
//! `Sw .t<id>, spill_reg` with no `src1` — the same field the assembly
//! emitter prints as a global symbol rather than a register-relative offset.

use std::collections::HashMap;

use log::debug;

use crate::cfg::Cfg;
use crate::error::{CompileError, CompileResult};
use crate::ir::{DirectiveKind, InstrArg, Instruction, LabelHandle, Opcode, Program, RegId, REG_ZERO};
use crate::regalloc::{Allocation, LiveInterval};
use crate::target::Target;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Slot {
    Dest,
    Src1,
    Src2,
}

fn operand_mut(instr: &mut Instruction, slot: Slot) -> Option<&mut InstrArg> {
    match slot {
        Slot::Dest => instr.dest.as_mut(),
        Slot::Src1 => instr.src1.as_mut(),
        Slot::Src2 => instr.src2.as_mut(),
    }
}

/// One entry in a block-local spill-slot cache.
#[derive(Clone, Copy)]
struct CacheEntry {
    temp: RegId,
    dirty: bool,
}

fn spill_load(spill_reg: RegId, global: LabelHandle) -> Instruction {
    Instruction::new(Opcode::Lw)
        .with_dest(InstrArg::new(spill_reg))
        .with_address_label(global)
}

fn spill_store(spill_reg: RegId, global: LabelHandle) -> Instruction {
    Instruction::new(Opcode::Sw)
        .with_src2(InstrArg::new(spill_reg))
        .with_address_label(global)
}

/// Allocate a `.t<id>`, one-word, zero-initialised global for every spilled
/// temporary named by `intervals`.
fn allocate_spill_globals(
    program: &mut Program,
    intervals: &[LiveInterval],
    alloc: &Allocation,
) -> HashMap<RegId, LabelHandle> {
    let mut globals = HashMap::new();
    for iv in intervals {
        if alloc.is_spilled(iv.temp_reg_id) && !globals.contains_key(&iv.temp_reg_id) {
            let label = program.new_label(Some(&format!("t{}", iv.temp_reg_id)));
            program.gen_data(DirectiveKind::Word, 0, label);
            globals.insert(iv.temp_reg_id, label);
        }
    }
    globals
}

/// Rewrite every spilled operand in `cfg` into loads/stores against its
/// spill global, rewrite every non-spilled operand to its physical binding,
/// and write the resulting instruction stream back into `program`.
pub fn materialize_spills(
    program: &mut Program,
    cfg: &Cfg,
    intervals: &[LiveInterval],
    alloc: &Allocation,
    target: &Target,
) -> CompileResult<()> {
    let globals = allocate_spill_globals(program, intervals, alloc);
    debug!("materialising {} spilled temporaries", globals.len());

    let mut serialized: Vec<Instruction> = Vec::new();

    for block in cfg.real_blocks() {
        let mut cache: Vec<Option<CacheEntry>> = vec![None; target.num_spill_regs()];
        let mut block_out: Vec<Instruction> = Vec::new();

        for &node_id in &cfg.block(block).nodes {
            let mut instr = cfg.node(node_id).instr.clone();
            let mut claimed = vec![false; target.num_spill_regs()];
            let mut prepend: Vec<Instruction> = Vec::new();

            for &slot in &[Slot::Dest, Slot::Src1, Slot::Src2] {
                let Some(arg) = operand_mut(&mut instr, slot) else {
                    continue;
                };
                let temp = arg.reg;
                if temp == REG_ZERO {
                    continue;
                }
                if !alloc.is_spilled(temp) {
                    arg.reg = alloc.binding(temp);
                    continue;
                }

                let is_dest = slot == Slot::Dest;
                let reused = cache
                    .iter()
                    .position(|e| e.map(|e| e.temp) == Some(temp));

                let idx = match reused {
                    Some(idx) => {
                        claimed[idx] = true;
                        if is_dest {
                            cache[idx].as_mut().unwrap().dirty = true;
                        }
                        idx
                    }
                    None => {
                        let idx = (0..cache.len())
                            .find(|i| !claimed[*i])
                            .ok_or_else(|| {
                                CompileError::internal(
                                    "spill slot exhausted materialising one instruction",
                                )
                            })?;
                        claimed[idx] = true;

                        if let Some(evicted) = cache[idx] {
                            if evicted.dirty && evicted.temp != temp {
                                let global = globals[&evicted.temp];
                                prepend.push(spill_store(
                                    target.spill_register(idx),
                                    global,
                                ));
                            }
                        }
                        if !is_dest {
                            let global = globals[&temp];
                            prepend.push(spill_load(target.spill_register(idx), global));
                        }
                        cache[idx] = Some(CacheEntry {
                            temp,
                            dirty: is_dest,
                        });
                        idx
                    }
                };

                arg.reg = target.spill_register(idx);
            }

            // A prepended load inherits the instruction's label; a
            // prepended store never does (spec.md §4.7 step 3).
            if let Some(label) = instr.label.take() {
                match prepend.iter_mut().find(|i| i.opcode == Opcode::Lw) {
                    Some(first_load) => first_load.label = Some(label),
                    None => instr.label = Some(label),
                }
            }

            block_out.extend(prepend);
            block_out.push(instr);
        }

        flush_dirty(&mut block_out, &cache, &globals, target);
        serialized.extend(block_out);
    }

    program.instructions = crate::ir::DList::new();
    for instr in serialized {
        program.instructions.push_back(instr);
    }
    Ok(())
}

/// Emit a store for every still-dirty cache entry at block exit, before the
/// terminator if the block ends in one.
fn flush_dirty(
    block_out: &mut Vec<Instruction>,
    cache: &[Option<CacheEntry>],
    globals: &HashMap<RegId, LabelHandle>,
    target: &Target,
) {
    let mut stores = Vec::new();
    for (i, entry) in cache.iter().enumerate() {
        if let Some(entry) = entry {
            if entry.dirty {
                stores.push(spill_store(target.spill_register(i), globals[&entry.temp]));
            }
        }
    }
    if stores.is_empty() {
        return;
    }
    let splice_before_terminator = block_out
        .last()
        .map(|i| i.opcode.is_terminator())
        .unwrap_or(false);
    if splice_before_terminator {
        let terminator = block_out.pop().expect("checked above");
        block_out.extend(stores);
        block_out.push(terminator);
    } else {
        block_out.extend(stores);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{build, liveness};
    use crate::ir::{InstrArg, Instruction, Opcode};
    use crate::regalloc::{allocate, derive_constraints, extract_intervals};

    fn pressure_program(target: &Target) -> Program {
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
        // Every temporary is defined before any of them is consumed, so
        // right after the last `ADDI` all `n` are simultaneously live.
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
        p
    }

    #[test]
    fn spilled_temporary_gets_a_global_and_no_surviving_bare_reference() {
        let target = Target::riscv32_reference();
        let mut p = pressure_program(&target);
        let mut cfg = build(&p);
        liveness::compute(&mut cfg);
        let mut intervals = extract_intervals(&cfg);
        derive_constraints(&mut intervals, &cfg, &target);
        let alloc = allocate(&intervals, &target);

        let spilled_count = intervals
            .iter()
            .filter(|iv| alloc.is_spilled(iv.temp_reg_id))
            .count();
        assert!(spilled_count >= 1, "pressure program must force a spill");

        materialize_spills(&mut p, &cfg, &intervals, &alloc, &target).unwrap();

        for instr in p.instructions.iter() {
            for arg in [&instr.dest, &instr.src1, &instr.src2]
                .into_iter()
                .flatten()
            {
                let is_physical = arg.reg == REG_ZERO
                    || target.gp_registers.contains(&arg.reg)
                    || target.spill_registers.contains(&arg.reg);
                assert!(is_physical, "operand {} is not a physical register", arg.reg);
            }
        }

        assert!(!p.data.is_empty(), "spilling allocates at least one global");
    }
}
