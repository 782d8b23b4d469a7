//! Control-flow graph construction.
//!
//! Modelled on `cranelift-codegen`'s `flowgraph::ControlFlowGraph` (successors
//! computed by scanning each block's terminator, predecessors as the reverse
//! of successors) but specialised to this backend's simpler data model: a
//! flat `Vec` arena of nodes in program order rather than an entity-keyed
//! `SecondaryMap`, since the whole CFG is rebuilt from scratch once per
//! compilation and never incrementally patched the way Cranelift's is.

use std::collections::HashMap;

use crate::ir::{Instruction, Opcode, Program, RegId, REG_ZERO};
use crate::target::PhysReg;

/// Maximum number of defs a CFG node may record (spec.md `CFG_MAX_DEFS`).
pub const CFG_MAX_DEFS: usize = 1;
/// Maximum number of uses a CFG node may record (spec.md `CFG_MAX_USES`).
pub const CFG_MAX_USES: usize = 3;

/// Handle to a basic block, including the entry/exit sentinels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub usize);

/// Handle to a node in the CFG's global node arena (program order).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CfgNodeId(pub usize);

/// Handle to an entry in the CFG's `CfgReg` pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CfgRegId(pub usize);

/// One CFG-local register: every `InstrArg` referring to the same temporary
/// id shares the same `CfgReg`, and therefore the same constraint set.
#[derive(Clone, Debug)]
pub struct CfgReg {
    pub temp_reg_id: RegId,
    pub mc_whitelist: Option<Vec<PhysReg>>,
}

/// One instruction plus its def/use sets and (after `liveness::compute`)
/// its live-in/live-out sets.
#[derive(Clone, Debug)]
pub struct CfgNode {
    pub instr: Instruction,
    pub block: BlockId,
    pub defs: Vec<CfgRegId>,
    pub uses: Vec<CfgRegId>,
    pub live_in: Vec<CfgRegId>,
    pub live_out: Vec<CfgRegId>,
}

/// An ordered sequence of CFG nodes with unordered predecessor/successor
/// block lists. Sentinel blocks (`entry`/`exit`) carry no nodes.
#[derive(Clone, Debug, Default)]
pub struct BasicBlock {
    pub nodes: Vec<CfgNodeId>,
    pub preds: Vec<BlockId>,
    pub succs: Vec<BlockId>,
}

/// The transient control-flow graph built from a [`Program`]'s instruction
/// stream, mutated during register allocation, and finally serialised back.
pub struct Cfg {
    pub blocks: Vec<BasicBlock>,
    pub nodes: Vec<CfgNode>,
    pub regs: Vec<CfgReg>,
    pub entry: BlockId,
    pub exit: BlockId,
    reg_index: HashMap<RegId, CfgRegId>,
}

impl Cfg {
    pub fn node(&self, id: CfgNodeId) -> &CfgNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: CfgNodeId) -> &mut CfgNode {
        &mut self.nodes[id.0]
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    pub fn reg(&self, id: CfgRegId) -> &CfgReg {
        &self.regs[id.0]
    }

    /// Iterate all real (non-sentinel) blocks in program order.
    pub fn real_blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len())
            .map(BlockId)
            .filter(move |&b| b != self.entry && b != self.exit)
    }

    /// Iterate every node across every block, in program order.
    pub fn all_nodes(&self) -> impl Iterator<Item = CfgNodeId> {
        (0..self.nodes.len()).map(CfgNodeId)
    }

    fn get_or_create_reg(&mut self, reg: RegId, whitelist: Option<Vec<PhysReg>>) -> CfgRegId {
        if let Some(&id) = self.reg_index.get(&reg) {
            return id;
        }
        let id = CfgRegId(self.regs.len());
        self.regs.push(CfgReg {
            temp_reg_id: reg,
            mc_whitelist: whitelist,
        });
        self.reg_index.insert(reg, id);
        id
    }
}

#[derive(Clone, Copy)]
enum Role {
    Dest,
    Src1,
    Src2,
}

fn arg_of(instr: &Instruction, role: Role) -> Option<(RegId, Option<Vec<PhysReg>>)> {
    let arg = match role {
        Role::Dest => instr.dest.as_ref(),
        Role::Src1 => instr.src1.as_ref(),
        Role::Src2 => instr.src2.as_ref(),
    }?;
    Some((arg.reg, arg.mc_whitelist.clone()))
}

/// The def/use role lists for an opcode, per spec.md §4.3's class table.
fn classify(op: Opcode) -> (&'static [Role], &'static [Role]) {
    use Opcode::*;
    use Role::*;
    match op {
        Add | Sub | And | Or | Xor | Shl | Shr | Sra | Slt | Sltu => {
            (&[Dest], &[Src1, Src2])
        }
        Lw => (&[Dest], &[Src1]),
        Sw => (&[], &[Src1, Src2]),
        SyscallRead => (&[Dest], &[]),
        SyscallPrint => (&[], &[Src1]),
        J | Nop | SyscallExit | Ebreak => (&[], &[]),
        _ if op.is_immediate_arith() => (&[Dest], &[Src1]),
        _ if op.is_conditional_branch() => (&[], &[Src1, Src2]),
        _ => (&[], &[]),
    }
}

/// Build the control-flow graph of `program`.
///
/// Block boundaries begin at: the first instruction, any labelled
/// instruction, and the instruction immediately following a terminator
/// (spec.md §4.3). The zero register is filtered out of every `defs`/`uses`
/// set — it is always live and never binds to anything.
pub fn build(program: &Program) -> Cfg {
    let instrs: Vec<Instruction> = program.instructions.iter().cloned().collect();
    let n = instrs.len();

    let mut boundary = vec![false; n];
    for i in 0..n {
        if i == 0 || instrs[i].label.is_some() {
            boundary[i] = true;
        }
        if i > 0 && instrs[i - 1].opcode.is_terminator() {
            boundary[i] = true;
        }
    }

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    let mut start = None;
    for i in 0..n {
        if boundary[i] {
            if let Some(s) = start {
                ranges.push((s, i));
            }
            start = Some(i);
        }
    }
    if let Some(s) = start {
        ranges.push((s, n));
    }

    let mut cfg = Cfg {
        blocks: Vec::new(),
        nodes: Vec::new(),
        regs: Vec::new(),
        entry: BlockId(0),
        exit: BlockId(0),
        reg_index: HashMap::new(),
    };
    cfg.blocks.push(BasicBlock::default()); // entry sentinel, index 0

    let mut label_block: HashMap<u32, BlockId> = HashMap::new();
    let mut real_block_ids: Vec<BlockId> = Vec::new();

    for &(s, e) in &ranges {
        let block_id = BlockId(cfg.blocks.len());
        cfg.blocks.push(BasicBlock::default());
        real_block_ids.push(block_id);

        if let Some(handle) = instrs[s].label {
            label_block.insert(program.label(handle).id, block_id);
        }

        for idx in s..e {
            let instr = instrs[idx].clone();
            let (def_roles, use_roles) = classify(instr.opcode);

            let mut defs = Vec::new();
            for &role in def_roles {
                if let Some((reg, wl)) = arg_of(&instr, role) {
                    if reg != REG_ZERO {
                        defs.push(cfg.get_or_create_reg(reg, wl));
                    }
                }
            }
            debug_assert!(defs.len() <= CFG_MAX_DEFS);

            let mut uses = Vec::new();
            for &role in use_roles {
                if let Some((reg, wl)) = arg_of(&instr, role) {
                    if reg != REG_ZERO {
                        uses.push(cfg.get_or_create_reg(reg, wl));
                    }
                }
            }
            debug_assert!(uses.len() <= CFG_MAX_USES);

            let node_id = CfgNodeId(cfg.nodes.len());
            cfg.nodes.push(CfgNode {
                instr,
                block: block_id,
                defs,
                uses,
                live_in: Vec::new(),
                live_out: Vec::new(),
            });
            cfg.blocks[block_id.0].nodes.push(node_id);
        }
    }

    let exit_id = BlockId(cfg.blocks.len());
    cfg.blocks.push(BasicBlock::default());
    cfg.exit = exit_id;

    let next_or_exit = |bi: usize| -> BlockId {
        real_block_ids
            .get(bi + 1)
            .copied()
            .unwrap_or(exit_id)
    };

    for (bi, &(_s, e)) in ranges.iter().enumerate() {
        let block_id = real_block_ids[bi];
        let last = &instrs[e - 1];
        let resolve = |h: Option<crate::ir::LabelHandle>| -> BlockId {
            let id = h
                .map(|handle| program.label(handle).id)
                .expect("branch/jump carries an address label");
            *label_block
                .get(&id)
                .expect("branch/jump target resolves to a block")
        };
        let succs = if last.opcode.is_conditional_branch() {
            vec![resolve(last.address_label), next_or_exit(bi)]
        } else if last.opcode.is_unconditional_jump() {
            vec![resolve(last.address_label)]
        } else if last.opcode.is_halt_or_exit() {
            vec![exit_id]
        } else {
            vec![next_or_exit(bi)]
        };
        cfg.blocks[block_id.0].succs = succs;
    }

    cfg.blocks[cfg.entry.0].succs = vec![real_block_ids.first().copied().unwrap_or(exit_id)];

    let edges: Vec<(BlockId, BlockId)> = cfg
        .blocks
        .iter()
        .enumerate()
        .flat_map(|(i, b)| b.succs.iter().map(move |&s| (BlockId(i), s)))
        .collect();
    for (from, to) in edges {
        cfg.blocks[to.0].preds.push(from);
    }

    cfg
}
