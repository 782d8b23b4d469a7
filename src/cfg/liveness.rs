//! Iterative backward liveness data-flow over the CFG (spec.md §4.4).

use std::collections::BTreeSet;

use crate::cfg::flowgraph::{BlockId, Cfg, CfgNodeId};

/// Compute `in`/`out` sets for every node in `cfg`, to a fixed point.
///
/// Blocks are visited in reverse post-order; within a block, nodes are
/// processed from last to first in a single sweep per iteration, matching
/// the standard formulation:
///
/// ```text
/// in[n]  = uses(n) ∪ (out[n] \ defs(n))
/// out[n] = ⋃ { in[s] : s ∈ successors(n) }
/// ```
pub fn compute(cfg: &mut Cfg) {
    let order = reverse_post_order(cfg);

    loop {
        let mut changed = false;
        for &block in &order {
            let node_ids = cfg.block(block).nodes.clone();
            for &n in node_ids.iter().rev() {
                let succ_nodes = successors_of(cfg, n);

                let mut new_out: BTreeSet<_> = BTreeSet::new();
                for s in succ_nodes {
                    new_out.extend(cfg.node(s).live_in.iter().copied());
                }

                let defs: BTreeSet<_> = cfg.node(n).defs.iter().copied().collect();
                let mut new_in: BTreeSet<_> = cfg.node(n).uses.iter().copied().collect();
                for r in &new_out {
                    if !defs.contains(r) {
                        new_in.insert(*r);
                    }
                }

                let new_out: Vec<_> = new_out.into_iter().collect();
                let new_in: Vec<_> = new_in.into_iter().collect();

                if cfg.node(n).live_out != new_out || cfg.node(n).live_in != new_in {
                    changed = true;
                    cfg.node_mut(n).live_out = new_out;
                    cfg.node_mut(n).live_in = new_in;
                }
            }
        }
        if !changed {
            break;
        }
    }
}

/// The CFG-node successors of `n`: the next node in the same block, or —
/// for a block's last node — the first node of each successor block.
fn successors_of(cfg: &Cfg, n: CfgNodeId) -> Vec<CfgNodeId> {
    let node = cfg.node(n);
    let block = cfg.block(node.block);
    let pos = block
        .nodes
        .iter()
        .position(|&x| x == n)
        .expect("node belongs to the block it points at");
    if pos + 1 < block.nodes.len() {
        vec![block.nodes[pos + 1]]
    } else {
        block
            .succs
            .iter()
            .filter_map(|&b| cfg.block(b).nodes.first().copied())
            .collect()
    }
}

fn reverse_post_order(cfg: &Cfg) -> Vec<BlockId> {
    let mut visited = vec![false; cfg.blocks.len()];
    let mut post = Vec::with_capacity(cfg.blocks.len());
    dfs(cfg, cfg.entry, &mut visited, &mut post);
    post.reverse();
    post
}

fn dfs(cfg: &Cfg, b: BlockId, visited: &mut [bool], post: &mut Vec<BlockId>) {
    if visited[b.0] {
        return;
    }
    visited[b.0] = true;
    for &s in &cfg.block(b).succs {
        dfs(cfg, s, visited, post);
    }
    post.push(b);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::flowgraph::build;
    use crate::ir::{InstrArg, Instruction, Opcode, Program};

    #[test]
    fn branch_and_fallthrough_liveness_matches_spec_example_e5() {
        // BEQ rA, rB, T; ADD rC, rA, rB; T: ADD rC, rC, 1
        let mut p = Program::new();
        let t = p.new_label(Some("t"));
        p.add_instruction(
            Instruction::new(Opcode::Beq)
                .with_src1(InstrArg::new(1))
                .with_src2(InstrArg::new(2))
                .with_address_label(t),
            1,
        );
        p.add_instruction(
            Instruction::new(Opcode::Add)
                .with_dest(InstrArg::new(3))
                .with_src1(InstrArg::new(1))
                .with_src2(InstrArg::new(2)),
            2,
        );
        p.assign_label(t);
        p.add_instruction(
            Instruction::new(Opcode::AddI)
                .with_dest(InstrArg::new(3))
                .with_src1(InstrArg::new(3))
                .with_immediate(1),
            3,
        );
        p.program_epilog(4);

        let mut cfg = build(&p);
        compute(&mut cfg);

        let beq_node = cfg.node(CfgNodeId(0));
        let beq_in_regs: Vec<_> = beq_node
            .live_in
            .iter()
            .map(|&r| cfg.reg(r).temp_reg_id)
            .collect();
        assert!(beq_in_regs.contains(&1));
        assert!(beq_in_regs.contains(&2));

        let tail_node = cfg.node(CfgNodeId(2));
        let tail_in_regs: Vec<_> = tail_node
            .live_in
            .iter()
            .map(|&r| cfg.reg(r).temp_reg_id)
            .collect();
        assert!(tail_in_regs.contains(&3));
    }

    #[test]
    fn soundness_out_includes_successor_in() {
        let mut p = Program::new();
        p.add_instruction(
            Instruction::new(Opcode::Add)
                .with_dest(InstrArg::new(1))
                .with_src1(InstrArg::new(2))
                .with_src2(InstrArg::new(3)),
            1,
        );
        p.add_instruction(
            Instruction::new(Opcode::Add)
                .with_dest(InstrArg::new(4))
                .with_src1(InstrArg::new(1))
                .with_src2(InstrArg::new(1)),
            2,
        );
        p.program_epilog(3);
        let mut cfg = build(&p);
        compute(&mut cfg);

        for n in cfg.all_nodes() {
            let succs = successors_of(&cfg, n);
            for s in succs {
                for r in &cfg.node(s).live_in {
                    assert!(cfg.node(n).live_out.contains(r));
                }
            }
        }
    }
}
