//! Live-interval extraction (spec.md §4.5).

use crate::cfg::Cfg;
use crate::ir::RegId;
use crate::target::PhysReg;

/// The half-open range of node indices over which a temporary is live, plus
/// whichever machine-register constraints it was born with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiveInterval {
    pub temp_reg_id: RegId,
    /// Ordered candidate physical registers; position encodes preference.
    /// Empty until [`crate::regalloc::constraints::derive_constraints`] has
    /// run, unless `explicit` is true.
    pub mc_constraints: Vec<PhysReg>,
    /// Whether `mc_constraints` came from the front end (an `InstrArg`'s
    /// whitelist) rather than being filled in by constraint derivation.
    pub explicit: bool,
    pub start: u32,
    pub end: u32,
}

/// Walk `cfg` in program order, producing one interval per distinct
/// temporary, in ascending `start` order (a consequence of the monotone
/// walk, not a separate sort).
pub fn extract_intervals(cfg: &Cfg) -> Vec<LiveInterval> {
    use std::collections::BTreeSet;

    let mut index_of_temp: std::collections::HashMap<RegId, usize> =
        std::collections::HashMap::new();
    let mut intervals = Vec::new();

    for (k, node_id) in cfg.all_nodes().enumerate() {
        let node = cfg.node(node_id);
        let k = k as u32;

        let mut touched: BTreeSet<_> = BTreeSet::new();
        touched.extend(node.live_in.iter().copied());
        touched.extend(node.live_out.iter().copied());
        touched.extend(node.defs.iter().copied());

        for cfg_reg_id in touched {
            let creg = cfg.reg(cfg_reg_id);
            match index_of_temp.get(&creg.temp_reg_id) {
                Some(&idx) => intervals[idx].end = k,
                None => {
                    let idx = intervals.len();
                    intervals.push(LiveInterval {
                        temp_reg_id: creg.temp_reg_id,
                        mc_constraints: creg.mc_whitelist.clone().unwrap_or_default(),
                        explicit: creg.mc_whitelist.is_some(),
                        start: k,
                        end: k,
                    });
                    index_of_temp.insert(creg.temp_reg_id, idx);
                }
            }
        }
    }

    intervals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::build;
    use crate::ir::{InstrArg, Instruction, Opcode, Program};

    #[test]
    fn interval_covers_def_through_last_use() {
        let mut p = Program::new();
        p.add_instruction(
            Instruction::new(Opcode::AddI)
                .with_dest(InstrArg::new(1))
                .with_src1(InstrArg::new(0))
                .with_immediate(1),
            1,
        );
        p.add_instruction(
            Instruction::new(Opcode::Add)
                .with_dest(InstrArg::new(2))
                .with_src1(InstrArg::new(1))
                .with_src2(InstrArg::new(1)),
            2,
        );
        p.program_epilog(3);

        let mut cfg = build(&p);
        crate::cfg::liveness::compute(&mut cfg);
        let intervals = extract_intervals(&cfg);

        let r1 = intervals.iter().find(|iv| iv.temp_reg_id == 1).unwrap();
        assert_eq!(r1.start, 0);
        assert_eq!(r1.end, 1);
    }

    #[test]
    fn intervals_are_produced_in_ascending_start_order() {
        let mut p = Program::new();
        p.add_instruction(
            Instruction::new(Opcode::AddI)
                .with_dest(InstrArg::new(1))
                .with_src1(InstrArg::new(0))
                .with_immediate(1),
            1,
        );
        p.add_instruction(
            Instruction::new(Opcode::AddI)
                .with_dest(InstrArg::new(2))
                .with_src1(InstrArg::new(0))
                .with_immediate(2),
            2,
        );
        p.program_epilog(3);
        let mut cfg = build(&p);
        crate::cfg::liveness::compute(&mut cfg);
        let intervals = extract_intervals(&cfg);
        let starts: Vec<_> = intervals.iter().map(|iv| iv.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
    }
}
