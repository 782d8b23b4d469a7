//! Constraint derivation, run once before the linear-scan main loop
//! (spec.md §4.6, "Constraint derivation").

use crate::cfg::Cfg;
use crate::regalloc::interval::LiveInterval;
use crate::target::{PhysReg, Target};

/// Move every register in `front`, in the order given, to the front of
/// `list`, preserving the relative order of whatever is left behind.
fn reorder_front(list: &mut Vec<PhysReg>, front: &[PhysReg]) {
    let mut head = Vec::with_capacity(front.len());
    for &reg in front {
        if let Some(pos) = list.iter().position(|&r| r == reg) {
            list.remove(pos);
            head.push(reg);
        }
    }
    head.extend(list.drain(..));
    *list = head;
}

/// Remove every register in `remove` from `list`, preserving order.
fn subtract(list: &mut Vec<PhysReg>, remove: &[PhysReg]) {
    list.retain(|r| !remove.contains(r));
}

/// There is no call instruction in this opcode set: the IR models a single
/// flat stream with no functions (spec.md §1 Non-goals). Kept as a named
/// predicate, rather than inlined `false`, so step 3 below reads the same
/// way the textbook algorithm does and needs only this function changed if
/// calls are ever added.
fn is_call_site(_opcode: crate::ir::Opcode) -> bool {
    false
}

/// Run the three constraint-derivation steps over `intervals` in place.
/// `intervals` must already be sorted by ascending `start` (the order
/// [`crate::regalloc::interval::extract_intervals`] produces).
pub fn derive_constraints(intervals: &mut [LiveInterval], cfg: &Cfg, target: &Target) {
    // Step 1: intervals with no explicit whitelist start out unconstrained,
    // i.e. any general-purpose register.
    for iv in intervals.iter_mut() {
        if !iv.explicit {
            iv.mc_constraints = target.gp_registers.clone();
        }
    }

    // Step 2: prefer coalescing into a directly-consuming interval, or
    // subtract a later interval's pinned constraints so it can still be
    // satisfied. Snapshot the "did this interval have an explicit
    // whitelist" facts and constraint sets up front so step 2 sees the
    // pre-derivation state of every *other* interval, not partially-updated
    // ones from earlier in this same pass.
    let snapshot: Vec<(bool, u32, u32, Vec<PhysReg>)> = intervals
        .iter()
        .map(|iv| (iv.explicit, iv.start, iv.end, iv.mc_constraints.clone()))
        .collect();

    for i in 0..intervals.len() {
        if intervals[i].explicit {
            continue;
        }
        let i_end = intervals[i].end;
        for j in (i + 1)..intervals.len() {
            let (j_explicit, j_start, j_end, ref j_constraints) = snapshot[j];
            if !j_explicit || j_start > i_end {
                continue;
            }
            if j_start == i_end {
                reorder_front(&mut intervals[i].mc_constraints, j_constraints);
            } else {
                subtract(&mut intervals[i].mc_constraints, j_constraints);
            }
        }
    }

    // Step 3: no temporary whose original constraints were pinned by the
    // front end is touched; everything else loses the caller-save set
    // across a call site.
    for node_id in cfg.all_nodes() {
        if !is_call_site(cfg.node(node_id).instr.opcode) {
            continue;
        }
        let k = node_id.0 as u32;
        for iv in intervals.iter_mut() {
            if iv.explicit {
                continue;
            }
            if iv.start <= k && k <= iv.end {
                subtract(&mut iv.mc_constraints, &target.caller_save);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorder_front_moves_matches_preserving_rest_order() {
        let mut list = vec![1, 2, 3, 4];
        reorder_front(&mut list, &[3, 1]);
        assert_eq!(list, vec![3, 1, 2, 4]);
    }

    #[test]
    fn subtract_removes_in_place_preserving_order() {
        let mut list = vec![1, 2, 3, 4];
        subtract(&mut list, &[2, 4]);
        assert_eq!(list, vec![1, 3]);
    }

    #[test]
    fn unconstrained_intervals_default_to_all_gp_registers() {
        let target = Target::riscv32_reference();
        let cfg = crate::cfg::build(&crate::ir::Program::new());
        let mut intervals = vec![LiveInterval {
            temp_reg_id: 1,
            mc_constraints: Vec::new(),
            explicit: false,
            start: 0,
            end: 0,
        }];
        derive_constraints(&mut intervals, &cfg, &target);
        assert_eq!(intervals[0].mc_constraints, target.gp_registers);
    }

    #[test]
    fn explicit_constraints_are_left_untouched() {
        let target = Target::riscv32_reference();
        let cfg = crate::cfg::build(&crate::ir::Program::new());
        let mut intervals = vec![LiveInterval {
            temp_reg_id: 1,
            mc_constraints: vec![300],
            explicit: true,
            start: 0,
            end: 0,
        }];
        derive_constraints(&mut intervals, &cfg, &target);
        assert_eq!(intervals[0].mc_constraints, vec![300]);
    }
}
