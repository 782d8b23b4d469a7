//! Linear-scan main loop (Poletto & Sarkar; spec.md §4.6 "Main loop").

use crate::ir::{RegId, REG_INVALID, SPILL_REQUIRED};
use crate::regalloc::interval::LiveInterval;
use crate::regalloc::register_set::RegisterSet;
use crate::target::Target;

/// The allocator's output: for every temporary id seen, its physical
/// register, or [`SPILL_REQUIRED`] if no register could be found.
/// `REG_INVALID` marks a temporary id never touched by any interval.
#[derive(Clone, Debug)]
pub struct Allocation {
    bindings: Vec<RegId>,
}

impl Allocation {
    pub fn binding(&self, temp_reg_id: RegId) -> RegId {
        self.bindings
            .get(temp_reg_id as usize)
            .copied()
            .unwrap_or(REG_INVALID)
    }

    pub fn is_spilled(&self, temp_reg_id: RegId) -> bool {
        self.binding(temp_reg_id) == SPILL_REQUIRED
    }
}

/// Find the insertion point for `end` in `active`, which is kept sorted by
/// ascending `intervals[idx].end`.
fn active_insert_pos(active: &[usize], intervals: &[LiveInterval], end: u32) -> usize {
    active.partition_point(|&idx| intervals[idx].end <= end)
}

/// Run linear scan over `intervals` (already constraint-derived, sorted by
/// ascending `start`) against `target`'s general-purpose register pool.
pub fn allocate(intervals: &[LiveInterval], target: &Target) -> Allocation {
    let max_temp = intervals.iter().map(|iv| iv.temp_reg_id).max().unwrap_or(0);
    let mut bindings = vec![REG_INVALID; (max_temp + 1).max(1) as usize];
    let mut free = RegisterSet::from_regs(target.gp_registers.iter().copied());
    // Indices into `intervals`, kept sorted by ascending `end`.
    let mut active: Vec<usize> = Vec::new();

    for (cur_idx, cur) in intervals.iter().enumerate() {
        let mut cur_constraints = cur.mc_constraints.clone();

        // a. Expire intervals that ended before `cur` starts; hoist (but
        // keep alive) any whose end coincides with `cur`'s start.
        let mut hoisted = Vec::new();
        let mut i = 0;
        while i < active.len() {
            let a = &intervals[active[i]];
            if a.end < cur.start {
                free.free(bindings[a.temp_reg_id as usize]);
                active.remove(i);
            } else if a.end == cur.start {
                hoisted.push(bindings[a.temp_reg_id as usize]);
                i += 1;
            } else {
                break;
            }
        }
        if !hoisted.is_empty() {
            reorder_front(&mut cur_constraints, &hoisted);
        }

        // b. Assign: first constraint entry that's free wins.
        let assigned = cur_constraints.iter().copied().find(|&r| free.is_avail(r));

        if let Some(reg) = assigned {
            free.take(reg);
            bindings[cur.temp_reg_id as usize] = reg;
            let pos = active_insert_pos(&active, intervals, cur.end);
            active.insert(pos, cur_idx);
            continue;
        }

        // c. Spill decision: try to steal the register of the
        // longest-lived active interval if it outlives `cur` and its
        // register is one `cur` could use.
        let stole = if let Some(&last_idx) = active.last() {
            let last = &intervals[last_idx];
            let last_reg = bindings[last.temp_reg_id as usize];
            if last.end > cur.end && cur_constraints.contains(&last_reg) {
                bindings[cur.temp_reg_id as usize] = last_reg;
                bindings[last.temp_reg_id as usize] = SPILL_REQUIRED;
                active.pop();
                let pos = active_insert_pos(&active, intervals, cur.end);
                active.insert(pos, cur_idx);
                true
            } else {
                false
            }
        } else {
            false
        };

        if !stole {
            bindings[cur.temp_reg_id as usize] = SPILL_REQUIRED;
        }
    }

    // Termination: return whatever is left active to the free pool. The
    // pool itself is discarded with this function's return, but doing this
    // keeps the loop's invariant ("active holds only registers taken from
    // free") honoured up to the very end, matching spec.md §4.6.
    for idx in active {
        free.free(bindings[intervals[idx].temp_reg_id as usize]);
    }

    Allocation { bindings }
}

fn reorder_front(list: &mut Vec<crate::target::PhysReg>, front: &[crate::target::PhysReg]) {
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
