//! Optional intermediate-representation dumps, gated behind
//! `cfg(debug_assertions)`.
//!
//! Analogous to the teacher's `cfg_printer`/IR-to-text `write` modules:
//! render whatever the pipeline is currently looking at so a developer can
//! inspect it without attaching a debugger. The exact text format is not a
//! contract anything parses back — only a human (or a diff in a bug report)
//! reads these.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cfg::Cfg;
use crate::error::{CompileError, CompileResult};
use crate::ir::Program;
use crate::regalloc::{Allocation, LiveInterval};

fn sibling(output_path: &Path, suffix: &str) -> PathBuf {
    let stem = output_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("rv32cc");
    output_path.with_file_name(format!("{stem}{suffix}"))
}

fn write_log(path: &Path, text: &str) -> CompileResult<()> {
    fs::write(path, text).map_err(|source| CompileError::Output {
        path: path.to_path_buf(),
        source,
    })
}

fn render_frontend(program: &Program) -> String {
    let mut out = String::new();
    for (i, instr) in program.instructions.iter().enumerate() {
        out.push_str(&format!("{i:>4}: {instr:?}\n"));
    }
    out
}

fn render_control_flow(cfg: &Cfg) -> String {
    let mut out = String::new();
    for block in cfg.real_blocks() {
        let b = cfg.block(block);
        out.push_str(&format!(
            "block {:?}: preds={:?} succs={:?}\n",
            block, b.preds, b.succs
        ));
        for &node_id in &b.nodes {
            let node = cfg.node(node_id);
            let regs = |ids: &[crate::cfg::CfgRegId]| -> Vec<i32> {
                ids.iter().map(|&id| cfg.reg(id).temp_reg_id).collect()
            };
            out.push_str(&format!(
                "    {:?} defs={:?} uses={:?} live_in={:?} live_out={:?}\n",
                node.instr.opcode,
                regs(&node.defs),
                regs(&node.uses),
                regs(&node.live_in),
                regs(&node.live_out),
            ));
        }
    }
    out
}

fn render_reg_alloc(intervals: &[LiveInterval], alloc: &Allocation) -> String {
    let mut out = String::new();
    for iv in intervals {
        let binding = alloc.binding(iv.temp_reg_id);
        let status = if alloc.is_spilled(iv.temp_reg_id) {
            "SPILL".to_string()
        } else {
            format!("r{binding}")
        };
        out.push_str(&format!(
            "t{} [{}, {}] constraints={:?} -> {}\n",
            iv.temp_reg_id, iv.start, iv.end, iv.mc_constraints, status
        ));
    }
    out
}

/// Write `_frontend.log`, `_controlFlow.log` and `_regAlloc.log` next to
/// `output_path`, named after its stem. A no-op in release builds.
pub fn write_all(
    output_path: &Path,
    program: &Program,
    cfg: &Cfg,
    intervals: &[LiveInterval],
    alloc: &Allocation,
) -> CompileResult<()> {
    if !cfg!(debug_assertions) {
        return Ok(());
    }
    write_log(&sibling(output_path, "_frontend.log"), &render_frontend(program))?;
    write_log(&sibling(output_path, "_controlFlow.log"), &render_control_flow(cfg))?;
    write_log(
        &sibling(output_path, "_regAlloc.log"),
        &render_reg_alloc(intervals, alloc),
    )?;
    Ok(())
}
