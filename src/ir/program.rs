//! The mutable IR container.
//!
//! `Program` owns the instruction stream, the data-directive list, the
//! symbol table, the label registry and the two monotonic counters
//! (next temporary register, next label id is owned by [`LabelTable`]). All
//! downstream passes (lowering, CFG construction, allocation, spill
//! materialisation) borrow a `Program` mutably and edit it in place; the CFG
//! itself is a transient projection built from, and finally serialised back
//! into, this instruction stream.

use crate::ir::instr::{InstrArg, Instruction, Opcode, RegId, REG_ZERO};
use crate::ir::label::{Label, LabelHandle, LabelTable};
use crate::ir::list::{DList, NodeId};

/// A named scalar or array symbol.
#[derive(Clone, Debug)]
pub enum SymbolKind {
    /// A scalar pinned to a temporary register.
    Scalar { reg: RegId },
    /// An array living only in the data segment.
    Array { size: u32 },
}

#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub label: LabelHandle,
}

/// The kind of a global data directive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectiveKind {
    /// A single 32-bit word with an initial value.
    Word,
    /// A zero-filled byte span.
    Space,
}

#[derive(Clone, Debug)]
pub struct GlobalDirective {
    pub kind: DirectiveKind,
    pub value: i32,
    pub label: LabelHandle,
}

/// A stable reference to an entry in `Program::data`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataHandle(usize);

/// The mutable program container. See the module docs for ownership.
pub struct Program {
    pub instructions: DList<Instruction>,
    pub data: Vec<GlobalDirective>,
    pub symbols: Vec<Symbol>,
    pub labels: LabelTable,
    pub start_label: LabelHandle,

    next_register: RegId,
    pending_label: Option<LabelHandle>,
    last_comment_line: Option<u32>,
}

impl Program {
    /// Create a program, reserving a global `_start` label and latching it
    /// as pending so the very first emitted instruction carries it.
    pub fn new() -> Self {
        let mut labels = LabelTable::new();
        let start_label = labels.new_label(Some("_start"), true);

        Program {
            instructions: DList::new(),
            data: Vec::new(),
            symbols: Vec::new(),
            labels,
            start_label,
            next_register: 1,
            pending_label: Some(start_label),
            last_comment_line: None,
        }
    }

    /// Allocate a fresh, unused temporary register.
    pub fn new_register(&mut self) -> RegId {
        let id = self.next_register;
        self.next_register += 1;
        id
    }

    /// Number of temporary registers allocated so far (excludes the zero
    /// register).
    pub fn register_count(&self) -> usize {
        (self.next_register - 1).max(0) as usize
    }

    /// Allocate a fresh label, sanitising and disambiguating `name` if
    /// given.
    pub fn new_label(&mut self, name: Option<&str>) -> LabelHandle {
        self.labels.new_label(name, false)
    }

    /// Attach `label` to the next instruction added via
    /// [`Program::add_instruction`]. If a label is already pending, collapse
    /// `label` into it per the alias-merge rule (spec.md §3).
    pub fn assign_label(&mut self, label: LabelHandle) {
        match self.pending_label {
            None => self.pending_label = Some(label),
            Some(pending) => self.labels.merge_alias(pending, label),
        }
    }

    /// Convenience: allocate a label and immediately assign it.
    pub fn assign_new_label(&mut self, name: Option<&str>) -> LabelHandle {
        let label = self.new_label(name);
        self.assign_label(label);
        label
    }

    /// Append `instr` to the instruction stream. Consumes any pending
    /// label, and attaches a `line <N>` comment iff `line` differs from the
    /// last line seen by this function.
    pub fn add_instruction(&mut self, mut instr: Instruction, line: u32) -> NodeId {
        if let Some(pending) = self.pending_label.take() {
            instr.label = Some(pending);
        }
        if self.last_comment_line != Some(line) {
            instr.comment = Some(format!("line {line}"));
            self.last_comment_line = Some(line);
        }
        self.instructions.push_back(instr)
    }

    /// Remove `node` from the instruction stream, preserving its label and
    /// comment by migrating them to the immediate successor (synthesising a
    /// NOP there first if the successor is missing or already labelled).
    /// The comment migrates only if the successor doesn't already have one;
    /// otherwise it is dropped.
    pub fn remove_instruction(&mut self, node: NodeId) -> Instruction {
        let label = self.instructions.get(node).label;
        let comment = self.instructions.get(node).comment.clone();
        let mut succ = self.instructions.next(node);

        if label.is_some() {
            let needs_synthetic =
                succ.map_or(true, |s| self.instructions.get(s).label.is_some());
            if needs_synthetic {
                succ = Some(
                    self.instructions
                        .insert_after(node, Instruction::new(Opcode::Nop)),
                );
            }
            let s = succ.expect("synthesised above if missing");
            self.instructions.get_mut(s).label = label;
            if comment.is_some() && self.instructions.get(s).comment.is_none() {
                self.instructions.get_mut(s).comment = comment;
            }
        } else if let Some(s) = succ {
            if comment.is_some() && self.instructions.get(s).comment.is_none() {
                self.instructions.get_mut(s).comment = comment;
            }
        }

        self.instructions.remove(node)
    }

    /// Append a global data directive. Returns a stable reference.
    pub fn gen_data(&mut self, kind: DirectiveKind, value: i32, label: LabelHandle) -> DataHandle {
        self.data.push(GlobalDirective {
            kind,
            value,
            label,
        });
        DataHandle(self.data.len() - 1)
    }

    pub fn data_directive(&self, handle: DataHandle) -> &GlobalDirective {
        &self.data[handle.0]
    }

    /// Declare a symbol. Scalars are pinned to `reg`; arrays live in the
    /// data segment only (`reg` is ignored for arrays).
    pub fn add_symbol(&mut self, name: impl Into<String>, kind: SymbolKind, label: LabelHandle) {
        self.symbols.push(Symbol {
            name: name.into(),
            kind,
            label,
        });
    }

    /// If a label is pending, emit an `exit(0)` so it isn't orphaned.
    /// Otherwise, append `exit(0)` unless the program already ends with it.
    pub fn program_epilog(&mut self, line: u32) {
        if self.pending_label.is_some() {
            self.add_instruction(Self::exit0(), line);
            return;
        }

        let already_halts = self
            .instructions
            .tail()
            .map(|t| is_exit0(self.instructions.get(t)))
            .unwrap_or(false);
        if !already_halts {
            self.add_instruction(Self::exit0(), line);
        }
    }

    fn exit0() -> Instruction {
        Instruction::new(Opcode::SyscallExit).with_immediate(0)
    }

    pub fn label(&self, handle: LabelHandle) -> &Label {
        self.labels.get(handle)
    }
}

fn is_exit0(instr: &Instruction) -> bool {
    instr.opcode == Opcode::SyscallExit && instr.immediate == 0
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the zero-register operand, useful in tests and in the lowering
/// pass.
pub fn zero_arg() -> InstrArg {
    InstrArg::new(REG_ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_program_latches_start_as_pending() {
        let mut p = Program::new();
        let node = p.add_instruction(Instruction::new(Opcode::Nop), 1);
        assert_eq!(p.instructions.get(node).label, Some(p.start_label));
    }

    #[test]
    fn add_instruction_dedupes_line_comment() {
        let mut p = Program::new();
        let a = p.add_instruction(Instruction::new(Opcode::Nop), 1);
        let b = p.add_instruction(Instruction::new(Opcode::Nop), 1);
        let c = p.add_instruction(Instruction::new(Opcode::Nop), 2);
        assert_eq!(p.instructions.get(a).comment.as_deref(), Some("line 1"));
        assert_eq!(p.instructions.get(b).comment, None);
        assert_eq!(p.instructions.get(c).comment.as_deref(), Some("line 2"));
    }

    #[test]
    fn remove_instruction_migrates_label_to_synthetic_nop() {
        let mut p = Program::new();
        // consumes the pending `_start` label
        let only = p.add_instruction(Instruction::new(Opcode::Nop), 1);
        p.remove_instruction(only);
        let head = p.instructions.head().expect("synthetic NOP inserted");
        assert_eq!(p.instructions.get(head).label, Some(p.start_label));
    }

    #[test]
    fn remove_instruction_migrates_label_to_existing_unlabelled_successor() {
        let mut p = Program::new();
        let first = p.add_instruction(Instruction::new(Opcode::Nop), 1);
        let _second = p.add_instruction(Instruction::new(Opcode::Nop), 1);
        p.remove_instruction(first);
        let head = p.instructions.head().unwrap();
        assert_eq!(p.instructions.get(head).label, Some(p.start_label));
        assert_eq!(p.instructions.len(), 1);
    }

    #[test]
    fn program_epilog_appends_exit_once() {
        let mut p = Program::new();
        p.add_instruction(Instruction::new(Opcode::Nop), 1);
        p.program_epilog(2);
        p.program_epilog(3);
        assert_eq!(p.instructions.len(), 2);
    }
}
