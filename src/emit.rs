//! Assembly emitter (spec.md §6, "Output assembly format").
//!
//! This is the one external-collaborator surface this crate fully owns: the
//! finalised [`Program`] is the only input, and the emitter is a pure
//! function of it — same IR in, byte-identical text out, every time.

use crate::ir::{
    DirectiveKind, Instruction, Label, LabelHandle, Opcode, Program,
};
use crate::target::{Target, REG_ZERO};

fn label_text(label: &Label) -> String {
    match &label.name {
        Some(name) => name.clone(),
        None => format!(".L{}", label.id),
    }
}

/// The assembler-visible name of a physical register. Mirrors the id
/// ranges `Target::riscv32_reference` hands out: `100+i` → `s<i>`,
/// `200+i` → `t<i>`, `300+i` → `a<i>`, `0` → `zero`.
fn register_name(reg: i32) -> String {
    if reg == REG_ZERO {
        return "zero".into();
    }
    match reg {
        100..=111 => format!("s{}", reg - 100),
        200..=219 => format!("t{}", reg - 200),
        300..=307 => format!("a{}", reg - 300),
        other => format!("r{other}"),
    }
}

fn opcode_mnemonic(op: Opcode) -> &'static str {
    use Opcode::*;
    match op {
        Add => "add",
        Sub => "sub",
        And => "and",
        Or => "or",
        Xor => "xor",
        Shl => "sll",
        Shr => "srl",
        Sra => "sra",
        Slt => "slt",
        Sltu => "sltu",
        AddI => "addi",
        SubI => "subi",
        AndI => "andi",
        OrI => "ori",
        XorI => "xori",
        ShlI => "slli",
        ShrI => "srli",
        SraI => "srai",
        SltI => "slti",
        SltIu => "sltiu",
        Beq => "beq",
        Bne => "bne",
        Blt => "blt",
        Bge => "bge",
        Bltu => "bltu",
        Bgeu => "bgeu",
        J => "j",
        Lw => "lw",
        Sw => "sw",
        SyscallExit => "exit",
        SyscallRead => "read",
        SyscallPrint => "print",
        Ebreak => "ebreak",
        Nop => "nop",
    }
}

fn label_ref(program: &Program, handle: LabelHandle) -> String {
    label_text(program.label(handle))
}

fn format_operands(program: &Program, instr: &Instruction) -> String {
    let reg = |arg: &Option<crate::ir::InstrArg>| {
        arg.as_ref()
            .map(|a| register_name(a.reg))
            .unwrap_or_default()
    };

    match instr.opcode {
        Opcode::Add | Opcode::Sub | Opcode::And | Opcode::Or | Opcode::Xor | Opcode::Shl
        | Opcode::Shr | Opcode::Sra | Opcode::Slt | Opcode::Sltu => format!(
            "{}, {}, {}",
            reg(&instr.dest),
            reg(&instr.src1),
            reg(&instr.src2)
        ),
        Opcode::AddI | Opcode::SubI | Opcode::AndI | Opcode::OrI | Opcode::XorI
        | Opcode::ShlI | Opcode::ShrI | Opcode::SraI | Opcode::SltI | Opcode::SltIu => {
            format!("{}, {}, {}", reg(&instr.dest), reg(&instr.src1), instr.immediate)
        }
        Opcode::Lw => match instr.address_label {
            Some(l) => format!("{}, {}", reg(&instr.dest), label_ref(program, l)),
            None => format!(
                "{}, {}({})",
                reg(&instr.dest),
                instr.immediate,
                reg(&instr.src1)
            ),
        },
        Opcode::Sw => match instr.address_label {
            Some(l) => format!("{}, {}", reg(&instr.src2), label_ref(program, l)),
            None => format!(
                "{}, {}({})",
                reg(&instr.src2),
                instr.immediate,
                reg(&instr.src1)
            ),
        },
        Opcode::Beq | Opcode::Bne | Opcode::Blt | Opcode::Bge | Opcode::Bltu | Opcode::Bgeu => {
            format!(
                "{}, {}, {}",
                reg(&instr.src1),
                reg(&instr.src2),
                instr
                    .address_label
                    .map(|l| label_ref(program, l))
                    .unwrap_or_default()
            )
        }
        Opcode::J => instr
            .address_label
            .map(|l| label_ref(program, l))
            .unwrap_or_default(),
        Opcode::SyscallExit => instr.immediate.to_string(),
        Opcode::SyscallRead => reg(&instr.dest),
        Opcode::SyscallPrint => reg(&instr.src1),
        Opcode::Ebreak | Opcode::Nop => String::new(),
    }
}

/// Render `program` as textual assembly for `target`. Pure function of the
/// IR: calling this twice on an unmodified `program` yields identical text.
pub fn emit(program: &Program, _target: &Target) -> String {
    let mut out = String::new();

    if !program.data.is_empty() {
        out.push_str(".data\n");
        for directive in &program.data {
            let label = program.label(directive.label);
            if label.global {
                out.push_str(&format!(".global {}\n", label_text(label)));
            }
            out.push_str(&format!("{}:\n", label_text(label)));
            match directive.kind {
                DirectiveKind::Word => out.push_str(&format!("    .word {}\n", directive.value)),
                DirectiveKind::Space => out.push_str(&format!("    .space {}\n", directive.value)),
            }
        }
    }

    out.push_str(".text\n");
    for instr in program.instructions.iter() {
        if let Some(handle) = instr.label {
            let label = program.label(handle);
            if label.global {
                out.push_str(&format!(".global {}\n", label_text(label)));
            }
            out.push_str(&format!("{}:\n", label_text(label)));
        }
        out.push_str(&format!(
            "    {} {}",
            opcode_mnemonic(instr.opcode),
            format_operands(program, instr)
        ));
        if let Some(comment) = &instr.comment {
            out.push_str(&format!("  # {comment}"));
        }
        out.push('\n');
    }

    out
}
