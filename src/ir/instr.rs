//! Instructions and their operands.

use crate::ir::label::LabelHandle;
use crate::target::PhysReg;

/// A temporary- or physical-register identifier.
///
/// Temporaries start at 1 and grow monotonically; `0` is the architectural
/// zero register; the allocator additionally uses `SPILL_REQUIRED` as a
/// sentinel in its own binding table (never stored on an `InstrArg` in the
/// IR itself).
pub type RegId = i32;

/// No register / not yet bound.
pub const REG_INVALID: RegId = -1;
/// Sentinel used only inside the allocator's binding table.
pub const SPILL_REQUIRED: RegId = -2;
/// The architectural zero register.
pub const REG_ZERO: RegId = 0;

/// One operand of an [`Instruction`]: a register id plus an optional
/// ordered whitelist of physical registers the allocator must choose from.
/// `mc_whitelist: None` means "any general-purpose register".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstrArg {
    pub reg: RegId,
    pub mc_whitelist: Option<Vec<PhysReg>>,
}

impl InstrArg {
    pub fn new(reg: RegId) -> Self {
        InstrArg {
            reg,
            mc_whitelist: None,
        }
    }

    pub fn with_whitelist(reg: RegId, whitelist: Vec<PhysReg>) -> Self {
        InstrArg {
            reg,
            mc_whitelist: Some(whitelist),
        }
    }
}

/// The closed opcode enumeration.
///
/// Register-form arithmetic opcodes occupy `0x00..=0x0f`; their immediate
/// counterparts occupy the same low nibble with bit `0x10` set, so
/// `op as u8 ^ 0x10` converts between the two — the encoding the target
/// lowering pass relies on (spec.md §4.2 step 4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Add = 0x00,
    Sub = 0x01,
    And = 0x02,
    Or = 0x03,
    Xor = 0x04,
    Shl = 0x05,
    Shr = 0x06,
    Sra = 0x07,
    Slt = 0x08,
    Sltu = 0x09,

    AddI = 0x10,
    SubI = 0x11,
    AndI = 0x12,
    OrI = 0x13,
    XorI = 0x14,
    ShlI = 0x15,
    ShrI = 0x16,
    SraI = 0x17,
    SltI = 0x18,
    SltIu = 0x19,

    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,

    J,
    Lw,
    Sw,

    SyscallExit,
    SyscallRead,
    SyscallPrint,
    Ebreak,

    Nop,
}

impl Opcode {
    /// Arithmetic instructions taking a 3rd operand from the immediate
    /// field rather than a register (`0x10..=0x19`).
    pub fn is_immediate_arith(self) -> bool {
        matches!(
            self,
            Opcode::AddI
                | Opcode::SubI
                | Opcode::AndI
                | Opcode::OrI
                | Opcode::XorI
                | Opcode::ShlI
                | Opcode::ShrI
                | Opcode::SraI
                | Opcode::SltI
                | Opcode::SltIu
        )
    }

    /// The register-form sibling of an immediate-arithmetic opcode
    /// (`op ^ 0x10`). Only meaningful when `is_immediate_arith()` is true.
    pub fn to_register_form(self) -> Opcode {
        debug_assert!(self.is_immediate_arith());
        // SAFETY-free: `self as u8 ^ 0x10` always lands on a valid
        // register-arithmetic discriminant because the two halves of the
        // enum mirror each other bit-for-bit.
        match self {
            Opcode::AddI => Opcode::Add,
            Opcode::SubI => Opcode::Sub,
            Opcode::AndI => Opcode::And,
            Opcode::OrI => Opcode::Or,
            Opcode::XorI => Opcode::Xor,
            Opcode::ShlI => Opcode::Shl,
            Opcode::ShrI => Opcode::Shr,
            Opcode::SraI => Opcode::Sra,
            Opcode::SltI => Opcode::Slt,
            Opcode::SltIu => Opcode::Sltu,
            _ => unreachable!("not an immediate-arithmetic opcode"),
        }
    }

    pub fn is_conditional_branch(self) -> bool {
        matches!(
            self,
            Opcode::Beq | Opcode::Bne | Opcode::Blt | Opcode::Bge | Opcode::Bltu | Opcode::Bgeu
        )
    }

    pub fn is_unconditional_jump(self) -> bool {
        matches!(self, Opcode::J)
    }

    /// Halt/return/exit-style instructions whose successor is the CFG exit
    /// sentinel.
    pub fn is_halt_or_exit(self) -> bool {
        matches!(self, Opcode::SyscallExit)
    }

    /// Any instruction that ends a basic block (spec.md §4.3).
    pub fn is_terminator(self) -> bool {
        self.is_conditional_branch() || self.is_unconditional_jump() || self.is_halt_or_exit()
    }
}

/// A symbolic instruction: up to one destination and two source operands,
/// an immediate, an optional branch/jump target label, and the label/
/// comment annotations attached by [`crate::ir::Program::add_instruction`].
#[derive(Clone, Debug)]
pub struct Instruction {
    pub opcode: Opcode,
    pub dest: Option<InstrArg>,
    pub src1: Option<InstrArg>,
    pub src2: Option<InstrArg>,
    pub immediate: i32,
    pub address_label: Option<LabelHandle>,
    pub label: Option<LabelHandle>,
    pub comment: Option<String>,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Instruction {
            opcode,
            dest: None,
            src1: None,
            src2: None,
            immediate: 0,
            address_label: None,
            label: None,
            comment: None,
        }
    }

    pub fn with_dest(mut self, arg: InstrArg) -> Self {
        self.dest = Some(arg);
        self
    }

    pub fn with_src1(mut self, arg: InstrArg) -> Self {
        self.src1 = Some(arg);
        self
    }

    pub fn with_src2(mut self, arg: InstrArg) -> Self {
        self.src2 = Some(arg);
        self
    }

    pub fn with_immediate(mut self, imm: i32) -> Self {
        self.immediate = imm;
        self
    }

    pub fn with_address_label(mut self, label: LabelHandle) -> Self {
        self.address_label = Some(label);
        self
    }
}
