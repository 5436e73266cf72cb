//! Reference RV32I/M instruction subset.
//!
//! This module implements the `Instruction` capability for the integer subset
//! used by the bundled programs and tests. It provides:
//! 1. **ALU Operations:** `AluOp`, shared by the register and immediate forms.
//! 2. **Memory Operations:** Byte/half/word loads and stores, little-endian.
//! 3. **Control Flow:** Conditional branches, `jal`/`jalr`, and the `ret` convention.
//!
//! The `ret` convention is simplified: when `ra` is non-zero the instruction
//! jumps to `ra` and clears it; when `ra` is zero the program terminates.

use std::fmt;

use crate::common::INSTRUCTION_WIDTH;
use crate::common::error::ProgramError;
use crate::common::reg::{RegSet, RegisterId};
use crate::isa::instruction::{
    ExecutionContext, ExecutionResult, Instruction, InstructionType, LabelTable,
};

/// Integer ALU operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AluOp {
    /// Wrapping addition.
    Add,
    /// Wrapping subtraction.
    Sub,
    /// Wrapping multiplication (low 32 bits).
    Mul,
    /// Signed division.
    Div,
    /// Signed remainder.
    Rem,
    /// Bitwise AND.
    And,
    /// Bitwise OR.
    Or,
    /// Bitwise XOR.
    Xor,
    /// Logical shift left.
    Sll,
    /// Logical shift right.
    Srl,
    /// Arithmetic shift right.
    Sra,
    /// Set if less than (signed).
    Slt,
    /// Set if less than (unsigned).
    Sltu,
}

impl AluOp {
    /// Applies the operation.
    ///
    /// # Errors
    ///
    /// `ProgramError::DivisionByZero` for `div`/`rem` with a zero divisor.
    pub fn apply(self, a: i32, b: i32) -> Result<i32, ProgramError> {
        let shamt = (b & 0x1f) as u32;
        Ok(match self {
            Self::Add => a.wrapping_add(b),
            Self::Sub => a.wrapping_sub(b),
            Self::Mul => a.wrapping_mul(b),
            Self::Div => {
                if b == 0 {
                    return Err(ProgramError::DivisionByZero);
                }
                a.wrapping_div(b)
            }
            Self::Rem => {
                if b == 0 {
                    return Err(ProgramError::DivisionByZero);
                }
                a.wrapping_rem(b)
            }
            Self::And => a & b,
            Self::Or => a | b,
            Self::Xor => a ^ b,
            Self::Sll => a.wrapping_shl(shamt),
            Self::Srl => ((a as u32) >> shamt) as i32,
            Self::Sra => a >> shamt,
            Self::Slt => i32::from(a < b),
            Self::Sltu => i32::from((a as u32) < (b as u32)),
        })
    }

    /// Register-form mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Rem => "rem",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Sll => "sll",
            Self::Srl => "srl",
            Self::Sra => "sra",
            Self::Slt => "slt",
            Self::Sltu => "sltu",
        }
    }
}

/// Width of a memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemWidth {
    /// One byte, sign-extended on load.
    Byte,
    /// One byte, zero-extended on load.
    ByteUnsigned,
    /// Two bytes, sign-extended on load.
    Half,
    /// Two bytes, zero-extended on load.
    HalfUnsigned,
    /// Four bytes.
    Word,
}

impl MemWidth {
    /// Number of bytes accessed.
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte | Self::ByteUnsigned => 1,
            Self::Half | Self::HalfUnsigned => 2,
            Self::Word => 4,
        }
    }

    /// Assembles little-endian bytes into a register value.
    fn extend(self, bytes: &[u8]) -> i32 {
        let b = |i: usize| bytes.get(i).copied().unwrap_or(0);
        match self {
            Self::Byte => i32::from(b(0) as i8),
            Self::ByteUnsigned => i32::from(b(0)),
            Self::Half => i32::from(i16::from_le_bytes([b(0), b(1)])),
            Self::HalfUnsigned => i32::from(u16::from_le_bytes([b(0), b(1)])),
            Self::Word => i32::from_le_bytes([b(0), b(1), b(2), b(3)]),
        }
    }

    const fn load_mnemonic(self) -> &'static str {
        match self {
            Self::Byte => "lb",
            Self::ByteUnsigned => "lbu",
            Self::Half => "lh",
            Self::HalfUnsigned => "lhu",
            Self::Word => "lw",
        }
    }

    const fn store_mnemonic(self) -> &'static str {
        match self {
            Self::Byte | Self::ByteUnsigned => "sb",
            Self::Half | Self::HalfUnsigned => "sh",
            Self::Word => "sw",
        }
    }
}

/// Conditional branch comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BranchCond {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than (signed).
    Lt,
    /// Greater or equal (signed).
    Ge,
    /// Less than (unsigned).
    Ltu,
    /// Greater or equal (unsigned).
    Geu,
}

impl BranchCond {
    /// Evaluates the comparison.
    pub const fn taken(self, a: i32, b: i32) -> bool {
        match self {
            Self::Eq => a == b,
            Self::Ne => a != b,
            Self::Lt => a < b,
            Self::Ge => a >= b,
            Self::Ltu => (a as u32) < (b as u32),
            Self::Geu => (a as u32) >= (b as u32),
        }
    }

    const fn mnemonic(self) -> &'static str {
        match self {
            Self::Eq => "beq",
            Self::Ne => "bne",
            Self::Lt => "blt",
            Self::Ge => "bge",
            Self::Ltu => "bltu",
            Self::Geu => "bgeu",
        }
    }
}

/// A decoded reference instruction.
///
/// Pseudo-instructions are lowered by the assembler: `mv` and `nop` become
/// `addi`, `beqz`/`bnez` compare against `zero`, `bgt`/`ble` swap operands,
/// and `j` is `jal zero`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rv32 {
    /// Register-register ALU operation.
    Op {
        /// Operation.
        op: AluOp,
        /// Destination.
        rd: RegisterId,
        /// First operand.
        rs1: RegisterId,
        /// Second operand.
        rs2: RegisterId,
    },
    /// Register-immediate ALU operation.
    OpImm {
        /// Operation.
        op: AluOp,
        /// Destination.
        rd: RegisterId,
        /// Register operand.
        rs1: RegisterId,
        /// Immediate operand.
        imm: i32,
    },
    /// Load upper immediate (`imm << 12`).
    Lui {
        /// Destination.
        rd: RegisterId,
        /// Upper 20 bits.
        imm: i32,
    },
    /// Load a full 32-bit immediate.
    Li {
        /// Destination.
        rd: RegisterId,
        /// Value.
        imm: i32,
    },
    /// Memory load.
    Load {
        /// Access width and extension.
        width: MemWidth,
        /// Destination.
        rd: RegisterId,
        /// Base address register.
        base: RegisterId,
        /// Byte offset.
        offset: i32,
    },
    /// Memory store.
    Store {
        /// Access width.
        width: MemWidth,
        /// Value register.
        src: RegisterId,
        /// Base address register.
        base: RegisterId,
        /// Byte offset.
        offset: i32,
    },
    /// Conditional branch to a label.
    Branch {
        /// Comparison.
        cond: BranchCond,
        /// Left operand.
        rs1: RegisterId,
        /// Right operand.
        rs2: RegisterId,
        /// Target label.
        target: String,
    },
    /// Jump to a label, linking `pc + 4` into `rd`.
    Jal {
        /// Link register (`zero` for a plain jump).
        rd: RegisterId,
        /// Target label.
        target: String,
    },
    /// Jump to `base + offset`, linking `pc + 4` into `rd`.
    Jalr {
        /// Link register.
        rd: RegisterId,
        /// Base address register.
        base: RegisterId,
        /// Byte offset.
        offset: i32,
    },
    /// Return through `ra`.
    Ret,
}

impl Rv32 {
    fn address(ctx: &ExecutionContext, base: RegisterId, offset: i32, width: MemWidth) -> Vec<u32> {
        let start = ctx.read(base).wrapping_add(offset) as u32;
        (0..width.bytes()).map(|i| start.wrapping_add(i)).collect()
    }

    fn checked_target(raw: i32) -> Result<u32, ProgramError> {
        if raw < 0 || raw as u32 % INSTRUCTION_WIDTH != 0 {
            return Err(ProgramError::InvalidJumpTarget(i64::from(raw)));
        }
        Ok(raw as u32)
    }

    fn link(rd: RegisterId, pc: u32, target: u32) -> ExecutionResult {
        ExecutionResult {
            register_change: (!rd.is_zero()).then_some((rd, pc.wrapping_add(INSTRUCTION_WIDTH) as i32)),
            pc_change: Some(target),
            ..ExecutionResult::default()
        }
    }
}

impl Instruction for Rv32 {
    fn instruction_type(&self) -> InstructionType {
        match self {
            Self::Op { .. } | Self::OpImm { .. } | Self::Lui { .. } | Self::Li { .. } => {
                InstructionType::Arithmetic
            }
            Self::Load { .. } => InstructionType::Load,
            Self::Store { .. } => InstructionType::Store,
            Self::Branch { .. } => InstructionType::ConditionalBranch,
            Self::Jal { .. } | Self::Jalr { .. } => InstructionType::Jump,
            Self::Ret => InstructionType::Return,
        }
    }

    fn read_registers(&self) -> RegSet {
        match self {
            Self::Op { rs1, rs2, .. } | Self::Branch { rs1, rs2, .. } => RegSet::of(&[*rs1, *rs2]),
            Self::OpImm { rs1, .. } => RegSet::of(&[*rs1]),
            Self::Lui { .. } | Self::Li { .. } | Self::Jal { .. } => RegSet::EMPTY,
            Self::Load { base, .. } | Self::Jalr { base, .. } => RegSet::of(&[*base]),
            Self::Store { src, base, .. } => RegSet::of(&[*src, *base]),
            Self::Ret => RegSet::of(&[RegisterId::RA]),
        }
    }

    fn write_registers(&self) -> RegSet {
        match self {
            Self::Op { rd, .. }
            | Self::OpImm { rd, .. }
            | Self::Lui { rd, .. }
            | Self::Li { rd, .. }
            | Self::Load { rd, .. }
            | Self::Jal { rd, .. }
            | Self::Jalr { rd, .. } => RegSet::of(&[*rd]),
            Self::Store { .. } | Self::Branch { .. } => RegSet::EMPTY,
            Self::Ret => RegSet::of(&[RegisterId::RA]),
        }
    }

    fn memory_read_addresses(&self, ctx: &ExecutionContext) -> Vec<u32> {
        match self {
            Self::Load {
                width,
                base,
                offset,
                ..
            } => Self::address(ctx, *base, *offset, *width),
            _ => Vec::new(),
        }
    }

    fn memory_write_addresses(&self, ctx: &ExecutionContext) -> Vec<u32> {
        match self {
            Self::Store {
                width,
                base,
                offset,
                ..
            } => Self::address(ctx, *base, *offset, *width),
            _ => Vec::new(),
        }
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        labels: &LabelTable,
        pc: u32,
        memory: &[u8],
    ) -> Result<ExecutionResult, ProgramError> {
        Ok(match self {
            Self::Op { op, rd, rs1, rs2 } => {
                ExecutionResult::register(*rd, op.apply(ctx.read(*rs1), ctx.read(*rs2))?)
            }
            Self::OpImm { op, rd, rs1, imm } => {
                ExecutionResult::register(*rd, op.apply(ctx.read(*rs1), *imm)?)
            }
            Self::Lui { rd, imm } => ExecutionResult::register(*rd, imm.wrapping_shl(12)),
            Self::Li { rd, imm } => ExecutionResult::register(*rd, *imm),
            Self::Load { width, rd, .. } => ExecutionResult::register(*rd, width.extend(memory)),
            Self::Store {
                width,
                src,
                base,
                offset,
            } => {
                let addr = ctx.read(*base).wrapping_add(*offset) as u32;
                let bytes = ctx.read(*src).to_le_bytes();
                ExecutionResult::memory(addr, &bytes[..width.bytes() as usize])
            }
            Self::Branch {
                cond,
                rs1,
                rs2,
                target,
            } => {
                let dest = labels.resolve(target)?;
                if cond.taken(ctx.read(*rs1), ctx.read(*rs2)) {
                    ExecutionResult::jump(dest)
                } else {
                    ExecutionResult::default()
                }
            }
            Self::Jal { rd, target } => Self::link(*rd, pc, labels.resolve(target)?),
            Self::Jalr { rd, base, offset } => {
                let target = Self::checked_target(ctx.read(*base).wrapping_add(*offset))?;
                Self::link(*rd, pc, target)
            }
            Self::Ret => {
                let ra = ctx.read(RegisterId::RA);
                if ra == 0 {
                    ExecutionResult {
                        terminate: true,
                        ..ExecutionResult::default()
                    }
                } else {
                    ExecutionResult {
                        register_change: Some((RegisterId::RA, 0)),
                        pc_change: Some(Self::checked_target(ra)?),
                        ..ExecutionResult::default()
                    }
                }
            }
        })
    }
}

impl fmt::Display for Rv32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Op { op, rd, rs1, rs2 } => write!(f, "{} {rd}, {rs1}, {rs2}", op.mnemonic()),
            Self::OpImm { op, rd, rs1, imm } => write!(f, "{}i {rd}, {rs1}, {imm}", op.mnemonic()),
            Self::Lui { rd, imm } => write!(f, "lui {rd}, {imm:#x}"),
            Self::Li { rd, imm } => write!(f, "li {rd}, {imm}"),
            Self::Load {
                width,
                rd,
                base,
                offset,
            } => write!(f, "{} {rd}, {offset}({base})", width.load_mnemonic()),
            Self::Store {
                width,
                src,
                base,
                offset,
            } => write!(f, "{} {src}, {offset}({base})", width.store_mnemonic()),
            Self::Branch {
                cond,
                rs1,
                rs2,
                target,
            } => write!(f, "{} {rs1}, {rs2}, {target}", cond.mnemonic()),
            Self::Jal { rd, target } if rd.is_zero() => write!(f, "j {target}"),
            Self::Jal { rd, target } => write!(f, "jal {rd}, {target}"),
            Self::Jalr { rd, base, offset } => write!(f, "jalr {rd}, {offset}({base})"),
            Self::Ret => f.write_str("ret"),
        }
    }
}
