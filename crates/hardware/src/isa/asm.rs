//! Textual assembler for the reference instruction subset.
//!
//! Parses one statement per line with `nom`:
//! 1. **Labels:** Zero or more `name:` prefixes binding the next instruction's index.
//! 2. **Instructions:** A mnemonic followed by comma-separated operands.
//! 3. **Operands:** Registers (`a0`, `x10`), immediates (`-4`, `0x10`), memory
//!    references (`8(sp)`, `(a1)`) and label names.
//!
//! Comments start with `#` or `;`. Pseudo-instructions are lowered here, so the
//! pipeline only ever sees `Rv32` descriptors. Label references are resolved at
//! execution time; an undefined label is a program error, not an assembly error.

use std::sync::Arc;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, hex_digit1, space0, space1},
    combinator::{map, map_res, opt, recognize},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use crate::common::error::{SimError, SimResult};
use crate::common::reg::RegisterId;
use crate::isa::abi::parse_register;
use crate::isa::instruction::LabelTable;
use crate::isa::program::{InstructionRef, Program};
use crate::isa::rv32i::{AluOp, BranchCond, MemWidth, Rv32};

/// A parsed operand before lowering.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Operand {
    Reg(RegisterId),
    Imm(i64),
    Mem(i64, RegisterId),
    Label(String),
}

/// One parsed source line.
#[derive(Debug, Default)]
struct Line<'a> {
    labels: Vec<&'a str>,
    statement: Option<(&'a str, Vec<Operand>)>,
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_' || c == '.'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
    ))(input)
}

fn immediate(input: &str) -> IResult<&str, i64> {
    let (input, neg) = opt(char('-'))(input)?;
    let (input, value) = alt((
        map_res(preceded(tag_no_case("0x"), hex_digit1), |h| {
            i64::from_str_radix(h, 16)
        }),
        map_res(digit1, str::parse::<i64>),
    ))(input)?;
    Ok((input, if neg.is_some() { -value } else { value }))
}

fn register(input: &str) -> IResult<&str, RegisterId> {
    let (rest, name) = identifier(input)?;
    match parse_register(name) {
        Some(reg) => Ok((rest, reg)),
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        ))),
    }
}

fn memory_operand(input: &str) -> IResult<&str, Operand> {
    map(
        pair(
            opt(immediate),
            delimited(
                pair(char('('), space0),
                register,
                pair(space0, char(')')),
            ),
        ),
        |(offset, base)| Operand::Mem(offset.unwrap_or(0), base),
    )(input)
}

fn operand(input: &str) -> IResult<&str, Operand> {
    alt((
        memory_operand,
        map(immediate, Operand::Imm),
        map(identifier, |name| match parse_register(name) {
            Some(reg) => Operand::Reg(reg),
            None => Operand::Label(name.to_string()),
        }),
    ))(input)
}

fn line(input: &str) -> IResult<&str, Line<'_>> {
    let (input, _) = space0(input)?;
    let (input, labels) = many0(terminated(identifier, tuple((space0, char(':'), space0))))(input)?;
    let (input, statement) = opt(pair(
        identifier,
        map(
            opt(preceded(
                space1,
                separated_list0(delimited(space0, char(','), space0), operand),
            )),
            Option::unwrap_or_default,
        ),
    ))(input)?;
    let (input, _) = space0(input)?;
    Ok((input, Line { labels, statement }))
}

fn strip_comment(text: &str) -> &str {
    text.find(['#', ';']).map_or(text, |i| &text[..i])
}

/// Assembles program text.
///
/// # Errors
///
/// `SimError::Assembly` with the 1-based line number for syntax errors,
/// unknown mnemonics, wrong operand shapes, out-of-range immediates and
/// duplicate labels.
///
/// # Examples
///
/// ```
/// use pipesim_core::isa::asm::assemble;
///
/// let program = assemble("start: li a0, 3\n  addi a0, a0, -1  # dec\n  bnez a0, start\n  ret").unwrap();
/// assert_eq!(program.len(), 4);
/// assert_eq!(program.labels().index("start"), Some(0));
/// ```
pub fn assemble(source: &str) -> SimResult<Program> {
    let mut instructions: Vec<InstructionRef> = Vec::new();
    let mut labels = LabelTable::new();

    for (idx, raw) in source.lines().enumerate() {
        let line_no = idx + 1;
        let err = |message: String| SimError::Assembly {
            line: line_no,
            message,
        };
        let text = strip_comment(raw);
        let (rest, parsed) = line(text).map_err(|e| err(format!("syntax error: {e}")))?;
        if !rest.is_empty() {
            return Err(err(format!("unexpected `{}`", rest.trim())));
        }
        for label in parsed.labels {
            if labels.insert(label, instructions.len()).is_some() {
                return Err(err(format!("duplicate label `{label}`")));
            }
        }
        if let Some((mnemonic, ops)) = parsed.statement {
            let inst = lower(&mnemonic.to_ascii_lowercase(), &ops).map_err(err)?;
            instructions.push(Arc::new(inst));
        }
    }

    Ok(Program::new(instructions, labels))
}

fn expect_arity(mnemonic: &str, ops: &[Operand], n: usize) -> Result<(), String> {
    if ops.len() == n {
        Ok(())
    } else {
        Err(format!("`{mnemonic}` expects {n} operand(s), found {}", ops.len()))
    }
}

fn reg(op: &Operand) -> Result<RegisterId, String> {
    match op {
        Operand::Reg(r) => Ok(*r),
        other => Err(format!("expected a register, found {other:?}")),
    }
}

fn imm(op: &Operand) -> Result<i32, String> {
    match op {
        Operand::Imm(v) => fit_i32(*v),
        other => Err(format!("expected an immediate, found {other:?}")),
    }
}

/// Accepts signed 32-bit values and unsigned 32-bit bit patterns.
fn fit_i32(v: i64) -> Result<i32, String> {
    if let Ok(x) = i32::try_from(v) {
        return Ok(x);
    }
    u32::try_from(v)
        .map(|x| x as i32)
        .map_err(|_| format!("immediate {v} does not fit in 32 bits"))
}

fn mem(op: &Operand) -> Result<(i32, RegisterId), String> {
    match op {
        Operand::Mem(offset, base) => Ok((fit_i32(*offset)?, *base)),
        other => Err(format!("expected a memory reference `offset(reg)`, found {other:?}")),
    }
}

fn label(op: &Operand) -> Result<String, String> {
    match op {
        Operand::Label(name) => Ok(name.clone()),
        other => Err(format!("expected a label, found {other:?}")),
    }
}

fn alu_op(mnemonic: &str) -> Option<AluOp> {
    Some(match mnemonic {
        "add" => AluOp::Add,
        "sub" => AluOp::Sub,
        "mul" => AluOp::Mul,
        "div" => AluOp::Div,
        "rem" => AluOp::Rem,
        "and" => AluOp::And,
        "or" => AluOp::Or,
        "xor" => AluOp::Xor,
        "sll" => AluOp::Sll,
        "srl" => AluOp::Srl,
        "sra" => AluOp::Sra,
        "slt" => AluOp::Slt,
        "sltu" => AluOp::Sltu,
        _ => return None,
    })
}

fn branch_cond(mnemonic: &str) -> Option<(BranchCond, bool)> {
    Some(match mnemonic {
        "beq" => (BranchCond::Eq, false),
        "bne" => (BranchCond::Ne, false),
        "blt" => (BranchCond::Lt, false),
        "bge" => (BranchCond::Ge, false),
        "bltu" => (BranchCond::Ltu, false),
        "bgeu" => (BranchCond::Geu, false),
        "bgt" => (BranchCond::Lt, true),
        "ble" => (BranchCond::Ge, true),
        "bgtu" => (BranchCond::Ltu, true),
        "bleu" => (BranchCond::Geu, true),
        _ => return None,
    })
}

fn load_width(mnemonic: &str) -> Option<MemWidth> {
    Some(match mnemonic {
        "lb" => MemWidth::Byte,
        "lbu" => MemWidth::ByteUnsigned,
        "lh" => MemWidth::Half,
        "lhu" => MemWidth::HalfUnsigned,
        "lw" => MemWidth::Word,
        _ => return None,
    })
}

fn store_width(mnemonic: &str) -> Option<MemWidth> {
    Some(match mnemonic {
        "sb" => MemWidth::Byte,
        "sh" => MemWidth::Half,
        "sw" => MemWidth::Word,
        _ => return None,
    })
}

/// Lowers one statement, expanding pseudo-instructions.
fn lower(mnemonic: &str, ops: &[Operand]) -> Result<Rv32, String> {
    let arity = |n| expect_arity(mnemonic, ops, n);

    if let Some(op) = alu_op(mnemonic) {
        arity(3)?;
        return Ok(Rv32::Op {
            op,
            rd: reg(&ops[0])?,
            rs1: reg(&ops[1])?,
            rs2: reg(&ops[2])?,
        });
    }
    if let Some(op) = mnemonic
        .strip_suffix('i')
        .and_then(alu_op)
        .filter(|op| !matches!(op, AluOp::Sub | AluOp::Mul | AluOp::Div | AluOp::Rem))
        .or_else(|| (mnemonic == "sltiu").then_some(AluOp::Sltu))
    {
        arity(3)?;
        return Ok(Rv32::OpImm {
            op,
            rd: reg(&ops[0])?,
            rs1: reg(&ops[1])?,
            imm: imm(&ops[2])?,
        });
    }
    if let Some(width) = load_width(mnemonic) {
        arity(2)?;
        let (offset, base) = mem(&ops[1])?;
        return Ok(Rv32::Load {
            width,
            rd: reg(&ops[0])?,
            base,
            offset,
        });
    }
    if let Some(width) = store_width(mnemonic) {
        arity(2)?;
        let (offset, base) = mem(&ops[1])?;
        return Ok(Rv32::Store {
            width,
            src: reg(&ops[0])?,
            base,
            offset,
        });
    }
    if let Some((cond, swap)) = branch_cond(mnemonic) {
        arity(3)?;
        let (a, b) = (reg(&ops[0])?, reg(&ops[1])?);
        let (rs1, rs2) = if swap { (b, a) } else { (a, b) };
        return Ok(Rv32::Branch {
            cond,
            rs1,
            rs2,
            target: label(&ops[2])?,
        });
    }

    match mnemonic {
        "beqz" | "bnez" => {
            arity(2)?;
            Ok(Rv32::Branch {
                cond: if mnemonic == "beqz" {
                    BranchCond::Eq
                } else {
                    BranchCond::Ne
                },
                rs1: reg(&ops[0])?,
                rs2: RegisterId::ZERO,
                target: label(&ops[1])?,
            })
        }
        "lui" => {
            arity(2)?;
            Ok(Rv32::Lui {
                rd: reg(&ops[0])?,
                imm: imm(&ops[1])?,
            })
        }
        "li" => {
            arity(2)?;
            Ok(Rv32::Li {
                rd: reg(&ops[0])?,
                imm: imm(&ops[1])?,
            })
        }
        "mv" => {
            arity(2)?;
            Ok(Rv32::OpImm {
                op: AluOp::Add,
                rd: reg(&ops[0])?,
                rs1: reg(&ops[1])?,
                imm: 0,
            })
        }
        "nop" => {
            arity(0)?;
            Ok(Rv32::OpImm {
                op: AluOp::Add,
                rd: RegisterId::ZERO,
                rs1: RegisterId::ZERO,
                imm: 0,
            })
        }
        "j" => {
            arity(1)?;
            Ok(Rv32::Jal {
                rd: RegisterId::ZERO,
                target: label(&ops[0])?,
            })
        }
        "jal" => match ops {
            [target] => Ok(Rv32::Jal {
                rd: RegisterId::RA,
                target: label(target)?,
            }),
            [rd, target] => Ok(Rv32::Jal {
                rd: reg(rd)?,
                target: label(target)?,
            }),
            _ => Err(format!("`jal` expects 1 or 2 operands, found {}", ops.len())),
        },
        "jr" => {
            arity(1)?;
            Ok(Rv32::Jalr {
                rd: RegisterId::ZERO,
                base: reg(&ops[0])?,
                offset: 0,
            })
        }
        "jalr" => match ops {
            [base] => Ok(Rv32::Jalr {
                rd: RegisterId::RA,
                base: reg(base)?,
                offset: 0,
            }),
            [rd, m @ Operand::Mem(..)] => {
                let (offset, base) = mem(m)?;
                Ok(Rv32::Jalr {
                    rd: reg(rd)?,
                    base,
                    offset,
                })
            }
            [rd, base, offset] => Ok(Rv32::Jalr {
                rd: reg(rd)?,
                base: reg(base)?,
                offset: imm(offset)?,
            }),
            _ => Err(format!("`jalr` expects 1 to 3 operands, found {}", ops.len())),
        },
        "ret" => {
            arity(0)?;
            Ok(Rv32::Ret)
        }
        other => Err(format!("unknown mnemonic `{other}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_operand_shapes() {
        assert_eq!(operand("-8(sp)").unwrap().1, Operand::Mem(-8, RegisterId::SP));
        assert_eq!(operand("( a1 )").unwrap().1, Operand::Mem(0, RegisterId::A1));
        assert_eq!(operand("0x1F").unwrap().1, Operand::Imm(31));
        assert_eq!(operand("x11").unwrap().1, Operand::Reg(RegisterId::A1));
        assert_eq!(operand("loop_1").unwrap().1, Operand::Label("loop_1".into()));
    }

    #[test]
    fn labels_bind_next_instruction() {
        let p = assemble("a:\nb: c: nop\n\n# only a comment\nd: ret").unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.labels().index("a"), Some(0));
        assert_eq!(p.labels().index("c"), Some(0));
        assert_eq!(p.labels().index("d"), Some(1));
    }

    #[test]
    fn pseudo_instructions_lower() {
        assert_eq!(
            lower("bgt", &[Operand::Reg(RegisterId::A0), Operand::Reg(RegisterId::A1), Operand::Label("l".into())]),
            Ok(Rv32::Branch {
                cond: BranchCond::Lt,
                rs1: RegisterId::A1,
                rs2: RegisterId::A0,
                target: "l".into(),
            })
        );
        assert_eq!(
            lower("srai", &[Operand::Reg(RegisterId::A0), Operand::Reg(RegisterId::A0), Operand::Imm(2)]),
            Ok(Rv32::OpImm {
                op: AluOp::Sra,
                rd: RegisterId::A0,
                rs1: RegisterId::A0,
                imm: 2,
            })
        );
        assert!(lower("muli", &[]).is_err());
    }

    #[test]
    fn reports_line_numbers() {
        match assemble("nop\nfrobnicate a0\n") {
            Err(SimError::Assembly { line, message }) => {
                assert_eq!(line, 2);
                assert!(message.contains("frobnicate"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            assemble("x: nop\nx: nop"),
            Err(SimError::Assembly { line: 2, .. })
        ));
        assert!(matches!(
            assemble("addi a0, a0, 1 2"),
            Err(SimError::Assembly { line: 1, .. })
        ));
    }

    #[test]
    fn hex_bit_patterns_fit() {
        assert_eq!(fit_i32(0xffff_ffff), Ok(-1));
        assert!(fit_i32(0x1_0000_0000).is_err());
    }
}
