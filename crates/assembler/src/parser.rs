//! Parser for Malachite assembly tokens into instructions.
//!
//! The opcode's [`Layout`](crate::layout::Layout) decides which field each
//! positional operand fills and how an immediate is read.

use malachite_common::{flags, Cell, Instruction, NumericKind, OpCode, SysCall};

use crate::error::AsmError;
use crate::layout::{layout, Field};
use crate::lexer::Token;

/// Maximum operands after the mnemonic.
const MAX_OPERANDS: usize = 4;

/// Parse the tokens of one line into an instruction.
///
/// Returns `Ok(None)` for blank lines (empty token list).
pub(crate) fn parse_line(
    tokens: &[Token],
    line_num: usize,
) -> Result<Option<Instruction>, AsmError> {
    let Some((first, operands)) = tokens.split_first() else {
        return Ok(None);
    };

    let mnemonic = match first {
        Token::Word(word) => word.as_str(),
        other => {
            return Err(AsmError::UnexpectedToken {
                line: line_num,
                token: other.text(),
            })
        }
    };
    let opcode = OpCode::from_mnemonic(mnemonic).ok_or_else(|| AsmError::UnknownOpcode {
        line: line_num,
        token: mnemonic.to_string(),
    })?;

    if operands.len() > MAX_OPERANDS {
        return Err(AsmError::TooManyOperands {
            line: line_num,
            opcode: opcode.mnemonic(),
            count: operands.len(),
        });
    }

    let mut instruction = Instruction::bare(opcode);
    for (token, field) in operands.iter().zip(layout(opcode).order) {
        match field {
            Field::Destination => instruction.destination = operand(token, line_num)?,
            Field::Source0 => instruction.source0 = operand(token, line_num)?,
            Field::Source1 => instruction.source1 = operand(token, line_num)?,
            Field::Immediate => {
                instruction.immediate = immediate(token, opcode.immediate_kind(), line_num)?
            }
        }
    }
    Ok(Some(instruction))
}

/// A destination or source field: number, `r<N>`, syscall name or flag name.
fn operand(token: &Token, line: usize) -> Result<u64, AsmError> {
    match token {
        Token::Number(n) | Token::Hex(n) => Ok(*n),
        Token::Word(word) => named_operand(word).ok_or_else(|| AsmError::UnexpectedToken {
            line,
            token: word.clone(),
        }),
        Token::Char(c) => Ok(u64::from(*c)),
        Token::Signed(_) | Token::Float(_) => Err(AsmError::InvalidNumber {
            line,
            token: token.text(),
        }),
    }
}

fn named_operand(word: &str) -> Option<u64> {
    if let Some(index) = word.strip_prefix('R') {
        if let Ok(n) = index.parse::<u64>() {
            return Some(n);
        }
    }
    SysCall::from_name(word)
        .map(|call| call as u64)
        .or_else(|| flags::by_name(word).map(u64::from))
}

/// The immediate field, read under the opcode's immediate kind. Hex is
/// taken as raw bits whatever the kind.
fn immediate(token: &Token, kind: NumericKind, line: usize) -> Result<Cell, AsmError> {
    let invalid = || AsmError::InvalidNumber {
        line,
        token: token.text(),
    };
    let cell = match (kind, token) {
        (_, Token::Hex(bits)) => Cell::from_bits(*bits),

        (NumericKind::Int, Token::Number(n)) => {
            Cell::from_int(i64::try_from(*n).map_err(|_| invalid())?)
        }
        (NumericKind::Int, Token::Signed(n)) => Cell::from_int(*n),
        (NumericKind::Int, Token::Char(c)) => Cell::from_int(i64::from(u32::from(*c))),

        (NumericKind::Uint, Token::Number(n)) => Cell::from_uint(*n),
        (NumericKind::Uint, Token::Char(c)) => Cell::from_uint(u64::from(*c)),

        (NumericKind::Double, Token::Float(f)) => Cell::from_float(*f),
        (NumericKind::Double, Token::Number(n)) => Cell::from_float(*n as f64),
        (NumericKind::Double, Token::Signed(n)) => Cell::from_float(*n as f64),
        (NumericKind::Double, Token::Word(word)) => match word.as_str() {
            "NAN" => Cell::from_float(f64::NAN),
            "INF" => Cell::from_float(f64::INFINITY),
            _ => return Err(invalid()),
        },

        _ => return Err(invalid()),
    };
    Ok(cell)
}
