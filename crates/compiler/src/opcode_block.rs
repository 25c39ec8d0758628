//! Inline `op_code { ... }` blocks.
//!
//! Each line is a machine mnemonic with up to four operands, or one of the
//! two bridge directives `STORE_VR var, src` and `LOAD_RV reg, var`.

use malachite_common::{flags, Cell, OpCode, SysCall};

use crate::pseudo::{BlockOperand, BlockRegister, BlockSource, PseudoOp};
use crate::statement::Lowerer;
use crate::syntax::{CompilerLabel, Literal, Node, Operator, Token, TokenKind};

/// One written operand.
#[derive(Debug, Clone, PartialEq)]
enum Operand<'t> {
    Name(&'t str),
    Literal(Literal),
}

/// Look up a named constant: syscall numbers and flag masks.
pub fn constant(name: &str) -> Option<u64> {
    SysCall::from_name(name)
        .map(|call| call as u64)
        .or_else(|| flags::by_name(name).map(u64::from))
}

/// The immediate cell a literal produces, by its own kind.
pub fn literal_cell(literal: &Literal) -> Option<Cell> {
    match literal {
        Literal::Int(v) => Some(Cell::from_int(*v)),
        Literal::Char(c) => Some(Cell::from_int(i64::from(u32::from(*c)))),
        Literal::Uint(v) => Some(Cell::from_uint(*v)),
        Literal::Bool(b) => Some(Cell::from_uint(u64::from(*b))),
        Literal::Float(v) => Some(Cell::from_float(*v)),
        Literal::Void | Literal::Str(_) => None,
    }
}

fn negate(literal: Literal) -> Option<Literal> {
    match literal {
        Literal::Int(v) => Some(Literal::Int(v.wrapping_neg())),
        Literal::Uint(v) => Some(Literal::Int((v as i64).wrapping_neg())),
        Literal::Float(v) => Some(Literal::Float(-v)),
        _ => None,
    }
}

/// Split a line's operand tokens, folding a leading `-` into the literal.
fn collect_operands(tokens: &[Token]) -> Result<Vec<Operand<'_>>, String> {
    let mut operands = Vec::new();
    let mut iter = tokens.iter().peekable();
    while let Some(token) = iter.next() {
        match &token.kind {
            TokenKind::Delimiter(',') => {}
            TokenKind::Identifier(name) => operands.push(Operand::Name(name)),
            TokenKind::Literal(lit) => operands.push(Operand::Literal(lit.clone())),
            TokenKind::Operator(Operator::Sub | Operator::UnaryMinus) => {
                let value = match iter.next().map(|t| &t.kind) {
                    Some(TokenKind::Literal(lit)) => negate(lit.clone()),
                    _ => None,
                };
                operands.push(Operand::Literal(
                    value.ok_or_else(|| "\"-\" must precede a number".to_string())?,
                ));
            }
            _ => return Err(format!("unexpected \"{}\" in opcode block", token.text())),
        }
    }
    Ok(operands)
}

impl<'a> Lowerer<'a> {
    pub(crate) fn lower_opcode_block(&mut self, node: &Node, out: &mut Vec<PseudoOp>) {
        if node.tokens.len() > 1 {
            self.diagnostics.syntax(node.line, "\"op_code\" takes no operands");
            return;
        }
        out.push(PseudoOp::OpCodeStart);
        for child in &node.children {
            if !child.is_leaf() {
                self.diagnostics
                    .syntax(child.line, "nested blocks are not allowed in an opcode block");
                continue;
            }
            let tokens: Vec<Token> = child
                .tokens
                .iter()
                .filter(|t| {
                    !t.is_statement_end()
                        && !t.is_label(CompilerLabel::ScopeStart)
                        && !t.is_label(CompilerLabel::ScopeEnd)
                })
                .cloned()
                .collect();
            if tokens.is_empty() {
                continue;
            }
            if let Some(op) = self.lower_block_line(&tokens, child.line) {
                out.push(op);
            }
        }
        out.push(PseudoOp::OpCodeEnd);
    }

    fn lower_block_line(&mut self, tokens: &[Token], line: u32) -> Option<PseudoOp> {
        let Some(mnemonic) = tokens[0].as_identifier() else {
            self.diagnostics
                .syntax(line, format!("expected a mnemonic, found \"{}\"", tokens[0].text()));
            return None;
        };
        let operands = match collect_operands(&tokens[1..]) {
            Ok(operands) => operands,
            Err(message) => {
                self.diagnostics.syntax(line, message);
                return None;
            }
        };

        match mnemonic {
            "STORE_VR" => self.store_directive(&operands, line),
            "LOAD_RV" => self.load_directive(&operands, line),
            _ => {
                let Some(opcode) = OpCode::from_mnemonic(mnemonic) else {
                    self.diagnostics
                        .logic(line, format!("unknown mnemonic \"{mnemonic}\""));
                    return None;
                };
                self.command(opcode, &operands, line)
            }
        }
    }

    fn block_variable(&mut self, name: &str, line: u32) -> Option<(u64, bool)> {
        match self.state.find_variable(name) {
            Some(var) => Some((var.id, var.is_const)),
            None => {
                self.diagnostics
                    .type_error(line, format!("undeclared variable \"{name}\""));
                None
            }
        }
    }

    fn store_directive(&mut self, operands: &[Operand<'_>], line: u32) -> Option<PseudoOp> {
        let [Operand::Name(name), source] = operands else {
            self.diagnostics
                .syntax(line, "STORE_VR takes a variable and a register or literal");
            return None;
        };
        let source = match source {
            Operand::Name(reg) => match BlockRegister::from_name(reg) {
                Some(register) => BlockSource::Register(register),
                None => {
                    self.diagnostics
                        .logic(line, format!("\"{reg}\" is not a block register"));
                    return None;
                }
            },
            Operand::Literal(lit) => BlockSource::Literal(lit.clone()),
        };
        let (variable, is_const) = self.block_variable(name, line)?;
        if is_const {
            self.diagnostics
                .type_error(line, format!("cannot assign to const \"{name}\""));
            return None;
        }
        Some(PseudoOp::OpCodeStoreVR { variable, source })
    }

    fn load_directive(&mut self, operands: &[Operand<'_>], line: u32) -> Option<PseudoOp> {
        let [Operand::Name(reg), Operand::Name(name)] = operands else {
            self.diagnostics
                .syntax(line, "LOAD_RV takes a register and a variable");
            return None;
        };
        let Some(register) = BlockRegister::from_name(reg) else {
            self.diagnostics
                .logic(line, format!("\"{reg}\" is not a block register"));
            return None;
        };
        let (variable, _) = self.block_variable(name, line)?;
        Some(PseudoOp::OpCodeLoadRV { register, variable })
    }

    fn command(&mut self, opcode: OpCode, operands: &[Operand<'_>], line: u32) -> Option<PseudoOp> {
        if operands.len() > 4 {
            self.diagnostics.syntax(
                line,
                format!("{} takes at most 4 operands", opcode.mnemonic()),
            );
            return None;
        }
        let mut slots = [BlockOperand::Value(0); 3];
        let mut immediate = Cell::ZERO;

        for (position, operand) in operands.iter().enumerate() {
            let named = match operand {
                Operand::Name(name) => match BlockRegister::from_name(name) {
                    Some(register) => Some(BlockOperand::Register(register)),
                    None => match constant(name) {
                        Some(value) => Some(BlockOperand::Value(value)),
                        None => {
                            self.diagnostics
                                .logic(line, format!("unknown operand \"{name}\""));
                            return None;
                        }
                    },
                },
                Operand::Literal(_) => None,
            };
            let cell = match operand {
                Operand::Literal(lit) => match literal_cell(lit) {
                    Some(cell) => Some(cell),
                    None => {
                        self.diagnostics
                            .type_error(line, format!("{lit:?} cannot be an operand"));
                        return None;
                    }
                },
                Operand::Name(_) => None,
            };

            match (position, named, cell) {
                (0, Some(slot), _) => slots[0] = slot,
                (0, None, Some(cell)) => slots[0] = BlockOperand::Value(cell.bits()),
                (1 | 2, Some(slot), _) => slots[position] = slot,
                (1 | 2, None, Some(cell)) => immediate = cell,
                (3, None, Some(cell)) => immediate = cell,
                (3, Some(BlockOperand::Value(value)), _) => immediate = Cell::from_uint(value),
                _ => {
                    self.diagnostics
                        .syntax(line, "the immediate operand cannot be a register");
                    return None;
                }
            }
        }

        let [destination, source0, source1] = slots;
        Some(PseudoOp::OpCodeCommand {
            opcode,
            destination,
            source0,
            source1,
            immediate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::state::CompilationState;
    use crate::syntax::{Keyword, ScopeWrap};

    fn block(lines: Vec<Vec<Token>>) -> Node {
        Node::headed(
            vec![Token::keyword(Keyword::OpCode, 1)],
            lines.into_iter().map(Node::leaf).collect(),
            ScopeWrap::Bare,
        )
    }

    fn ident(name: &str) -> Token {
        Token::identifier(name, 2)
    }

    fn comma() -> Token {
        Token::delimiter(',', 2)
    }

    fn lower(node: &Node) -> (Vec<PseudoOp>, Diagnostics) {
        let mut state = CompilationState::new();
        let mut diagnostics = Diagnostics::new();
        let ops = Lowerer::new(&mut state, &mut diagnostics).lower_program(node);
        (ops, diagnostics)
    }

    #[test]
    fn constants_resolve() {
        assert_eq!(constant("PRINT_CHAR"), Some(SysCall::PrintChar as u64));
        assert_eq!(constant("LESS"), Some(u64::from(flags::LESS)));
        assert_eq!(constant("RA"), None);
    }

    #[test]
    fn syscall_line() {
        let node = block(vec![vec![
            ident("OP_SYSTEM_CALL"),
            ident("PRINT_INT"),
            comma(),
            ident("RA"),
        ]]);
        let (ops, diagnostics) = lower(&node);
        assert!(diagnostics.is_empty());
        assert_eq!(
            ops[1],
            PseudoOp::OpCodeCommand {
                opcode: OpCode::SystemCall,
                destination: BlockOperand::Value(SysCall::PrintInt as u64),
                source0: BlockOperand::Register(BlockRegister(0)),
                source1: BlockOperand::Value(0),
                immediate: Cell::ZERO,
            }
        );
    }

    #[test]
    fn literal_goes_to_immediate() {
        let node = block(vec![vec![
            ident("OP_MOV_RI_INT"),
            ident("RB"),
            comma(),
            Token::operator(Operator::Sub, 2),
            Token::literal(Literal::Int(5), 2),
        ]]);
        let (ops, _) = lower(&node);
        let PseudoOp::OpCodeCommand {
            destination,
            immediate,
            ..
        } = &ops[1]
        else {
            panic!("expected a command, got {:?}", ops[1]);
        };
        assert_eq!(*destination, BlockOperand::Register(BlockRegister(1)));
        assert_eq!(immediate.as_int(), -5);
    }

    #[test]
    fn char_literal_immediate() {
        let node = block(vec![vec![
            ident("OP_MOV_RI_INT"),
            ident("RA"),
            Token::literal(Literal::Char('|'), 2),
        ]]);
        let (ops, _) = lower(&node);
        let PseudoOp::OpCodeCommand { immediate, .. } = &ops[1] else {
            panic!("expected a command");
        };
        assert_eq!(immediate.as_int(), i64::from(b'|'));
    }

    #[test]
    fn bad_lines_are_reported_and_skipped() {
        let node = block(vec![
            vec![ident("OP_FROB"), ident("RA")],
            vec![
                ident("OP_IADD_RRR"),
                ident("RA"),
                ident("RB"),
                ident("RC"),
                ident("RD"),
                ident("RE"),
            ],
            vec![ident("LOAD_RV"), ident("RA"), ident("missing")],
            vec![ident("OP_NOP")],
        ]);
        let (ops, diagnostics) = lower(&node);
        assert_eq!(
            ops,
            vec![
                PseudoOp::OpCodeStart,
                PseudoOp::OpCodeCommand {
                    opcode: OpCode::Nop,
                    destination: BlockOperand::Value(0),
                    source0: BlockOperand::Value(0),
                    source1: BlockOperand::Value(0),
                    immediate: Cell::ZERO,
                },
                PseudoOp::OpCodeEnd,
            ]
        );
        assert_eq!(diagnostics.len(), 3);
    }
}
