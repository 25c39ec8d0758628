//! Expression and single-statement lowering.
//!
//! Expressions go through a shunting-yard pass into postfix [`Item`]s and
//! are then emitted as pseudo ops. Statements are assignments,
//! declarations, scope markers, `break`/`continue` and bare expressions.

use crate::error::ExpressionError;
use crate::pseudo::{PseudoOp, SignalKind};
use crate::statement::Lowerer;
use crate::syntax::{CompilerLabel, Keyword, Operator, Token, TokenKind};

/// One postfix element.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Operand(Token),
    Operator(Operator, u32),
    /// A call with each argument already in postfix order.
    Call {
        name: String,
        args: Vec<Vec<Item>>,
        line: u32,
    },
}

enum Pending {
    Operator(Operator, u32),
    Paren,
}

/// Convert an infix token run into postfix order.
pub fn to_postfix(tokens: &[Token]) -> Result<Vec<Item>, ExpressionError> {
    let mut output = Vec::new();
    let mut stack: Vec<Pending> = Vec::new();
    let mut prev: Option<&Token> = None;
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        match &token.kind {
            TokenKind::Identifier(_) | TokenKind::Literal(_) => {
                if prev.is_some_and(ends_operand) {
                    return Err(ExpressionError::UnexpectedToken(token.text()));
                }
                if let (TokenKind::Identifier(name), true) = (
                    &token.kind,
                    tokens.get(i + 1).is_some_and(|t| t.is_delimiter('(')),
                ) {
                    let close = matching_paren(tokens, i + 1)
                        .ok_or(ExpressionError::UnbalancedParentheses)?;
                    let args = split_arguments(&tokens[i + 2..close])?
                        .into_iter()
                        .map(to_postfix)
                        .collect::<Result<Vec<_>, _>>()?;
                    output.push(Item::Call {
                        name: name.clone(),
                        args,
                        line: token.line,
                    });
                    prev = Some(&tokens[close]);
                    i = close + 1;
                    continue;
                }
                output.push(Item::Operand(token.clone()));
            }
            TokenKind::Operator(op) => {
                if op.is_assignment() {
                    return Err(ExpressionError::UnexpectedToken(op.symbol().to_string()));
                }
                let unary = prev.map_or(true, |p| {
                    p.as_operator().is_some() || p.is_delimiter('(') || p.is_delimiter(',')
                });
                let op = if unary {
                    op.prefix_form()
                        .ok_or_else(|| ExpressionError::UnexpectedToken(op.symbol().to_string()))?
                } else if op.is_prefix() {
                    return Err(ExpressionError::UnexpectedToken(op.symbol().to_string()));
                } else {
                    *op
                };
                if !op.is_prefix() {
                    while let Some(Pending::Operator(top, line)) = stack.last() {
                        if top.precedence() < op.precedence() {
                            break;
                        }
                        output.push(Item::Operator(*top, *line));
                        stack.pop();
                    }
                }
                stack.push(Pending::Operator(op, token.line));
            }
            TokenKind::Delimiter('(') => stack.push(Pending::Paren),
            TokenKind::Delimiter(')') => loop {
                match stack.pop() {
                    Some(Pending::Operator(op, line)) => output.push(Item::Operator(op, line)),
                    Some(Pending::Paren) => break,
                    None => return Err(ExpressionError::UnbalancedParentheses),
                }
            },
            TokenKind::Delimiter(',') => return Err(ExpressionError::MisplacedComma),
            _ => return Err(ExpressionError::UnexpectedToken(token.text())),
        }
        prev = Some(token);
        i += 1;
    }

    while let Some(pending) = stack.pop() {
        match pending {
            Pending::Operator(op, line) => output.push(Item::Operator(op, line)),
            Pending::Paren => return Err(ExpressionError::UnbalancedParentheses),
        }
    }
    if output.is_empty() {
        return Err(ExpressionError::Empty);
    }
    Ok(output)
}

fn ends_operand(token: &Token) -> bool {
    matches!(token.kind, TokenKind::Identifier(_) | TokenKind::Literal(_))
        || token.is_delimiter(')')
}

/// Index of the `)` closing the `(` at `open`.
pub(crate) fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if token.is_delimiter('(') {
            depth += 1;
        } else if token.is_delimiter(')') {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split at commas outside any parentheses. An empty run has no arguments.
pub(crate) fn split_arguments(tokens: &[Token]) -> Result<Vec<&[Token]>, ExpressionError> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if token.is_delimiter('(') {
            depth += 1;
        } else if token.is_delimiter(')') {
            depth = depth
                .checked_sub(1)
                .ok_or(ExpressionError::UnbalancedParentheses)?;
        } else if token.is_delimiter(',') && depth == 0 {
            parts.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    parts.push(&tokens[start..]);
    if parts.iter().any(|part| part.is_empty()) {
        return Err(ExpressionError::Empty);
    }
    Ok(parts)
}

/// The pseudo op an expression operator lowers to. Unary plus lowers to
/// nothing.
pub(crate) fn operator_op(op: Operator) -> Option<PseudoOp> {
    let op = match op {
        Operator::Add => PseudoOp::Add,
        Operator::Sub => PseudoOp::Subtract,
        Operator::Mul => PseudoOp::Multiply,
        Operator::Div => PseudoOp::Divide,
        Operator::Mod => PseudoOp::Mod,
        Operator::UnaryMinus => PseudoOp::Negate,
        Operator::And => PseudoOp::And,
        Operator::Or => PseudoOp::Or,
        Operator::Not => PseudoOp::Not,
        Operator::Eq => PseudoOp::Equal,
        Operator::Ne => PseudoOp::NotEqual,
        Operator::Gt => PseudoOp::Greater,
        Operator::Lt => PseudoOp::Less,
        Operator::Ge => PseudoOp::GreaterEqual,
        Operator::Le => PseudoOp::LessEqual,
        Operator::BitOr => PseudoOp::BitOr,
        Operator::BitNot => PseudoOp::BitNot,
        Operator::BitAnd => PseudoOp::BitAnd,
        Operator::Shl => PseudoOp::ShiftLeft,
        Operator::Shr => PseudoOp::ShiftRight,
        _ => return None,
    };
    Some(op)
}

/// Index of the first assignment operator outside parentheses.
fn find_assignment(tokens: &[Token]) -> Option<(usize, Operator)> {
    let mut depth = 0i32;
    for (i, token) in tokens.iter().enumerate() {
        if token.is_delimiter('(') {
            depth += 1;
        } else if token.is_delimiter(')') {
            depth -= 1;
        } else if let Some(op) = token.as_operator() {
            if depth == 0 && op.is_assignment() {
                return Some((i, op));
            }
        }
    }
    None
}

/// `[const] Type name`, as written on the left of a declaration.
struct Declaration<'t> {
    is_const: bool,
    type_name: &'t str,
    name: &'t str,
}

fn parse_declaration(tokens: &[Token]) -> Option<Declaration<'_>> {
    let (is_const, rest) = match tokens.split_first() {
        Some((first, rest)) if first.is_keyword(Keyword::Const) => (true, rest),
        _ => (false, tokens),
    };
    match rest {
        [ty, name] => match (&ty.kind, &name.kind) {
            (TokenKind::TypeMarker(type_name), TokenKind::Identifier(name)) => Some(Declaration {
                is_const,
                type_name,
                name,
            }),
            _ => None,
        },
        _ => None,
    }
}

fn is_declaration_start(token: &Token) -> bool {
    token.is_keyword(Keyword::Const) || matches!(token.kind, TokenKind::TypeMarker(_))
}

impl<'a> Lowerer<'a> {
    /// Lower an expression into a fresh op list. `None` if a diagnostic
    /// was reported.
    pub(crate) fn lower_expression(
        &mut self,
        tokens: &[Token],
        line: u32,
    ) -> Option<Vec<PseudoOp>> {
        let items = match to_postfix(tokens) {
            Ok(items) => items,
            Err(err) => {
                self.diagnostics.syntax(line, err.to_string());
                return None;
            }
        };
        let mut ops = Vec::new();
        self.emit_items(&items, &mut ops)?;
        Some(ops)
    }

    fn emit_items(&mut self, items: &[Item], ops: &mut Vec<PseudoOp>) -> Option<()> {
        for item in items {
            match item {
                Item::Operand(token) => match &token.kind {
                    TokenKind::Identifier(name) => match self.state.find_variable(name) {
                        Some(var) => ops.push(PseudoOp::Load(var.id)),
                        None => {
                            self.diagnostics
                                .type_error(token.line, format!("undeclared variable \"{name}\""));
                            return None;
                        }
                    },
                    TokenKind::Literal(value) => ops.push(PseudoOp::Immediate(value.clone())),
                    _ => {
                        self.diagnostics
                            .syntax(token.line, format!("unexpected \"{}\"", token.text()));
                        return None;
                    }
                },
                Item::Operator(op, _) => ops.extend(operator_op(*op)),
                Item::Call { name, args, line } => {
                    for arg in args {
                        self.emit_items(arg, ops)?;
                        ops.push(PseudoOp::Push);
                    }
                    match self.state.resolve_overload(name, args.len()) {
                        Some(function) => ops.push(PseudoOp::Call(function.id)),
                        None => {
                            self.diagnostics.logic(
                                *line,
                                format!("no overload of \"{name}\" takes {} arguments", args.len()),
                            );
                            return None;
                        }
                    }
                }
            }
        }
        Some(())
    }

    /// Lower one statement leaf.
    pub(crate) fn lower_statement(&mut self, tokens: &[Token], out: &mut Vec<PseudoOp>) {
        let mut tokens = tokens;
        while let Some((last, rest)) = tokens.split_last() {
            if !last.is_statement_end() {
                break;
            }
            tokens = rest;
        }
        let Some(first) = tokens.first() else {
            return;
        };
        let line = first.line;

        match &first.kind {
            TokenKind::Label(CompilerLabel::ScopeStart) => {
                self.state.push_scope();
                out.push(PseudoOp::ScopeStart);
                return;
            }
            TokenKind::Label(CompilerLabel::ScopeEnd) => {
                match self.state.pop_scope() {
                    Ok(_) => out.push(PseudoOp::ScopeEnd),
                    Err(err) => self.diagnostics.logic(line, err.to_string()),
                }
                return;
            }
            TokenKind::Keyword(keyword @ (Keyword::Break | Keyword::Continue)) => {
                let kind = match keyword {
                    Keyword::Break => SignalKind::Break,
                    _ => SignalKind::Continue,
                };
                self.lower_signal(kind, tokens, out);
                return;
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.diagnostics.logic(line, "\"return\" is not supported");
                return;
            }
            _ => {}
        }

        if let Some((at, op)) = find_assignment(tokens) {
            self.lower_assignment(&tokens[..at], op, &tokens[at + 1..], line, out);
        } else if is_declaration_start(first) {
            self.lower_declaration(tokens, line, out);
        } else if let Some(ops) = self.lower_expression(tokens, line) {
            out.extend(ops);
            out.push(PseudoOp::Pop);
        }
    }

    fn lower_signal(&mut self, kind: SignalKind, tokens: &[Token], out: &mut Vec<PseudoOp>) {
        let line = tokens.first().map_or(0, |t| t.line);
        if tokens.len() > 1 {
            self.diagnostics
                .syntax(line, format!("\"{kind}\" takes no operands"));
            return;
        }
        match self.loops.last() {
            Some(&base) => {
                let unwind = self.state.depth().saturating_sub(base) as u64;
                out.push(PseudoOp::Signal { kind, unwind });
            }
            None => self
                .diagnostics
                .syntax(line, format!("\"{kind}\" outside of a loop")),
        }
    }

    /// `Type name` with no initializer.
    fn lower_declaration(&mut self, tokens: &[Token], line: u32, out: &mut Vec<PseudoOp>) {
        let Some(decl) = parse_declaration(tokens) else {
            self.diagnostics.syntax(line, "malformed declaration");
            return;
        };
        if decl.is_const {
            self.diagnostics
                .syntax(line, format!("const \"{}\" needs an initializer", decl.name));
            return;
        }
        if let Some(id) = self.declare(&decl, line) {
            out.push(PseudoOp::DeclareVariable(id));
        }
    }

    fn declare(&mut self, decl: &Declaration<'_>, line: u32) -> Option<u64> {
        let Some(type_id) = self.state.find_type(decl.type_name).map(|t| t.id) else {
            self.diagnostics
                .type_error(line, format!("unknown type \"{}\"", decl.type_name));
            return None;
        };
        match self.state.declare_variable(decl.name, type_id, decl.is_const) {
            Ok(id) => Some(id),
            Err(err) => {
                self.diagnostics.logic(line, err.to_string());
                None
            }
        }
    }

    fn lower_assignment(
        &mut self,
        lhs: &[Token],
        op: Operator,
        rhs: &[Token],
        line: u32,
        out: &mut Vec<PseudoOp>,
    ) {
        if lhs.first().is_some_and(is_declaration_start) {
            let Some(decl) = parse_declaration(lhs) else {
                self.diagnostics.syntax(line, "malformed declaration");
                return;
            };
            if op != Operator::Assign {
                self.diagnostics.syntax(
                    line,
                    format!("declaration of \"{}\" must use \"=\"", decl.name),
                );
                return;
            }
            // The initializer sees the enclosing binding, not the new one.
            let Some(value) = self.lower_expression(rhs, line) else {
                return;
            };
            let Some(id) = self.declare(&decl, line) else {
                return;
            };
            out.push(PseudoOp::DeclareVariable(id));
            out.extend(value);
            out.push(PseudoOp::Store(id));
            return;
        }

        let target = match lhs {
            [token] => token.as_identifier(),
            _ => None,
        };
        let Some(name) = target else {
            self.diagnostics.syntax(line, "invalid assignment target");
            return;
        };
        let (id, is_const) = match self.state.find_variable(name) {
            Some(var) => (var.id, var.is_const),
            None => {
                self.diagnostics
                    .type_error(line, format!("undeclared variable \"{name}\""));
                return;
            }
        };
        if is_const {
            self.diagnostics
                .type_error(line, format!("cannot assign to const \"{name}\""));
            return;
        }
        let Some(value) = self.lower_expression(rhs, line) else {
            return;
        };

        match op.compound_base() {
            None => out.extend(value),
            Some(Operator::BitNot) => {
                out.extend(value);
                out.push(PseudoOp::BitNot);
            }
            Some(base) => {
                out.push(PseudoOp::Load(id));
                out.extend(value);
                out.extend(operator_op(base));
            }
        }
        out.push(PseudoOp::Store(id));
    }
}
