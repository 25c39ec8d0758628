//! Tree lowering: structured constructs into pseudo ops with labels.

use crate::diagnostics::Diagnostics;
use crate::expression::{matching_paren, split_arguments};
use crate::pseudo::{LabelMark, PseudoOp, SignalKind};
use crate::state::{CompilationState, LabelId};
use crate::syntax::{CompilerLabel, Keyword, Literal, Node, Token};

/// Walks a syntax tree and produces the pseudo stream.
pub struct Lowerer<'a> {
    pub(crate) state: &'a mut CompilationState,
    pub(crate) diagnostics: &'a mut Diagnostics,
    /// Scope depth at the base of each enclosing loop, innermost last.
    pub(crate) loops: Vec<usize>,
}

/// A parsed `if`/`elif`/`else` header.
struct Branch<'n> {
    condition: Option<&'n [Token]>,
    /// The statement after `:`, if the body is inline.
    inline: Option<&'n [Token]>,
}

impl<'a> Lowerer<'a> {
    pub fn new(state: &'a mut CompilationState, diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            state,
            diagnostics,
            loops: Vec::new(),
        }
    }

    /// Lower a whole program tree.
    pub fn lower_program(&mut self, root: &Node) -> Vec<PseudoOp> {
        let mut out = Vec::new();
        self.lower_node(root, &mut out);
        out
    }

    pub fn lower_node(&mut self, node: &Node, out: &mut Vec<PseudoOp>) {
        let Some(first) = node.tokens.first() else {
            self.lower_children(&node.children, out);
            return;
        };
        if first.is_label(CompilerLabel::ConditionChain) {
            self.lower_chain(&node.children, out);
            return;
        }
        match first.as_keyword() {
            Some(Keyword::If | Keyword::Elif | Keyword::Else) => {
                self.lower_chain(std::slice::from_ref(node), out)
            }
            Some(Keyword::While) => self.lower_while(node, out),
            Some(Keyword::Loop) => self.lower_loop(node, out),
            Some(Keyword::For) => self.lower_for(node, out),
            Some(Keyword::OpCode) => self.lower_opcode_block(node, out),
            Some(keyword @ (Keyword::Func | Keyword::Class | Keyword::Alias)) => {
                self.diagnostics.logic(
                    node.line,
                    format!("\"{}\" declarations are not supported", keyword.as_str()),
                );
            }
            _ if node.is_leaf() => self.lower_statement(&node.tokens, out),
            _ => self.diagnostics.logic(
                node.line,
                format!("unsupported block header \"{}\"", first.text()),
            ),
        }
    }

    fn lower_children(&mut self, children: &[Node], out: &mut Vec<PseudoOp>) {
        for child in children {
            self.lower_node(child, out);
        }
    }

    // ---- Condition chains ----

    fn lower_chain(&mut self, branches: &[Node], out: &mut Vec<PseudoOp>) {
        let skip = (branches.len() > 1).then(|| self.state.new_label());
        for (i, node) in branches.iter().enumerate() {
            let last = i + 1 == branches.len();
            let Some(branch) = self.parse_branch(node, i == 0, last) else {
                continue;
            };

            let mut ops = Vec::new();
            let exit = match branch.condition {
                Some(condition) => {
                    let Some(cond) = self.lower_expression(condition, node.line) else {
                        continue;
                    };
                    let exit = self.state.new_label();
                    ops.extend(cond);
                    ops.push(PseudoOp::JumpNotIf(exit));
                    Some(exit)
                }
                None => None,
            };
            if let Some(inline) = branch.inline {
                // Frame bytes reserved here must not outlive a skipped branch.
                self.state.push_scope();
                ops.push(PseudoOp::ScopeStart);
                self.lower_statement(inline, &mut ops);
                if self.state.pop_scope().is_ok() {
                    ops.push(PseudoOp::ScopeEnd);
                }
            }
            self.lower_children(&node.children, &mut ops);
            if let (Some(skip), false) = (skip, last) {
                ops.push(PseudoOp::Jump(skip));
            }
            if let Some(exit) = exit {
                ops.push(label(exit, LabelMark::NextCondition));
            }
            out.extend(ops);
        }
        if let Some(skip) = skip {
            out.push(label(skip, LabelMark::ChainSkip));
        }
    }

    fn parse_branch<'n>(&mut self, node: &'n Node, first: bool, last: bool) -> Option<Branch<'n>> {
        let tokens = node.tokens.as_slice();
        let line = node.line;
        let keyword = tokens.first().and_then(Token::as_keyword);

        let (condition, rest) = match keyword {
            Some(Keyword::If | Keyword::Elif) => {
                if keyword == Some(Keyword::If) && !first {
                    self.diagnostics.syntax(line, "\"if\" inside a condition chain");
                    return None;
                }
                if keyword == Some(Keyword::Elif) && first {
                    self.diagnostics.syntax(line, "\"elif\" without a preceding \"if\"");
                    return None;
                }
                if tokens.len() < 4 || !tokens[1].is_delimiter('(') {
                    self.diagnostics.syntax(line, "malformed condition header");
                    return None;
                }
                let Some(close) = matching_paren(tokens, 1) else {
                    self.diagnostics.syntax(line, "unbalanced parentheses in condition");
                    return None;
                };
                (Some(&tokens[2..close]), &tokens[close + 1..])
            }
            Some(Keyword::Else) => {
                if first {
                    self.diagnostics.syntax(line, "\"else\" without a preceding \"if\"");
                    return None;
                }
                if !last {
                    self.diagnostics.syntax(line, "\"else\" must end the condition chain");
                    return None;
                }
                let rest = &tokens[1..];
                if rest.first().is_some_and(|t| !t.is_delimiter(':')) {
                    self.diagnostics.syntax(line, "\"else\" takes no condition");
                    return None;
                }
                (None, rest)
            }
            _ => {
                self.diagnostics
                    .syntax(line, "condition chain branch must start with if, elif or else");
                return None;
            }
        };

        let inline = match rest.split_first() {
            None => None,
            Some((colon, statement)) if colon.is_delimiter(':') => {
                if statement.is_empty() {
                    self.diagnostics.syntax(line, "\":\" must be followed by a statement");
                    return None;
                }
                if statement.iter().any(|t| t.is_delimiter(':')) {
                    self.diagnostics.syntax(line, "\":\" may appear only once");
                    return None;
                }
                Some(statement)
            }
            Some((token, _)) => {
                self.diagnostics
                    .syntax(line, format!("unexpected \"{}\" after condition", token.text()));
                return None;
            }
        };
        Some(Branch { condition, inline })
    }

    // ---- Loops ----

    fn lower_while(&mut self, node: &Node, out: &mut Vec<PseudoOp>) {
        let Some(condition) = self.loop_condition(&node.tokens, node.line) else {
            return;
        };
        let Some(cond) = self.lower_expression(condition, node.line) else {
            return;
        };
        let check = self.state.new_label();
        let end = self.state.new_label();

        out.push(label(check, LabelMark::WhileCheck));
        out.extend(cond);
        out.push(PseudoOp::JumpNotIf(end));
        let body = self.lower_loop_body(&node.children);
        rewrite_signals(body, check, end, out);
        out.push(PseudoOp::Jump(check));
        out.push(label(end, LabelMark::WhileEnd));
    }

    fn lower_loop(&mut self, node: &Node, out: &mut Vec<PseudoOp>) {
        if node.tokens.len() > 1 {
            self.diagnostics.syntax(node.line, "\"loop\" takes no condition");
            return;
        }
        let start = self.state.new_label();
        let end = self.state.new_label();

        out.push(label(start, LabelMark::LoopStart));
        let body = self.lower_loop_body(&node.children);
        rewrite_signals(body, start, end, out);
        out.push(PseudoOp::Jump(start));
        out.push(label(end, LabelMark::LoopEnd));
    }

    /// `for name ( start , end [, step] )`, inclusive at both ends.
    fn lower_for(&mut self, node: &Node, out: &mut Vec<PseudoOp>) {
        let line = node.line;
        let tokens = node.tokens.as_slice();
        let name = match tokens.get(1).and_then(Token::as_identifier) {
            Some(name) if tokens.get(2).is_some_and(|t| t.is_delimiter('(')) => name,
            _ => {
                self.diagnostics.syntax(line, "expected \"for name ( start , end [, step] )\"");
                return;
            }
        };
        if matching_paren(tokens, 2) != Some(tokens.len() - 1) {
            self.diagnostics.syntax(line, "malformed for header");
            return;
        }
        let bounds = match split_arguments(&tokens[3..tokens.len() - 1]) {
            Ok(parts) if (2..=3).contains(&parts.len()) => parts,
            _ => {
                self.diagnostics
                    .syntax(line, "for takes a start, an end and an optional step");
                return;
            }
        };

        let mut header = Vec::new();
        let mut values = Vec::with_capacity(3);
        for part in &bounds {
            let Some(ops) = self.lower_expression(part, line) else {
                return;
            };
            values.push(ops);
        }
        if values.len() == 2 {
            values.push(vec![PseudoOp::Immediate(Literal::Int(1))]);
        }

        let check = self.state.new_label();
        let greater = self.state.new_label();
        let body = self.state.new_label();
        let add = self.state.new_label();
        let end = self.state.new_label();
        let start_name = format!("for{check}.start");
        let end_name = format!("for{check}.end");
        let step_name = format!("for{check}.step");

        for (ops, pseudonym) in values.into_iter().zip([&start_name, &end_name, &step_name]) {
            header.extend(ops);
            header.push(PseudoOp::SavePseudonym(pseudonym.clone()));
        }

        let Some(int) = self.state.find_type("int").map(|t| t.id) else {
            self.diagnostics.logic(line, "the int type is not declared");
            return;
        };
        self.state.push_scope();
        header.push(PseudoOp::ScopeStart);
        let var = match self.state.declare_variable(name, int, false) {
            Ok(id) => id,
            Err(err) => {
                self.diagnostics.logic(line, err.to_string());
                let _ = self.state.pop_scope();
                return;
            }
        };
        out.extend(header);
        out.extend([
            PseudoOp::DeclareVariable(var),
            PseudoOp::LoadPseudonym(start_name.clone()),
            PseudoOp::Store(var),
            label(check, LabelMark::ForCheck),
            PseudoOp::LoadPseudonym(step_name.clone()),
            PseudoOp::Immediate(Literal::Int(0)),
            PseudoOp::Less,
            PseudoOp::JumpNotIf(greater),
            PseudoOp::Load(var),
            PseudoOp::LoadPseudonym(end_name.clone()),
            PseudoOp::GreaterEqual,
            PseudoOp::JumpIf(body),
            PseudoOp::Jump(end),
            label(greater, LabelMark::ForGreater),
            PseudoOp::Load(var),
            PseudoOp::LoadPseudonym(end_name.clone()),
            PseudoOp::LessEqual,
            PseudoOp::JumpIf(body),
            PseudoOp::Jump(end),
            label(body, LabelMark::ForBody),
        ]);

        self.loops.push(self.state.depth());
        let mut ops = Vec::new();
        self.state.push_scope();
        ops.push(PseudoOp::ScopeStart);
        self.lower_children(&node.children, &mut ops);
        if self.state.pop_scope().is_ok() {
            ops.push(PseudoOp::ScopeEnd);
        }
        self.loops.pop();
        rewrite_signals(ops, add, end, out);

        out.extend([
            label(add, LabelMark::ForAdd),
            PseudoOp::Load(var),
            PseudoOp::LoadPseudonym(step_name.clone()),
            PseudoOp::Add,
            PseudoOp::Store(var),
            PseudoOp::Jump(check),
            label(end, LabelMark::ForEnd),
            PseudoOp::ReleasePseudonym(start_name),
            PseudoOp::ReleasePseudonym(end_name),
            PseudoOp::ReleasePseudonym(step_name),
        ]);
        if self.state.pop_scope().is_ok() {
            out.push(PseudoOp::ScopeEnd);
        }
    }

    /// The tokens between the parentheses of `while ( cond )`.
    fn loop_condition<'n>(&mut self, tokens: &'n [Token], line: u32) -> Option<&'n [Token]> {
        if tokens.len() < 4 || !tokens[1].is_delimiter('(') {
            self.diagnostics.syntax(line, "malformed loop header");
            return None;
        }
        if matching_paren(tokens, 1) != Some(tokens.len() - 1) {
            self.diagnostics.syntax(line, "unexpected tokens after loop condition");
            return None;
        }
        Some(&tokens[2..tokens.len() - 1])
    }

    fn lower_loop_body(&mut self, children: &[Node]) -> Vec<PseudoOp> {
        self.loops.push(self.state.depth());
        let mut body = Vec::new();
        self.lower_children(children, &mut body);
        self.loops.pop();
        body
    }
}

fn label(id: LabelId, mark: LabelMark) -> PseudoOp {
    PseudoOp::Label { id, mark }
}

/// Replace the loop's own `break`/`continue` placeholders with jumps.
///
/// Inner loops have already rewritten theirs, so every signal left in
/// `body` belongs to this loop.
fn rewrite_signals(
    body: Vec<PseudoOp>,
    continue_to: LabelId,
    break_to: LabelId,
    out: &mut Vec<PseudoOp>,
) {
    for op in body {
        match op {
            PseudoOp::Signal { kind, unwind } => {
                if unwind > 0 {
                    out.push(PseudoOp::CloseScopes(unwind));
                }
                out.push(PseudoOp::Jump(match kind {
                    SignalKind::Break => break_to,
                    SignalKind::Continue => continue_to,
                }));
            }
            other => out.push(other),
        }
    }
}
