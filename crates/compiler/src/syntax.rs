//! Syntax-tree contract consumed by the compiler.
//!
//! Tokenization and tree building happen outside this crate. A front end
//! hands over a [`Node`] tree whose leaves are single statements and whose
//! headed nodes carry a construct header (`if (..)`, `while (..)`, ...).
//! Scope boundaries are explicit `[ScopeStart]`/`[ScopeEnd]` label leaves,
//! and consecutive `if`/`elif`/`else` siblings are grouped under a
//! `[ConditionChain]` node.
//!
//! Every type here derives `serde` so trees can be exchanged as JSON.

use serde::{Deserialize, Serialize};

/// A source token with its line number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    #[serde(default)]
    pub line: u32,
}

/// What a token is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    Identifier(String),
    Operator(Operator),
    Literal(Literal),
    /// One of `(`, `)`, `,`, `:`, `;`.
    Delimiter(char),
    Keyword(Keyword),
    /// A type name in declaration position (`int`, `float`, ...).
    TypeMarker(String),
    /// Compiler-inserted marker.
    Label(CompilerLabel),
}

/// Literal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Void,
    Int(i64),
    Uint(u64),
    Bool(bool),
    Float(f64),
    Str(String),
    Char(char),
}

/// Operators, including the unary forms and every assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "!")]
    Not,
    #[serde(rename = "~")]
    BitNot,
    #[serde(rename = "&")]
    BitAnd,
    #[serde(rename = "|")]
    BitOr,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "<<")]
    Shl,
    #[serde(rename = ">>")]
    Shr,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "+u")]
    UnaryPlus,
    #[serde(rename = "-u")]
    UnaryMinus,
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "+=")]
    AddAssign,
    #[serde(rename = "-=")]
    SubAssign,
    #[serde(rename = "*=")]
    MulAssign,
    #[serde(rename = "/=")]
    DivAssign,
    #[serde(rename = "%=")]
    ModAssign,
    #[serde(rename = "&=")]
    BitAndAssign,
    #[serde(rename = "|=")]
    BitOrAssign,
    #[serde(rename = "<<=")]
    ShlAssign,
    #[serde(rename = ">>=")]
    ShrAssign,
    #[serde(rename = "&&=")]
    AndAssign,
    #[serde(rename = "||=")]
    OrAssign,
    #[serde(rename = "~=")]
    BitNotAssign,
}

/// All operators, for symbol lookup.
pub const ALL_OPERATORS: [Operator; 34] = [
    Operator::Add,
    Operator::Sub,
    Operator::Mul,
    Operator::Div,
    Operator::Mod,
    Operator::Not,
    Operator::BitNot,
    Operator::BitAnd,
    Operator::BitOr,
    Operator::And,
    Operator::Or,
    Operator::Shl,
    Operator::Shr,
    Operator::Eq,
    Operator::Ne,
    Operator::Lt,
    Operator::Le,
    Operator::Gt,
    Operator::Ge,
    Operator::UnaryPlus,
    Operator::UnaryMinus,
    Operator::Assign,
    Operator::AddAssign,
    Operator::SubAssign,
    Operator::MulAssign,
    Operator::DivAssign,
    Operator::ModAssign,
    Operator::BitAndAssign,
    Operator::BitOrAssign,
    Operator::ShlAssign,
    Operator::ShrAssign,
    Operator::AndAssign,
    Operator::OrAssign,
    Operator::BitNotAssign,
];

impl Operator {
    /// Source spelling.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Not => "!",
            Operator::BitNot => "~",
            Operator::BitAnd => "&",
            Operator::BitOr => "|",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Shl => "<<",
            Operator::Shr => ">>",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::UnaryPlus => "+u",
            Operator::UnaryMinus => "-u",
            Operator::Assign => "=",
            Operator::AddAssign => "+=",
            Operator::SubAssign => "-=",
            Operator::MulAssign => "*=",
            Operator::DivAssign => "/=",
            Operator::ModAssign => "%=",
            Operator::BitAndAssign => "&=",
            Operator::BitOrAssign => "|=",
            Operator::ShlAssign => "<<=",
            Operator::ShrAssign => ">>=",
            Operator::AndAssign => "&&=",
            Operator::OrAssign => "||=",
            Operator::BitNotAssign => "~=",
        }
    }

    /// Look up an operator by its spelling.
    pub fn from_symbol(symbol: &str) -> Option<Operator> {
        ALL_OPERATORS.iter().copied().find(|op| op.symbol() == symbol)
    }

    /// Binding strength. Higher binds tighter; assignments are -1.
    pub fn precedence(&self) -> i8 {
        match self {
            Operator::UnaryPlus | Operator::UnaryMinus | Operator::Not | Operator::BitNot => 8,
            Operator::Mul | Operator::Div | Operator::Mod => 7,
            Operator::Add | Operator::Sub => 6,
            Operator::Shl | Operator::Shr => 5,
            Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => 4,
            Operator::Eq | Operator::Ne => 3,
            Operator::BitAnd => 2,
            Operator::BitOr => 1,
            Operator::And | Operator::Or => 0,
            _ => -1,
        }
    }

    pub fn is_assignment(&self) -> bool {
        self.precedence() < 0
    }

    /// True for operators that take a single operand on their right.
    pub fn is_prefix(&self) -> bool {
        matches!(
            self,
            Operator::UnaryPlus | Operator::UnaryMinus | Operator::Not | Operator::BitNot
        )
    }

    /// The form this operator takes in operand position, if it has one.
    pub fn prefix_form(&self) -> Option<Operator> {
        match self {
            Operator::Add | Operator::UnaryPlus => Some(Operator::UnaryPlus),
            Operator::Sub | Operator::UnaryMinus => Some(Operator::UnaryMinus),
            Operator::Not => Some(Operator::Not),
            Operator::BitNot => Some(Operator::BitNot),
            _ => None,
        }
    }

    /// For a compound assignment, the operator it applies. `None` for `=`
    /// and for non-assignments.
    pub fn compound_base(&self) -> Option<Operator> {
        match self {
            Operator::AddAssign => Some(Operator::Add),
            Operator::SubAssign => Some(Operator::Sub),
            Operator::MulAssign => Some(Operator::Mul),
            Operator::DivAssign => Some(Operator::Div),
            Operator::ModAssign => Some(Operator::Mod),
            Operator::BitAndAssign => Some(Operator::BitAnd),
            Operator::BitOrAssign => Some(Operator::BitOr),
            Operator::ShlAssign => Some(Operator::Shl),
            Operator::ShrAssign => Some(Operator::Shr),
            Operator::AndAssign => Some(Operator::And),
            Operator::OrAssign => Some(Operator::Or),
            Operator::BitNotAssign => Some(Operator::BitNot),
            _ => None,
        }
    }
}

/// Reserved words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Keyword {
    If,
    Elif,
    Else,
    While,
    For,
    Loop,
    Continue,
    Break,
    Func,
    Return,
    OpCode,
    Const,
    Class,
    Alias,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::Elif => "elif",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::For => "for",
            Keyword::Loop => "loop",
            Keyword::Continue => "continue",
            Keyword::Break => "break",
            Keyword::Func => "func",
            Keyword::Return => "return",
            Keyword::OpCode => "op_code",
            Keyword::Const => "const",
            Keyword::Class => "class",
            Keyword::Alias => "alias",
        }
    }
}

/// Markers inserted by the tree builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompilerLabel {
    OperationEnd,
    ScopeStart,
    ScopeEnd,
    ConditionChain,
    FunctionCall,
    OffsetAccess,
    FieldAccess,
    MethodCall,
}

impl Token {
    pub fn new(kind: TokenKind, line: u32) -> Self {
        Self { kind, line }
    }

    pub fn identifier(name: impl Into<String>, line: u32) -> Self {
        Self::new(TokenKind::Identifier(name.into()), line)
    }

    pub fn operator(op: Operator, line: u32) -> Self {
        Self::new(TokenKind::Operator(op), line)
    }

    pub fn literal(value: Literal, line: u32) -> Self {
        Self::new(TokenKind::Literal(value), line)
    }

    pub fn delimiter(c: char, line: u32) -> Self {
        Self::new(TokenKind::Delimiter(c), line)
    }

    pub fn keyword(keyword: Keyword, line: u32) -> Self {
        Self::new(TokenKind::Keyword(keyword), line)
    }

    pub fn type_marker(name: impl Into<String>, line: u32) -> Self {
        Self::new(TokenKind::TypeMarker(name.into()), line)
    }

    pub fn label(label: CompilerLabel, line: u32) -> Self {
        Self::new(TokenKind::Label(label), line)
    }

    pub fn is_delimiter(&self, c: char) -> bool {
        self.kind == TokenKind::Delimiter(c)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    pub fn is_label(&self, label: CompilerLabel) -> bool {
        self.kind == TokenKind::Label(label)
    }

    pub fn as_keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_operator(&self) -> Option<Operator> {
        match self.kind {
            TokenKind::Operator(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Ends a statement: `;` or an `[OperationEnd]` marker.
    pub fn is_statement_end(&self) -> bool {
        self.is_delimiter(';') || self.is_label(CompilerLabel::OperationEnd)
    }

    /// Short human-readable text, for diagnostics.
    pub fn text(&self) -> String {
        match &self.kind {
            TokenKind::Identifier(name) | TokenKind::TypeMarker(name) => name.clone(),
            TokenKind::Operator(op) => op.symbol().to_string(),
            TokenKind::Literal(lit) => format!("{lit:?}"),
            TokenKind::Delimiter(c) => c.to_string(),
            TokenKind::Keyword(k) => k.as_str().to_string(),
            TokenKind::Label(label) => format!("[{label:?}]"),
        }
    }
}

/// Whether a headed node's children get scope markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeWrap {
    Wrapped,
    Bare,
}

impl ScopeWrap {
    /// The wrapping a header gets from the tree builder.
    ///
    /// `for`, `op_code`, `func`, `class` and `alias` manage their own
    /// scopes, and a header with an inline `: stmt` body has no block.
    pub fn for_header(tokens: &[Token]) -> ScopeWrap {
        let self_scoped = tokens.first().and_then(Token::as_keyword).is_some_and(|k| {
            matches!(
                k,
                Keyword::For | Keyword::OpCode | Keyword::Func | Keyword::Class | Keyword::Alias
            )
        });
        if self_scoped || tokens.iter().any(|t| t.is_delimiter(':')) {
            ScopeWrap::Bare
        } else {
            ScopeWrap::Wrapped
        }
    }
}

/// A syntax-tree node.
///
/// Leaves (no children) are single statements. Nodes with tokens and
/// children are headed blocks. Nodes with children and no tokens are
/// plain blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default)]
    pub line: u32,
}

impl Node {
    /// A single statement.
    pub fn leaf(tokens: Vec<Token>) -> Self {
        let line = tokens.first().map_or(0, |t| t.line);
        Self {
            tokens,
            children: Vec::new(),
            line,
        }
    }

    /// A construct header with a body.
    pub fn headed(tokens: Vec<Token>, children: Vec<Node>, wrap: ScopeWrap) -> Self {
        let line = tokens.first().map_or(0, |t| t.line);
        let children = match wrap {
            ScopeWrap::Wrapped => wrap_scope(children, line),
            ScopeWrap::Bare => children,
        };
        Self {
            tokens,
            children,
            line,
        }
    }

    /// Groups `if`/`elif`/`else` branches.
    pub fn chain(branches: Vec<Node>) -> Self {
        let line = branches.first().map_or(0, |b| b.line);
        Self {
            tokens: vec![Token::label(CompilerLabel::ConditionChain, line)],
            children: branches,
            line,
        }
    }

    /// The top-level block of a program.
    pub fn root(children: Vec<Node>) -> Self {
        Self::scope(children)
    }

    /// A tokenless block with its own scope.
    pub fn scope(children: Vec<Node>) -> Self {
        let line = children.first().map_or(0, |c| c.line);
        Self {
            tokens: Vec::new(),
            children: wrap_scope(children, line),
            line,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

fn wrap_scope(children: Vec<Node>, line: u32) -> Vec<Node> {
    let end_line = children.last().map_or(line, |c| c.line);
    let mut wrapped = Vec::with_capacity(children.len() + 2);
    wrapped.push(Node::leaf(vec![Token::label(CompilerLabel::ScopeStart, line)]));
    wrapped.extend(children);
    wrapped.push(Node::leaf(vec![Token::label(CompilerLabel::ScopeEnd, end_line)]));
    wrapped
}
