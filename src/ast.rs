//! Typed AST, lowered from the syntax tree by [`crate::lower`].
//!
//! Trivia and punctuation are gone, strings are unescaped and numbers are
//! decoded. Spans point back into the source. Ranges the parser could not
//! make sense of lower to [`Statement::Error`] and [`ExprKind::Error`], so a
//! file with mistakes still lowers completely.
use crate::span::Span;

/// The statements of one file, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `include <path>`, path without the angle brackets
    Include { path: String, span: Span },
    /// `use <path>`
    Use { path: String, span: Span },
    /// `name = expr;`
    Assignment {
        name: String,
        expr: Expr,
        span: Span,
    },
    /// `module name(params) body`. A single-statement body is a one-element vec.
    ModuleDefinition {
        name: String,
        params: Vec<Parameter>,
        body: Vec<Self>,
        span: Span,
    },
    /// `function name(params) = expr;`
    FunctionDefinition {
        name: String,
        params: Vec<Parameter>,
        body: Expr,
        span: Span,
    },
    /// A call of a module, with the statements it applies to.
    /// `children` is empty for `name(args);`.
    ModuleInstantiation {
        name: String,
        args: Vec<Argument>,
        children: Vec<Self>,
        modifiers: Modifiers,
        span: Span,
    },
    IfElse {
        condition: Expr,
        then_body: Vec<Self>,
        else_body: Option<Vec<Self>>,
        span: Span,
    },
    /// `for` or, with `intersection` set, `intersection_for`
    For {
        assignments: Vec<Argument>,
        body: Vec<Self>,
        intersection: bool,
        span: Span,
    },
    Let {
        assignments: Vec<Argument>,
        body: Vec<Self>,
        span: Span,
    },
    Assert {
        args: Vec<Argument>,
        children: Vec<Self>,
        span: Span,
    },
    Echo {
        args: Vec<Argument>,
        children: Vec<Self>,
        span: Span,
    },
    /// Modifiers in front of something other than a call, e.g. `%{ ... }`
    /// or `#for (...) ...`.
    Modified {
        modifiers: Modifiers,
        body: Box<Self>,
        span: Span,
    },
    Block { body: Vec<Self>, span: Span },
    /// A lone `;`
    Empty { span: Span },
    /// Source the parser reported as malformed.
    Error { span: Span },
}

/// The `!` `#` `%` `*` prefixes, which may be combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Modifiers {
    /// `!` render only this subtree
    pub root: bool,
    /// `#` draw highlighted
    pub highlight: bool,
    /// `%` draw transparent, exclude from the result
    pub background: bool,
    /// `*` ignore the subtree
    pub disable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    #[must_use]
    pub const fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Placeholder for a missing or malformed expression.
    #[must_use]
    pub const fn error(span: Span) -> Self {
        Self::new(ExprKind::Error, span)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(f64),
    /// Decoded string contents
    String(String),
    BoolTrue,
    BoolFalse,
    Undef,
    /// A name, including special variables like `$fn`
    Identifier(String),

    UnaryOp { op: UnaryOp, operand: Box<Expr> },
    /// Left-associative at every level, `^` included.
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `c ? a : b`
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },

    /// The callee is any expression, so `f(1)(2)` nests.
    FunctionCall {
        callee: Box<Expr>,
        args: Vec<Argument>,
    },
    Index { object: Box<Expr>, index: Box<Expr> },
    /// `v[a:b]` or `v[a:step:b]`
    Slice {
        object: Box<Expr>,
        start: Box<Expr>,
        step: Option<Box<Expr>>,
        end: Box<Expr>,
    },
    /// `v.x`
    MemberAccess { object: Box<Expr>, member: String },

    /// `[a, b, c]`. Elements may be generators (the `Lc*` variants).
    Vector(Vec<Expr>),
    /// `[start:end]` or `[start:step:end]`
    Range {
        start: Box<Expr>,
        step: Option<Box<Expr>>,
        end: Box<Expr>,
    },

    Let {
        assignments: Vec<Argument>,
        body: Box<Expr>,
    },
    /// `assert(args) body`. Without a body the value is `undef`.
    Assert {
        args: Vec<Argument>,
        body: Option<Box<Expr>>,
    },
    Echo {
        args: Vec<Argument>,
        body: Option<Box<Expr>>,
    },

    /// `function(params) body`
    AnonymousFunction {
        params: Vec<Parameter>,
        body: Box<Expr>,
    },

    // Generators, only valid as vector elements
    LcFor {
        assignments: Vec<Argument>,
        body: Box<Expr>,
    },
    /// `for (init; condition; update) body`
    LcForC {
        init: Vec<Argument>,
        condition: Box<Expr>,
        update: Vec<Argument>,
        body: Box<Expr>,
    },
    LcIf {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Option<Box<Expr>>,
    },
    LcLet {
        assignments: Vec<Argument>,
        body: Box<Expr>,
    },
    LcEach { body: Box<Expr> },

    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-`
    Negate,
    /// `!`
    Not,
    /// `+`
    Plus,
    /// `~`
    BinaryNot,
}

/// Listed from loosest to tightest binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    LogicalOr,
    LogicalAnd,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    BitwiseOr,
    BitwiseAnd,
    ShiftLeft,
    ShiftRight,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Exponent,
}

/// A declared parameter, with its default value if it has one.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub default: Option<Expr>,
    pub span: Span,
}

/// A call argument (`expr` or `name = expr`), or a `let`/`for` binding,
/// which always has a name.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Expr,
    pub span: Span,
}

impl Statement {
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Include { span, .. }
            | Self::Use { span, .. }
            | Self::Assignment { span, .. }
            | Self::ModuleDefinition { span, .. }
            | Self::FunctionDefinition { span, .. }
            | Self::ModuleInstantiation { span, .. }
            | Self::IfElse { span, .. }
            | Self::For { span, .. }
            | Self::Let { span, .. }
            | Self::Assert { span, .. }
            | Self::Echo { span, .. }
            | Self::Modified { span, .. }
            | Self::Block { span, .. }
            | Self::Empty { span }
            | Self::Error { span } => *span,
        }
    }
}
