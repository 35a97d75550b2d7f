//! Lowering from the lossless [`SyntaxTree`] to the typed AST.
//!
//! Flat binary nodes fold left-associatively, literal tokens decode to
//! values, and anything missing or malformed becomes an `Error` variant
//! spanning where it should have been. Lowering never fails.
use crate::ast::{
    Argument, BinaryOp, Expr, ExprKind, Modifiers, Parameter, SourceFile, Statement, UnaryOp,
};
use crate::lexer::extract_include_path;
use crate::span::Span;
use crate::syntax::{NodeKind, SyntaxNode, SyntaxTree};
use crate::token::TokenKind;

/// Lower the whole tree.
#[must_use]
pub fn lower(tree: &SyntaxTree) -> SourceFile {
    let root = tree.root();
    SourceFile {
        statements: statements_in(root),
        span: root.span(),
    }
}

fn is_statement_like(node: SyntaxNode<'_>) -> bool {
    node.kind().is_statement() || node.kind() == NodeKind::Error
}

fn is_expr_like(node: SyntaxNode<'_>) -> bool {
    let kind = node.kind();
    kind.is_expression() || kind.is_generator() || kind == NodeKind::Error
}

fn statements_in(node: SyntaxNode<'_>) -> Vec<Statement> {
    node.child_nodes()
        .filter(|child| is_statement_like(*child))
        .map(statement)
        .collect()
}

/// A block body lowers to its statements, anything else to one statement.
fn body(node: Option<SyntaxNode<'_>>) -> Vec<Statement> {
    match node {
        Some(block) if block.kind() == NodeKind::Block => statements_in(block),
        Some(other) => vec![statement(other)],
        None => Vec::new(),
    }
}

fn name_of(node: SyntaxNode<'_>) -> String {
    node.first_child_of(NodeKind::Name)
        .map(|name| name.text().to_string())
        .unwrap_or_default()
}

fn modifiers_of(node: SyntaxNode<'_>) -> Modifiers {
    let mut modifiers = Modifiers::default();
    for (_, tok) in node.child_tokens() {
        match tok.kind {
            TokenKind::Bang => modifiers.root = true,
            TokenKind::Hash => modifiers.highlight = true,
            TokenKind::Percent => modifiers.background = true,
            TokenKind::Star => modifiers.disable = true,
            _ => {}
        }
    }
    modifiers
}

fn statement(node: SyntaxNode<'_>) -> Statement {
    let span = node.span();
    match node.kind() {
        NodeKind::IncludeStmt => Statement::Include {
            path: extract_include_path(node.text()).to_string(),
            span,
        },
        NodeKind::UseStmt => Statement::Use {
            path: extract_include_path(node.text()).to_string(),
            span,
        },
        NodeKind::Assignment => Statement::Assignment {
            name: name_of(node),
            expr: expr_child(node, 0),
            span,
        },
        NodeKind::ModuleDecl => Statement::ModuleDefinition {
            name: name_of(node),
            params: params(node),
            body: body(node.child_nodes().find(|child| is_statement_like(*child))),
            span,
        },
        NodeKind::FunctionDecl => Statement::FunctionDefinition {
            name: name_of(node),
            params: params(node),
            body: expr_child(node, 0),
            span,
        },
        NodeKind::ModuleInstantiation => module_instantiation(node),
        NodeKind::IfStmt => {
            let mut parts = node
                .child_nodes()
                .filter(|child| child.kind() != NodeKind::ElseClause);
            let condition = expr_or_error(parts.next(), span);
            let then_body = body(parts.next());
            let else_body = node
                .first_child_of(NodeKind::ElseClause)
                .map(|clause| body(clause.child_nodes().next()));
            Statement::IfElse {
                condition,
                then_body,
                else_body,
                span,
            }
        }
        NodeKind::ForStmt | NodeKind::IntersectionForStmt => Statement::For {
            assignments: bindings(node.first_child_of(NodeKind::BindingList)),
            body: body(node.child_nodes().find(|child| is_statement_like(*child))),
            intersection: node.kind() == NodeKind::IntersectionForStmt,
            span,
        },
        NodeKind::LetStmt => Statement::Let {
            assignments: bindings(node.first_child_of(NodeKind::BindingList)),
            body: body(node.child_nodes().find(|child| is_statement_like(*child))),
            span,
        },
        NodeKind::AssertStmt => Statement::Assert {
            args: arguments(node),
            children: body(node.child_nodes().find(|child| is_statement_like(*child))),
            span,
        },
        NodeKind::EchoStmt => Statement::Echo {
            args: arguments(node),
            children: body(node.child_nodes().find(|child| is_statement_like(*child))),
            span,
        },
        NodeKind::Block => Statement::Block {
            body: statements_in(node),
            span,
        },
        NodeKind::EmptyStmt => Statement::Empty { span },
        _ => Statement::Error { span },
    }
}

fn module_instantiation(node: SyntaxNode<'_>) -> Statement {
    let span = node.span();
    let modifiers = modifiers_of(node);
    let child = node.child_nodes().find(|child| is_statement_like(*child));
    if node.first_child_of(NodeKind::Name).is_some() {
        return Statement::ModuleInstantiation {
            name: name_of(node),
            args: arguments(node),
            children: body(child),
            modifiers,
            span,
        };
    }
    match child {
        Some(child) => Statement::Modified {
            modifiers,
            body: Box::new(statement(child)),
            span,
        },
        None => Statement::Error { span },
    }
}

fn params(node: SyntaxNode<'_>) -> Vec<Parameter> {
    node.first_child_of(NodeKind::ParamList)
        .into_iter()
        .flat_map(SyntaxNode::child_nodes)
        .filter(|child| child.kind() == NodeKind::Param)
        .map(|param| Parameter {
            name: name_of(param),
            default: param
                .child_nodes()
                .find(|child| is_expr_like(*child))
                .map(expr),
            span: param.span(),
        })
        .collect()
}

fn arguments(node: SyntaxNode<'_>) -> Vec<Argument> {
    node.first_child_of(NodeKind::ArgList)
        .into_iter()
        .flat_map(SyntaxNode::child_nodes)
        .filter(|child| child.kind() == NodeKind::Argument)
        .map(|arg| Argument {
            name: arg
                .first_child_of(NodeKind::Name)
                .map(|name| name.text().to_string()),
            value: expr_child(arg, 0),
            span: arg.span(),
        })
        .collect()
}

fn bindings(list: Option<SyntaxNode<'_>>) -> Vec<Argument> {
    list.into_iter()
        .flat_map(SyntaxNode::child_nodes)
        .filter(|child| child.kind() == NodeKind::Binding)
        .map(|binding| Argument {
            name: Some(name_of(binding)),
            value: expr_child(binding, 0),
            span: binding.span(),
        })
        .collect()
}

/// The `n`th expression child, or an error expression at the end of `node`.
fn expr_child(node: SyntaxNode<'_>, n: usize) -> Expr {
    expr_or_error(
        node.child_nodes().filter(|child| is_expr_like(*child)).nth(n),
        node.span(),
    )
}

fn expr_or_error(node: Option<SyntaxNode<'_>>, parent: Span) -> Expr {
    node.map_or_else(|| Expr::error(Span::empty(parent.end)), expr)
}

fn boxed(node: Option<SyntaxNode<'_>>, parent: Span) -> Box<Expr> {
    Box::new(expr_or_error(node, parent))
}

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Or => BinaryOp::LogicalOr,
        TokenKind::And => BinaryOp::LogicalAnd,
        TokenKind::EqualEqual => BinaryOp::Equal,
        TokenKind::NotEqual => BinaryOp::NotEqual,
        TokenKind::Less => BinaryOp::Less,
        TokenKind::LessEqual => BinaryOp::LessEqual,
        TokenKind::Greater => BinaryOp::Greater,
        TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
        TokenKind::Pipe => BinaryOp::BitwiseOr,
        TokenKind::Ampersand => BinaryOp::BitwiseAnd,
        TokenKind::ShiftLeft => BinaryOp::ShiftLeft,
        TokenKind::ShiftRight => BinaryOp::ShiftRight,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Subtract,
        TokenKind::Star => BinaryOp::Multiply,
        TokenKind::Slash => BinaryOp::Divide,
        TokenKind::Percent => BinaryOp::Modulo,
        TokenKind::Caret => BinaryOp::Exponent,
        _ => return None,
    })
}

/// Fold `a op b op c` into `((a op b) op c)`.
fn binary(node: SyntaxNode<'_>) -> Expr {
    let span = node.span();
    let mut operands = node.child_nodes().filter(|child| is_expr_like(*child));
    let mut left = expr_or_error(operands.next(), Span::empty(span.start));
    for (_, tok) in node.child_tokens() {
        let Some(op) = binary_op(tok.kind) else {
            continue;
        };
        let right = expr_or_error(operands.next(), span);
        let span = left.span.merge(right.span);
        left = Expr::new(
            ExprKind::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        );
    }
    left
}

fn unary(node: SyntaxNode<'_>) -> Expr {
    let span = node.span();
    let operand = expr_child(node, 0);
    let op = match node.child_tokens().next().map(|(_, tok)| tok.kind) {
        Some(TokenKind::Minus) => {
            // Fold negative number literals
            if let ExprKind::Number(n) = operand.kind {
                return Expr::new(ExprKind::Number(-n), span);
            }
            UnaryOp::Negate
        }
        Some(TokenKind::Bang) => UnaryOp::Not,
        Some(TokenKind::Tilde) => UnaryOp::BinaryNot,
        _ => UnaryOp::Plus,
    };
    Expr::new(
        ExprKind::UnaryOp {
            op,
            operand: Box::new(operand),
        },
        span,
    )
}

fn literal(node: SyntaxNode<'_>) -> ExprKind {
    let Some((_, tok)) = node.child_tokens().next() else {
        return ExprKind::Error;
    };
    let text = tok.text(node.tree().source());
    match tok.kind {
        TokenKind::Number => parse_number(text).map_or(ExprKind::Error, ExprKind::Number),
        TokenKind::String => {
            let inner = text.strip_prefix('"').unwrap_or(text);
            let inner = if tok.is_terminated(node.tree().source()) {
                inner.strip_suffix('"').unwrap_or(inner)
            } else {
                inner
            };
            ExprKind::String(unescape(inner))
        }
        TokenKind::True => ExprKind::BoolTrue,
        TokenKind::False => ExprKind::BoolFalse,
        TokenKind::Undef => ExprKind::Undef,
        _ => ExprKind::Error,
    }
}

/// Decimal or `0x` hexadecimal.
#[allow(clippy::cast_precision_loss)] // Hex values in OpenSCAD are inherently approximate as f64
#[must_use]
pub fn parse_number(text: &str) -> Option<f64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok().map(|n| n as f64),
        None => text.parse().ok(),
    }
}

/// Decode the escapes of a string literal body (quotes already removed).
#[must_use]
pub fn unescape(inner: &str) -> String {
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('\\') | None => result.push('\\'),
            Some('"') => result.push('"'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                if let Ok(val) = u32::from_str_radix(&hex, 16) {
                    if val == 0 {
                        result.push(' ');
                    } else if let Some(ch) = char::from_u32(val) {
                        result.push(ch);
                    }
                }
            }
            Some('u') => push_code_point(&mut result, &chars.by_ref().take(4).collect::<String>()),
            Some('U') => push_code_point(&mut result, &chars.by_ref().take(6).collect::<String>()),
            // Unknown escapes are kept verbatim
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
        }
    }
    result
}

fn push_code_point(out: &mut String, hex: &str) {
    if let Ok(val) = u32::from_str_radix(hex, 16)
        && let Some(ch) = char::from_u32(val)
    {
        out.push(ch);
    }
}

fn expr(node: SyntaxNode<'_>) -> Expr {
    let span = node.span();
    let mut parts = node.child_nodes().filter(|child| is_expr_like(*child));
    let kind = match node.kind() {
        kind if kind.is_binary() => return binary(node),
        NodeKind::Unary => return unary(node),
        NodeKind::ParenExpr => return expr_or_error(parts.next(), span),
        NodeKind::Literal => literal(node),
        NodeKind::NameRef => ExprKind::Identifier(node.text().to_string()),
        NodeKind::Conditional => ExprKind::Ternary {
            condition: boxed(parts.next(), span),
            then_expr: boxed(parts.next(), span),
            else_expr: boxed(parts.next(), span),
        },
        NodeKind::CallExpr => ExprKind::FunctionCall {
            callee: boxed(parts.next(), span),
            args: arguments(node),
        },
        NodeKind::IndexExpr => {
            let object = boxed(parts.next(), span);
            let colons = node
                .child_tokens()
                .filter(|(_, tok)| tok.kind == TokenKind::Colon)
                .count();
            match colons {
                0 => ExprKind::Index {
                    object,
                    index: boxed(parts.next(), span),
                },
                1 => ExprKind::Slice {
                    object,
                    start: boxed(parts.next(), span),
                    step: None,
                    end: boxed(parts.next(), span),
                },
                _ => ExprKind::Slice {
                    object,
                    start: boxed(parts.next(), span),
                    step: Some(boxed(parts.next(), span)),
                    end: boxed(parts.next(), span),
                },
            }
        }
        NodeKind::MemberExpr => ExprKind::MemberAccess {
            object: boxed(parts.next(), span),
            member: name_of(node),
        },
        NodeKind::VectorLiteral | NodeKind::ListComprehension => {
            ExprKind::Vector(parts.map(expr).collect())
        }
        NodeKind::RangeLiteral => {
            let items: Vec<_> = parts.collect();
            let start = boxed(items.first().copied(), span);
            if items.len() >= 3 {
                ExprKind::Range {
                    start,
                    step: Some(boxed(items.get(1).copied(), span)),
                    end: boxed(items.get(2).copied(), span),
                }
            } else {
                ExprKind::Range {
                    start,
                    step: None,
                    end: boxed(items.get(1).copied(), span),
                }
            }
        }
        NodeKind::LetExpr => ExprKind::Let {
            assignments: bindings(node.first_child_of(NodeKind::BindingList)),
            body: boxed(parts.next(), span),
        },
        NodeKind::FunctionLiteral => ExprKind::AnonymousFunction {
            params: params(node),
            body: boxed(parts.next(), span),
        },
        NodeKind::AssertExpr => ExprKind::Assert {
            args: arguments(node),
            body: parts.next().map(|body| Box::new(expr(body))),
        },
        NodeKind::EchoExpr => ExprKind::Echo {
            args: arguments(node),
            body: parts.next().map(|body| Box::new(expr(body))),
        },
        NodeKind::ForClause => {
            let mut lists = node
                .child_nodes()
                .filter(|child| child.kind() == NodeKind::BindingList);
            let init = bindings(lists.next());
            if node.first_token_of(TokenKind::Semicolon).is_some() {
                ExprKind::LcForC {
                    init,
                    condition: boxed(parts.next(), span),
                    update: bindings(lists.next()),
                    body: boxed(parts.next(), span),
                }
            } else {
                ExprKind::LcFor {
                    assignments: init,
                    body: boxed(parts.next(), span),
                }
            }
        }
        NodeKind::IfClause => ExprKind::LcIf {
            condition: boxed(parts.next(), span),
            then_expr: boxed(parts.next(), span),
            else_expr: node
                .first_child_of(NodeKind::ElseClause)
                .map(|clause| boxed(clause.child_nodes().next(), clause.span())),
        },
        NodeKind::LetClause => ExprKind::LcLet {
            assignments: bindings(node.first_child_of(NodeKind::BindingList)),
            body: boxed(parts.next(), span),
        },
        NodeKind::EachClause => ExprKind::LcEach {
            body: boxed(parts.next(), span),
        },
        _ => ExprKind::Error,
    };
    Expr::new(kind, span)
}
