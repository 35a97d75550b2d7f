//! Lossless syntax tree for `OpenSCAD` source.
//!
//! The tree is a flat arena: nodes live in one `Vec`, each owning an ordered
//! list of child elements (nodes or tokens). There are no parent pointers;
//! context queries such as "which declaration am I in" are answered top-down
//! by [`crate::walk`].
//!
//! The tree owns its source text and the full token vector. Tokens the
//! grammar consumes appear as leaves exactly once; whitespace and comments
//! are reachable through [`SyntaxTree::trivia`].

use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Every grammar production that can own children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    SourceFile,

    // ── Declarations ─────────────────────────────────────────
    ModuleDecl,
    FunctionDecl,

    // ── Statements ───────────────────────────────────────────
    Assignment,
    ModuleInstantiation,
    IfStmt,
    ForStmt,
    IntersectionForStmt,
    LetStmt,
    AssertStmt,
    EchoStmt,
    IncludeStmt,
    UseStmt,
    Block,
    EmptyStmt,

    // ── Expressions ──────────────────────────────────────────
    Conditional,
    LogicalOr,
    LogicalAnd,
    Equality,
    Relational,
    BitwiseOr,
    BitwiseAnd,
    Shift,
    Additive,
    Multiplicative,
    Power,
    Unary,
    CallExpr,
    IndexExpr,
    MemberExpr,
    Literal,
    NameRef,
    ParenExpr,
    VectorLiteral,
    RangeLiteral,
    ListComprehension,
    LetExpr,
    FunctionLiteral,
    AssertExpr,
    EchoExpr,

    // ── Generator clauses ────────────────────────────────────
    ForClause,
    IfClause,
    LetClause,
    EachClause,
    ElseClause,

    // ── Supporting ───────────────────────────────────────────
    /// A declared or referenced name: one identifier, or a number token
    /// immediately followed by an identifier (`2D`).
    Name,
    ParamList,
    Param,
    ArgList,
    Argument,
    BindingList,
    Binding,

    /// A range the parser could not make sense of.
    Error,
}

impl NodeKind {
    #[must_use]
    pub const fn is_declaration(self) -> bool {
        matches!(self, Self::ModuleDecl | Self::FunctionDecl)
    }

    #[must_use]
    pub const fn is_statement(self) -> bool {
        matches!(
            self,
            Self::ModuleDecl
                | Self::FunctionDecl
                | Self::Assignment
                | Self::ModuleInstantiation
                | Self::IfStmt
                | Self::ForStmt
                | Self::IntersectionForStmt
                | Self::LetStmt
                | Self::AssertStmt
                | Self::EchoStmt
                | Self::IncludeStmt
                | Self::UseStmt
                | Self::Block
                | Self::EmptyStmt
        )
    }

    /// Binary precedence levels; children alternate operand and operator.
    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(
            self,
            Self::LogicalOr
                | Self::LogicalAnd
                | Self::Equality
                | Self::Relational
                | Self::BitwiseOr
                | Self::BitwiseAnd
                | Self::Shift
                | Self::Additive
                | Self::Multiplicative
                | Self::Power
        )
    }

    #[must_use]
    pub const fn is_expression(self) -> bool {
        self.is_binary()
            || matches!(
                self,
                Self::Conditional
                    | Self::Unary
                    | Self::CallExpr
                    | Self::IndexExpr
                    | Self::MemberExpr
                    | Self::Literal
                    | Self::NameRef
                    | Self::ParenExpr
                    | Self::VectorLiteral
                    | Self::RangeLiteral
                    | Self::ListComprehension
                    | Self::LetExpr
                    | Self::FunctionLiteral
                    | Self::AssertExpr
                    | Self::EchoExpr
            )
    }

    #[must_use]
    pub const fn is_generator(self) -> bool {
        matches!(
            self,
            Self::ForClause | Self::IfClause | Self::LetClause | Self::EachClause
        )
    }
}

/// Index of a node in [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// Index of a token in [`SyntaxTree::tokens`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u32);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl TokenId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A child slot: either a nested node or a token leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Node(NodeId),
    Token(TokenId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeData {
    kind: NodeKind,
    span: Span,
    children: Vec<Element>,
}

/// The parsed tree plus the text and tokens it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    source: String,
    tokens: Vec<Token>,
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl SyntaxTree {
    #[must_use]
    pub fn root(&self) -> SyntaxNode<'_> {
        self.node(self.root)
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> SyntaxNode<'_> {
        SyntaxNode { tree: self, id }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every token of the input in source order, trivia and `Eof` included.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[must_use]
    pub fn token(&self, id: TokenId) -> Token {
        self.tokens[id.index()]
    }

    #[must_use]
    pub fn token_text(&self, id: TokenId) -> &str {
        self.tokens[id.index()].text(&self.source)
    }

    /// Whitespace and comment tokens, keyed by their offsets.
    pub fn trivia(&self) -> impl Iterator<Item = Token> + '_ {
        self.tokens.iter().copied().filter(|tok| tok.kind.is_trivia())
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }
}

/// A borrowed view of one node.
#[derive(Clone, Copy)]
pub struct SyntaxNode<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl<'t> SyntaxNode<'t> {
    #[must_use]
    pub const fn id(self) -> NodeId {
        self.id
    }

    #[must_use]
    pub const fn tree(self) -> &'t SyntaxTree {
        self.tree
    }

    #[must_use]
    pub fn kind(self) -> NodeKind {
        self.tree.data(self.id).kind
    }

    /// From the first to the last grammar token under this node. Empty
    /// nodes get a zero-length span where they were created.
    #[must_use]
    pub fn span(self) -> Span {
        self.tree.data(self.id).span
    }

    /// Source text covered by [`Self::span`], comments inside included.
    #[must_use]
    pub fn text(self) -> &'t str {
        let span = self.span();
        &self.tree.source[span.start..span.end]
    }

    #[must_use]
    pub fn children(self) -> &'t [Element] {
        &self.tree.data(self.id).children
    }

    pub fn child_nodes(self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        let tree = self.tree;
        self.children().iter().filter_map(move |child| match child {
            Element::Node(id) => Some(tree.node(*id)),
            Element::Token(_) => None,
        })
    }

    pub fn child_tokens(self) -> impl Iterator<Item = (TokenId, Token)> + 't {
        let tree = self.tree;
        self.children().iter().filter_map(move |child| match child {
            Element::Token(id) => Some((*id, tree.token(*id))),
            Element::Node(_) => None,
        })
    }

    /// First direct child node of `kind`.
    #[must_use]
    pub fn first_child_of(self, kind: NodeKind) -> Option<SyntaxNode<'t>> {
        self.child_nodes().find(|child| child.kind() == kind)
    }

    /// First direct child token of `kind`.
    #[must_use]
    pub fn first_token_of(self, kind: TokenKind) -> Option<Token> {
        self.child_tokens()
            .map(|(_, tok)| tok)
            .find(|tok| tok.kind == kind)
    }

    /// Whether this node or anything below it is an error range.
    #[must_use]
    pub fn contains_error(self) -> bool {
        self.kind() == NodeKind::Error || self.child_nodes().any(Self::contains_error)
    }

    /// Compact structural rendering: literals and names print as their
    /// text, everything else as `(Kind child...)` over child nodes.
    #[must_use]
    pub fn sexp(self) -> String {
        match self.kind() {
            NodeKind::Literal | NodeKind::NameRef | NodeKind::Name => self.text().to_string(),
            kind => {
                let mut out = format!("({kind:?}");
                for child in self.child_nodes() {
                    out.push(' ');
                    out.push_str(&child.sexp());
                }
                out.push(')');
                out
            }
        }
    }

    /// Every token leaf under this node, in source order.
    #[must_use]
    pub fn descendant_tokens(self) -> Vec<TokenId> {
        let mut out = Vec::new();
        self.collect_tokens(&mut out);
        out
    }

    fn collect_tokens(self, out: &mut Vec<TokenId>) {
        for child in self.children() {
            match child {
                Element::Token(id) => out.push(*id),
                Element::Node(id) => self.tree.node(*id).collect_tokens(out),
            }
        }
    }
}

impl PartialEq for SyntaxNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for SyntaxNode<'_> {}

impl std::fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}@{}..{}", self.kind(), self.span().start, self.span().end)
    }
}

/// Indented dump of the tree, one node or token per line.
impl std::fmt::Display for SyntaxNode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn go(
            node: SyntaxNode<'_>,
            depth: usize,
            f: &mut std::fmt::Formatter<'_>,
        ) -> std::fmt::Result {
            writeln!(f, "{:indent$}{:?}", "", node, indent = depth * 2)?;
            for child in node.children() {
                match child {
                    Element::Node(id) => go(node.tree.node(*id), depth + 1, f)?,
                    Element::Token(id) => {
                        let tok = node.tree.token(*id);
                        writeln!(
                            f,
                            "{:indent$}{:?} {:?}",
                            "",
                            tok.kind,
                            tok.text(&node.tree.source),
                            indent = (depth + 1) * 2
                        )?;
                    }
                }
            }
            Ok(())
        }
        go(*self, 0, f)
    }
}

/// Position in the open node's child list, used to wrap already-parsed
/// children into a new node after the fact.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint(usize);

struct OpenNode {
    kind: NodeKind,
    children: Vec<Element>,
    /// Offset used as the span of a node that ends up without tokens.
    offset: usize,
}

/// Builds a [`SyntaxTree`] bottom-up from start/token/finish calls.
pub(crate) struct TreeBuilder {
    source: String,
    tokens: Vec<Token>,
    nodes: Vec<NodeData>,
    open: Vec<OpenNode>,
}

impl TreeBuilder {
    pub(crate) fn new(source: &str, tokens: Vec<Token>) -> Self {
        Self {
            source: source.to_string(),
            tokens,
            nodes: Vec::new(),
            open: Vec::new(),
        }
    }

    pub(crate) fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub(crate) fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn start_node(&mut self, kind: NodeKind, offset: usize) {
        self.open.push(OpenNode {
            kind,
            children: Vec::new(),
            offset,
        });
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.open.last().map_or(0, |node| node.children.len()))
    }

    /// Open a node that adopts every child added since `checkpoint`.
    pub(crate) fn start_node_at(&mut self, checkpoint: Checkpoint, kind: NodeKind, offset: usize) {
        let children = self
            .open
            .last_mut()
            .map(|node| node.children.split_off(checkpoint.0.min(node.children.len())))
            .unwrap_or_default();
        self.open.push(OpenNode {
            kind,
            children,
            offset,
        });
    }

    pub(crate) fn token(&mut self, index: usize) {
        let id = TokenId(u32::try_from(index).unwrap_or(u32::MAX));
        if let Some(node) = self.open.last_mut() {
            node.children.push(Element::Token(id));
        }
    }

    pub(crate) fn finish_node(&mut self) {
        let Some(node) = self.open.pop() else {
            return;
        };
        let span = self.span_of(&node.children).unwrap_or(Span::empty(node.offset));
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(NodeData {
            kind: node.kind,
            span,
            children: node.children,
        });
        if let Some(parent) = self.open.last_mut() {
            parent.children.push(Element::Node(id));
        }
    }

    fn span_of(&self, children: &[Element]) -> Option<Span> {
        let first = children.iter().find_map(|child| self.element_span(*child))?;
        let last = children
            .iter()
            .rev()
            .find_map(|child| self.element_span(*child))?;
        Some(first.merge(last))
    }

    /// Span of a child, skipping empty nodes and the zero-length `Eof` so
    /// they do not stretch their parent.
    fn element_span(&self, element: Element) -> Option<Span> {
        match element {
            Element::Token(id) => {
                let tok = self.tokens[id.index()];
                (tok.kind != TokenKind::Eof).then_some(tok.span)
            }
            Element::Node(id) => {
                let span = self.nodes[id.index()].span;
                (!span.is_empty()).then_some(span)
            }
        }
    }

    /// Close any nodes left open and hand over the finished tree. The last
    /// finished node is the root.
    pub(crate) fn finish(mut self) -> SyntaxTree {
        while !self.open.is_empty() {
            self.finish_node();
        }
        if self.nodes.is_empty() {
            self.nodes.push(NodeData {
                kind: NodeKind::SourceFile,
                span: Span::empty(0),
                children: Vec::new(),
            });
        }
        let root = NodeId(u32::try_from(self.nodes.len() - 1).unwrap_or(u32::MAX));
        SyntaxTree {
            source: self.source,
            tokens: self.tokens,
            nodes: self.nodes,
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn build(source: &str) -> SyntaxTree {
        // SourceFile(Assignment(Name(x) = Literal(1) ;) Eof)
        let tokens = lex(source);
        let mut builder = TreeBuilder::new(source, tokens);
        builder.start_node(NodeKind::SourceFile, 0);
        builder.start_node(NodeKind::Assignment, 0);
        builder.start_node(NodeKind::Name, 0);
        builder.token(0);
        builder.finish_node();
        builder.token(2);
        let checkpoint = builder.checkpoint();
        builder.token(4);
        builder.start_node_at(checkpoint, NodeKind::Literal, 4);
        builder.finish_node();
        builder.token(5);
        builder.finish_node();
        builder.token(6);
        builder.finish()
    }

    #[test]
    fn test_builds_nested_nodes_with_spans() {
        let tree = build("x = 1;");
        let root = tree.root();
        assert_eq!(root.kind(), NodeKind::SourceFile);
        assert_eq!(root.span(), Span::new(0, 6));
        let assignment = root.first_child_of(NodeKind::Assignment).unwrap();
        assert_eq!(assignment.text(), "x = 1;");
        let literal = assignment.first_child_of(NodeKind::Literal).unwrap();
        assert_eq!(literal.text(), "1");
        assert_eq!(assignment.child_nodes().count(), 2);
    }

    #[test]
    fn test_descendant_tokens_are_in_order() {
        let tree = build("x = 1;");
        let ids: Vec<_> = tree.root().descendant_tokens();
        let texts: Vec<_> = ids.iter().map(|id| tree.token_text(*id)).collect();
        assert_eq!(texts, vec!["x", "=", "1", ";", ""]);
    }

    #[test]
    fn test_trivia_channel_holds_whitespace() {
        let tree = build("x = 1;");
        assert_eq!(tree.trivia().count(), 2);
    }

    #[test]
    fn test_empty_node_gets_zero_length_span() {
        let source = "x";
        let mut builder = TreeBuilder::new(source, lex(source));
        builder.start_node(NodeKind::SourceFile, 0);
        builder.start_node(NodeKind::Error, 1);
        builder.finish_node();
        builder.token(0);
        let tree = builder.finish();
        let error = tree.root().first_child_of(NodeKind::Error).unwrap();
        assert_eq!(error.span(), Span::empty(1));
        assert!(tree.root().contains_error());
        assert_eq!(tree.root().span(), Span::new(0, 1));
    }
}
