//! Recursive-descent parser for `OpenSCAD`.
//!
//! Consumes the token stream from the lexer and produces a [`SyntaxTree`]
//! plus diagnostics. Uses precedence climbing for expressions. The parser
//! never gives up: a missing token is reported without being consumed, and
//! a token that cannot start anything is wrapped in an `Error` node, so every
//! call returns a complete tree.
use crate::ast::SourceFile;
use crate::error::{Diagnostic, ParseErrors};
use crate::lexer;
use crate::lower;
use crate::span::Span;
use crate::syntax::{Checkpoint, NodeKind, SyntaxNode, SyntaxTree, TreeBuilder};
use crate::token::{Token, TokenKind};
use tracing::{debug, trace};

/// Nesting depth allowed before the parser stops descending.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Tunables for one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum nesting of statements, expressions and generator clauses.
    /// Deeper input is reported once and absorbed into an `Error` node.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseOptions {
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// The tree and the diagnostics of one parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    tree: SyntaxTree,
    diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    /// The `SourceFile` node.
    #[must_use]
    pub fn root(&self) -> SyntaxNode<'_> {
        self.tree.root()
    }

    #[must_use]
    pub const fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// Sorted by offset.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    #[must_use]
    pub fn into_parts(self) -> (SyntaxTree, Vec<Diagnostic>) {
        (self.tree, self.diagnostics)
    }

    /// Lower the tree into the typed AST.
    #[must_use]
    pub fn to_ast(&self) -> SourceFile {
        lower::lower(&self.tree)
    }

    /// `Err` with every error diagnostic when the source had any.
    ///
    /// # Errors
    /// Returns [`ParseErrors`] if at least one error diagnostic was recorded.
    pub fn into_result(self) -> Result<Self, ParseErrors> {
        if self.has_errors() {
            Err(ParseErrors {
                diagnostics: self
                    .diagnostics
                    .into_iter()
                    .filter(Diagnostic::is_error)
                    .collect(),
            })
        } else {
            Ok(self)
        }
    }
}

/// Parse `OpenSCAD` source text with default options.
#[must_use]
pub fn parse(source: &str) -> ParseResult {
    parse_with(source, &ParseOptions::default())
}

/// Parse `OpenSCAD` source text.
#[must_use]
pub fn parse_with(source: &str, options: &ParseOptions) -> ParseResult {
    debug!(bytes = source.len(), "parsing OpenSCAD source");
    let tokens = lexer::lex(source);
    let mut parser = Parser::new(source, tokens, options);
    parser.source_file();
    let result = parser.finish();
    debug!(
        tokens = result.tree.tokens().len(),
        nodes = result.tree.node_count(),
        diagnostics = result.diagnostics.len(),
        "parsed OpenSCAD source"
    );
    result
}

/// Checkpoint plus the offset to use if the wrapped node ends up empty.
#[derive(Clone, Copy)]
struct Mark {
    checkpoint: Checkpoint,
    offset: usize,
}

/// Tokens at which list and expression recovery stop skipping.
const RECOVERY: &[TokenKind] = &[
    TokenKind::Semicolon,
    TokenKind::LBrace,
    TokenKind::RBrace,
    TokenKind::Module,
    TokenKind::Include,
    TokenKind::Use,
    TokenKind::Eof,
];

struct Parser {
    builder: TreeBuilder,
    /// Indices of the non-trivia tokens; the last one is always `Eof`.
    significant: Vec<usize>,
    pos: usize,
    depth: usize,
    max_depth: usize,
    depth_exceeded: bool,
    diagnostics: Vec<Diagnostic>,
    last_error_offset: Option<usize>,
}

impl Parser {
    fn new(source: &str, tokens: Vec<Token>, options: &ParseOptions) -> Self {
        let significant = tokens
            .iter()
            .enumerate()
            .filter(|(_, tok)| !tok.kind.is_trivia())
            .map(|(index, _)| index)
            .collect();
        Self {
            builder: TreeBuilder::new(source, tokens),
            significant,
            pos: 0,
            depth: 0,
            max_depth: options.max_depth,
            depth_exceeded: false,
            diagnostics: Vec::new(),
            last_error_offset: None,
        }
    }

    fn finish(mut self) -> ParseResult {
        let source = self.builder.source();
        let unterminated: Vec<Span> = self
            .builder
            .tokens()
            .iter()
            .filter(|tok| tok.kind == TokenKind::BlockComment && !tok.is_terminated(source))
            .map(|tok| tok.span)
            .collect();
        for span in unterminated {
            self.diagnostics
                .push(Diagnostic::error("unterminated block comment", span));
        }
        self.diagnostics.sort_by_key(Diagnostic::offset);
        ParseResult {
            tree: self.builder.finish(),
            diagnostics: self.diagnostics,
        }
    }

    // ── Helpers ──────────────────────────────────────────────

    fn nth_token(&self, n: usize) -> Token {
        let last = self.significant.len().saturating_sub(1);
        let index = self.significant[(self.pos + n).min(last)];
        self.builder.tokens()[index]
    }

    fn current(&self) -> Token {
        self.nth_token(0)
    }

    fn nth(&self, n: usize) -> TokenKind {
        self.nth_token(n).kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.nth(0) == kind
    }

    fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.nth(0))
    }

    fn at_eof(&self) -> bool {
        self.at(TokenKind::Eof)
    }

    fn offset(&self) -> usize {
        self.current().span.start
    }

    fn bump(&mut self) {
        if self.at_eof() {
            return;
        }
        let tok = self.current();
        match tok.kind {
            TokenKind::Unknown => {
                let message = format!(
                    "unrecognized character `{}`",
                    tok.text(self.builder.source())
                );
                self.error_at(tok.span, message);
            }
            TokenKind::String if !tok.is_terminated(self.builder.source()) => {
                self.error_at(tok.span, "unterminated string literal");
            }
            _ => {}
        }
        self.builder.token(self.significant[self.pos]);
        self.pos += 1;
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume `kind` or report it missing without consuming anything.
    fn expect(&mut self, kind: TokenKind) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error_expected(&kind.to_string());
            false
        }
    }

    fn error_expected(&mut self, expected: &str) {
        let tok = self.current();
        if tok.kind == TokenKind::Unknown {
            let message = format!(
                "unrecognized character `{}`",
                tok.text(self.builder.source())
            );
            self.error_at(tok.span, message);
            return;
        }
        let found = match tok.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::String => "string".to_string(),
            _ => format!("`{}`", tok.text(self.builder.source())),
        };
        self.error_at(tok.span, format!("expected {expected}, found {found}"));
    }

    /// Record an error unless one was already recorded at this offset.
    fn error_at(&mut self, span: Span, message: impl Into<String>) {
        if self.last_error_offset == Some(span.start) {
            return;
        }
        let message = message.into();
        trace!(offset = span.start, %message, "syntax error");
        self.last_error_offset = Some(span.start);
        self.diagnostics.push(Diagnostic::error(message, span));
    }

    fn start(&mut self, kind: NodeKind) {
        let offset = self.offset();
        self.builder.start_node(kind, offset);
    }

    fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    fn mark(&self) -> Mark {
        Mark {
            checkpoint: self.builder.checkpoint(),
            offset: self.offset(),
        }
    }

    fn start_at(&mut self, mark: Mark, kind: NodeKind) {
        self.builder.start_node_at(mark.checkpoint, kind, mark.offset);
    }

    /// Wrap the current token in an `Error` node.
    fn bump_error(&mut self) {
        self.start(NodeKind::Error);
        self.bump();
        self.finish_node();
    }

    /// Skip tokens into one `Error` node until a list separator, one of
    /// `close`, or a recovery token.
    fn skip_until(&mut self, close: &[TokenKind]) {
        self.skip_junk(close, true);
    }

    fn skip_junk(&mut self, close: &[TokenKind], stop_at_comma: bool) {
        let at_stop = |p: &Self| {
            (stop_at_comma && p.at(TokenKind::Comma)) || p.at_any(close) || p.at_any(RECOVERY)
        };
        if at_stop(self) {
            return;
        }
        trace!(offset = self.offset(), "skipping to list boundary");
        self.start(NodeKind::Error);
        while !at_stop(self) {
            self.bump();
        }
        self.finish_node();
    }

    /// `]` closing a range or an index. Junk before it stays inside the
    /// bracketed node.
    fn close_bracket(&mut self) {
        if self.expect(TokenKind::RBracket) {
            return;
        }
        self.skip_junk(&[TokenKind::RBracket], false);
        self.eat(TokenKind::RBracket);
    }

    fn enter(&mut self) -> bool {
        self.depth += 1;
        if self.depth <= self.max_depth {
            return true;
        }
        if !self.depth_exceeded {
            self.depth_exceeded = true;
            let span = self.current().span;
            self.error_at(span, "maximum nesting depth exceeded");
            self.start(NodeKind::Error);
            while !self.at_eof() {
                self.bump();
            }
            self.finish_node();
        }
        false
    }

    const fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Number of tokens making up a name here: an identifier, or a run of
    /// digits immediately followed by an identifier (`2D`). `2.5mm` and
    /// `0xFFg` are not names.
    fn name_len(&self) -> Option<usize> {
        match self.nth(0) {
            TokenKind::Ident => Some(1),
            TokenKind::Number
                if self.nth(1) == TokenKind::Ident
                    && self.nth_token(0).span.end == self.nth_token(1).span.start
                    && self
                        .nth_token(0)
                        .text(self.builder.source())
                        .bytes()
                        .all(|b| b.is_ascii_digit()) =>
            {
                Some(2)
            }
            _ => None,
        }
    }

    fn at_name(&self) -> bool {
        self.name_len().is_some()
    }

    /// `name =` ahead, for assignments and named arguments.
    fn at_named_assign(&self) -> bool {
        self.name_len()
            .is_some_and(|len| self.nth(len) == TokenKind::Assign)
    }

    fn name(&mut self) {
        let Some(len) = self.name_len() else {
            self.error_expected("name");
            return;
        };
        self.start(NodeKind::Name);
        for _ in 0..len {
            self.bump();
        }
        self.finish_node();
    }

    // ── File-level ───────────────────────────────────────────

    fn source_file(&mut self) {
        self.start(NodeKind::SourceFile);
        self.statements_until(None);
        // Attach `Eof` so the root owns every grammar token.
        if let Some(&eof) = self.significant.last() {
            self.builder.token(eof);
        }
        self.finish_node();
    }

    fn statements_until(&mut self, close: Option<TokenKind>) {
        while !self.at_eof() && close.is_none_or(|kind| !self.at(kind)) {
            let before = self.pos;
            self.statement();
            if self.pos == before {
                self.recover_statement();
            }
        }
    }

    /// Nothing here starts a statement: report and step over one token.
    fn recover_statement(&mut self) {
        if !self.at(TokenKind::Unknown) {
            self.error_expected("statement");
        }
        if !self.at_eof() {
            self.bump_error();
        }
    }

    // ── Statements ───────────────────────────────────────────

    fn statement(&mut self) {
        if self.enter() {
            self.statement_inner();
        }
        self.leave();
    }

    fn statement_inner(&mut self) {
        match self.nth(0) {
            TokenKind::Semicolon => {
                self.start(NodeKind::EmptyStmt);
                self.bump();
                self.finish_node();
            }
            TokenKind::LBrace => self.block(),
            TokenKind::Include => self.single_token_statement(NodeKind::IncludeStmt),
            TokenKind::Use => self.single_token_statement(NodeKind::UseStmt),
            TokenKind::Module => self.module_decl(),
            TokenKind::Function => self.function_decl(),
            TokenKind::If => self.if_stmt(),
            TokenKind::For => self.for_stmt(NodeKind::ForStmt),
            TokenKind::IntersectionFor => self.for_stmt(NodeKind::IntersectionForStmt),
            TokenKind::Let => self.let_stmt(),
            TokenKind::Assert => self.call_like_stmt(NodeKind::AssertStmt),
            TokenKind::Echo => self.call_like_stmt(NodeKind::EchoStmt),
            _ if self.at_named_assign() => self.assignment(),
            kind if self.at_name() || kind.is_modifier() => self.module_instantiation(),
            _ => self.recover_statement(),
        }
    }

    fn single_token_statement(&mut self, kind: NodeKind) {
        self.start(kind);
        self.bump();
        self.finish_node();
    }

    /// `{ statement* }`
    fn block(&mut self) {
        self.start(NodeKind::Block);
        self.expect(TokenKind::LBrace);
        self.statements_until(Some(TokenKind::RBrace));
        self.expect(TokenKind::RBrace);
        self.finish_node();
    }

    /// A block when `{` follows, otherwise exactly one statement.
    fn body(&mut self) {
        if self.at(TokenKind::LBrace) {
            self.block();
        } else {
            self.statement();
        }
    }

    /// `name "=" expr ";"`
    fn assignment(&mut self) {
        self.start(NodeKind::Assignment);
        self.name();
        self.expect(TokenKind::Assign);
        self.expr();
        self.expect(TokenKind::Semicolon);
        self.finish_node();
    }

    /// `"module" name param_list body`
    fn module_decl(&mut self) {
        self.start(NodeKind::ModuleDecl);
        self.bump();
        if self.at_name() {
            self.name();
        } else {
            self.error_expected("module name");
        }
        self.param_list();
        self.body();
        self.finish_node();
    }

    /// `"function" name param_list "=" expr ";"`
    fn function_decl(&mut self) {
        self.start(NodeKind::FunctionDecl);
        self.bump();
        if self.at_name() {
            self.name();
        } else {
            self.error_expected("function name");
        }
        self.param_list();
        self.expect(TokenKind::Assign);
        self.expr();
        self.expect(TokenKind::Semicolon);
        self.finish_node();
    }

    /// `"if" "(" expr ")" body ["else" body]`
    fn if_stmt(&mut self) {
        self.start(NodeKind::IfStmt);
        self.bump();
        self.expect(TokenKind::LParen);
        self.expr();
        self.expect(TokenKind::RParen);
        self.body();
        if self.at(TokenKind::Else) {
            self.start(NodeKind::ElseClause);
            self.bump();
            self.body();
            self.finish_node();
        }
        self.finish_node();
    }

    /// `("for" | "intersection_for") "(" bindings ")" body`
    fn for_stmt(&mut self, kind: NodeKind) {
        self.start(kind);
        self.bump();
        self.expect(TokenKind::LParen);
        self.binding_list(&[TokenKind::RParen]);
        self.expect(TokenKind::RParen);
        self.body();
        self.finish_node();
    }

    /// `"let" "(" bindings ")" body`
    fn let_stmt(&mut self) {
        self.start(NodeKind::LetStmt);
        self.bump();
        self.expect(TokenKind::LParen);
        self.binding_list(&[TokenKind::RParen]);
        self.expect(TokenKind::RParen);
        self.body();
        self.finish_node();
    }

    /// `("assert" | "echo") arg_list child`
    fn call_like_stmt(&mut self, kind: NodeKind) {
        self.start(kind);
        self.bump();
        self.arg_list();
        self.child();
        self.finish_node();
    }

    /// `modifier* (name arg_list child | name ";" | block | control statement)`
    fn module_instantiation(&mut self) {
        self.start(NodeKind::ModuleInstantiation);
        let mut modified = false;
        while self.nth(0).is_modifier() {
            self.bump();
            modified = true;
        }
        match self.nth(0) {
            _ if self.at_name() => {
                self.name();
                // `x;` is a call without arguments.
                if self.at(TokenKind::Semicolon) {
                    self.bump();
                } else {
                    self.arg_list();
                    self.child();
                }
            }
            TokenKind::LBrace => self.block(),
            TokenKind::If
            | TokenKind::For
            | TokenKind::IntersectionFor
            | TokenKind::Let
            | TokenKind::Assert
            | TokenKind::Echo
                if modified =>
            {
                self.statement();
            }
            _ => self.error_expected("module instantiation"),
        }
        self.finish_node();
    }

    /// What may follow a call: `;`, a block of children, or one chained
    /// statement with no separator (`translate(v) rotate(a) cube(1);`).
    fn child(&mut self) {
        match self.nth(0) {
            TokenKind::Semicolon => self.bump(),
            TokenKind::LBrace => self.block(),
            _ if self.at_child_start() => self.statement(),
            _ => self.error_expected("`;`"),
        }
    }

    /// A statement that can be a child of a call. Assignments and
    /// declarations cannot.
    fn at_child_start(&self) -> bool {
        let kind = self.nth(0);
        kind.is_modifier()
            || matches!(
                kind,
                TokenKind::If
                    | TokenKind::For
                    | TokenKind::IntersectionFor
                    | TokenKind::Let
                    | TokenKind::Assert
                    | TokenKind::Echo
            )
            || (self.at_name() && !self.at_named_assign())
    }

    // ── Parameters, arguments, bindings ──────────────────────

    /// Comma-separated items until one of `close`; a trailing comma is
    /// accepted.
    fn list_items(&mut self, close: &[TokenKind], item: fn(&mut Self)) {
        while !self.at_any(close) && !self.at_eof() {
            item(self);
            if !self.list_separator(close) {
                break;
            }
        }
    }

    /// After an item: consume `,` and report whether another item may
    /// follow. Junk before the next separator is skipped into an error node.
    fn list_separator(&mut self, close: &[TokenKind]) -> bool {
        if self.eat(TokenKind::Comma) {
            return true;
        }
        if self.at_any(close) || self.at_eof() {
            return false;
        }
        let closing = close.first().map_or_else(String::new, |kind| format!(" or {kind}"));
        self.error_expected(&format!("`,`{closing}"));
        self.skip_until(close);
        self.eat(TokenKind::Comma)
    }

    /// `"(" [param ("," param)* [","]] ")"`
    fn param_list(&mut self) {
        self.start(NodeKind::ParamList);
        if self.expect(TokenKind::LParen) {
            self.list_items(&[TokenKind::RParen], Self::param);
            self.expect(TokenKind::RParen);
        }
        self.finish_node();
    }

    /// `name ["=" expr]`
    fn param(&mut self) {
        if !self.at_name() {
            self.error_expected("parameter name");
            self.skip_until(&[TokenKind::RParen]);
            return;
        }
        self.start(NodeKind::Param);
        self.name();
        if self.eat(TokenKind::Assign) {
            self.expr();
        }
        self.finish_node();
    }

    /// `"(" [argument ("," argument)* [","]] ")"`
    fn arg_list(&mut self) {
        self.start(NodeKind::ArgList);
        if self.expect(TokenKind::LParen) {
            self.list_items(&[TokenKind::RParen], Self::argument);
            self.expect(TokenKind::RParen);
        }
        self.finish_node();
    }

    /// `[name "="] expr`
    fn argument(&mut self) {
        self.start(NodeKind::Argument);
        if self.at_named_assign() {
            self.name();
            self.bump();
        }
        self.expr();
        self.finish_node();
    }

    /// `[binding ("," binding)* [","]]`, stopping before any of `close`.
    fn binding_list(&mut self, close: &[TokenKind]) {
        self.start(NodeKind::BindingList);
        self.list_items(close, Self::binding);
        self.finish_node();
    }

    /// `name "=" expr`
    fn binding(&mut self) {
        if !self.at_name() {
            self.error_expected("name");
            self.skip_until(&[TokenKind::RParen, TokenKind::Semicolon]);
            return;
        }
        self.start(NodeKind::Binding);
        self.name();
        if self.expect(TokenKind::Assign) || self.nth(0).can_start_expression() {
            self.expr();
        }
        self.finish_node();
    }

    // ── Expressions (precedence climbing) ────────────────────

    fn expr(&mut self) {
        if self.enter() {
            self.conditional();
        }
        self.leave();
    }

    // Precedence levels (lowest to highest):
    // 1. conditional `?:` (right-associative)
    // 2. logical or
    // 3. logical and
    // 4. equality
    // 5. relational
    // 6. bitwise or
    // 7. bitwise and
    // 8. shift
    // 9. additive
    // 10. multiplicative
    // 11. power
    // 12. unary prefix
    // 13. postfix (call, index/slice, member)
    // 14. primary

    fn conditional(&mut self) {
        let mark = self.mark();
        self.logical_or();
        if self.at(TokenKind::Question) {
            self.start_at(mark, NodeKind::Conditional);
            self.bump();
            self.expr();
            self.expect(TokenKind::Colon);
            self.expr();
            self.finish_node();
        }
    }

    /// One left-associative level: operands from `next`, and a single flat
    /// node for the whole run only if an operator was consumed.
    fn binary(&mut self, kind: NodeKind, ops: &[TokenKind], next: fn(&mut Self)) {
        let mark = self.mark();
        next(self);
        if !self.at_any(ops) {
            return;
        }
        self.start_at(mark, kind);
        while self.at_any(ops) {
            self.bump();
            next(self);
        }
        self.finish_node();
    }

    fn logical_or(&mut self) {
        self.binary(NodeKind::LogicalOr, &[TokenKind::Or], Self::logical_and);
    }

    fn logical_and(&mut self) {
        self.binary(NodeKind::LogicalAnd, &[TokenKind::And], Self::equality);
    }

    fn equality(&mut self) {
        self.binary(
            NodeKind::Equality,
            &[TokenKind::EqualEqual, TokenKind::NotEqual],
            Self::relational,
        );
    }

    fn relational(&mut self) {
        self.binary(
            NodeKind::Relational,
            &[
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
            ],
            Self::bitwise_or,
        );
    }

    fn bitwise_or(&mut self) {
        self.binary(NodeKind::BitwiseOr, &[TokenKind::Pipe], Self::bitwise_and);
    }

    fn bitwise_and(&mut self) {
        self.binary(NodeKind::BitwiseAnd, &[TokenKind::Ampersand], Self::shift);
    }

    fn shift(&mut self) {
        self.binary(
            NodeKind::Shift,
            &[TokenKind::ShiftLeft, TokenKind::ShiftRight],
            Self::additive,
        );
    }

    fn additive(&mut self) {
        self.binary(
            NodeKind::Additive,
            &[TokenKind::Plus, TokenKind::Minus],
            Self::multiplicative,
        );
    }

    fn multiplicative(&mut self) {
        self.binary(
            NodeKind::Multiplicative,
            &[TokenKind::Star, TokenKind::Slash, TokenKind::Percent],
            Self::power,
        );
    }

    fn power(&mut self) {
        self.binary(NodeKind::Power, &[TokenKind::Caret], Self::unary);
    }

    fn unary(&mut self) {
        if !self.at_any(&[
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Bang,
            TokenKind::Tilde,
        ]) {
            self.postfix();
            return;
        }
        if self.enter() {
            self.start(NodeKind::Unary);
            self.bump();
            self.unary();
            self.finish_node();
        }
        self.leave();
    }

    fn postfix(&mut self) {
        let mark = self.mark();
        self.primary();
        loop {
            match self.nth(0) {
                TokenKind::LParen => {
                    self.start_at(mark, NodeKind::CallExpr);
                    self.arg_list();
                    self.finish_node();
                }
                // `[i]`, `[start:end]`, `[start:step:end]`
                TokenKind::LBracket => {
                    self.start_at(mark, NodeKind::IndexExpr);
                    self.bump();
                    self.expr();
                    if self.eat(TokenKind::Colon) {
                        self.expr();
                        if self.eat(TokenKind::Colon) {
                            self.expr();
                        }
                    }
                    self.close_bracket();
                    self.finish_node();
                }
                TokenKind::Dot => {
                    self.start_at(mark, NodeKind::MemberExpr);
                    self.bump();
                    if self.at(TokenKind::Ident) {
                        self.start(NodeKind::Name);
                        self.bump();
                        self.finish_node();
                    } else {
                        self.error_expected("member name");
                    }
                    self.finish_node();
                }
                _ => break,
            }
        }
    }

    fn primary(&mut self) {
        match self.nth(0) {
            TokenKind::Number if self.at_name() => {
                self.start(NodeKind::NameRef);
                self.bump();
                self.bump();
                self.finish_node();
            }
            TokenKind::Number
            | TokenKind::String
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Undef => {
                self.start(NodeKind::Literal);
                self.bump();
                self.finish_node();
            }
            TokenKind::Ident => {
                self.start(NodeKind::NameRef);
                self.bump();
                self.finish_node();
            }
            TokenKind::LParen => {
                self.start(NodeKind::ParenExpr);
                self.bump();
                self.expr();
                self.expect(TokenKind::RParen);
                self.finish_node();
            }
            TokenKind::LBracket => self.bracketed(),
            TokenKind::Let => self.let_expr(),
            TokenKind::Function => self.function_literal(),
            TokenKind::Assert => self.prefixed_expr(NodeKind::AssertExpr),
            TokenKind::Echo => self.prefixed_expr(NodeKind::EchoExpr),
            TokenKind::Unknown => self.bump_error(),
            _ => {
                self.error_expected("expression");
                if !self.at_any(&[
                    TokenKind::Comma,
                    TokenKind::Colon,
                    TokenKind::RParen,
                    TokenKind::RBracket,
                    TokenKind::Else,
                ]) && !self.at_any(RECOVERY)
                {
                    self.bump_error();
                } else {
                    // Zero-width marker where the expression is missing.
                    self.start(NodeKind::Error);
                    self.finish_node();
                }
            }
        }
    }

    /// `"let" "(" bindings ")" expr`
    fn let_expr(&mut self) {
        self.start(NodeKind::LetExpr);
        self.bump();
        self.expect(TokenKind::LParen);
        self.binding_list(&[TokenKind::RParen]);
        self.expect(TokenKind::RParen);
        self.expr();
        self.finish_node();
    }

    /// `"function" param_list expr`
    fn function_literal(&mut self) {
        self.start(NodeKind::FunctionLiteral);
        self.bump();
        self.param_list();
        self.expr();
        self.finish_node();
    }

    /// `("assert" | "echo") arg_list [expr]`; the trailing expression is
    /// the value produced and is parsed whenever one can start here.
    fn prefixed_expr(&mut self, kind: NodeKind) {
        self.start(kind);
        self.bump();
        self.arg_list();
        if self.nth(0).can_start_expression() {
            self.expr();
        }
        self.finish_node();
    }

    // ── Vectors, ranges, comprehensions ──────────────────────

    /// `[` starts an empty vector, a comprehension (`for`/`let` first), a
    /// range (`:` after the first element), or a vector.
    fn bracketed(&mut self) {
        if self.nth(1) == TokenKind::RBracket {
            self.start(NodeKind::VectorLiteral);
            self.bump();
            self.bump();
            self.finish_node();
            return;
        }
        if matches!(self.nth(1), TokenKind::For | TokenKind::Let) {
            self.start(NodeKind::ListComprehension);
            self.bump();
            self.vector_element();
            if self.list_separator(&[TokenKind::RBracket]) {
                self.list_items(&[TokenKind::RBracket], Self::vector_element);
            }
            self.expect(TokenKind::RBracket);
            self.finish_node();
            return;
        }
        let mark = self.mark();
        self.bump();
        self.vector_element();
        if self.at(TokenKind::Colon) {
            self.start_at(mark, NodeKind::RangeLiteral);
            self.bump();
            self.expr();
            if self.eat(TokenKind::Colon) {
                self.expr();
            }
            self.close_bracket();
        } else {
            self.start_at(mark, NodeKind::VectorLiteral);
            if self.list_separator(&[TokenKind::RBracket]) {
                self.list_items(&[TokenKind::RBracket], Self::vector_element);
            }
            self.expect(TokenKind::RBracket);
        }
        self.finish_node();
    }

    /// An expression, or a generator clause whose body is again a vector
    /// element, so clauses chain (`for` inside `if` inside `each`).
    fn vector_element(&mut self) {
        if !self.enter() {
            self.leave();
            return;
        }
        match self.nth(0) {
            TokenKind::For => self.for_clause(),
            TokenKind::If => self.if_clause(),
            TokenKind::Let => self.let_clause(),
            TokenKind::Each => {
                self.start(NodeKind::EachClause);
                self.bump();
                self.vector_element();
                self.finish_node();
            }
            TokenKind::LParen
                if matches!(
                    self.nth(1),
                    TokenKind::For | TokenKind::If | TokenKind::Each
                ) =>
            {
                self.start(NodeKind::ParenExpr);
                self.bump();
                self.vector_element();
                self.expect(TokenKind::RParen);
                self.finish_node();
            }
            _ => self.expr(),
        }
        self.leave();
    }

    /// `"for" "(" bindings [";" expr ";" bindings] ")" element`
    fn for_clause(&mut self) {
        self.start(NodeKind::ForClause);
        self.bump();
        self.expect(TokenKind::LParen);
        self.binding_list(&[TokenKind::RParen, TokenKind::Semicolon]);
        if self.eat(TokenKind::Semicolon) {
            self.expr();
            self.expect(TokenKind::Semicolon);
            self.binding_list(&[TokenKind::RParen]);
        }
        self.expect(TokenKind::RParen);
        self.vector_element();
        self.finish_node();
    }

    /// `"if" "(" expr ")" element ["else" element]`
    fn if_clause(&mut self) {
        self.start(NodeKind::IfClause);
        self.bump();
        self.expect(TokenKind::LParen);
        self.expr();
        self.expect(TokenKind::RParen);
        self.vector_element();
        if self.at(TokenKind::Else) {
            self.start(NodeKind::ElseClause);
            self.bump();
            self.vector_element();
            self.finish_node();
        }
        self.finish_node();
    }

    /// `"let" "(" bindings ")" element`
    fn let_clause(&mut self) {
        self.start(NodeKind::LetClause);
        self.bump();
        self.expect(TokenKind::LParen);
        self.binding_list(&[TokenKind::RParen]);
        self.expect(TokenKind::RParen);
        self.vector_element();
        self.finish_node();
    }
}
