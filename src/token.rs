//! Token kinds for the `OpenSCAD` lexer.
//!
//! Matches the lexical grammar of the official `OpenSCAD` `lexer.l`, extended
//! with trivia kinds (whitespace, comments) so the token stream tiles the
//! whole input, and with `Unknown`/`Eof` so the lexer never has to fail.
use crate::span::Span;
use logos::Logos;

#[allow(clippy::needless_pass_by_ref_mut)] // Required by logos callback signature
fn lex_string(lex: &mut logos::Lexer<'_, TokenKind>) -> bool {
    // The opening quote is already consumed. Stop after the closing quote, or
    // just before the line break when the string is unterminated.
    let rest = lex.remainder().as_bytes();
    let mut len = 0;
    while len < rest.len() {
        match rest[len] {
            b'"' => {
                lex.bump(len + 1);
                return true;
            }
            b'\n' | b'\r' => break,
            b'\\' if len + 1 < rest.len() && !matches!(rest[len + 1], b'\n' | b'\r') => len += 2,
            _ => len += 1,
        }
    }
    lex.bump(len);
    true
}

#[allow(clippy::needless_pass_by_ref_mut)] // Required by logos callback signature
fn lex_block_comment(lex: &mut logos::Lexer<'_, TokenKind>) -> bool {
    let rest = lex.remainder();
    let len = rest.find("*/").map_or(rest.len(), |end| end + 2);
    lex.bump(len);
    true
}

/// All token kinds of the `OpenSCAD` language.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // ── Trivia ───────────────────────────────────────────────
    #[regex(r"[ \t\r\n\x0c]+")]
    Whitespace,
    #[regex(r"//[^\n]*")]
    LineComment,
    #[token("/*", lex_block_comment)]
    BlockComment,

    // ── Keywords ──────────────────────────────────────────────
    #[token("module")]
    Module,
    #[token("function")]
    Function,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("intersection_for")]
    IntersectionFor,
    #[token("let")]
    Let,
    #[token("assert")]
    Assert,
    #[token("echo")]
    Echo,
    #[token("each")]
    Each,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("undef")]
    Undef,

    // ── Include / Use ────────────────────────────────────────
    #[regex(r"include[ \t\r\n]*<[^>\n]*>")]
    Include,
    #[regex(r"use[ \t\r\n]*<[^>\n]*>")]
    Use,

    // ── Literals ─────────────────────────────────────────────
    // A number directly followed by letters (`2D`) lexes as Number + Ident;
    // the parser stitches the pair back into one name.
    #[regex(r"0x[0-9a-fA-F]+")]
    #[regex(r"[0-9]+\.?[0-9]*([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
    Number,

    #[token("\"", lex_string)]
    String,

    // ── Identifiers ──────────────────────────────────────────
    #[regex(r"\$?[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    // ── Multi-char operators ─────────────────────────────────
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("==")]
    EqualEqual,
    #[token("!=")]
    NotEqual,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("<<")]
    ShiftLeft,
    #[token(">>")]
    ShiftRight,

    // ── Single-char operators & delimiters ────────────────────
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("=")]
    Assign,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("#")]
    Hash,
    #[token("&")]
    Ampersand,
    #[token("|")]
    Pipe,

    // ── Synthetic ────────────────────────────────────────────
    /// A single character no rule matches.
    Unknown,
    /// Zero-length marker after the last byte of input.
    Eof,
}

impl TokenKind {
    /// Whitespace and comments: kept for exact source reconstruction but
    /// never consulted by the grammar.
    #[must_use]
    pub const fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::LineComment | Self::BlockComment)
    }

    #[must_use]
    pub const fn is_keyword(self) -> bool {
        matches!(
            self,
            Self::Module
                | Self::Function
                | Self::If
                | Self::Else
                | Self::For
                | Self::IntersectionFor
                | Self::Let
                | Self::Assert
                | Self::Echo
                | Self::Each
                | Self::True
                | Self::False
                | Self::Undef
        )
    }

    /// `!`, `#`, `%`, `*` in statement position.
    #[must_use]
    pub const fn is_modifier(self) -> bool {
        matches!(self, Self::Bang | Self::Hash | Self::Percent | Self::Star)
    }

    #[must_use]
    pub const fn is_literal(self) -> bool {
        matches!(
            self,
            Self::Number | Self::String | Self::True | Self::False | Self::Undef
        )
    }

    /// Whether a token of this kind can begin an expression.
    #[must_use]
    pub const fn can_start_expression(self) -> bool {
        matches!(
            self,
            Self::Number
                | Self::String
                | Self::True
                | Self::False
                | Self::Undef
                | Self::Ident
                | Self::LParen
                | Self::LBracket
                | Self::Plus
                | Self::Minus
                | Self::Bang
                | Self::Tilde
                | Self::Let
                | Self::Function
                | Self::Assert
                | Self::Echo
        )
    }

    /// Whether a token of this kind can begin a statement.
    #[must_use]
    pub const fn can_start_statement(self) -> bool {
        matches!(
            self,
            Self::Ident
                | Self::Number
                | Self::LBrace
                | Self::Semicolon
                | Self::Module
                | Self::Function
                | Self::Include
                | Self::Use
                | Self::If
                | Self::For
                | Self::IntersectionFor
                | Self::Let
                | Self::Assert
                | Self::Echo
        ) || self.is_modifier()
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Whitespace => write!(f, "whitespace"),
            Self::LineComment | Self::BlockComment => write!(f, "comment"),
            Self::Module => write!(f, "`module`"),
            Self::Function => write!(f, "`function`"),
            Self::If => write!(f, "`if`"),
            Self::Else => write!(f, "`else`"),
            Self::For => write!(f, "`for`"),
            Self::IntersectionFor => write!(f, "`intersection_for`"),
            Self::Let => write!(f, "`let`"),
            Self::Assert => write!(f, "`assert`"),
            Self::Echo => write!(f, "`echo`"),
            Self::Each => write!(f, "`each`"),
            Self::True => write!(f, "`true`"),
            Self::False => write!(f, "`false`"),
            Self::Undef => write!(f, "`undef`"),
            Self::Include => write!(f, "`include`"),
            Self::Use => write!(f, "`use`"),
            Self::Number => write!(f, "number"),
            Self::String => write!(f, "string"),
            Self::Ident => write!(f, "identifier"),
            Self::LessEqual => write!(f, "`<=`"),
            Self::GreaterEqual => write!(f, "`>=`"),
            Self::EqualEqual => write!(f, "`==`"),
            Self::NotEqual => write!(f, "`!=`"),
            Self::And => write!(f, "`&&`"),
            Self::Or => write!(f, "`||`"),
            Self::ShiftLeft => write!(f, "`<<`"),
            Self::ShiftRight => write!(f, "`>>`"),
            Self::Plus => write!(f, "`+`"),
            Self::Minus => write!(f, "`-`"),
            Self::Star => write!(f, "`*`"),
            Self::Slash => write!(f, "`/`"),
            Self::Percent => write!(f, "`%`"),
            Self::Caret => write!(f, "`^`"),
            Self::Bang => write!(f, "`!`"),
            Self::Tilde => write!(f, "`~`"),
            Self::Less => write!(f, "`<`"),
            Self::Greater => write!(f, "`>`"),
            Self::Assign => write!(f, "`=`"),
            Self::Question => write!(f, "`?`"),
            Self::Colon => write!(f, "`:`"),
            Self::Semicolon => write!(f, "`;`"),
            Self::Comma => write!(f, "`,`"),
            Self::Dot => write!(f, "`.`"),
            Self::LParen => write!(f, "`(`"),
            Self::RParen => write!(f, "`)`"),
            Self::LBracket => write!(f, "`[`"),
            Self::RBracket => write!(f, "`]`"),
            Self::LBrace => write!(f, "`{{`"),
            Self::RBrace => write!(f, "`}}`"),
            Self::Hash => write!(f, "`#`"),
            Self::Ampersand => write!(f, "`&`"),
            Self::Pipe => write!(f, "`|`"),
            Self::Unknown => write!(f, "unrecognized character"),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

/// A token: its kind plus the byte range it covers. The raw text is a slice
/// of the source the token was lexed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The raw source text of this token.
    #[must_use]
    pub fn text<'src>(&self, source: &'src str) -> &'src str {
        &source[self.span.start..self.span.end]
    }

    /// Strings must end with `"`, block comments with `*/`. Other kinds are
    /// always complete.
    #[must_use]
    pub fn is_terminated(&self, source: &str) -> bool {
        let text = self.text(source);
        match self.kind {
            TokenKind::String => text.len() >= 2 && text.ends_with('"') && !ends_escaped(text),
            TokenKind::BlockComment => text.len() >= 4 && text.ends_with("*/"),
            _ => true,
        }
    }
}

/// Whether the final quote of `text` is preceded by an odd run of backslashes.
fn ends_escaped(text: &str) -> bool {
    let body = &text.as_bytes()[..text.len() - 1];
    body.iter().rev().take_while(|&&b| b == b'\\').count() % 2 == 1
}
