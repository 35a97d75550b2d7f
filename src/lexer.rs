//! Lexer for `OpenSCAD` source code.
//!
//! Wraps the `logos`-generated tokenizer and provides a lazy iterator that
//! yields [`Token`]s covering every byte of the input, trivia included, and
//! ends with a single zero-length [`TokenKind::Eof`].
use crate::span::Span;
use crate::token::{Token, TokenKind};
use logos::Logos;

/// A restartable, lazy token stream. Creating a new `Lexer` over the same
/// text always yields the same tokens.
#[derive(Clone)]
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, TokenKind>,
    source: &'src str,
    /// Rest of an unrecognized run still to be split into single characters.
    pending: Option<Span>,
    /// End of the last emitted token.
    pos: usize,
    finished: bool,
}

impl<'src> Lexer<'src> {
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            source,
            pending: None,
            pos: 0,
            finished: false,
        }
    }

    #[must_use]
    pub const fn source(&self) -> &'src str {
        self.source
    }

    /// Emit one `Unknown` token for the first character of `span`, keeping
    /// the remainder for the next call so spans stay on char boundaries.
    fn unknown_char(&mut self, span: Span) -> Token {
        let width = self.source[span.start..span.end]
            .chars()
            .next()
            .map_or(1, char::len_utf8);
        let end = (span.start + width).min(span.end);
        if end < span.end {
            self.pending = Some(Span::new(end, span.end));
        }
        Token::new(TokenKind::Unknown, Span::new(span.start, end))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = if let Some(span) = self.pending.take() {
            self.unknown_char(span)
        } else {
            loop {
                match self.inner.next() {
                    Some(Ok(kind)) => break Token::new(kind, Span::from(self.inner.span())),
                    Some(Err(())) => {
                        let span = self.inner.span();
                        // Already covered by a previous run widened to a char boundary.
                        if span.end <= self.pos {
                            continue;
                        }
                        let mut end = span.end;
                        while !self.source.is_char_boundary(end) {
                            end += 1;
                        }
                        break self.unknown_char(Span::new(self.pos, end));
                    }
                    None if !self.finished => {
                        self.finished = true;
                        break Token::new(TokenKind::Eof, Span::empty(self.source.len()));
                    }
                    None => return None,
                }
            }
        };
        self.pos = token.span.end;
        Some(token)
    }
}

impl std::iter::FusedIterator for Lexer<'_> {}

/// Tokenize an `OpenSCAD` source string into every token, trivia and the
/// final `Eof` included.
#[must_use]
pub fn lex(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}

/// Only the whitespace and comment tokens of `source`.
pub fn trivia(source: &str) -> impl Iterator<Item = Token> + '_ {
    Lexer::new(source).filter(|tok| tok.kind.is_trivia())
}

/// Extract the path from an `include<...>` or `use<...>` token slice.
#[must_use]
pub fn extract_include_path(slice: &str) -> &str {
    if let Some(start) = slice.find('<')
        && let Some(end) = slice.rfind('>')
        && start < end
    {
        return &slice[start + 1..end];
    }
    slice
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .into_iter()
            .map(|tok| tok.kind)
            .filter(|kind| !kind.is_trivia() && *kind != TokenKind::Eof)
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            kinds("cube(10);"),
            vec![
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Number,
                TokenKind::RParen,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        let expected = vec![
            TokenKind::Module,
            TokenKind::Function,
            TokenKind::If,
            TokenKind::Else,
            TokenKind::For,
            TokenKind::IntersectionFor,
            TokenKind::Let,
            TokenKind::Assert,
            TokenKind::Echo,
            TokenKind::Each,
            TokenKind::True,
            TokenKind::False,
            TokenKind::Undef,
        ];
        assert_eq!(
            kinds("module function if else for intersection_for let assert echo each true false undef"),
            expected
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(kinds("modules iffy format"), vec![TokenKind::Ident; 3]);
    }

    #[test]
    fn test_numbers() {
        let source = "42 7.25 .5 1e10 2.5e-3 2E+10 0xFF";
        let tokens: Vec<_> = lex(source)
            .into_iter()
            .filter(|tok| tok.kind == TokenKind::Number)
            .map(|tok| tok.text(source))
            .collect();
        assert_eq!(tokens, vec!["42", "7.25", ".5", "1e10", "2.5e-3", "2E+10", "0xFF"]);
    }

    #[test]
    fn test_digit_prefixed_name_splits() {
        let source = "2Dpipe";
        let tokens = lex(source);
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].text(source), "2");
        assert_eq!(tokens[1].kind, TokenKind::Ident);
        assert_eq!(tokens[1].text(source), "Dpipe");
        assert_eq!(tokens[0].span.end, tokens[1].span.start);
    }

    #[test]
    fn test_special_variable_is_identifier() {
        let source = "$fn = 32;";
        let tokens = lex(source);
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].text(source), "$fn");
    }

    #[test]
    fn test_dollar_needs_a_letter() {
        assert_eq!(kinds("$"), vec![TokenKind::Unknown]);
        assert_eq!(kinds("$1"), vec![TokenKind::Unknown, TokenKind::Number]);
        assert_eq!(kinds("$_x"), vec![TokenKind::Ident]);
    }

    #[test]
    fn test_string_with_escapes() {
        let source = r#""hello \"world\"\n" x"#;
        let tokens = lex(source);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text(source), r#""hello \"world\"\n""#);
        assert!(tokens[0].is_terminated(source));
    }

    #[test]
    fn test_unterminated_string_stops_at_line_end() {
        let source = "\"abc\ncube();";
        let tokens = lex(source);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text(source), "\"abc");
        assert!(!tokens[0].is_terminated(source));
        assert_eq!(tokens[1].kind, TokenKind::Whitespace);
        assert_eq!(tokens[2].kind, TokenKind::Ident);
    }

    #[test]
    fn test_string_ending_in_escaped_quote_is_unterminated() {
        let source = r#""abc\""#;
        let tokens = lex(source);
        assert_eq!(tokens[0].span, Span::new(0, source.len()));
        assert!(!tokens[0].is_terminated(source));
    }

    #[test]
    fn test_comments_are_trivia() {
        let source = "x = 1; // comment\ny = /* block */ 2;";
        assert_eq!(kinds(source).len(), 8);
        let comments: Vec<_> = trivia(source)
            .filter(|tok| tok.kind != TokenKind::Whitespace)
            .map(|tok| tok.text(source))
            .collect();
        assert_eq!(comments, vec!["// comment", "/* block */"]);
    }

    #[test]
    fn test_multiline_block_comment() {
        let source = "/* one\n * two\n */cube();";
        let tokens = lex(source);
        assert_eq!(tokens[0].kind, TokenKind::BlockComment);
        assert!(tokens[0].is_terminated(source));
        assert_eq!(tokens[1].kind, TokenKind::Ident);
    }

    #[test]
    fn test_unterminated_block_comment_runs_to_end() {
        let source = "a /* never closed\nb;";
        let tokens = lex(source);
        assert_eq!(tokens[2].kind, TokenKind::BlockComment);
        assert_eq!(tokens[2].span.end, source.len());
        assert!(!tokens[2].is_terminated(source));
        assert_eq!(tokens[3].kind, TokenKind::Eof);
    }

    #[test]
    fn test_operators_are_greedy() {
        let expected = vec![
            TokenKind::LessEqual,
            TokenKind::GreaterEqual,
            TokenKind::EqualEqual,
            TokenKind::NotEqual,
            TokenKind::And,
            TokenKind::Or,
            TokenKind::ShiftLeft,
            TokenKind::ShiftRight,
        ];
        assert_eq!(kinds("<= >= == != && || << >>"), expected);
        assert_eq!(
            kinds("= ! < > & |"),
            vec![
                TokenKind::Assign,
                TokenKind::Bang,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Ampersand,
                TokenKind::Pipe,
            ]
        );
    }

    #[test]
    fn test_modifiers_are_plain_operators() {
        assert_eq!(
            kinds("# ! % *"),
            vec![
                TokenKind::Hash,
                TokenKind::Bang,
                TokenKind::Percent,
                TokenKind::Star,
            ]
        );
    }

    #[test]
    fn test_include_use() {
        assert_eq!(
            kinds("include <file.scad>\nuse <lib.scad>"),
            vec![TokenKind::Include, TokenKind::Use]
        );
    }

    #[test]
    fn test_extract_include_path() {
        assert_eq!(
            extract_include_path("include <foo/bar.scad>"),
            "foo/bar.scad"
        );
        assert_eq!(extract_include_path("use <lib.scad>"), "lib.scad");
    }

    #[test]
    fn test_unknown_characters_are_split() {
        let source = "a @é b";
        let tokens = lex(source);
        let unknown: Vec<_> = tokens
            .iter()
            .filter(|tok| tok.kind == TokenKind::Unknown)
            .map(|tok| tok.text(source))
            .collect();
        assert_eq!(unknown, vec!["@", "é"]);
    }

    #[test]
    fn test_tokens_tile_the_source() {
        let source = "module m(a=1) { /* c */ cube(a); } // end\n@";
        let tokens = lex(source);
        let rebuilt: String = tokens.iter().map(|tok| tok.text(source)).collect();
        assert_eq!(rebuilt, source);
        for pair in tokens.windows(2) {
            assert_eq!(pair[0].span.end, pair[1].span.start);
        }
    }

    #[test]
    fn test_ends_with_single_eof() {
        let tokens = lex("");
        assert_eq!(tokens, vec![Token::new(TokenKind::Eof, Span::empty(0))]);
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::Ident));
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::Eof));
        assert_eq!(lexer.next(), None);
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn test_restartable() {
        let source = "x = [1:2:10];";
        assert_eq!(lex(source), lex(source));
    }

    #[test]
    fn test_spans_are_correct() {
        let tokens = lex("ab cd");
        assert_eq!(tokens[0].span, Span::new(0, 2));
        assert_eq!(tokens[1].span, Span::new(2, 3));
        assert_eq!(tokens[2].span, Span::new(3, 5));
    }
}
