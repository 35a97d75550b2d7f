//! # openscad-syntax
//!
//! A resilient `OpenSCAD` tokenizer and parser.
//!
//! Parsing never fails: every call returns a complete, lossless syntax tree
//! plus a list of diagnostics, so editors can keep highlighting, outlining
//! and navigating a file while the user is still typing it. The tree can be
//! lowered into a typed AST for compilers, formatters and linters.
//!
//! ## Quick Start
//!
//! ```rust
//! use openscad_syntax::{parse, walk};
//!
//! let source = r#"
//!     module box(size = 10) {
//!         cube(size);
//!     }
//!     box(size = 20);
//! "#;
//!
//! let result = parse(source);
//! assert!(result.diagnostics().is_empty());
//!
//! let outline = walk::outline(result.tree());
//! assert_eq!(outline[0].name, "box");
//!
//! let ast = result.to_ast();
//! println!("Parsed {} statements", ast.statements.len());
//! ```
//!
//! Malformed input still yields a tree:
//!
//! ```rust
//! let result = openscad_syntax::parse("a = 1;\nb = ;\nc = 3;");
//! assert_eq!(result.diagnostics().len(), 1);
//! assert_eq!(result.root().child_nodes().count(), 3);
//! ```

// Suppress false positive from thiserror/miette derive macros
#![allow(unused_assignments)]

pub mod ast;
pub mod error;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod span;
pub mod syntax;
pub mod token;
pub mod visit;
pub mod walk;

// Re-exports for convenience
pub use ast::{
    Argument, BinaryOp, Expr, ExprKind, Modifiers, Parameter, SourceFile, Statement, UnaryOp,
};
pub use error::{Diagnostic, ParseErrors, Severity};
pub use lexer::{Lexer, lex};
pub use parser::{ParseOptions, ParseResult, parse, parse_with};
pub use span::Span;
pub use syntax::{Element, NodeId, NodeKind, SyntaxNode, SyntaxTree, TokenId};
pub use token::{Token, TokenKind};
pub use visit::Visitor;
