//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing
//! infrastructure, including the error type, helper methods, and the main
//! parse entry point.
//!
//! # Parser Architecture
//!
//! Unlike a recursive descent parser, statement nesting is tracked with an
//! explicit stack of open contexts (block / conditional / loop) and a single
//! token-dispatch loop; see `statements`. Expressions are parsed with a
//! two-stack operator-precedence algorithm; see `expressions`.
//!
//! Parser methods are split across multiple files using `impl Parser`
//! blocks, allowing each module to extend the Parser with related
//! functionality while maintaining access to the shared parser state.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token};
use crate::parser::statements::OpenContext;
use rustc_hash::FxHashMap;
use std::fmt;

/// Which class of rule a parse error violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unexpected token, missing keyword or punctuation.
    Syntax,
    /// Unknown identifier or datatype, malformed `else`/`end` usage,
    /// nested-block misuse, missing entry point.
    Semantic,
}

/// Parser error type. The first error aborts the parse; there is no
/// recovery or multi-error reporting.
#[derive(Debug)]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Syntax => "Syntax error",
            ErrorKind::Semantic => "Semantic error",
        };
        write!(
            f,
            "{} at line {}, column {}: {}",
            kind, self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            kind: ErrorKind::Syntax,
            message: err.message,
            location: err.location,
        }
    }
}

impl ParseError {
    pub(crate) fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        ParseError {
            kind: ErrorKind::Syntax,
            message: message.into(),
            location,
        }
    }

    pub(crate) fn semantic(message: impl Into<String>, location: SourceLocation) -> Self {
        ParseError {
            kind: ErrorKind::Semantic,
            message: message.into(),
            location,
        }
    }
}

/// Statement-level parser for the Pascal dialect.
///
/// Holds the token cursor together with all parse state: the symbol table,
/// the stack of open nesting contexts, and the entry-point bookkeeping.
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    pub(crate) symbols: SymbolTable,
    pub(crate) contexts: Vec<OpenContext>,
    pub(crate) root: Vec<AstNode>,
    pub(crate) found_entry: bool,
    pub(crate) block_seen: bool,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            symbols: FxHashMap::default(),
            contexts: Vec::new(),
            root: Vec::new(),
            found_entry: false,
            block_seen: false,
        })
    }

    /// Parse the entire program into its root node list.
    ///
    /// Fails on the first structural violation; the partially built tree is
    /// dropped with the parser on every exit path.
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        while !self.is_at_end() {
            self.parse_item()?;
        }
        self.finish()
    }

    fn finish(&mut self) -> Result<Program, ParseError> {
        let eof_location = self.current_location();

        if let Some(context) = self.contexts.last() {
            let message = match context {
                OpenContext::Block(_) => "Expected 'end' before end of input",
                OpenContext::Cond(_) => "Unterminated 'if' before end of input",
                OpenContext::Loop(_) => "Unterminated 'while' before end of input",
            };
            return Err(ParseError::syntax(message, eof_location));
        }

        if !self.found_entry {
            return Err(ParseError::semantic(
                "Cannot find entry point.",
                eof_location,
            ));
        }

        Ok(Program {
            nodes: std::mem::take(&mut self.root),
            symbols: std::mem::take(&mut self.symbols),
        })
    }

    // ===== Helper methods =====

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.tokens[self.position].clone();
        if !self.is_at_end() {
            self.position += 1;
        }
        token
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek_token(), Token::Eof(_))
    }

    pub(crate) fn peek_token(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek_token().location()
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<(), ParseError> {
        match self.peek_token() {
            Token::Semicolon(_) => {
                self.advance();
                Ok(())
            }
            found => Err(ParseError::syntax(
                format!("Expected ';' {}, found {}", ctx, found),
                self.current_location(),
            )),
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<(String, SourceLocation), ParseError> {
        match self.peek_token() {
            Token::Ident(name, loc) => {
                let result = (name.clone(), *loc);
                self.advance();
                Ok(result)
            }
            found => Err(ParseError::syntax(
                format!("Expected identifier, found {}", found),
                self.current_location(),
            )),
        }
    }
}
