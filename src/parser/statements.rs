//! Statement parsing implementation
//!
//! Statements are parsed by a single token-dispatch loop rather than by
//! recursive descent: a conditional or loop body is filled in incrementally,
//! statement by statement, as tokens arrive. Nesting is tracked with an
//! explicit stack of open contexts, and every finished statement is handed
//! to one attachment dispatch that picks its home by fixed priority:
//!
//! 1. an open loop body slot (which the statement closes),
//! 2. the conditional on top of the stack (`then` branch, pending `else`
//!    slot, or an open branch block),
//! 3. the innermost open block,
//! 4. the program root list.
//!
//! A conditional stays on the stack after its `then` branch is complete
//! because an `else` may still arrive; it is retired either when the next
//! statement proves no `else` is coming, or when a block closes and the
//! token after `end` is not `else`.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the
//! [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

/// An open nesting context: a `begin` block, an `if` whose branches are
/// still being collected, or a `while` whose body slot is open.
pub(crate) enum OpenContext {
    Block(OpenBlock),
    Cond(OpenCond),
    Loop(OpenLoop),
}

pub(crate) struct OpenBlock {
    statements: Vec<AstNode>,
    location: SourceLocation,
}

pub(crate) struct OpenCond {
    condition: AstNode,
    yes: Option<AstNode>,
    no: ElseBranch,
    location: SourceLocation,
}

impl OpenCond {
    /// True once the conditional can never change again: the `then` branch
    /// is filled and no `else` body is owed.
    fn is_settled(&self) -> bool {
        self.yes.is_some() && !matches!(self.no, ElseBranch::Pending)
    }

    fn into_node(self) -> AstNode {
        let yes = self
            .yes
            .expect("conditional finalized without a then-branch");
        let no = match self.no {
            ElseBranch::Present(no) => ElseBranch::Present(no),
            _ => ElseBranch::Absent,
        };
        AstNode::Conditional {
            condition: Box::new(self.condition),
            yes: Box::new(yes),
            no,
            location: self.location,
        }
    }
}

pub(crate) struct OpenLoop {
    condition: AstNode,
    location: SourceLocation,
}

impl Parser {
    /// Dispatch on one token at statement level.
    pub(crate) fn parse_item(&mut self) -> Result<(), ParseError> {
        match self.advance() {
            Token::Program(loc) => self.parse_program_header(loc),
            Token::Var(loc) => self.parse_var_declare(loc),
            Token::Begin(loc) => self.open_block(loc),
            Token::End(loc) => self.close_block(loc),
            Token::If(loc) => self.parse_if(loc),
            Token::Else(loc) => self.parse_else(loc),
            Token::While(loc) => self.parse_while(loc),
            Token::Ident(name, loc) => match self.peek_token() {
                Token::LParen(_) => self.parse_function_call(name, loc),
                Token::Assign(_) => self.parse_assignment(name, loc),
                found => Err(ParseError::syntax(
                    format!("Expected ':=' or '(' after identifier, found {}", found),
                    self.current_location(),
                )),
            },
            Token::Eof(_) => Ok(()),
            found => Err(ParseError::syntax(
                format!("Unexpected {}", found),
                found.location(),
            )),
        }
    }

    /// `program <name> ;`
    fn parse_program_header(&mut self, location: SourceLocation) -> Result<(), ParseError> {
        let (name, _) = self.expect_identifier()?;
        self.expect_semicolon("after program name")?;
        self.attach_statement(AstNode::ProgramName { name, location });
        Ok(())
    }

    /// `var <name> : <datatype> [ '[' <size> ']' ] ;`
    ///
    /// Declarations are only legal before the first `begin`. Redeclaring a
    /// name silently rebinds it in the symbol table.
    fn parse_var_declare(&mut self, location: SourceLocation) -> Result<(), ParseError> {
        if self.block_seen {
            return Err(ParseError::semantic(
                "Variable declarations must appear before the first block",
                location,
            ));
        }

        let (name, _) = self.expect_identifier()?;

        match self.peek_token() {
            Token::Colon(_) => {
                self.advance();
            }
            found => {
                return Err(ParseError::syntax(
                    format!("Expected ':' after variable name, found {}", found),
                    self.current_location(),
                ));
            }
        }

        let (type_name, type_loc) = self.expect_identifier()?;
        let datatype = DataType::from_name(&type_name).ok_or_else(|| {
            ParseError::semantic(format!("Unknown datatype \"{}\"", type_name), type_loc)
        })?;

        let mut array_size = None;
        if matches!(self.peek_token(), Token::LBracket(_)) {
            self.advance();
            array_size = Some(self.parse_array_size()?);
            match self.peek_token() {
                Token::RBracket(_) => {
                    self.advance();
                }
                found => {
                    return Err(ParseError::syntax(
                        format!("Expected ']' after array size, found {}", found),
                        self.current_location(),
                    ));
                }
            }
        }

        // Strings are backed by a fixed array; 256 when no size is written.
        if array_size.is_none() && datatype == DataType::Str {
            array_size = Some(256);
        }

        self.expect_semicolon("after variable declaration")?;

        self.symbols.insert(
            name.clone(),
            Symbol {
                datatype,
                array_size,
            },
        );
        self.attach_statement(AstNode::VarDeclare {
            name,
            datatype,
            array_size,
            location,
        });
        Ok(())
    }

    fn parse_array_size(&mut self) -> Result<u32, ParseError> {
        match self.peek_token() {
            Token::IntLiteral(value, loc) => {
                let size = u32::try_from(*value).map_err(|_| {
                    ParseError::semantic(format!("Invalid array size {}", value), *loc)
                })?;
                self.advance();
                Ok(size)
            }
            found => Err(ParseError::syntax(
                format!("Expected array size, found {}", found),
                self.current_location(),
            )),
        }
    }

    /// `begin` opens a block: the top-level one, or the body of the open
    /// conditional branch or loop on top of the stack. Blocks directly
    /// inside blocks are not supported.
    fn open_block(&mut self, location: SourceLocation) -> Result<(), ParseError> {
        // A conditional that can no longer gain an else is retired by the
        // arrival of any new statement, `begin` included.
        self.settle_conditionals();

        let allowed = match self.contexts.last() {
            None => true,
            Some(OpenContext::Cond(cond)) => !cond.is_settled(),
            Some(OpenContext::Loop(_)) => true,
            Some(OpenContext::Block(_)) => false,
        };
        if !allowed {
            return Err(ParseError::semantic(
                "Nested blocks are not supported",
                location,
            ));
        }

        self.block_seen = true;
        self.contexts.push(OpenContext::Block(OpenBlock {
            statements: Vec::new(),
            location,
        }));
        Ok(())
    }

    /// `end` closes the innermost open block. Conditionals still open above
    /// it are retired first; a loop or an empty branch above it is malformed.
    fn close_block(&mut self, location: SourceLocation) -> Result<(), ParseError> {
        let block = loop {
            match self.contexts.pop() {
                None => {
                    return Err(ParseError::semantic(
                        "Invalid 'end' with no open block",
                        location,
                    ));
                }
                Some(OpenContext::Block(block)) => break block,
                Some(OpenContext::Cond(cond)) => {
                    if cond.yes.is_none() {
                        return Err(ParseError::syntax(
                            "Expected statement after 'then'",
                            location,
                        ));
                    }
                    if matches!(cond.no, ElseBranch::Pending) {
                        return Err(ParseError::syntax(
                            "Expected statement after 'else'",
                            location,
                        ));
                    }
                    let node = cond.into_node();
                    self.attach_statement(node);
                }
                Some(OpenContext::Loop(_)) => {
                    return Err(ParseError::syntax(
                        "Expected statement after 'do'",
                        location,
                    ));
                }
            }
        };

        // A trailing dot right after the closing `end` of a top-level block
        // promotes it to the main block, once per program.
        if self.contexts.is_empty()
            && !self.found_entry
            && matches!(self.peek_token(), Token::Dot(_))
        {
            self.advance();
            self.found_entry = true;
            self.attach_statement(AstNode::MainBlock {
                statements: block.statements,
                location: block.location,
            });
            return Ok(());
        }

        self.attach_statement(AstNode::Block {
            statements: block.statements,
            location: block.location,
        });

        // The block may have become a conditional branch. Only a direct
        // `else` can still extend that conditional; anything else retires it.
        if !matches!(self.peek_token(), Token::Else(_)) {
            self.settle_conditionals();
        }
        Ok(())
    }

    /// `if <condition> then` pushes a new open conditional.
    fn parse_if(&mut self, location: SourceLocation) -> Result<(), ParseError> {
        let condition = self.parse_expression()?.ok_or_else(|| {
            ParseError::syntax("Expected condition after 'if'", self.current_location())
        })?;

        match self.peek_token() {
            Token::Then(_) => {
                self.advance();
            }
            found => {
                return Err(ParseError::syntax(
                    format!("Expected 'then' after condition, found {}", found),
                    self.current_location(),
                ));
            }
        }

        self.contexts.push(OpenContext::Cond(OpenCond {
            condition,
            yes: None,
            no: ElseBranch::Absent,
            location,
        }));
        Ok(())
    }

    /// `else` marks the pending else slot of the top conditional.
    fn parse_else(&mut self, location: SourceLocation) -> Result<(), ParseError> {
        match self.contexts.last_mut() {
            Some(OpenContext::Cond(cond))
                if cond.yes.is_some() && matches!(cond.no, ElseBranch::Absent) =>
            {
                cond.no = ElseBranch::Pending;
                Ok(())
            }
            _ => Err(ParseError::semantic(
                "Invalid 'else' with no matching 'if'",
                location,
            )),
        }
    }

    /// `while <condition> do` pushes a new open loop.
    fn parse_while(&mut self, location: SourceLocation) -> Result<(), ParseError> {
        let condition = self.parse_expression()?.ok_or_else(|| {
            ParseError::syntax("Expected condition after 'while'", self.current_location())
        })?;

        match self.peek_token() {
            Token::Do(_) => {
                self.advance();
            }
            found => {
                return Err(ParseError::syntax(
                    format!("Expected 'do' after condition, found {}", found),
                    self.current_location(),
                ));
            }
        }

        self.contexts.push(OpenContext::Loop(OpenLoop {
            condition,
            location,
        }));
        Ok(())
    }

    /// `<name> := <expression> ;`
    fn parse_assignment(&mut self, name: String, location: SourceLocation) -> Result<(), ParseError> {
        if !self.symbols.contains_key(&name) {
            return Err(ParseError::semantic(
                format!("Unknown identifier \"{}\"", name),
                location,
            ));
        }

        self.advance(); // the ':=' token

        let value = self.parse_expression()?.ok_or_else(|| {
            ParseError::syntax("Expected expression after ':='", self.current_location())
        })?;
        self.expect_semicolon("after assignment")?;

        self.attach_statement(AstNode::VarAssign {
            name,
            value: Box::new(value),
            location,
        });
        Ok(())
    }

    /// `<name> ( <args> ) ;` — the trailing semicolon may be omitted when
    /// the call is the last statement directly before an `else`.
    fn parse_function_call(
        &mut self,
        name: String,
        location: SourceLocation,
    ) -> Result<(), ParseError> {
        self.advance(); // the '(' token

        let mut args = Vec::new();
        if matches!(self.peek_token(), Token::RParen(_)) {
            self.advance();
        } else {
            loop {
                let arg = self.parse_expression()?.ok_or_else(|| {
                    ParseError::syntax(
                        "Expected expression in argument list",
                        self.current_location(),
                    )
                })?;
                args.push(arg);

                match self.advance() {
                    Token::Comma(_) => continue,
                    Token::RParen(_) => break,
                    found => {
                        return Err(ParseError::syntax(
                            format!("Expected ',' or ')' in argument list, found {}", found),
                            found.location(),
                        ));
                    }
                }
            }
        }

        if !matches!(self.peek_token(), Token::Else(_)) {
            self.expect_semicolon("after function call")?;
        }

        self.attach_statement(AstNode::FunctionCall {
            name,
            args,
            location,
        });
        Ok(())
    }

    /// Attach one finished statement to its home, chosen by fixed priority:
    /// open loop body, top conditional, innermost block, program root.
    ///
    /// Closing a loop body turns the loop into a statement that is attached
    /// in turn; a settled conditional in the way is retired first so that
    /// statement order inside its enclosing block is preserved.
    pub(crate) fn attach_statement(&mut self, mut stmt: AstNode) {
        loop {
            match self.contexts.pop() {
                None => {
                    self.root.push(stmt);
                    return;
                }
                Some(OpenContext::Block(mut block)) => {
                    block.statements.push(stmt);
                    self.contexts.push(OpenContext::Block(block));
                    return;
                }
                Some(OpenContext::Loop(lp)) => {
                    // The statement is the loop body; the finished loop
                    // becomes the statement to attach.
                    stmt = AstNode::WhileLoop {
                        condition: Box::new(lp.condition),
                        body: Box::new(stmt),
                        location: lp.location,
                    };
                }
                Some(OpenContext::Cond(mut cond)) => {
                    if cond.yes.is_none() {
                        cond.yes = Some(stmt);
                        self.contexts.push(OpenContext::Cond(cond));
                        return;
                    }
                    if matches!(cond.no, ElseBranch::Pending) {
                        cond.no = ElseBranch::Present(Box::new(stmt));
                        self.contexts.push(OpenContext::Cond(cond));
                        return;
                    }
                    // Settled conditional: it can never gain an else now.
                    // Retire it below the new statement, then keep walking.
                    let node = cond.into_node();
                    self.attach_statement(node);
                }
            }
        }
    }

    /// Retire every settled conditional from the top of the context stack.
    pub(crate) fn settle_conditionals(&mut self) {
        while matches!(self.contexts.last(), Some(OpenContext::Cond(cond)) if cond.is_settled())
        {
            if let Some(OpenContext::Cond(cond)) = self.contexts.pop() {
                let node = cond.into_node();
                self.attach_statement(node);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::ErrorKind;

    fn parse(source: &str) -> Result<Program, ParseError> {
        Parser::new(source)?.parse_program()
    }

    fn main_dump(source: &str) -> String {
        let program = parse(source).unwrap();
        program
            .nodes
            .iter()
            .find(|n| matches!(n, AstNode::MainBlock { .. }))
            .expect("no main block")
            .to_string()
    }

    #[test]
    fn test_if_without_else_releases_following_statement() {
        let dump = main_dump(
            "var c : boolean; var y : integer; \
             begin if c then y := 1; y := 2; end.",
        );
        assert_eq!(dump, "(main (if c (:= y 1)) (:= y 2))");
    }

    #[test]
    fn test_if_else_collects_both_branches() {
        let dump = main_dump(
            "var c : boolean; var y : integer; \
             begin if c then y := 1; else y := 2; y := 3; end.",
        );
        assert_eq!(dump, "(main (if c (:= y 1) (:= y 2)) (:= y 3))");
    }

    #[test]
    fn test_block_as_then_branch() {
        let dump = main_dump(
            "var c : boolean; var y : integer; \
             begin if c then begin y := 1; y := 2; end y := 3; end.",
        );
        assert_eq!(dump, "(main (if c (block (:= y 1) (:= y 2))) (:= y 3))");
    }

    #[test]
    fn test_block_then_branch_with_else() {
        let dump = main_dump(
            "var c : boolean; var y : integer; \
             begin if c then begin y := 1; end else y := 2; end.",
        );
        assert_eq!(dump, "(main (if c (block (:= y 1)) (:= y 2)))");
    }

    #[test]
    fn test_nested_conditionals_dangling_else() {
        // The else binds the innermost if.
        let dump = main_dump(
            "var a : boolean; var b : boolean; var y : integer; \
             begin if a then if b then y := 1; else y := 2; end.",
        );
        assert_eq!(dump, "(main (if a (if b (:= y 1) (:= y 2))))");
    }

    #[test]
    fn test_else_if_chain() {
        let dump = main_dump(
            "var a : boolean; var b : boolean; var y : integer; \
             begin if a then y := 1; else if b then y := 2; else y := 3; end.",
        );
        assert_eq!(dump, "(main (if a (:= y 1) (if b (:= y 2) (:= y 3))))");
    }

    #[test]
    fn test_while_single_statement_body() {
        let dump = main_dump(
            "var c : boolean; var y : integer; \
             begin while c do y := 1; y := 2; end.",
        );
        assert_eq!(dump, "(main (while c (:= y 1)) (:= y 2))");
    }

    #[test]
    fn test_while_block_body() {
        let dump = main_dump(
            "var c : boolean; var y : integer; \
             begin while c do begin y := 1; y := 2; end end.",
        );
        assert_eq!(dump, "(main (while c (block (:= y 1) (:= y 2))))");
    }

    #[test]
    fn test_function_call_arguments() {
        let dump = main_dump(
            "var x : integer; begin writeln('x is', x, 1 + 2); end.",
        );
        assert_eq!(dump, "(main (call writeln 'x is' x (+ 1 2)))");
    }

    #[test]
    fn test_call_before_else_skips_semicolon() {
        let dump = main_dump(
            "var c : boolean; \
             begin if c then writeln('yes') else writeln('no'); end.",
        );
        assert_eq!(dump, "(main (if c (call writeln 'yes') (call writeln 'no')))");
    }

    #[test]
    fn test_unmatched_end() {
        let err = parse("begin end. end.").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
        assert!(err.message.contains("'end'"));
    }

    #[test]
    fn test_nested_blocks_rejected() {
        let err = parse("begin begin end end.").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
        assert!(err.message.contains("Nested blocks"));
    }

    #[test]
    fn test_else_without_if() {
        let err = parse("var y : integer; begin y := 1; else y := 2; end.").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
        assert!(err.message.contains("'else'"));
    }

    #[test]
    fn test_var_after_block() {
        let err = parse("begin end. var x : integer;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
    }

    #[test]
    fn test_unknown_datatype() {
        let err = parse("var x : number; begin end.").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
        assert!(err.message.contains("Unknown datatype \"number\""));
    }

    #[test]
    fn test_assignment_to_undeclared() {
        let err = parse("begin x := 1; end.").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
        assert!(err.message.contains("Unknown identifier \"x\""));
    }

    #[test]
    fn test_string_declaration_defaults_to_256() {
        let program = parse("var s : string; var t : string[64]; begin end.").unwrap();
        assert_eq!(program.symbols["s"].array_size, Some(256));
        assert_eq!(program.symbols["t"].array_size, Some(64));
    }

    #[test]
    fn test_redeclaration_silently_rebinds() {
        // Documented looseness: the second declaration wins without any
        // diagnostic.
        let program = parse("var x : integer; var x : real; begin end.").unwrap();
        assert_eq!(program.symbols["x"].datatype, DataType::Real);
        assert_eq!(program.symbols.len(), 1);
    }
}
