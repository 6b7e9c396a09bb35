use tracing::{debug, trace};

use crate::{
    ast::{
        Assignment, FunctionDef, FunctionInvocation, Program, Range, ReturnSpec, Selection,
        Statement,
    },
    error::{byte_offset_to_location, Location, MungeError, MungeResult, ParseError},
    lexer::{Lexer, Token, TokenKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope<'f> {
    TopLevel,
    Function(&'f str),
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

pub fn parse_source(source: &str) -> MungeResult<Program> {
    Parser::new(Lexer::new(source))?.parse()
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> MungeResult<Self> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    pub fn parse(&mut self) -> MungeResult<Program> {
        let mut statements = Vec::new();

        loop {
            self.skip_newlines()?;
            if self.current.kind == TokenKind::Eof {
                break;
            }
            statements.push(self.parse_statement(Scope::TopLevel)?);
            self.expect_terminator()?;
        }

        debug!(statements = statements.len(), "parsed program");
        Ok(Program { statements })
    }

    fn parse_statement(&mut self, scope: Scope<'_>) -> MungeResult<Statement> {
        match (self.current.kind, scope) {
            (TokenKind::Def, Scope::TopLevel) => self.parse_function(),
            (TokenKind::Def, Scope::Function(function)) => Err(ParseError::NestedFunction {
                function: function.to_string(),
                location: self.location(),
            }
            .into()),
            (TokenKind::Return, _) => Err(ParseError::ReturnOutsideFunction {
                location: self.location(),
            }
            .into()),
            (TokenKind::Identifier, _) => self.parse_binding(),
            _ => Err(self.unexpected("IDENTIFIER")),
        }
    }

    fn parse_function(&mut self) -> MungeResult<Statement> {
        self.expect(TokenKind::Def)?;
        let identifier = self.expect_text(TokenKind::Identifier)?;
        let mut body = Vec::new();

        let returns = loop {
            self.skip_newlines()?;
            match self.current.kind {
                TokenKind::Return => {
                    self.advance()?;
                    break self.parse_return_spec()?;
                }
                TokenKind::Eof => return Err(self.unexpected(TokenKind::Return.describe())),
                _ => {
                    body.push(self.parse_statement(Scope::Function(&identifier))?);
                    self.expect_terminator()?;
                }
            }
        };

        trace!(function = %identifier, statements = body.len(), "parsed function");
        Ok(Statement::FunctionDef(FunctionDef {
            identifier,
            body,
            returns,
        }))
    }

    fn parse_binding(&mut self) -> MungeResult<Statement> {
        let mut identifiers = vec![self.expect_text(TokenKind::Identifier)?];
        while self.current.kind == TokenKind::Comma {
            self.advance()?;
            identifiers.push(self.expect_text(TokenKind::Identifier)?);
        }

        self.expect(TokenKind::Equals)?;

        if self.current.kind == TokenKind::Do {
            self.advance()?;
            let function_name = self.expect_text(TokenKind::Identifier)?;
            return Ok(Statement::FunctionInvocation(FunctionInvocation {
                identifiers,
                function_name,
            }));
        }

        if identifiers.len() > 1 {
            return Err(self.unexpected(TokenKind::Do.describe()));
        }

        let selection = self.parse_selection()?;
        let identifier = identifiers.remove(0);
        Ok(Statement::Assignment(Assignment {
            identifier,
            selection,
        }))
    }

    // Selector, then attributes, then range.
    fn parse_selection(&mut self) -> MungeResult<Selection> {
        let selector = self.expect_text(TokenKind::Identifier)?;
        let mut selection = Selection {
            selector,
            range: Range::whole(),
            attributes: None,
        };

        if self.current.kind == TokenKind::LBrace {
            selection.attributes = Some(self.parse_name_list()?);
        }
        if self.current.kind == TokenKind::LParen {
            selection.range = self.parse_range()?;
        }

        Ok(selection)
    }

    fn parse_range(&mut self) -> MungeResult<Range> {
        self.expect(TokenKind::LParen)?;
        let start = self.expect_integer()?;

        match self.current.kind {
            TokenKind::RParen => {
                self.advance()?;
                Ok(Range::index(start))
            }
            TokenKind::Comma => {
                self.advance()?;
                match self.current.kind {
                    TokenKind::RParen => {
                        self.advance()?;
                        Ok(Range::open_ended(start))
                    }
                    TokenKind::Integer => {
                        let end = self.expect_integer()?;
                        self.expect(TokenKind::RParen)?;
                        Ok(Range::slice(start, end))
                    }
                    _ => Err(self.unexpected("INTEGER or RPAREN")),
                }
            }
            _ => Err(self.unexpected("DELIMITER or RPAREN")),
        }
    }

    fn parse_return_spec(&mut self) -> MungeResult<ReturnSpec> {
        Ok(ReturnSpec {
            names: self.parse_name_list()?,
        })
    }

    fn parse_name_list(&mut self) -> MungeResult<Vec<String>> {
        self.expect(TokenKind::LBrace)?;
        let mut names = Vec::new();

        loop {
            names.push(self.expect_text(TokenKind::Identifier)?);
            match self.current.kind {
                TokenKind::Comma => self.advance()?,
                TokenKind::RBrace => {
                    self.advance()?;
                    return Ok(names);
                }
                _ => return Err(self.unexpected("DELIMITER or RBRACE")),
            }
        }
    }

    fn skip_newlines(&mut self) -> MungeResult<()> {
        while self.current.kind == TokenKind::Newline {
            self.advance()?;
        }
        Ok(())
    }

    fn expect_terminator(&mut self) -> MungeResult<()> {
        match self.current.kind {
            TokenKind::Newline => self.advance(),
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("NEWLINE or EOF")),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> MungeResult<Token> {
        if self.current.kind != kind {
            return Err(self.unexpected(kind.describe()));
        }
        self.advance_and_take()
    }

    fn expect_text(&mut self, kind: TokenKind) -> MungeResult<String> {
        Ok(self.expect(kind)?.text)
    }

    fn expect_integer(&mut self) -> MungeResult<usize> {
        let location = self.location();
        let literal = self.expect_text(TokenKind::Integer)?;
        literal
            .parse::<usize>()
            .map_err(|_| ParseError::IntegerOutOfRange { literal, location }.into())
    }

    fn advance(&mut self) -> MungeResult<()> {
        self.advance_and_take().map(|_| ())
    }

    fn advance_and_take(&mut self) -> MungeResult<Token> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn location(&self) -> Location {
        byte_offset_to_location(self.lexer.source(), self.current.span.start)
    }

    fn unexpected(&self, expected: &str) -> MungeError {
        let found = match self.current.kind {
            TokenKind::Identifier | TokenKind::Integer => {
                format!("{} '{}'", self.current.kind.describe(), self.current.text)
            }
            kind => kind.describe().to_string(),
        };
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found,
            location: self.location(),
        }
        .into()
    }
}
