//! Level-0 reader.
//!
//! Turns source text into units the session compiles one at a time:
//!
//! ```text
//! unit    := '{' stmt* '}' | stmt
//! stmt    := (ident '=')? expr ';'
//! expr    := primary ('(' (expr (',' expr)*)? ')')*
//! primary := ident | integer | string | char | '(' expr ')'
//! ```
//!
//! Integers are decimal or `0x` hex with an optional leading `-`. Strings
//! and chars accept `\n \t \r \0 \\ \' \"` and `\xHH`. `//` and `/* */`
//! comments count as whitespace.

use std::path::Path;

use vela_compile::{Frontend, ParseError, UnitSource};
use vela_ir::{Node, NodeRef, Symbol};

/// The level-0 [`Frontend`].
#[derive(Copy, Clone, Debug, Default)]
pub struct Reader;

impl Frontend for Reader {
    fn open(&self, path: &Path, text: String) -> Box<dyn UnitSource> {
        tracing::trace!(file = %path.display(), bytes = text.len(), "reader opened");
        Box::new(UnitReader::new(text))
    }
}

/// Source position, 1-based.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Pos {
    offset: usize,
    line: u32,
    column: u32,
}

/// Unit stream over one source text.
pub struct UnitReader {
    text: String,
    pos: Pos,
}

type ParseResult<T> = Result<T, ParseError>;

impl UnitReader {
    pub fn new(text: String) -> Self {
        UnitReader {
            text,
            pos: Pos {
                offset: 0,
                line: 1,
                column: 1,
            },
        }
    }

    // -- Cursor --

    fn peek(&self) -> Option<char> {
        self.text[self.pos.offset..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.text[self.pos.offset..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos.offset += c.len_utf8();
        if c == '\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }
        Some(c)
    }

    fn error_at(pos: Pos, message: impl Into<String>) -> ParseError {
        ParseError::new(pos.line, pos.column, message)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        Self::error_at(self.pos, message)
    }

    fn skip_trivia(&mut self) -> ParseResult<()> {
        loop {
            match (self.peek(), self.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.pos;
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(Self::error_at(start, "unterminated comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn expect(&mut self, expected: char) -> ParseResult<()> {
        self.skip_trivia()?;
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected `{expected}`, found `{c}`"))),
            None => Err(self.error(format!("expected `{expected}`, found end of input"))),
        }
    }

    fn eat(&mut self, expected: char) -> ParseResult<bool> {
        self.skip_trivia()?;
        if self.peek() == Some(expected) {
            self.bump();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // -- Grammar --

    fn unit(&mut self) -> ParseResult<Option<NodeRef>> {
        self.skip_trivia()?;
        let start = self.pos;
        if self.peek().is_none() {
            return Ok(None);
        }

        let mut stmts = Vec::new();
        if self.eat('{')? {
            while !self.eat('}')? {
                if self.peek().is_none() {
                    return Err(Self::error_at(start, "unterminated unit block"));
                }
                stmts.push(self.stmt()?);
            }
        } else {
            stmts.push(self.stmt()?);
        }
        Ok(Some(Node::unit(stmts, start.line, start.column)))
    }

    fn stmt(&mut self) -> ParseResult<NodeRef> {
        self.skip_trivia()?;
        let start = self.pos;
        let mut name = Symbol::NONE;
        if let Some(ident) = self.ident() {
            self.skip_trivia()?;
            if self.peek() == Some('=') {
                self.bump();
                name = Symbol::intern(&ident);
            } else {
                self.pos = start;
            }
        }
        let expr = self.expr()?;
        self.expect(';')?;
        Ok(Node::stmt(name, Some(expr)))
    }

    fn expr(&mut self) -> ParseResult<NodeRef> {
        let mut expr = self.primary()?;
        while self.eat('(')? {
            let mut args = Vec::new();
            if !self.eat(')')? {
                loop {
                    args.push(self.expr()?);
                    if self.eat(')')? {
                        break;
                    }
                    self.expect(',')?;
                }
            }
            expr = Node::call(expr, args);
        }
        Ok(expr)
    }

    fn primary(&mut self) -> ParseResult<NodeRef> {
        self.skip_trivia()?;
        match self.peek() {
            Some('(') => {
                self.bump();
                let inner = self.expr()?;
                self.expect(')')?;
                Ok(inner)
            }
            Some('"') => self.string(),
            Some('\'') => self.char_literal(),
            Some(c) if c.is_ascii_digit() || c == '-' => self.integer(),
            Some(_) => match self.ident() {
                Some(ident) => Ok(Node::identifier(Symbol::intern(&ident))),
                None => Err(self.error("expected an expression")),
            },
            None => Err(self.error("expected an expression, found end of input")),
        }
    }

    fn ident(&mut self) -> Option<String> {
        let first = self.peek()?;
        if !(first.is_ascii_alphabetic() || first == '_') {
            return None;
        }
        let begin = self.pos.offset;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        Some(self.text[begin..self.pos.offset].to_owned())
    }

    fn integer(&mut self) -> ParseResult<NodeRef> {
        let start = self.pos;
        let negative = self.peek() == Some('-');
        if negative {
            self.bump();
        }

        let hex = self.peek() == Some('0') && matches!(self.peek_second(), Some('x' | 'X'));
        if hex {
            self.bump();
            self.bump();
        }
        let radix = if hex { 16 } else { 10 };

        let begin = self.pos.offset;
        while self.peek().is_some_and(|c| c.is_digit(radix) || c == '_') {
            self.bump();
        }
        let digits: String = self.text[begin..self.pos.offset]
            .chars()
            .filter(|&c| c != '_')
            .collect();
        if digits.is_empty() {
            return Err(Self::error_at(start, "expected digits"));
        }

        let magnitude = u64::from_str_radix(&digits, radix)
            .map_err(|_| Self::error_at(start, "integer literal out of range"))?;
        // Hex literals wrap into the signed range so full-width bit patterns fit.
        #[expect(clippy::cast_possible_wrap, reason = "bit pattern of a hex literal")]
        let value = if hex {
            magnitude as i64
        } else {
            i64::try_from(magnitude)
                .or_else(|_| {
                    if negative && magnitude == i64::MIN.unsigned_abs() {
                        Ok(i64::MIN)
                    } else {
                        Err(Self::error_at(start, "integer literal out of range"))
                    }
                })?
        };
        let value = if negative { value.wrapping_neg() } else { value };
        Ok(Node::integer(value))
    }

    fn escape(&mut self) -> ParseResult<char> {
        let at = self.pos;
        let c = self
            .bump()
            .ok_or_else(|| Self::error_at(at, "unterminated escape"))?;
        Ok(match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' | '\'' | '"' => c,
            'x' => {
                let mut code = 0u32;
                for _ in 0..2 {
                    let digit = self
                        .bump()
                        .and_then(|d| d.to_digit(16))
                        .ok_or_else(|| Self::error_at(at, "expected two hex digits"))?;
                    code = code * 16 + digit;
                }
                char::from_u32(code).ok_or_else(|| Self::error_at(at, "invalid escape"))?
            }
            other => return Err(Self::error_at(at, format!("unknown escape `\\{other}`"))),
        })
    }

    fn string(&mut self) -> ParseResult<NodeRef> {
        let start = self.pos;
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Node::string(text)),
                Some('\\') => text.push(self.escape()?),
                Some(c) => text.push(c),
                None => return Err(Self::error_at(start, "unterminated string")),
            }
        }
    }

    fn char_literal(&mut self) -> ParseResult<NodeRef> {
        let start = self.pos;
        self.bump();
        let c = match self.bump() {
            Some('\\') => self.escape()?,
            Some('\'') | None => return Err(Self::error_at(start, "empty character literal")),
            Some(c) => c,
        };
        if self.bump() != Some('\'') {
            return Err(Self::error_at(start, "unterminated character literal"));
        }
        Ok(Node::char(c))
    }
}

impl UnitSource for UnitReader {
    fn next_unit(&mut self) -> Result<Option<NodeRef>, ParseError> {
        self.unit()
    }
}
