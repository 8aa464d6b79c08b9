use nom::{
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::satisfy,
    combinator::recognize,
    sequence::pair,
    IResult,
};
use std::fmt::{self, Display};
use tracing::trace;

use crate::error::StructureError;
use crate::notation::{Notation, Terminator};
use crate::{Identifier, Literal};

/// A location in grammar source. `offset` is in bytes, `line` and `column`
/// start at 1 and `column` counts characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const START: Position = Position {
        offset: 0,
        line: 1,
        column: 1,
    };
}

impl Default for Position {
    fn default() -> Self {
        Position::START
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    QuotedLiteral,
    RuleAssign,
    AlternativeSeparator,
    SequenceBoundary,
    EpsilonMarker,
    RuleTerminator,
    EndOfInput,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            TokenKind::Identifier => "identifier",
            TokenKind::QuotedLiteral => "quoted literal",
            TokenKind::RuleAssign => "rule assignment",
            TokenKind::AlternativeSeparator => "alternative separator",
            TokenKind::SequenceBoundary => "sequence separator",
            TokenKind::EpsilonMarker => "epsilon",
            TokenKind::RuleTerminator => "end of rule",
            TokenKind::EndOfInput => "end of input",
        };
        f.write_str(s)
    }
}

/// What a token holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lexeme {
    Identifier(Identifier),
    QuotedLiteral(Literal),
    RuleAssign,
    AlternativeSeparator,
    SequenceBoundary,
    EpsilonMarker,
    RuleTerminator,
    EndOfInput,
}

impl Lexeme {
    pub fn kind(&self) -> TokenKind {
        match self {
            Lexeme::Identifier(_) => TokenKind::Identifier,
            Lexeme::QuotedLiteral(_) => TokenKind::QuotedLiteral,
            Lexeme::RuleAssign => TokenKind::RuleAssign,
            Lexeme::AlternativeSeparator => TokenKind::AlternativeSeparator,
            Lexeme::SequenceBoundary => TokenKind::SequenceBoundary,
            Lexeme::EpsilonMarker => TokenKind::EpsilonMarker,
            Lexeme::RuleTerminator => TokenKind::RuleTerminator,
            Lexeme::EndOfInput => TokenKind::EndOfInput,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub lexeme: Lexeme,
    pub position: Position,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        self.lexeme.kind()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LexErrorKind {
    #[error("unterminated literal")]
    UnterminatedLiteral,
    #[error("unterminated rule name")]
    UnterminatedIdentifier,
    #[error("illegal character {0:?}")]
    IllegalCharacter(char),
    #[error("line break inside a literal or name")]
    EmbeddedLineBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {position}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub position: Position,
}

/// Turns grammar source into [`Token`]s on demand.
///
/// The lexer stops after yielding `EndOfInput` or the first error. Cloning
/// it (or calling [`Lexer::restart`]) replays the stream from a known point.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    notation: &'a Notation,
    cursor: Position,
    /// A token was produced since the last rule terminator.
    rule_open: bool,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, notation: &'a Notation) -> Self {
        Lexer {
            source,
            notation,
            cursor: Position::START,
            rule_open: false,
            done: false,
        }
    }

    /// Rewind to the start of the source.
    pub fn restart(&mut self) {
        self.cursor = Position::START;
        self.rule_open = false;
        self.done = false;
    }

    /// Where the next token will start.
    pub fn location(&self) -> Position {
        self.cursor
    }

    fn rest(&self) -> &'a str {
        &self.source[self.cursor.offset..]
    }

    fn line_oriented(&self) -> bool {
        self.notation.terminator == Terminator::LineBreak
    }

    fn advance(&mut self, len: usize) {
        let consumed = &self.source[self.cursor.offset..self.cursor.offset + len];
        let mut chars = consumed.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\n' => {
                    self.cursor.line += 1;
                    self.cursor.column = 1;
                }
                // "\r\n" counts once, on the '\n'.
                '\r' if chars.peek() == Some(&'\n') => {}
                '\r' => {
                    self.cursor.line += 1;
                    self.cursor.column = 1;
                }
                _ => self.cursor.column += 1,
            }
        }
        self.cursor.offset += len;
    }

    /// Position `len` bytes past the cursor, without moving the cursor.
    fn position_after(&self, len: usize) -> Position {
        let mut ahead = self.clone();
        ahead.advance(len);
        ahead.cursor
    }

    fn error_at(&self, len: usize, kind: LexErrorKind) -> LexError {
        LexError {
            kind,
            position: self.position_after(len),
        }
    }

    /// Skips whitespace and comments. In line oriented notations, returns the
    /// position of the first line break crossed.
    fn skip_trivia(&mut self) -> Option<Position> {
        let line_oriented = self.line_oriented();
        let mut first_break = None;
        loop {
            let rest = self.rest();
            let spaces = if line_oriented {
                inline_space(rest)
            } else {
                any_space(rest)
            };
            let skipped = match spaces {
                Ok((after, _)) => rest.len() - after.len(),
                Err(_) => 0,
            };
            if skipped > 0 {
                self.advance(skipped);
                continue;
            }

            if let Some(prefix) = &self.notation.comment {
                if let Ok((after, _)) = comment(prefix, rest) {
                    self.advance(rest.len() - after.len());
                    continue;
                }
            }

            if line_oriented {
                if let Ok((after, _)) = line_break(rest) {
                    if first_break.is_none() {
                        first_break = Some(self.cursor);
                    }
                    self.advance(rest.len() - after.len());
                    continue;
                }
            }

            return first_break;
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let crossed = self.skip_trivia();
        if let Some(position) = crossed {
            if self.rule_open && !self.rest().starts_with(self.notation.alternative.as_str()) {
                self.rule_open = false;
                return Ok(Token {
                    lexeme: Lexeme::RuleTerminator,
                    position,
                });
            }
        }

        let position = self.cursor;
        if self.rest().is_empty() {
            if self.line_oriented() && self.rule_open {
                self.rule_open = false;
                return Ok(Token {
                    lexeme: Lexeme::RuleTerminator,
                    position,
                });
            }
            return Ok(Token {
                lexeme: Lexeme::EndOfInput,
                position,
            });
        }

        let (lexeme, len) = self.scan_token()?;
        self.advance(len);
        self.rule_open = lexeme != Lexeme::RuleTerminator;
        Ok(Token { lexeme, position })
    }

    /// Recognizes one token at the cursor, returning it with its length.
    fn scan_token(&self) -> Result<(Lexeme, usize), LexError> {
        let rest = self.rest();
        let notation = self.notation;

        if let Terminator::Symbol(symbol) = &notation.terminator {
            if let Ok((_, matched)) = keyword(symbol, rest) {
                return Ok((Lexeme::RuleTerminator, matched.len()));
            }
        }
        if let Ok((_, matched)) = keyword(&notation.assign, rest) {
            return Ok((Lexeme::RuleAssign, matched.len()));
        }
        if let Ok((_, matched)) = keyword(&notation.alternative, rest) {
            return Ok((Lexeme::AlternativeSeparator, matched.len()));
        }
        if let Some(separator) = &notation.concatenation {
            if let Ok((_, matched)) = keyword(separator, rest) {
                return Ok((Lexeme::SequenceBoundary, matched.len()));
            }
        }
        if !notation.epsilon.chars().all(is_name_char) {
            if let Ok((_, matched)) = keyword(&notation.epsilon, rest) {
                return Ok((Lexeme::EpsilonMarker, matched.len()));
            }
        }

        let first = match rest.chars().next() {
            Some(c) => c,
            None => return Ok((Lexeme::EndOfInput, 0)),
        };

        if notation.is_quote(first) {
            return self.scan_literal(first);
        }
        if let Some((open, close)) = notation.name_brackets {
            if first == open {
                return self.scan_bracketed_name(open, close);
            }
        }
        if let Ok((_, matched)) = bare_name(rest) {
            if matched == notation.epsilon {
                return Ok((Lexeme::EpsilonMarker, matched.len()));
            }
            let name = Identifier::from_name(matched)
                .map_err(|e| self.name_error(e, 0, first))?;
            return Ok((Lexeme::Identifier(name), matched.len()));
        }

        Err(self.error_at(0, LexErrorKind::IllegalCharacter(first)))
    }

    fn scan_literal(&self, quote: char) -> Result<(Lexeme, usize), LexError> {
        let rest = self.rest();
        let escape = self.notation.escape;
        let mut text = String::new();
        let mut chars = rest.char_indices().skip(1);
        loop {
            match chars.next() {
                None => return Err(self.error_at(0, LexErrorKind::UnterminatedLiteral)),
                Some((i, '\n')) | Some((i, '\r')) => {
                    return Err(self.error_at(i, LexErrorKind::EmbeddedLineBreak))
                }
                Some((_, c)) if Some(c) == escape => match chars.next() {
                    None => return Err(self.error_at(0, LexErrorKind::UnterminatedLiteral)),
                    Some((j, '\n')) | Some((j, '\r')) => {
                        return Err(self.error_at(j, LexErrorKind::EmbeddedLineBreak))
                    }
                    Some((_, escaped)) => text.push(escaped),
                },
                Some((i, c)) if c == quote => {
                    let literal = Literal::new(text)
                        .map_err(|_| self.error_at(i, LexErrorKind::EmbeddedLineBreak))?;
                    return Ok((Lexeme::QuotedLiteral(literal), i + c.len_utf8()));
                }
                Some((_, c)) => text.push(c),
            }
        }
    }

    fn scan_bracketed_name(&self, open: char, close: char) -> Result<(Lexeme, usize), LexError> {
        let rest = self.rest();
        let inner = &rest[open.len_utf8()..];
        for (i, c) in inner.char_indices() {
            let at = open.len_utf8() + i;
            match c {
                '\n' | '\r' => return Err(self.error_at(at, LexErrorKind::EmbeddedLineBreak)),
                c if c == close => {
                    let name = Identifier::from_name(&inner[..i])
                        .map_err(|e| self.name_error(e, at, close))?;
                    return Ok((Lexeme::Identifier(name), at + close.len_utf8()));
                }
                _ => {}
            }
        }
        Err(self.error_at(0, LexErrorKind::UnterminatedIdentifier))
    }

    fn name_error(&self, err: StructureError, at: usize, c: char) -> LexError {
        match err {
            StructureError::Text(_) => self.error_at(at, LexErrorKind::EmbeddedLineBreak),
            _ => self.error_at(at, LexErrorKind::IllegalCharacter(c)),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.next_token();
        match &result {
            Ok(token) => {
                trace!(kind = %token.kind(), position = %token.position, "token");
                if token.lexeme == Lexeme::EndOfInput {
                    self.done = true;
                }
            }
            Err(_) => self.done = true,
        }
        Some(result)
    }
}

pub(crate) fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn keyword<'i>(expected: &str, input: &'i str) -> IResult<&'i str, &'i str> {
    tag(expected)(input)
}

fn inline_space(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c.is_whitespace() && c != '\n' && c != '\r')(input)
}

fn any_space(input: &str) -> IResult<&str, &str> {
    take_while(char::is_whitespace)(input)
}

fn line_break(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c == '\n' || c == '\r')(input)
}

fn comment<'i>(prefix: &str, input: &'i str) -> IResult<&'i str, &'i str> {
    recognize(pair(tag(prefix), take_till(|c: char| c == '\n' || c == '\r')))(input)
}

fn bare_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_alphanumeric() || c == '_'),
        take_while(is_name_char),
    ))(input)
}
