//! Recursive descent over the token stream, one function per nonterminal:
//!
//! ```text
//! grammar    := rule+
//! rule       := identifier RuleAssign definition RuleTerminator
//! definition := choice (AlternativeSeparator choice)*
//! choice     := part* | EpsilonMarker
//! part       := literal | identifier
//! ```
//!
//! No semantic checks happen here. Undefined and duplicate rules are the
//! analyzer's business.

use tracing::{debug, instrument};

use crate::error::ParseError;
use crate::lexer::{Lexeme, Lexer, Token, TokenKind};
use crate::notation::Notation;
use crate::{Definition, DefinitionChoice, DefinitionPart, Grammar, Identifier, Rule};

/// Parse a full grammar.
#[instrument(skip_all)]
pub fn parse(source: &str, notation: &Notation) -> Result<Grammar, ParseError> {
    let mut parser = Parser::new(source, notation)?;
    let grammar = parser.grammar()?;
    debug!(rules = grammar.rules().len(), "parsed grammar");
    Ok(grammar)
}

/// Parse source holding exactly one rule.
pub fn parse_rule(source: &str, notation: &Notation) -> Result<Rule, ParseError> {
    let mut parser = Parser::new(source, notation)?;
    let rule = parser.rule()?;
    parser.expect(TokenKind::EndOfInput)?;
    Ok(rule)
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    concatenated: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, notation: &'a Notation) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source, notation);
        let current = pull(&mut lexer)?;
        Ok(Parser {
            lexer,
            current,
            concatenated: notation.concatenation.is_some(),
        })
    }

    pub fn grammar(&mut self) -> Result<Grammar, ParseError> {
        let mut rules = vec![self.rule()?];
        while self.current.kind() != TokenKind::EndOfInput {
            rules.push(self.rule()?);
        }
        Ok(Grammar(rules))
    }

    pub fn rule(&mut self) -> Result<Rule, ParseError> {
        let name = self.identifier()?;
        self.expect(TokenKind::RuleAssign)?;
        let definition = self.definition()?;
        self.expect(TokenKind::RuleTerminator)?;
        Ok(Rule { name, definition })
    }

    fn definition(&mut self) -> Result<Definition, ParseError> {
        let mut choices = vec![self.choice()?];
        while self.current.kind() == TokenKind::AlternativeSeparator {
            self.bump()?;
            choices.push(self.choice()?);
        }
        Ok(Definition(choices))
    }

    fn choice(&mut self) -> Result<DefinitionChoice, ParseError> {
        if self.current.kind() == TokenKind::EpsilonMarker {
            self.bump()?;
            return Ok(DefinitionChoice(vec![DefinitionPart::Epsilon]));
        }

        let mut parts = Vec::new();
        while starts_part(self.current.kind()) {
            parts.push(self.part()?);
            if !self.concatenated {
                continue;
            }
            if self.current.kind() != TokenKind::SequenceBoundary {
                break;
            }
            self.bump()?;
            if !starts_part(self.current.kind()) {
                return Err(self.unexpected(TokenKind::Identifier));
            }
        }
        Ok(DefinitionChoice(parts))
    }

    fn part(&mut self) -> Result<DefinitionPart, ParseError> {
        let token = self.bump()?;
        match token.lexeme {
            Lexeme::Identifier(name) => Ok(DefinitionPart::Reference(name)),
            Lexeme::QuotedLiteral(literal) => Ok(DefinitionPart::Literal(literal)),
            other => Err(ParseError::UnexpectedToken {
                expected: TokenKind::Identifier,
                found: other.kind(),
                position: token.position,
            }),
        }
    }

    fn identifier(&mut self) -> Result<Identifier, ParseError> {
        let token = self.expect(TokenKind::Identifier)?;
        match token.lexeme {
            Lexeme::Identifier(name) => Ok(name),
            other => Err(ParseError::UnexpectedToken {
                expected: TokenKind::Identifier,
                found: other.kind(),
                position: token.position,
            }),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.current.kind() != kind {
            return Err(self.unexpected(kind));
        }
        self.bump()
    }

    fn unexpected(&self, expected: TokenKind) -> ParseError {
        ParseError::UnexpectedToken {
            expected,
            found: self.current.kind(),
            position: self.current.position,
        }
    }

    /// Returns the current token and moves to the next one.
    fn bump(&mut self) -> Result<Token, ParseError> {
        let next = pull(&mut self.lexer)?;
        Ok(std::mem::replace(&mut self.current, next))
    }
}

fn starts_part(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Identifier | TokenKind::QuotedLiteral)
}

fn pull(lexer: &mut Lexer) -> Result<Token, ParseError> {
    match lexer.next() {
        Some(token) => Ok(token?),
        None => Ok(Token {
            lexeme: Lexeme::EndOfInput,
            position: lexer.location(),
        }),
    }
}
