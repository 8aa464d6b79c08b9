use crate::lexer::{LexError, Position, TokenKind};
use crate::text::TextError;

/// A grammar value was assembled in a way its invariants forbid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructureError {
    #[error("identifier has no fragments")]
    EmptyIdentifier,
    #[error("definition has no alternatives")]
    EmptyDefinition,
    #[error("grammar has no rules")]
    EmptyGrammar,
    #[error(transparent)]
    Text(#[from] TextError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("expected {expected}, found {found} at {position}")]
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
        position: Position,
    },
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            ParseError::Lex(e) => e.position,
            ParseError::UnexpectedToken { position, .. } => *position,
        }
    }
}
