use bnf::{ParseError, StructureError};
use typegen::AnalysisError;

pub type Result<T> = std::result::Result<T, DeriveError>;

#[derive(Debug, thiserror::Error)]
pub enum DeriveError {
    #[error("no grammar source provided, expected `bnf_inline` or `bnf_file`")]
    MissingGrammarSource,
    #[error("at most one grammar source can be provided")]
    MultipleGrammarSources,
    #[error("attribute `{0}` given more than once")]
    DuplicateAttribute(String),
    #[error("attribute `{0}` must be a string literal")]
    NotAString(String),
    #[error("unknown notation `{0}`, expected `bnf` or `ebnf`")]
    UnknownNotation(String),
    #[error("read grammar file {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid name: {0}")]
    Name(#[from] StructureError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Syn(#[from] syn::Error),
}
