use bnf::Identifier;

use crate::RuleId;

/// A grammar that parses but cannot be turned into types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SemanticError {
    #[error("rule <{rule}> alternative {alternative} refers to undefined rule <{reference}>")]
    UndefinedRuleReference {
        rule: Identifier,
        reference: Identifier,
        /// Index of the alternative within the rule.
        alternative: usize,
        /// Index of the part within the alternative.
        part: usize,
    },
    #[error("rule <{name}> is already defined as rule {first}")]
    DuplicateRuleName {
        name: Identifier,
        first: RuleId,
        duplicate: RuleId,
    },
    #[error("start rule <{name}> is not defined")]
    UnknownStartRule { name: Identifier },
    #[error("rule <{rule}> cannot derive a finite sequence")]
    UnproductiveRule { rule: Identifier },
}

/// Every semantic error found in one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", summarize(.errors))]
pub struct AnalysisError {
    pub errors: Vec<SemanticError>,
}

fn summarize(errors: &[SemanticError]) -> String {
    let mut out = format!("grammar has {} error(s)", errors.len());
    for err in errors {
        out.push_str("\n  ");
        out.push_str(&err.to_string());
    }
    out
}

/// Internal contract violations of the protocol synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("rule <{rule}> has no incremental construction protocol")]
    UnsupportedShape { rule: Identifier },
}
