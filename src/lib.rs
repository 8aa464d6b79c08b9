//! Compile a BNF grammar into a type hierarchy and construction protocols.
//!
//! ```ignore
//! let compilation = gramtype::compile(source, &CompileOptions::default())?;
//! let number = compilation.rule("number").unwrap();
//! let machine = compilation.builders().protocol(number).as_machine().unwrap();
//! assert!(machine.accepts_names(&["One", "Two", "Build"]));
//! ```
//!
//! Rust types for a grammar are available through `#[derive(Grammar)]`.

use tracing::{debug, instrument};

pub use bnf::{
    parse, Definition, DefinitionChoice, DefinitionPart, Grammar, Identifier, LexError,
    LexErrorKind, Literal, Notation, ParseError, Position, Rule, SingleLineText, StructureError,
    Terminator, TextError,
};
pub use derive::Grammar;
pub use typegen::{
    analyze, synthesize, synthesize_incremental, Action, AnalysisError, AnalyzedGrammar,
    AnalyzerOptions, BuilderProtocol, BuilderSet, BuilderState, Capability, CompositionContract,
    ConstructionShape, Constructor, Fill, Generated, ProtocolError, RecursionClass, Renderer,
    RuleId, Selection, SemanticError, StateMachine, Step, StepKind, SubTerm, Transition,
    TypeModel, Variant, Warning,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub notation: Notation,
    pub analyzer: AnalyzerOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("parse grammar: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Everything derived from one grammar.
#[derive(Debug, Clone)]
pub struct Compilation {
    analyzed: AnalyzedGrammar,
    model: TypeModel,
    builders: BuilderSet,
}

impl Compilation {
    pub fn analyzed(&self) -> &AnalyzedGrammar {
        &self.analyzed
    }

    pub fn model(&self) -> &TypeModel {
        &self.model
    }

    pub fn builders(&self) -> &BuilderSet {
        &self.builders
    }

    pub fn warnings(&self) -> &[Warning] {
        self.analyzed.warnings()
    }

    /// Look up a rule by its written name.
    pub fn rule(&self, name: &str) -> Option<RuleId> {
        let name = Identifier::from_name(name).ok()?;
        self.analyzed.lookup(&name)
    }

    pub fn generated(&self) -> Generated<'_> {
        Generated {
            analyzed: &self.analyzed,
            model: &self.model,
            builders: &self.builders,
        }
    }

    pub fn render<R: Renderer>(&self, renderer: &R) -> R::Output {
        renderer.render(&self.generated())
    }
}

/// Parse, analyze and generate in one go.
///
/// Lexical and syntax errors stop at the first one. Semantic errors are
/// reported together.
#[instrument(skip_all)]
pub fn compile(source: &str, options: &CompileOptions) -> Result<Compilation, CompileError> {
    let grammar = parse(source, &options.notation)?;
    let analyzed = analyze(&grammar, &options.analyzer)?;
    let model = TypeModel::build(&analyzed);
    let builders = synthesize(&analyzed, &model);
    debug!(
        rules = grammar.rules().len(),
        warnings = analyzed.warnings().len(),
        "compiled grammar"
    );
    Ok(Compilation {
        analyzed,
        model,
        builders,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn outputs_are_shareable() {
        assert_send_sync::<Compilation>();
        assert_send_sync::<CompileError>();
    }

    #[test]
    fn rule_lookup_by_written_name() {
        let compilation = compile(
            "nonZeroDigit ::= \"1\" | \"2\"\n",
            &CompileOptions::default(),
        )
        .unwrap();
        assert_eq!(compilation.rule("nonZeroDigit"), Some(RuleId(0)));
        assert_eq!(compilation.rule("non Zero_Digit"), Some(RuleId(0)));
        assert_eq!(compilation.rule("digit"), None);
        assert_eq!(compilation.rule(""), None);
    }

    #[test]
    fn errors_by_stage() {
        let err = compile("a ::= \"x\n", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)), "err: {:?}", err);

        let err = compile("a ::= b\n", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::Analysis(_)), "err: {:?}", err);
    }
}
