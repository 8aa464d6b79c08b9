//! Analysis of a parsed grammar and the abstract types and builders derived
//! from it.
//!
//! [`analysis::analyze`] checks a [`bnf::Grammar`], [`model::TypeModel`]
//! turns the result into a capability hierarchy, and [`protocol::synthesize`]
//! derives a construction protocol per rule. Renderers consume all three
//! through [`Renderer`].

use std::fmt::{self, Display};

pub mod analysis;
pub mod error;
pub mod graph;
pub mod model;
pub mod names;
pub mod protocol;

pub use analysis::{
    analyze, AnalyzedGrammar, AnalyzerOptions, ConstructionShape, RecursionClass, RuleAnalysis,
    Warning,
};
pub use error::{AnalysisError, ProtocolError, SemanticError};
pub use graph::RuleGraph;
pub use model::{Capability, SubTerm, TypeModel, Variant};
pub use protocol::{
    synthesize, synthesize_incremental, Action, BuilderProtocol, BuilderSet, BuilderState,
    CompositionContract, Constructor, Fill, Selection, StateMachine, Step, StepKind, Transition,
};

/// Position of a rule in its grammar, in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub usize);

impl RuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything a renderer gets to see.
#[derive(Debug, Clone, Copy)]
pub struct Generated<'a> {
    pub analyzed: &'a AnalyzedGrammar,
    pub model: &'a TypeModel,
    pub builders: &'a BuilderSet,
}

/// Turns the generated model into host-language output.
pub trait Renderer {
    type Output;

    fn render(&self, generated: &Generated<'_>) -> Self::Output;
}
