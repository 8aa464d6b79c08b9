//! Construction protocols.
//!
//! `Flat` and `LeftRecursiveSequence` rules get an incremental builder whose
//! legal call sequences are exactly the derivations of the rule. Everything
//! else gets a composition contract: one constructor per alternative taking
//! already built sub-terms.
//!
//! Machines are plain data. Renderers decide how states become types.

use bnf::{Identifier, SingleLineText};
use tracing::{debug, instrument, trace};

use crate::analysis::{AnalyzedGrammar, ConstructionShape, RecursionClass};
use crate::error::ProtocolError;
use crate::model::{SubTerm, TypeModel, Variant};
use crate::names::{self, NameSet};
use crate::RuleId;

/// Enumerable rules with more values than this get an argument step instead.
const MAX_VALUES: usize = 32;

/// Name reserved for [`Action::Build`].
pub const BUILD: &str = "Build";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuilderState {
    /// Nothing chosen yet.
    Initial,
    /// A base value exists and may keep growing.
    Growing,
    /// A value exists and can only be built.
    Complete,
    /// `build` was called.
    Built,
}

/// How one sub-term of a selected variant is filled in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fill {
    /// The value built so far.
    Previous,
    Literal(SingleLineText),
    Empty,
    /// A value the caller passes to the step.
    Argument(RuleId),
    /// A value fixed by the step itself.
    Fixed(Box<Selection>),
}

/// A variant of `rule` with every sub-term accounted for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    pub rule: RuleId,
    pub variant: usize,
    /// One per term of the variant.
    pub fills: Vec<Fill>,
}

impl Selection {
    /// Rules the caller has to supply, in order.
    pub fn arguments(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.fills.iter().filter_map(|fill| match fill {
            Fill::Argument(id) => Some(*id),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Picks the alternative of a flat rule.
    Choice,
    /// Starts a sequence.
    Base,
    /// Extends a sequence by one suffix.
    Growth,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: Identifier,
    pub kind: StepKind,
    pub selection: Selection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Step(usize),
    Build,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transition {
    pub from: BuilderState,
    pub action: Action,
    pub to: BuilderState,
}

/// An incremental builder as a transition table. Starts in
/// [`BuilderState::Initial`] and accepts in [`BuilderState::Built`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMachine {
    pub rule: RuleId,
    pub shape: ConstructionShape,
    pub states: Vec<BuilderState>,
    pub steps: Vec<Step>,
    pub transitions: Vec<Transition>,
}

impl StateMachine {
    pub fn next(&self, from: BuilderState, action: Action) -> Option<BuilderState> {
        self.transitions
            .iter()
            .find(|t| t.from == from && t.action == action)
            .map(|t| t.to)
    }

    /// Actions legal in `state`, in table order.
    pub fn available(&self, state: BuilderState) -> impl Iterator<Item = Action> + '_ {
        self.transitions
            .iter()
            .filter(move |t| t.from == state)
            .map(|t| t.action)
    }

    /// The step leaving `state` whose pascal cased name is `name`.
    pub fn step_named(&self, state: BuilderState, name: &str) -> Option<usize> {
        self.available(state).find_map(|action| match action {
            Action::Step(i) if self.steps[i].name.to_pascal_case() == name => Some(i),
            _ => None,
        })
    }

    /// Steps leaving `state`.
    pub fn steps_from(&self, state: BuilderState) -> impl Iterator<Item = (usize, &Step)> + '_ {
        self.available(state).filter_map(move |action| match action {
            Action::Step(i) => Some((i, &self.steps[i])),
            Action::Build => None,
        })
    }

    pub fn accepts(&self, actions: &[Action]) -> bool {
        let mut state = BuilderState::Initial;
        for action in actions {
            match self.next(state, *action) {
                Some(next) => state = next,
                None => return false,
            }
        }
        state == BuilderState::Built
    }

    /// Like [`StateMachine::accepts`], naming steps by their pascal cased name
    /// and the build action by `"Build"`.
    pub fn accepts_names(&self, names: &[&str]) -> bool {
        let mut state = BuilderState::Initial;
        for name in names {
            let action = if *name == BUILD {
                Action::Build
            } else {
                match self.step_named(state, name) {
                    Some(i) => Action::Step(i),
                    None => return false,
                }
            };
            match self.next(state, action) {
                Some(next) => state = next,
                None => return false,
            }
        }
        state == BuilderState::Built
    }
}

/// A constructor taking every sub-term value up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    pub name: Identifier,
    pub variant: usize,
    pub parameters: Vec<RuleId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionContract {
    pub rule: RuleId,
    pub constructors: Vec<Constructor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderProtocol {
    Incremental(StateMachine),
    Composition(CompositionContract),
}

impl BuilderProtocol {
    pub fn rule(&self) -> RuleId {
        match self {
            BuilderProtocol::Incremental(machine) => machine.rule,
            BuilderProtocol::Composition(contract) => contract.rule,
        }
    }

    pub fn as_machine(&self) -> Option<&StateMachine> {
        match self {
            BuilderProtocol::Incremental(machine) => Some(machine),
            BuilderProtocol::Composition(_) => None,
        }
    }
}

/// One protocol per rule, indexed by [`RuleId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderSet {
    protocols: Vec<BuilderProtocol>,
}

impl BuilderSet {
    pub fn protocol(&self, rule: RuleId) -> &BuilderProtocol {
        &self.protocols[rule.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuilderProtocol> {
        self.protocols.iter()
    }

    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }
}

#[instrument(skip_all)]
pub fn synthesize(analyzed: &AnalyzedGrammar, model: &TypeModel) -> BuilderSet {
    let protocols = analyzed
        .rule_ids()
        .map(|rule| match incremental(analyzed, model, rule) {
            Some(machine) => BuilderProtocol::Incremental(machine),
            None => BuilderProtocol::Composition(composition(model, rule)),
        })
        .collect();
    BuilderSet { protocols }
}

pub fn synthesize_incremental(
    analyzed: &AnalyzedGrammar,
    model: &TypeModel,
    rule: RuleId,
) -> Result<StateMachine, ProtocolError> {
    incremental(analyzed, model, rule).ok_or_else(|| ProtocolError::UnsupportedShape {
        rule: analyzed.rule(rule).name.clone(),
    })
}

fn incremental(analyzed: &AnalyzedGrammar, model: &TypeModel, rule: RuleId) -> Option<StateMachine> {
    let shape = analyzed.shape(rule);
    let variants = &model.capability(rule).variants;
    let mut machine = match shape {
        ConstructionShape::Flat => StateMachine {
            rule,
            shape,
            states: vec![
                BuilderState::Initial,
                BuilderState::Complete,
                BuilderState::Built,
            ],
            steps: Vec::new(),
            transitions: Vec::new(),
        },
        ConstructionShape::LeftRecursiveSequence => StateMachine {
            rule,
            shape,
            states: vec![
                BuilderState::Initial,
                BuilderState::Growing,
                BuilderState::Built,
            ],
            steps: Vec::new(),
            transitions: Vec::new(),
        },
        ConstructionShape::General => return None,
    };

    let mut initial = NameSet::with_reserved([BUILD]);
    let mut growing = NameSet::with_reserved([BUILD]);
    let recursion = &analyzed.analysis(rule).recursion;
    for (index, (variant, class)) in variants.iter().zip(recursion).enumerate() {
        let (kind, from, to, taken) = match (shape, class) {
            (ConstructionShape::Flat, _) => (
                StepKind::Choice,
                BuilderState::Initial,
                BuilderState::Complete,
                &mut initial,
            ),
            (_, RecursionClass::NonRecursive) => (
                StepKind::Base,
                BuilderState::Initial,
                BuilderState::Growing,
                &mut initial,
            ),
            _ => (
                StepKind::Growth,
                BuilderState::Growing,
                BuilderState::Growing,
                &mut growing,
            ),
        };
        for (name, selection) in expand(analyzed, model, rule, index, variant, kind) {
            let name = taken.claim(name);
            trace!(rule = %analyzed.rule(rule).name, step = %name, ?kind, "step");
            machine.transitions.push(Transition {
                from,
                action: Action::Step(machine.steps.len()),
                to,
            });
            machine.steps.push(Step {
                name,
                kind,
                selection,
            });
        }
    }

    let ready = match shape {
        ConstructionShape::Flat => BuilderState::Complete,
        _ => BuilderState::Growing,
    };
    machine.transitions.push(Transition {
        from: ready,
        action: Action::Build,
        to: BuilderState::Built,
    });

    debug!(
        rule = %analyzed.rule(rule).name,
        %shape,
        steps = machine.steps.len(),
        "synthesized builder"
    );
    Some(machine)
}

fn composition(model: &TypeModel, rule: RuleId) -> CompositionContract {
    let constructors = model
        .capability(rule)
        .variants
        .iter()
        .enumerate()
        .map(|(variant, v)| Constructor {
            name: v.name.clone(),
            variant,
            parameters: v.rule_terms().collect(),
        })
        .collect();
    CompositionContract { rule, constructors }
}

/// The named steps contributed by one variant. A payload holding exactly one
/// rule value of an enumerable rule becomes one step per value.
fn expand(
    analyzed: &AnalyzedGrammar,
    model: &TypeModel,
    rule: RuleId,
    index: usize,
    variant: &Variant,
    kind: StepKind,
) -> Vec<(Identifier, Selection)> {
    let skip = match kind {
        StepKind::Growth => 1,
        StepKind::Choice | StepKind::Base => 0,
    };
    let fills: Vec<Fill> = variant
        .terms
        .iter()
        .enumerate()
        .map(|(i, term)| if i < skip { Fill::Previous } else { fill(term) })
        .collect();
    let payload = &variant.terms[skip.min(variant.terms.len())..];

    let arguments: Vec<(usize, RuleId)> = payload
        .iter()
        .enumerate()
        .filter_map(|(i, term)| match term {
            SubTerm::Rule(id) => Some((i, *id)),
            _ => None,
        })
        .collect();
    if let [(at, argument)] = arguments.as_slice() {
        if let Some(values) = values(analyzed, model, *argument) {
            return values
                .into_iter()
                .map(|(value, selection)| {
                    let mut fills = fills.clone();
                    fills[skip + at] = Fill::Fixed(Box::new(selection));
                    let name = payload_name(analyzed, payload, Some((*at, &value)), &variant.name);
                    (
                        name,
                        Selection {
                            rule,
                            variant: index,
                            fills,
                        },
                    )
                })
                .collect();
        }
    }

    let name = match kind {
        StepKind::Growth => payload_name(analyzed, payload, None, &variant.name),
        StepKind::Choice | StepKind::Base => variant.name.clone(),
    };
    vec![(
        name,
        Selection {
            rule,
            variant: index,
            fills,
        },
    )]
}

fn fill(term: &SubTerm) -> Fill {
    match term {
        SubTerm::Rule(id) => Fill::Argument(*id),
        SubTerm::Literal(text) => Fill::Literal(text.clone()),
        SubTerm::Empty => Fill::Empty,
    }
}

fn payload_name(
    analyzed: &AnalyzedGrammar,
    payload: &[SubTerm],
    expanded: Option<(usize, &Identifier)>,
    fallback: &Identifier,
) -> Identifier {
    let parts: Vec<Identifier> = payload
        .iter()
        .enumerate()
        .map(|(i, term)| match (term, expanded) {
            (_, Some((at, value))) if at == i => value.clone(),
            (SubTerm::Rule(id), _) => analyzed.rule(*id).name.clone(),
            (SubTerm::Literal(text), _) => names::literal_name(text, fallback),
            (SubTerm::Empty, _) => names::literal_name("", fallback),
        })
        .collect();
    names::join(&parts, fallback)
}

/// Every value of a finitely enumerable rule: a flat rule whose alternatives
/// are terminal or bare references to enumerable rules.
fn values(
    analyzed: &AnalyzedGrammar,
    model: &TypeModel,
    rule: RuleId,
) -> Option<Vec<(Identifier, Selection)>> {
    if analyzed.shape(rule) != ConstructionShape::Flat {
        return None;
    }
    let mut out = Vec::new();
    for (index, variant) in model.capability(rule).variants.iter().enumerate() {
        match variant.terms.as_slice() {
            [SubTerm::Rule(sub)] => {
                for (name, inner) in values(analyzed, model, *sub)? {
                    out.push((
                        name,
                        Selection {
                            rule,
                            variant: index,
                            fills: vec![Fill::Fixed(Box::new(inner))],
                        },
                    ));
                }
            }
            terms if variant.is_terminal() => out.push((
                variant.name.clone(),
                Selection {
                    rule,
                    variant: index,
                    fills: terms.iter().map(fill).collect(),
                },
            )),
            _ => return None,
        }
        if out.len() > MAX_VALUES {
            return None;
        }
    }
    Some(out)
}
