//! The type hierarchy: one capability per rule, one variant per alternative.
//!
//! A variant that is nothing but a reference to another rule does not wrap a
//! value of that rule. Instead the referenced rule's capability refines the
//! referencing one, so every value of the sub-rule is usable where the
//! super-rule is expected.

use std::collections::{BTreeMap, BTreeSet};

use bnf::{DefinitionChoice, DefinitionPart, Identifier, SingleLineText};
use tracing::{debug, instrument};

use crate::analysis::AnalyzedGrammar;
use crate::names::{self, NameSet};
use crate::RuleId;

/// One ordered constituent of a variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubTerm {
    Rule(RuleId),
    Literal(SingleLineText),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: Identifier,
    pub terms: Vec<SubTerm>,
    /// Set when this variant is a bare reference that became a refinement
    /// edge. The referenced rule is the only term.
    pub refines: Option<RuleId>,
}

impl Variant {
    /// Rules this variant holds values of, in order.
    pub fn rule_terms(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.terms.iter().filter_map(|term| match term {
            SubTerm::Rule(id) => Some(*id),
            SubTerm::Literal(_) | SubTerm::Empty => None,
        })
    }

    /// Whether the variant carries no rule values at all.
    pub fn is_terminal(&self) -> bool {
        self.rule_terms().next().is_none()
    }

    /// The text of a terminal variant, with empty terms producing nothing.
    pub fn text(&self) -> Option<String> {
        if !self.is_terminal() {
            return None;
        }
        Some(
            self.terms
                .iter()
                .filter_map(|term| match term {
                    SubTerm::Literal(text) => Some(text.as_str()),
                    SubTerm::Rule(_) | SubTerm::Empty => None,
                })
                .collect(),
        )
    }
}

/// The abstract type generated for one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub rule: RuleId,
    pub name: Identifier,
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeModel {
    capabilities: Vec<Capability>,
    /// capability -> capabilities it refines. Acyclic.
    supertypes: BTreeMap<RuleId, BTreeSet<RuleId>>,
}

impl TypeModel {
    #[instrument(skip_all)]
    pub fn build(analyzed: &AnalyzedGrammar) -> TypeModel {
        let mut model = TypeModel {
            capabilities: Vec::new(),
            supertypes: BTreeMap::new(),
        };

        for owner in analyzed.rule_ids() {
            let rule = analyzed.rule(owner);
            let mut taken = NameSet::new();
            let mut variants = Vec::with_capacity(rule.definition.choices().len());
            for choice in rule.definition.choices() {
                let terms = sub_terms(analyzed, choice);
                let name = taken.claim(variant_name(analyzed, &rule.name, &terms));
                let refines = match terms.as_slice() {
                    [SubTerm::Rule(sub)] if *sub != owner && !model.is_subtype(owner, *sub) => {
                        model.supertypes.entry(*sub).or_default().insert(owner);
                        Some(*sub)
                    }
                    _ => None,
                };
                variants.push(Variant {
                    name,
                    terms,
                    refines,
                });
            }
            model.capabilities.push(Capability {
                rule: owner,
                name: rule.name.clone(),
                variants,
            });
        }

        debug!(
            capabilities = model.capabilities.len(),
            refinements = model.refinements().count(),
            "built type model"
        );
        model
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn capability(&self, id: RuleId) -> &Capability {
        &self.capabilities[id.index()]
    }

    /// Direct supertypes of `id`.
    pub fn supertypes(&self, id: RuleId) -> impl Iterator<Item = RuleId> + '_ {
        self.supertypes.get(&id).into_iter().flatten().copied()
    }

    /// Every `(sub, super)` refinement edge.
    pub fn refinements(&self) -> impl Iterator<Item = (RuleId, RuleId)> + '_ {
        self.supertypes
            .iter()
            .flat_map(|(sub, sups)| sups.iter().map(move |sup| (*sub, *sup)))
    }

    /// Whether `sub` is `sup` or refines it through one or more edges.
    pub fn is_subtype(&self, sub: RuleId, sup: RuleId) -> bool {
        let mut stack = vec![sub];
        let mut seen = BTreeSet::new();
        while let Some(id) = stack.pop() {
            if id == sup {
                return true;
            }
            if seen.insert(id) {
                stack.extend(self.supertypes(id));
            }
        }
        false
    }
}

fn sub_terms(analyzed: &AnalyzedGrammar, choice: &DefinitionChoice) -> Vec<SubTerm> {
    choice
        .parts()
        .iter()
        .filter_map(|part| match part {
            DefinitionPart::Literal(literal) => Some(SubTerm::Literal(literal.text().clone())),
            DefinitionPart::Reference(name) => analyzed.lookup(name).map(SubTerm::Rule),
            DefinitionPart::Epsilon => Some(SubTerm::Empty),
        })
        .collect()
}

fn variant_name(analyzed: &AnalyzedGrammar, owner: &Identifier, terms: &[SubTerm]) -> Identifier {
    let rules: Vec<RuleId> = terms
        .iter()
        .filter_map(|term| match term {
            SubTerm::Rule(id) => Some(*id),
            _ => None,
        })
        .collect();

    if rules.is_empty() {
        let text: String = terms
            .iter()
            .filter_map(|term| match term {
                SubTerm::Literal(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        return names::literal_name(&text, owner);
    }
    if let [SubTerm::Rule(id)] = terms {
        return analyzed.rule(*id).name.clone();
    }

    let parts: Vec<Identifier> = terms
        .iter()
        .map(|term| match term {
            SubTerm::Rule(id) => analyzed.rule(*id).name.clone(),
            SubTerm::Literal(text) => names::literal_name(text, owner),
            SubTerm::Empty => names::literal_name("", owner),
        })
        .collect();
    names::join(&parts, owner)
}
