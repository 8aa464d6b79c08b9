//! Static analysis of a parsed grammar.
//!
//! Checks run in order: name resolution and uniqueness (batched), then
//! productivity, then reachability, recursion classification and shape
//! assignment. Nothing here mutates the input grammar.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::{self, Display};

use bnf::{DefinitionChoice, DefinitionPart, Grammar, Identifier, Rule};
use tracing::{debug, instrument, warn};

use crate::error::{AnalysisError, SemanticError};
use crate::graph::RuleGraph;
use crate::RuleId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyzerOptions {
    /// Rule to compute reachability from. Defaults to the first rule.
    pub start_rule: Option<Identifier>,
}

/// Where an alternative refers back to its own rule.
///
/// A part is a recursive occurrence when it references the owning rule, or a
/// rule from which the owning rule is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecursionClass {
    NonRecursive,
    /// Recursive occurrence in first position only.
    Left,
    /// Recursive occurrence in last position only.
    Right,
    /// Recursive occurrences strictly between the first and last position.
    Internal,
    /// More than one of the above.
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructionShape {
    /// No alternative refers back to the rule.
    Flat,
    /// `rule := base | rule suffix`, with non-recursive bases and suffixes.
    LeftRecursiveSequence,
    /// Everything else. Built by composing whole sub-terms.
    General,
}

impl Display for ConstructionShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ConstructionShape::Flat => "flat",
            ConstructionShape::LeftRecursiveSequence => "left recursive sequence",
            ConstructionShape::General => "general",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleAnalysis {
    /// One entry per alternative, in order.
    pub recursion: Vec<RecursionClass>,
    pub shape: ConstructionShape,
    pub reachable: bool,
}

/// Findings that do not stop generation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    #[error("rule <{rule}> is unreachable from start rule <{start}>")]
    UnreachableRule { rule: Identifier, start: Identifier },
}

/// A closed, productive grammar together with everything derived from it.
#[derive(Debug, Clone)]
pub struct AnalyzedGrammar {
    grammar: Grammar,
    index: HashMap<Identifier, RuleId>,
    graph: RuleGraph,
    rules: Vec<RuleAnalysis>,
    start: RuleId,
    warnings: Vec<Warning>,
}

impl AnalyzedGrammar {
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn graph(&self) -> &RuleGraph {
        &self.graph
    }

    pub fn start(&self) -> RuleId {
        self.start
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = RuleId> {
        (0..self.rules.len()).map(RuleId)
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.grammar.rules()[id.index()]
    }

    pub fn analysis(&self, id: RuleId) -> &RuleAnalysis {
        &self.rules[id.index()]
    }

    pub fn shape(&self, id: RuleId) -> ConstructionShape {
        self.rules[id.index()].shape
    }

    pub fn lookup(&self, name: &Identifier) -> Option<RuleId> {
        self.index.get(name).copied()
    }

    /// Whether `to` is reachable from `from` in zero or more steps.
    pub fn reaches(&self, from: RuleId, to: RuleId) -> bool {
        self.graph.reaches(from, to)
    }
}

#[instrument(skip_all)]
pub fn analyze(grammar: &Grammar, options: &AnalyzerOptions) -> Result<AnalyzedGrammar, AnalysisError> {
    let rules = grammar.rules();

    let mut index = HashMap::with_capacity(rules.len());
    let mut duplicates = Vec::new();
    for (i, rule) in rules.iter().enumerate() {
        match index.entry(rule.name.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(RuleId(i));
            }
            Entry::Occupied(entry) => duplicates.push(SemanticError::DuplicateRuleName {
                name: rule.name.clone(),
                first: *entry.get(),
                duplicate: RuleId(i),
            }),
        }
    }

    let mut errors = undefined_references(rules, &index);
    errors.append(&mut duplicates);

    let start = match &options.start_rule {
        Some(name) => match index.get(name) {
            Some(id) => *id,
            None => {
                errors.push(SemanticError::UnknownStartRule { name: name.clone() });
                RuleId(0)
            }
        },
        None => RuleId(0),
    };

    if !errors.is_empty() {
        debug!(errors = errors.len(), "grammar is not closed");
        return Err(AnalysisError { errors });
    }

    let graph = RuleGraph::build(rules, &index);

    let unproductive: Vec<SemanticError> = productive_rules(rules, &index)
        .into_iter()
        .zip(rules)
        .filter(|(productive, _)| !productive)
        .map(|(_, rule)| SemanticError::UnproductiveRule {
            rule: rule.name.clone(),
        })
        .collect();
    if !unproductive.is_empty() {
        debug!(errors = unproductive.len(), "grammar has unproductive rules");
        return Err(AnalysisError {
            errors: unproductive,
        });
    }

    let corners = Corners {
        left: RuleGraph::left_corners(rules, &index),
        right: RuleGraph::right_corners(rules, &index),
    };
    let reachable = graph.reachable_from(start);
    let mut warnings = Vec::new();
    let mut analyses = Vec::with_capacity(rules.len());
    for (i, rule) in rules.iter().enumerate() {
        let id = RuleId(i);
        let recursion: Vec<RecursionClass> = rule
            .definition
            .choices()
            .iter()
            .map(|choice| classify(id, choice, &index, &graph, &corners))
            .collect();
        let shape = assign_shape(id, rule, &recursion, &index);
        let is_reachable = reachable.contains(&id);
        if !is_reachable {
            warn!(rule = %rule.name, "unreachable rule");
            warnings.push(Warning::UnreachableRule {
                rule: rule.name.clone(),
                start: rules[start.index()].name.clone(),
            });
        }
        debug!(rule = %rule.name, %shape, "analyzed rule");
        analyses.push(RuleAnalysis {
            recursion,
            shape,
            reachable: is_reachable,
        });
    }

    Ok(AnalyzedGrammar {
        grammar: grammar.clone(),
        index,
        graph,
        rules: analyses,
        start,
        warnings,
    })
}

fn undefined_references(rules: &[Rule], index: &HashMap<Identifier, RuleId>) -> Vec<SemanticError> {
    let mut errors = Vec::new();
    for rule in rules {
        for (alternative, choice) in rule.definition.choices().iter().enumerate() {
            for (part, p) in choice.parts().iter().enumerate() {
                if let DefinitionPart::Reference(reference) = p {
                    if !index.contains_key(reference) {
                        errors.push(SemanticError::UndefinedRuleReference {
                            rule: rule.name.clone(),
                            reference: reference.clone(),
                            alternative,
                            part,
                        });
                    }
                }
            }
        }
    }
    errors
}

/// Fixpoint: a rule is productive once one of its alternatives references
/// only productive rules.
fn productive_rules(rules: &[Rule], index: &HashMap<Identifier, RuleId>) -> Vec<bool> {
    let mut productive = vec![false; rules.len()];
    let mut changed = true;
    while changed {
        changed = false;
        for (i, rule) in rules.iter().enumerate() {
            if productive[i] {
                continue;
            }
            let derives = rule.definition.choices().iter().any(|choice| {
                choice
                    .references()
                    .all(|name| index.get(name).map_or(false, |id| productive[id.index()]))
            });
            if derives {
                productive[i] = true;
                changed = true;
            }
        }
    }
    productive
}

/// Leftmost and rightmost expansion edges, used to tell edge recursion from
/// recursion that passes through a nested position.
struct Corners {
    left: RuleGraph,
    right: RuleGraph,
}

fn classify(
    owner: RuleId,
    choice: &DefinitionChoice,
    index: &HashMap<Identifier, RuleId>,
    graph: &RuleGraph,
    corners: &Corners,
) -> RecursionClass {
    let parts = choice.parts();
    let last = parts.len().saturating_sub(1);
    let (mut left, mut right, mut internal) = (false, false, false);
    for (pos, part) in parts.iter().enumerate() {
        let target = match part {
            DefinitionPart::Reference(name) => match index.get(name) {
                Some(id) => *id,
                None => continue,
            },
            DefinitionPart::Literal(_) | DefinitionPart::Epsilon => continue,
        };
        if !graph.reaches(target, owner) {
            continue;
        }
        if pos == 0 && corners.left.reaches(target, owner) {
            left = true;
        } else if pos == last && corners.right.reaches(target, owner) {
            right = true;
        } else {
            internal = true;
        }
    }
    match (left, right, internal) {
        (false, false, false) => RecursionClass::NonRecursive,
        (true, false, false) => RecursionClass::Left,
        (false, true, false) => RecursionClass::Right,
        (false, false, true) => RecursionClass::Internal,
        _ => RecursionClass::Mixed,
    }
}

fn assign_shape(
    owner: RuleId,
    rule: &Rule,
    recursion: &[RecursionClass],
    index: &HashMap<Identifier, RuleId>,
) -> ConstructionShape {
    if recursion.iter().all(|c| *c == RecursionClass::NonRecursive) {
        return ConstructionShape::Flat;
    }

    let (mut bases, mut growths) = (0, 0);
    for (choice, class) in rule.definition.choices().iter().zip(recursion) {
        match class {
            RecursionClass::NonRecursive => bases += 1,
            RecursionClass::Left if is_growth_step(owner, choice, index) => growths += 1,
            _ => return ConstructionShape::General,
        }
    }
    if bases > 0 && growths > 0 {
        ConstructionShape::LeftRecursiveSequence
    } else {
        ConstructionShape::General
    }
}

/// `rule suffix`: a direct self reference first, followed by a non-empty
/// suffix. The caller has already established the suffix is not recursive.
fn is_growth_step(owner: RuleId, choice: &DefinitionChoice, index: &HashMap<Identifier, RuleId>) -> bool {
    match choice.parts() {
        [DefinitionPart::Reference(first), _, ..] => index.get(first) == Some(&owner),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzed(source: &str) -> AnalyzedGrammar {
        let g: Grammar = source.parse().unwrap();
        analyze(&g, &AnalyzerOptions::default()).unwrap()
    }

    fn errors(source: &str) -> Vec<SemanticError> {
        let g: Grammar = source.parse().unwrap();
        analyze(&g, &AnalyzerOptions::default()).unwrap_err().errors
    }

    fn name(s: &str) -> Identifier {
        Identifier::from_name(s).unwrap()
    }

    const NUMBER: &str = "\
number ::= nonZeroDigit | number digit
digit ::= \"0\" | nonZeroDigit
nonZeroDigit ::= \"1\" | \"2\" | \"3\" | \"4\" | \"5\" | \"6\" | \"7\" | \"8\" | \"9\"
";

    #[test]
    fn number_shapes() {
        let a = analyzed(NUMBER);
        assert_eq!(a.shape(RuleId(0)), ConstructionShape::LeftRecursiveSequence);
        assert_eq!(a.shape(RuleId(1)), ConstructionShape::Flat);
        assert_eq!(a.shape(RuleId(2)), ConstructionShape::Flat);
        assert_eq!(
            a.analysis(RuleId(0)).recursion,
            vec![RecursionClass::NonRecursive, RecursionClass::Left]
        );
        assert!(a.warnings().is_empty());
        assert_eq!(a.lookup(&name("digit")), Some(RuleId(1)));
    }

    #[test]
    fn recursion_classes() {
        let a = analyzed(
            "\
list ::= item | item \",\" list
expr ::= \"(\" expr \")\" | \"x\"
both ::= both \"+\" both | \"1\"
item ::= \"i\"
",
        );
        assert_eq!(
            a.analysis(RuleId(0)).recursion,
            vec![RecursionClass::NonRecursive, RecursionClass::Right]
        );
        assert_eq!(a.shape(RuleId(0)), ConstructionShape::General);
        assert_eq!(
            a.analysis(RuleId(1)).recursion,
            vec![RecursionClass::Internal, RecursionClass::NonRecursive]
        );
        assert_eq!(a.shape(RuleId(1)), ConstructionShape::General);
        assert_eq!(
            a.analysis(RuleId(2)).recursion,
            vec![RecursionClass::Mixed, RecursionClass::NonRecursive]
        );
        assert_eq!(a.shape(RuleId(2)), ConstructionShape::General);
    }

    #[test]
    fn indirect_left_recursion() {
        let a = analyzed("a ::= b \"x\" | \"y\"\nb ::= a | \"z\"\n");
        assert_eq!(
            a.analysis(RuleId(0)).recursion,
            vec![RecursionClass::Left, RecursionClass::NonRecursive]
        );
        // Not a direct self reference, so no incremental shape.
        assert_eq!(a.shape(RuleId(0)), ConstructionShape::General);
        assert_eq!(a.shape(RuleId(1)), ConstructionShape::General);
    }

    #[test]
    fn nested_recursion_is_not_left() {
        let a = analyzed(
            "\
a ::= b \"x\" | \"y\"
b ::= \"(\" a \")\"
c ::= \"[\" d | \"z\"
d ::= c \"]\"
",
        );
        // a comes back only from inside the brackets of b.
        assert_eq!(
            a.analysis(RuleId(0)).recursion,
            vec![RecursionClass::Internal, RecursionClass::NonRecursive]
        );
        assert_eq!(
            a.analysis(RuleId(1)).recursion,
            vec![RecursionClass::Internal]
        );
        assert_eq!(a.shape(RuleId(0)), ConstructionShape::General);
        // d ends with a literal, so c is not right recursive through it.
        assert_eq!(
            a.analysis(RuleId(2)).recursion,
            vec![RecursionClass::Internal, RecursionClass::NonRecursive]
        );
        // d starts with c, and c starts with a literal in both alternatives.
        assert_eq!(
            a.analysis(RuleId(3)).recursion,
            vec![RecursionClass::Internal]
        );
    }

    #[test]
    fn unit_alternatives_pass_recursion_through() {
        let a = analyzed("b ::= a | \"z\"\na ::= \"(\" b\n");
        // b => a => "(" b puts b last.
        assert_eq!(
            a.analysis(RuleId(0)).recursion,
            vec![RecursionClass::Right, RecursionClass::NonRecursive]
        );
        assert_eq!(
            a.analysis(RuleId(1)).recursion,
            vec![RecursionClass::Right]
        );
    }

    #[test]
    fn left_recursive_sequence_needs_pure_suffix() {
        let a = analyzed(
            "\
args ::= arg | args \",\" arg
bad ::= \"x\" | bad bad
arg ::= \"a\"
",
        );
        assert_eq!(a.shape(RuleId(0)), ConstructionShape::LeftRecursiveSequence);
        assert_eq!(a.shape(RuleId(1)), ConstructionShape::General);
    }

    #[test]
    fn unproductive() {
        assert_eq!(
            errors("foo ::= foo\n"),
            vec![SemanticError::UnproductiveRule { rule: name("foo") }]
        );
        assert_eq!(
            errors("a ::= b\nb ::= a \"x\"\nc ::= \"ok\"\n"),
            vec![
                SemanticError::UnproductiveRule { rule: name("a") },
                SemanticError::UnproductiveRule { rule: name("b") },
            ]
        );
    }

    #[test]
    fn batched_semantic_errors() {
        let errs = errors("a ::= missing | b\nb ::= other\nb ::= \"x\"\n");
        assert_eq!(errs.len(), 3, "errors: {:?}", errs);
        assert_eq!(
            errs,
            vec![
                SemanticError::UndefinedRuleReference {
                    rule: name("a"),
                    reference: name("missing"),
                    alternative: 0,
                    part: 0,
                },
                SemanticError::UndefinedRuleReference {
                    rule: name("b"),
                    reference: name("other"),
                    alternative: 0,
                    part: 0,
                },
                SemanticError::DuplicateRuleName {
                    name: name("b"),
                    first: RuleId(1),
                    duplicate: RuleId(2),
                },
            ]
        );
    }

    #[test]
    fn unreachable_rules_warn() {
        let a = analyzed("a ::= \"x\"\nb ::= a\n");
        assert_eq!(
            a.warnings(),
            &[Warning::UnreachableRule {
                rule: name("b"),
                start: name("a"),
            }]
        );
        assert!(!a.analysis(RuleId(1)).reachable);
    }

    #[test]
    fn start_rule_override() {
        let g: Grammar = "a ::= \"x\"\nb ::= a\n".parse().unwrap();
        let options = AnalyzerOptions {
            start_rule: Some(name("b")),
        };
        let a = analyze(&g, &options).unwrap();
        assert_eq!(a.start(), RuleId(1));
        assert!(a.warnings().is_empty());

        let options = AnalyzerOptions {
            start_rule: Some(name("nope")),
        };
        assert_eq!(
            analyze(&g, &options).unwrap_err().errors,
            vec![SemanticError::UnknownStartRule { name: name("nope") }]
        );
    }

    #[test]
    fn references_resolve() {
        let a = analyzed(NUMBER);
        for rule in a.grammar().rules() {
            for choice in rule.definition.choices() {
                for reference in choice.references() {
                    assert!(a.lookup(reference).is_some(), "dangling: {}", reference);
                }
            }
        }
    }
}
