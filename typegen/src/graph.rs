use std::collections::{BTreeSet, HashMap, VecDeque};

use bnf::{DefinitionChoice, DefinitionPart, Identifier, Rule};

use crate::RuleId;

/// Direct rule dependencies plus their transitive closure.
///
/// An edge `a -> b` exists when some alternative of `a` references `b`.
/// Self edges are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleGraph {
    edges: Vec<BTreeSet<RuleId>>,
    closure: Vec<BTreeSet<RuleId>>,
}

impl RuleGraph {
    /// Build the graph for `rules`. References missing from `index` are
    /// skipped; the analyzer rejects those before it gets here.
    pub fn build(rules: &[Rule], index: &HashMap<Identifier, RuleId>) -> Self {
        Self::over(rules, index, DefinitionChoice::parts)
    }

    /// Only the first part of each alternative counts, so `a` reaches `b`
    /// when `b` can appear leftmost in an expansion of `a`.
    pub fn left_corners(rules: &[Rule], index: &HashMap<Identifier, RuleId>) -> Self {
        Self::over(rules, index, first_part)
    }

    /// Mirror of [`RuleGraph::left_corners`] over the last part.
    pub fn right_corners(rules: &[Rule], index: &HashMap<Identifier, RuleId>) -> Self {
        Self::over(rules, index, last_part)
    }

    fn over(
        rules: &[Rule],
        index: &HashMap<Identifier, RuleId>,
        parts: fn(&DefinitionChoice) -> &[DefinitionPart],
    ) -> Self {
        let edges: Vec<BTreeSet<RuleId>> = rules
            .iter()
            .map(|rule| {
                rule.definition
                    .choices()
                    .iter()
                    .flat_map(|choice| parts(choice))
                    .filter_map(|part| match part {
                        DefinitionPart::Reference(name) => index.get(name).copied(),
                        DefinitionPart::Literal(_) | DefinitionPart::Epsilon => None,
                    })
                    .collect()
            })
            .collect();

        let closure = (0..edges.len())
            .map(|start| bfs(&edges, RuleId(start)))
            .collect();

        RuleGraph { edges, closure }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Rules referenced directly by `rule`.
    pub fn successors(&self, rule: RuleId) -> &BTreeSet<RuleId> {
        &self.edges[rule.index()]
    }

    /// Every rule reachable from `rule`, including `rule` itself.
    pub fn reachable_from(&self, rule: RuleId) -> &BTreeSet<RuleId> {
        &self.closure[rule.index()]
    }

    /// Whether `to` is reachable from `from` in zero or more steps.
    pub fn reaches(&self, from: RuleId, to: RuleId) -> bool {
        self.closure[from.index()].contains(&to)
    }

    /// Whether `rule` can reach itself in one or more steps.
    pub fn is_cyclic(&self, rule: RuleId) -> bool {
        self.edges[rule.index()]
            .iter()
            .any(|next| self.reaches(*next, rule))
    }
}

fn first_part(choice: &DefinitionChoice) -> &[DefinitionPart] {
    let parts = choice.parts();
    &parts[..parts.len().min(1)]
}

fn last_part(choice: &DefinitionChoice) -> &[DefinitionPart] {
    let parts = choice.parts();
    &parts[parts.len().saturating_sub(1)..]
}

fn bfs(edges: &[BTreeSet<RuleId>], start: RuleId) -> BTreeSet<RuleId> {
    let mut seen = BTreeSet::new();
    let mut queue = VecDeque::new();
    seen.insert(start);
    queue.push_back(start);
    while let Some(rule) = queue.pop_front() {
        for next in &edges[rule.index()] {
            if seen.insert(*next) {
                queue.push_back(*next);
            }
        }
    }
    seen
}
