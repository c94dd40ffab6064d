//! Alias clustering over argument positions
//!
//! Positions are laid out as slots: inputs `0..N`, then outputs `N..N+M`.
//! Clusters are kept in a union-find over slot indices, so the relation is
//! an equivalence by construction. Wildcard positions are not merged into
//! anything because of the wildcard; they are recorded separately and link to
//! every other slot at query time.

use crate::options::AnalysisOptions;
use crate::rules::{RuleTable, RuleVerdict};
use crate::store::ValueStore;
use crate::value::ArgumentValue;
use opinfo_schema::{ArgumentKind, FunctionSchema, SchemaArgument};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Disjoint sets over `0..n` (path halving, union by rank)
#[derive(Debug, Clone)]
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Clustering and mutability facts for one set of bindings
#[derive(Debug, Clone)]
pub struct AliasGraph {
    num_inputs: usize,
    /// Slot to cluster representative
    cluster_of: Vec<usize>,
    wildcard: Vec<bool>,
    separations: HashSet<(usize, usize)>,
    /// Rule overrides per input
    overrides: Vec<Option<bool>>,
    /// Indexed by representative: some member is mutated on its own
    cluster_mutable: Vec<bool>,
    own_mutable: Vec<bool>,
    options: AnalysisOptions,
    rule_applied: bool,
}

impl AliasGraph {
    pub fn build<V: ArgumentValue>(
        schema: &FunctionSchema,
        values: &ValueStore<V>,
        rules: &RuleTable,
        options: AnalysisOptions,
    ) -> Self {
        let inputs = schema.arguments();
        let num_inputs = inputs.len();
        let num_slots = num_inputs + schema.returns().len();
        let declared: Vec<_> = inputs.iter().chain(schema.returns()).collect();

        let verdict = if options.apply_special_cases {
            rules.evaluate(schema, values)
        } else {
            None
        };
        let rule_applied = verdict.is_some();
        let verdict = verdict.unwrap_or_default();

        let separations: HashSet<(usize, usize)> = verdict
            .separations
            .iter()
            .filter_map(|(lhs, rhs)| Self::checked_pair(schema, *lhs, *rhs))
            .collect();

        let mut edges: Vec<(usize, usize)> = Vec::new();

        // declared alias sets, across inputs and outputs
        let mut by_set: HashMap<&str, Vec<usize>> = HashMap::new();
        for (slot, arg) in declared.iter().enumerate() {
            for set in arg.alias_sets() {
                by_set.entry(set).or_default().push(slot);
            }
        }
        for members in by_set.values() {
            for (i, &a) in members.iter().enumerate() {
                edges.extend(members[i + 1..].iter().map(|&b| (a, b)));
            }
        }

        // storage overlap between bound inputs
        for i in 0..num_inputs {
            for j in i + 1..num_inputs {
                if values.overlaps(&inputs[i].name, &inputs[j].name) {
                    edges.push((i, j));
                }
            }
        }

        let mut sets = UnionFind::new(num_slots);
        for (a, b) in edges {
            if a != b && !separations.contains(&ordered(a, b)) {
                sets.union(a, b);
            }
        }
        for (lhs, rhs) in &verdict.aliases {
            if let Some((a, b)) = Self::checked_pair(schema, *lhs, *rhs) {
                sets.union(a, b);
            }
        }

        let cluster_of: Vec<usize> = (0..num_slots).map(|slot| sets.find(slot)).collect();
        for &(a, b) in &separations {
            if cluster_of[a] == cluster_of[b] {
                warn!(
                    operator = %schema.name(),
                    lhs = a,
                    rhs = b,
                    "separation overridden by a transitive alias"
                );
            }
        }

        let overrides = Self::overrides(schema, &verdict);
        let own_mutable: Vec<bool> = (0..num_slots)
            .map(|slot| match overrides.get(slot) {
                Some(Some(forced)) => *forced,
                Some(None) => declared[slot].is_write(),
                None => false,
            })
            .collect();
        let mut cluster_mutable = vec![false; num_slots];
        for slot in 0..num_slots {
            cluster_mutable[cluster_of[slot]] |= own_mutable[slot];
        }

        let wildcard: Vec<bool> = declared.iter().map(|arg| arg.is_wildcard()).collect();

        let graph = Self {
            num_inputs,
            cluster_of,
            wildcard,
            separations,
            overrides,
            cluster_mutable,
            own_mutable,
            options,
            rule_applied,
        };
        debug!(
            operator = %schema.name(),
            clusters = graph.cluster_count(),
            wildcards = graph.wildcard.iter().filter(|w| **w).count(),
            rule_applied,
            "rebuilt alias graph"
        );
        graph
    }

    fn overrides(schema: &FunctionSchema, verdict: &RuleVerdict) -> Vec<Option<bool>> {
        let mut overrides = vec![None; schema.arguments().len()];
        for &(index, mutable) in &verdict.mutability {
            match overrides.get_mut(index) {
                Some(slot) => *slot = Some(mutable),
                None => warn!(
                    operator = %schema.name(),
                    index,
                    "rule override for nonexistent input ignored"
                ),
            }
        }
        overrides
    }

    fn checked_pair(
        schema: &FunctionSchema,
        lhs: SchemaArgument,
        rhs: SchemaArgument,
    ) -> Option<(usize, usize)> {
        let to_slot = |arg: SchemaArgument| {
            schema.argument(arg)?;
            Some(match arg.kind {
                ArgumentKind::Input => arg.index,
                ArgumentKind::Output => schema.arguments().len() + arg.index,
            })
        };
        match (to_slot(lhs), to_slot(rhs)) {
            (Some(a), Some(b)) => Some(ordered(a, b)),
            _ => {
                warn!(
                    operator = %schema.name(),
                    %lhs,
                    %rhs,
                    "rule pair names a nonexistent position, ignored"
                );
                None
            }
        }
    }

    /// Slot of an argument known to be in range
    pub fn slot(&self, arg: SchemaArgument) -> usize {
        match arg.kind {
            ArgumentKind::Input => arg.index,
            ArgumentKind::Output => self.num_inputs + arg.index,
        }
    }

    fn argument_at(&self, slot: usize) -> SchemaArgument {
        if slot < self.num_inputs {
            SchemaArgument::input(slot)
        } else {
            SchemaArgument::output(slot - self.num_inputs)
        }
    }

    pub fn num_slots(&self) -> usize {
        self.cluster_of.len()
    }

    pub fn cluster_count(&self) -> usize {
        (0..self.num_slots())
            .filter(|&slot| self.cluster_of[slot] == slot)
            .count()
    }

    pub fn rule_applied(&self) -> bool {
        self.rule_applied
    }

    pub fn same_cluster(&self, a: usize, b: usize) -> bool {
        self.cluster_of[a] == self.cluster_of[b]
    }

    pub fn is_wildcard(&self, slot: usize) -> bool {
        self.wildcard[slot]
    }

    fn wildcard_linked(&self, a: usize, b: usize) -> bool {
        self.options.link_wildcards
            && a != b
            && (self.wildcard[a] || self.wildcard[b])
            && !self.separations.contains(&ordered(a, b))
    }

    /// Same cluster, or linked through a wildcard
    pub fn may_alias(&self, a: usize, b: usize) -> bool {
        self.same_cluster(a, b) || self.wildcard_linked(a, b)
    }

    /// Members of the cluster holding `slot`, in slot order
    pub fn cluster_members(&self, slot: usize) -> Vec<SchemaArgument> {
        let root = self.cluster_of[slot];
        (0..self.num_slots())
            .filter(|&other| self.cluster_of[other] == root)
            .map(|other| self.argument_at(other))
            .collect()
    }

    /// Refined mutability of an input position
    pub fn is_mutable(&self, index: usize) -> bool {
        if let Some(forced) = self.overrides[index] {
            return forced;
        }
        if self.own_mutable[index] {
            return true;
        }
        if self.options.propagate_through_aliases && self.cluster_mutable[self.cluster_of[index]] {
            return true;
        }
        (0..self.num_slots()).any(|other| {
            self.wildcard_linked(index, other) && self.cluster_mutable[self.cluster_of[other]]
        })
    }

    pub fn any_mutable(&self) -> bool {
        (0..self.num_inputs).any(|index| self.is_mutable(index))
    }
}
