//! Special-case rules for operators with data-dependent mutation or aliasing
//!
//! A rule is a pure function registered under an operator identity. It reads
//! the signature and the bound values and returns a partial verdict that
//! overrides the generic, signature-derived answer for the positions it names.

mod training;

pub use training::TRAINING_OPS;

use crate::store::ValueLookup;
use opinfo_schema::{FunctionSchema, OperatorName, SchemaArgument};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

pub type SpecialCaseRule = Arc<dyn Fn(&RuleContext<'_>) -> RuleVerdict + Send + Sync>;

static BUILTIN_RULES: LazyLock<RuleTable> = LazyLock::new(RuleTable::with_builtin_rules);

/// What a rule gets to look at
pub struct RuleContext<'a> {
    schema: &'a FunctionSchema,
    values: &'a dyn ValueLookup,
}

impl<'a> RuleContext<'a> {
    pub fn new(schema: &'a FunctionSchema, values: &'a dyn ValueLookup) -> Self {
        Self { schema, values }
    }

    pub fn schema(&self) -> &'a FunctionSchema {
        self.schema
    }

    pub fn values(&self) -> &'a dyn ValueLookup {
        self.values
    }

    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.schema.argument_index(name)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.values.is_bound(name)
    }

    /// State of a mode flag, conservatively.
    ///
    /// `None` if the signature does not declare the flag. A declared flag
    /// that is unbound, or bound to something other than a boolean, reads as
    /// enabled.
    pub fn flag_enabled(&self, name: &str) -> Option<bool> {
        if !self.schema.has_argument(name) {
            return None;
        }
        Some(self.values.bool_value(name).unwrap_or(true))
    }
}

/// Partial answer produced by a rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleVerdict {
    /// Input position and whether it is mutated
    pub mutability: SmallVec<[(usize, bool); 4]>,
    /// Pairs that must share a cluster
    pub aliases: SmallVec<[(SchemaArgument, SchemaArgument); 2]>,
    /// Pairs whose direct declared, value or wildcard links are dropped
    pub separations: SmallVec<[(SchemaArgument, SchemaArgument); 2]>,
}

impl RuleVerdict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mutable(mut self, index: usize, mutable: bool) -> Self {
        self.mutability.push((index, mutable));
        self
    }

    pub fn with_alias(mut self, lhs: SchemaArgument, rhs: SchemaArgument) -> Self {
        self.aliases.push((lhs, rhs));
        self
    }

    pub fn with_separation(mut self, lhs: SchemaArgument, rhs: SchemaArgument) -> Self {
        self.separations.push((lhs, rhs));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mutability.is_empty() && self.aliases.is_empty() && self.separations.is_empty()
    }

    /// Override recorded for an input position; the last one wins
    pub fn mutability_of(&self, index: usize) -> Option<bool> {
        self.mutability
            .iter()
            .rev()
            .find(|(i, _)| *i == index)
            .map(|(_, mutable)| *mutable)
    }
}

/// Operator identity to rule function
#[derive(Clone, Default)]
pub struct RuleTable {
    rules: HashMap<OperatorName, SpecialCaseRule>,
}

impl RuleTable {
    /// Empty table: every operator falls back to the generic answer
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared table holding the built-in rules, initialised on first use
    pub fn builtin() -> &'static RuleTable {
        &BUILTIN_RULES
    }

    /// Fresh table seeded with the built-in rules, for extension
    pub fn with_builtin_rules() -> Self {
        let mut table = Self::new();
        training::register(&mut table);
        table
    }

    /// Register a rule, returning the one it replaced
    pub fn register<F>(&mut self, operator: OperatorName, rule: F) -> Option<SpecialCaseRule>
    where
        F: Fn(&RuleContext<'_>) -> RuleVerdict + Send + Sync + 'static,
    {
        self.rules.insert(operator, Arc::new(rule))
    }

    pub fn get(&self, operator: &OperatorName) -> Option<&SpecialCaseRule> {
        self.rules.get(operator)
    }

    pub fn contains(&self, operator: &OperatorName) -> bool {
        self.rules.contains_key(operator)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run the rule registered for the schema's operator, if any
    pub fn evaluate(&self, schema: &FunctionSchema, values: &dyn ValueLookup) -> Option<RuleVerdict> {
        let rule = self.rules.get(schema.name())?;
        Some(rule(&RuleContext::new(schema, values)))
    }

    /// Rule for operators whose `buffers` are written only while `flag` is set
    pub fn training_flag_rule<I, S>(flag: impl Into<String>, buffers: I) -> SpecialCaseRule
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let flag = flag.into();
        let buffers: Vec<String> = buffers.into_iter().map(Into::into).collect();
        Arc::new(move |ctx: &RuleContext<'_>| {
            let Some(enabled) = ctx.flag_enabled(&flag) else {
                return RuleVerdict::new();
            };
            buffers
                .iter()
                .filter_map(|buffer| ctx.input_index(buffer))
                .fold(RuleVerdict::new(), |verdict, index| {
                    verdict.with_mutable(index, enabled)
                })
        })
    }

    /// Register an already shared rule, e.g. one built by [`RuleTable::training_flag_rule`]
    pub fn register_shared(
        &mut self,
        operator: OperatorName,
        rule: SpecialCaseRule,
    ) -> Option<SpecialCaseRule> {
        self.rules.insert(operator, rule)
    }
}

impl fmt::Debug for RuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut operators: Vec<_> = self.rules.keys().map(ToString::to_string).collect();
        operators.sort();
        f.debug_struct("RuleTable").field("operators", &operators).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ValueStore;
    use crate::value::Value;

    fn inplace_flag_schema() -> FunctionSchema {
        FunctionSchema::parse("test::maybe_inplace(Tensor self, Tensor other, bool inplace=False) -> Tensor")
            .unwrap()
    }

    #[test]
    fn test_empty_table_has_no_verdict() {
        let schema = inplace_flag_schema();
        let store: ValueStore<Value> = ValueStore::new();
        assert!(RuleTable::new().evaluate(&schema, &store).is_none());
    }

    #[test]
    fn test_registered_rule_reads_flag() {
        let schema = inplace_flag_schema();
        let mut table = RuleTable::new();
        table.register(OperatorName::base("test::maybe_inplace"), |ctx| {
            let inplace = ctx.values().bool_value("inplace") == Some(true);
            RuleVerdict::new().with_mutable(0, inplace)
        });

        let mut store: ValueStore<Value> = ValueStore::new();
        let verdict = table.evaluate(&schema, &store).unwrap();
        assert_eq!(verdict.mutability_of(0), Some(false));

        store.bind("inplace", Value::Bool(true));
        let verdict = table.evaluate(&schema, &store).unwrap();
        assert_eq!(verdict.mutability_of(0), Some(true));
    }

    #[test]
    fn test_register_replaces_previous_rule() {
        let mut table = RuleTable::new();
        let op = OperatorName::base("test::op");
        assert!(table.register(op.clone(), |_| RuleVerdict::new()).is_none());
        assert!(table.register(op.clone(), |_| RuleVerdict::new()).is_some());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_overload_is_part_of_identity() {
        let mut table = RuleTable::new();
        table.register(OperatorName::new("aten::add_", "Tensor"), |_| {
            RuleVerdict::new().with_mutable(0, false)
        });
        assert!(table.contains(&OperatorName::new("aten::add_", "Tensor")));
        assert!(!table.contains(&OperatorName::base("aten::add_")));
    }

    #[test]
    fn test_flag_enabled_is_conservative() {
        let schema = inplace_flag_schema();
        let mut store: ValueStore<Value> = ValueStore::new();
        let ctx = RuleContext::new(&schema, &store);
        assert_eq!(ctx.flag_enabled("inplace"), Some(true));
        assert_eq!(ctx.flag_enabled("training"), None);

        store.bind("inplace", Value::Int(0));
        let ctx = RuleContext::new(&schema, &store);
        assert_eq!(ctx.flag_enabled("inplace"), Some(true));

        store.bind("inplace", Value::Bool(false));
        let ctx = RuleContext::new(&schema, &store);
        assert_eq!(ctx.flag_enabled("inplace"), Some(false));
    }

    #[test]
    fn test_verdict_last_override_wins() {
        let verdict = RuleVerdict::new().with_mutable(1, true).with_mutable(1, false);
        assert_eq!(verdict.mutability_of(1), Some(false));
        assert_eq!(verdict.mutability_of(0), None);
        assert!(!verdict.is_empty());
        assert!(RuleVerdict::new().is_empty());
    }

    #[test]
    fn test_builtin_table_is_shared() {
        let a = RuleTable::builtin() as *const RuleTable;
        let b = RuleTable::builtin() as *const RuleTable;
        assert_eq!(a, b);
        assert_eq!(RuleTable::builtin().len(), TRAINING_OPS.len());
    }
}
