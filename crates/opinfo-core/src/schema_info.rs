//! Call-site query facade
//!
//! `SchemaInfo` pairs a borrowed signature with the values bound at one call
//! site. The alias graph is derived lazily: bindings only empty the cache, and
//! the first query afterwards rebuilds it.

use crate::error::{Result, SchemaInfoError};
use crate::graph::AliasGraph;
use crate::options::AnalysisOptions;
use crate::rules::RuleTable;
use crate::store::ValueStore;
use crate::value::{ArgumentValue, Value};
use opinfo_schema::{ArgumentKind, FunctionSchema, SchemaArgument};
use std::cell::OnceCell;
use tracing::trace;

/// Mutation and alias facts for one invocation of an operator.
///
/// Not `Sync`: bindings and queries on one instance must come from one
/// thread at a time. Separate instances over the same schema are independent.
///
/// # Example
///
/// ```rust
/// use opinfo_core::{FunctionSchema, SchemaInfo, Value};
///
/// let schema = FunctionSchema::parse(
///     "aten::batch_norm(Tensor input, Tensor? weight, Tensor? bias, Tensor? running_mean, Tensor? running_var, bool training, float momentum, float eps, bool cudnn_enabled) -> Tensor",
/// )
/// .unwrap();
///
/// let mut info = SchemaInfo::new(&schema);
/// assert!(info.is_mutable_named("running_mean").unwrap());
///
/// info.bind_value("training", Value::Bool(false)).unwrap();
/// assert!(!info.is_mutable());
/// ```
#[derive(Debug)]
pub struct SchemaInfo<'a, V = Value> {
    schema: &'a FunctionSchema,
    rules: &'a RuleTable,
    options: AnalysisOptions,
    values: ValueStore<V>,
    /// Empty while stale
    alias_graph: OnceCell<AliasGraph>,
}

impl<'a, V: ArgumentValue> SchemaInfo<'a, V> {
    /// Facade using the built-in special-case rules
    pub fn new(schema: &'a FunctionSchema) -> Self {
        Self::with_rules(schema, RuleTable::builtin())
    }

    pub fn with_rules(schema: &'a FunctionSchema, rules: &'a RuleTable) -> Self {
        Self {
            schema,
            rules,
            options: AnalysisOptions::default(),
            values: ValueStore::new(),
            alias_graph: OnceCell::new(),
        }
    }

    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self.invalidate();
        self
    }

    pub fn schema(&self) -> &'a FunctionSchema {
        self.schema
    }

    pub fn options(&self) -> AnalysisOptions {
        self.options
    }

    pub fn values(&self) -> &ValueStore<V> {
        &self.values
    }

    pub fn argument_value(&self, name: &str) -> Option<&V> {
        self.values.get(name)
    }

    pub fn has_argument(&self, name: &str) -> bool {
        self.schema.has_argument(name)
    }

    /// True until the next query rebuilds the alias graph
    pub fn is_stale(&self) -> bool {
        self.alias_graph.get().is_none()
    }

    /// Whether any input is mutated at this call site
    pub fn is_mutable(&self) -> bool {
        self.alias_graph().any_mutable()
    }

    pub fn is_mutable_at(&self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        Ok(self.alias_graph().is_mutable(index))
    }

    pub fn is_mutable_named(&self, name: &str) -> Result<bool> {
        let index = self.index_of(name)?;
        Ok(self.alias_graph().is_mutable(index))
    }

    /// Outputs are never mutated in place; they are only range checked
    pub fn is_mutable_arg(&self, arg: SchemaArgument) -> Result<bool> {
        self.check_argument(arg)?;
        match arg.kind {
            ArgumentKind::Input => Ok(self.alias_graph().is_mutable(arg.index)),
            ArgumentKind::Output => Ok(false),
        }
    }

    pub fn may_alias(&self, lhs: SchemaArgument, rhs: SchemaArgument) -> Result<bool> {
        self.check_argument(lhs)?;
        self.check_argument(rhs)?;
        let graph = self.alias_graph();
        Ok(graph.may_alias(graph.slot(lhs), graph.slot(rhs)))
    }

    /// Positions known to share storage with `arg`, itself included.
    /// Wildcard links are not clusters and do not appear here.
    pub fn alias_cluster(&self, arg: SchemaArgument) -> Result<Vec<SchemaArgument>> {
        self.check_argument(arg)?;
        let graph = self.alias_graph();
        Ok(graph.cluster_members(graph.slot(arg)))
    }

    pub fn bind_value(&mut self, name: &str, value: V) -> Result<()> {
        self.index_of(name)?;
        trace!(operator = %self.schema.name(), argument = name, "bind value");
        self.values.bind(name, value);
        self.invalidate();
        Ok(())
    }

    /// Bind by position, skipping `None` entries. Fails without binding
    /// anything if the list is longer than the input arity.
    pub fn bind_values_positional<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = Option<V>>,
    {
        let values: Vec<Option<V>> = values.into_iter().collect();
        let arity = self.schema.arguments().len();
        if values.len() > arity {
            return Err(SchemaInfoError::OutOfRange {
                index: values.len() - 1,
                arity,
            });
        }
        for (arg, value) in self.schema.arguments().iter().zip(values) {
            if let Some(value) = value {
                trace!(operator = %self.schema.name(), argument = %arg.name, "bind value");
                self.values.bind(arg.name.as_str(), value);
            }
        }
        self.invalidate();
        Ok(())
    }

    /// Bind a batch by name. Every name is checked before anything is bound.
    pub fn bind_values_named<I, K>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
    {
        let values: Vec<(K, V)> = values.into_iter().collect();
        for (name, _) in &values {
            self.index_of(name.as_ref())?;
        }
        for (name, value) in values {
            trace!(operator = %self.schema.name(), argument = name.as_ref(), "bind value");
            self.values.bind(name.as_ref(), value);
        }
        self.invalidate();
        Ok(())
    }

    fn alias_graph(&self) -> &AliasGraph {
        self.alias_graph
            .get_or_init(|| AliasGraph::build(self.schema, &self.values, self.rules, self.options))
    }

    fn invalidate(&mut self) {
        self.alias_graph.take();
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.schema
            .argument_index(name)
            .ok_or_else(|| SchemaInfoError::UnknownArgument {
                name: name.to_string(),
            })
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let arity = self.schema.arguments().len();
        if index >= arity {
            return Err(SchemaInfoError::OutOfRange { index, arity });
        }
        Ok(())
    }

    fn check_argument(&self, arg: SchemaArgument) -> Result<()> {
        let arity = self.schema.arguments_of(arg.kind).len();
        if arg.index >= arity {
            return Err(SchemaInfoError::OutOfRange {
                index: arg.index,
                arity,
            });
        }
        Ok(())
    }
}
