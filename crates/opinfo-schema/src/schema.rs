//! Function schema model

use crate::alias::AliasAnnotation;
use crate::error::SchemaError;
use crate::parser::parse_schema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operator identity: qualified name plus overload marker
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperatorName {
    pub name: String,
    pub overload_name: String,
}

impl OperatorName {
    pub fn new(name: impl Into<String>, overload_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overload_name: overload_name.into(),
        }
    }

    /// Operator without an overload marker
    pub fn base(name: impl Into<String>) -> Self {
        Self::new(name, "")
    }
}

impl fmt::Display for OperatorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.overload_name.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.name, self.overload_name)
        }
    }
}

/// Which side of the signature a position refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArgumentKind {
    Input,
    Output,
}

/// A position in either the input or the output list of a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaArgument {
    pub kind: ArgumentKind,
    pub index: usize,
}

impl SchemaArgument {
    pub fn input(index: usize) -> Self {
        Self {
            kind: ArgumentKind::Input,
            index,
        }
    }

    pub fn output(index: usize) -> Self {
        Self {
            kind: ArgumentKind::Output,
            index,
        }
    }
}

impl fmt::Display for SchemaArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ArgumentKind::Input => write!(f, "input[{}]", self.index),
            ArgumentKind::Output => write!(f, "output[{}]", self.index),
        }
    }
}

/// One declared argument or return value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    /// Type text without the alias annotation, e.g. `Tensor?` or `int[2]`
    pub ty: String,
    pub default_value: Option<String>,
    pub kwarg_only: bool,
    pub alias: Option<AliasAnnotation>,
}

impl Argument {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            default_value: None,
            kwarg_only: false,
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: AliasAnnotation) -> Self {
        self.alias = Some(alias);
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    pub fn kwarg_only(mut self) -> Self {
        self.kwarg_only = true;
        self
    }

    /// Declared mutated: carries a write annotation
    pub fn is_write(&self) -> bool {
        self.alias.as_ref().is_some_and(AliasAnnotation::is_write)
    }

    pub fn is_wildcard(&self) -> bool {
        self.alias.as_ref().is_some_and(AliasAnnotation::is_wildcard)
    }

    pub fn alias_sets(&self) -> impl Iterator<Item = &str> {
        self.alias.iter().flat_map(|alias| alias.concrete_sets())
    }

    fn fmt_type(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => {
                let split = base_type_len(&self.ty);
                write!(f, "{}({}){}", &self.ty[..split], alias, &self.ty[split..])
            }
            None => write!(f, "{}", self.ty),
        }
    }
}

/// Length of the leading base type, before list/optional suffixes
fn base_type_len(ty: &str) -> usize {
    let mut depth = 0usize;
    for (i, c) in ty.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '[' | '?' if depth == 0 => return i,
            _ => {}
        }
    }
    ty.len()
}

/// Immutable operator signature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSchema {
    name: OperatorName,
    arguments: Vec<Argument>,
    returns: Vec<Argument>,
}

impl FunctionSchema {
    /// Assemble a schema, rejecting unnamed or duplicate inputs
    pub fn new(
        name: OperatorName,
        arguments: Vec<Argument>,
        returns: Vec<Argument>,
    ) -> Result<Self, SchemaError> {
        for (index, arg) in arguments.iter().enumerate() {
            if arg.name.is_empty() {
                return Err(SchemaError::UnnamedArgument { index });
            }
            if arguments[..index].iter().any(|prev| prev.name == arg.name) {
                return Err(SchemaError::DuplicateArgument {
                    name: arg.name.clone(),
                });
            }
        }
        Ok(Self {
            name,
            arguments,
            returns,
        })
    }

    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        parse_schema(text)
    }

    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &OperatorName {
        &self.name
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn returns(&self) -> &[Argument] {
        &self.returns
    }

    pub fn arguments_of(&self, kind: ArgumentKind) -> &[Argument] {
        match kind {
            ArgumentKind::Input => &self.arguments,
            ArgumentKind::Output => &self.returns,
        }
    }

    pub fn argument(&self, position: SchemaArgument) -> Option<&Argument> {
        self.arguments_of(position.kind).get(position.index)
    }

    pub fn argument_index(&self, name: &str) -> Option<usize> {
        self.arguments.iter().position(|arg| arg.name == name)
    }

    pub fn has_argument(&self, name: &str) -> bool {
        self.argument_index(name).is_some()
    }

    /// Conservative, signature-only mutability of an input
    pub fn is_mutable(&self, index: usize) -> bool {
        self.arguments.get(index).is_some_and(Argument::is_write)
    }

    /// True if any input carries a write annotation
    pub fn is_any_mutable(&self) -> bool {
        self.arguments.iter().any(Argument::is_write)
    }
}

impl FromStr for FunctionSchema {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_schema(s)
    }
}

impl fmt::Display for FunctionSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        let mut seen_kwarg_only = false;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if arg.kwarg_only && !seen_kwarg_only {
                write!(f, "*, ")?;
                seen_kwarg_only = true;
            }
            arg.fmt_type(f)?;
            write!(f, " {}", arg.name)?;
            if let Some(default_value) = &arg.default_value {
                write!(f, "={default_value}")?;
            }
        }
        write!(f, ") -> ")?;

        let single_unnamed = self.returns.len() == 1 && self.returns[0].name.is_empty();
        if single_unnamed {
            return self.returns[0].fmt_type(f);
        }
        write!(f, "(")?;
        for (i, ret) in self.returns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            ret.fmt_type(f)?;
            if !ret.name.is_empty() {
                write!(f, " {}", ret.name)?;
            }
        }
        write!(f, ")")
    }
}

/// Fluent construction of schemas without going through text
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: OperatorName,
    arguments: Vec<Argument>,
    returns: Vec<Argument>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: OperatorName::base(name),
            arguments: Vec::new(),
            returns: Vec::new(),
        }
    }

    pub fn overload(mut self, overload_name: impl Into<String>) -> Self {
        self.name.overload_name = overload_name.into();
        self
    }

    pub fn input(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn output(mut self, argument: Argument) -> Self {
        self.returns.push(argument);
        self
    }

    pub fn build(self) -> Result<FunctionSchema, SchemaError> {
        FunctionSchema::new(self.name, self.arguments, self.returns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_name_display() {
        assert_eq!(OperatorName::base("aten::relu").to_string(), "aten::relu");
        assert_eq!(
            OperatorName::new("aten::add", "Tensor").to_string(),
            "aten::add.Tensor"
        );
    }

    #[test]
    fn test_builder_rejects_duplicate_inputs() {
        let result = FunctionSchema::builder("test::dup")
            .input(Argument::new("x", "Tensor"))
            .input(Argument::new("x", "Tensor"))
            .build();
        assert_eq!(
            result,
            Err(SchemaError::DuplicateArgument {
                name: "x".to_string()
            })
        );
    }

    #[test]
    fn test_builder_rejects_unnamed_input() {
        let result = FunctionSchema::builder("test::anon")
            .input(Argument::new("", "Tensor"))
            .build();
        assert_eq!(result, Err(SchemaError::UnnamedArgument { index: 0 }));
    }

    #[test]
    fn test_signature_only_mutability() {
        let schema = FunctionSchema::builder("aten::add_")
            .overload("Tensor")
            .input(Argument::new("self", "Tensor").with_alias(AliasAnnotation::write("a")))
            .input(Argument::new("other", "Tensor"))
            .output(Argument::new("", "Tensor").with_alias(AliasAnnotation::write("a")))
            .build()
            .unwrap();

        assert!(schema.is_mutable(0));
        assert!(!schema.is_mutable(1));
        assert!(!schema.is_mutable(7));
        assert!(schema.is_any_mutable());
        assert_eq!(schema.argument_index("other"), Some(1));
        assert!(schema.argument(SchemaArgument::output(0)).is_some());
        assert!(schema.argument(SchemaArgument::output(1)).is_none());
    }

    #[test]
    fn test_display_places_alias_before_suffix() {
        let schema = FunctionSchema::builder("aten::stack_into")
            .input(Argument::new("tensors", "Tensor[]").with_alias(AliasAnnotation::read("a")))
            .input(Argument::new("out", "Tensor?").with_alias(AliasAnnotation::write("b")))
            .input(Argument::new("dim", "int").with_default("0").kwarg_only())
            .output(Argument::new("", "Tensor").with_alias(AliasAnnotation::write("b")))
            .build()
            .unwrap();

        assert_eq!(
            schema.to_string(),
            "aten::stack_into(Tensor(a)[] tensors, Tensor(b!)? out, *, int dim=0) -> Tensor(b!)"
        );
    }

    #[test]
    fn test_display_tuple_returns() {
        let schema = FunctionSchema::builder("aten::max")
            .overload("dim")
            .input(Argument::new("self", "Tensor"))
            .output(Argument::new("values", "Tensor"))
            .output(Argument::new("indices", "Tensor"))
            .build()
            .unwrap();

        assert_eq!(
            schema.to_string(),
            "aten::max.dim(Tensor self) -> (Tensor values, Tensor indices)"
        );
    }
}
