//! # Opinfo Core
//!
//! Refines the conservative mutation and aliasing facts of an operator
//! signature into facts about one call site, once the argument values
//! supplied there are known.
//!
//! ## Modules
//!
//! - **[`store`]** - argument bindings for one call site
//! - **[`graph`]** - union-find clustering of argument positions
//! - **[`rules`]** - per-operator special cases keyed by operator identity
//! - **[`schema_info`]** - the query facade
//!
//! ## Quick Start
//!
//! ```rust
//! use opinfo_core::prelude::*;
//!
//! let schema = FunctionSchema::parse("aten::copy_(Tensor(a!) self, Tensor src, bool non_blocking=False) -> Tensor(a!)")
//!     .unwrap();
//! let mut info = SchemaInfo::new(&schema);
//!
//! assert!(info.is_mutable_named("self").unwrap());
//! assert!(!info.is_mutable_named("src").unwrap());
//!
//! // `src` is a view into the same storage as `self`
//! info.bind_value("self", Value::tensor(1, 0, 8)).unwrap();
//! info.bind_value("src", Value::tensor(1, 4, 8)).unwrap();
//! assert!(info.is_mutable_named("src").unwrap());
//! ```

pub mod error;
pub mod graph;
pub mod options;
pub mod rules;
pub mod schema_info;
pub mod store;
pub mod value;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::SchemaInfoError;
    pub use crate::options::AnalysisOptions;
    pub use crate::rules::{RuleContext, RuleTable, RuleVerdict};
    pub use crate::schema_info::SchemaInfo;
    pub use crate::store::{ValueLookup, ValueStore};
    pub use crate::value::{ArgumentValue, TensorRef, Value};
    pub use opinfo_schema::{FunctionSchema, OperatorName, SchemaArgument};
}

// Re-export main types at crate root for convenience
pub use error::SchemaInfoError;
pub use graph::AliasGraph;
pub use options::AnalysisOptions;
pub use rules::{RuleContext, RuleTable, RuleVerdict, SpecialCaseRule};
pub use schema_info::SchemaInfo;
pub use store::{ValueLookup, ValueStore};
pub use value::{ArgumentValue, StorageId, TensorRef, Value};

pub use opinfo_schema::{
    AliasAnnotation, Argument, ArgumentKind, FunctionSchema, OperatorName, SchemaArgument, SchemaError,
};
