//! # Opinfo Schema
//!
//! Immutable operator signatures: ordered input descriptors, output
//! descriptors, and the alias annotations that declare which positions share
//! storage and which ones are written.
//!
//! ## Quick Start
//!
//! ```rust
//! use opinfo_schema::FunctionSchema;
//!
//! let schema: FunctionSchema = "aten::add_.Tensor(Tensor(a!) self, Tensor other, *, Scalar alpha=1) -> Tensor(a!)"
//!     .parse()
//!     .unwrap();
//!
//! assert_eq!(schema.name().to_string(), "aten::add_.Tensor");
//! assert!(schema.arguments()[0].is_write());
//! assert!(!schema.arguments()[1].is_write());
//! ```

mod alias;
mod error;
mod parser;
mod schema;

pub use alias::{AliasAnnotation, WILDCARD_SET};
pub use error::SchemaError;
pub use parser::parse_schema;
pub use schema::{Argument, ArgumentKind, FunctionSchema, OperatorName, SchemaArgument, SchemaBuilder};
