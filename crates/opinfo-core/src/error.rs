use thiserror::Error;

/// Caller errors raised by [`SchemaInfo`](crate::SchemaInfo) queries and bindings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaInfoError {
    #[error("unknown argument `{name}`")]
    UnknownArgument { name: String },

    #[error("argument index {index} out of range for arity {arity}")]
    OutOfRange { index: usize, arity: usize },
}

pub type Result<T> = std::result::Result<T, SchemaInfoError>;
