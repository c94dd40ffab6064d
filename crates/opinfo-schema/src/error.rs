use thiserror::Error;

/// Errors raised while decoding or assembling a signature
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{message} at offset {offset}")]
    Parse { message: String, offset: usize },

    #[error("duplicate input argument `{name}`")]
    DuplicateArgument { name: String },

    #[error("input argument at position {index} has no name")]
    UnnamedArgument { index: usize },
}

impl SchemaError {
    pub(crate) fn parse(message: impl Into<String>, offset: usize) -> Self {
        SchemaError::Parse {
            message: message.into(),
            offset,
        }
    }
}
