use thiserror::Error;

/// Errors raised by schema construction and the mapping operations.
///
/// Only malformed schema/type-descriptor pairings are errors. Missing
/// profiles, unconvertible answers and content violations are reported as
/// absent values or validation issues instead.
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("Type '{type_name}' has no accessor for element '{element}'")]
    MissingAccessor { type_name: String, element: String },

    #[error("Accessor for '{path}' rejected a container of type '{type_name}'")]
    AccessorMismatch { path: String, type_name: String },

    #[error("Type '{type_name}' cannot be instantiated")]
    Uninstantiable { type_name: String },

    #[error("Invalid expression '{expression}': {message}")]
    InvalidExpression { expression: String, message: String },

    #[error("Invalid snapshot for '{profile}': {message}")]
    InvalidSnapshot { profile: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MappingError {
    pub fn missing_accessor(type_name: impl Into<String>, element: impl Into<String>) -> Self {
        Self::MissingAccessor {
            type_name: type_name.into(),
            element: element.into(),
        }
    }

    pub fn accessor_mismatch(path: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::AccessorMismatch {
            path: path.into(),
            type_name: type_name.into(),
        }
    }

    pub fn uninstantiable(type_name: impl Into<String>) -> Self {
        Self::Uninstantiable {
            type_name: type_name.into(),
        }
    }

    pub fn invalid_expression(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidExpression {
            expression: expression.into(),
            message: message.into(),
        }
    }

    pub fn invalid_snapshot(profile: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSnapshot {
            profile: profile.into(),
            message: message.into(),
        }
    }

    /// True for errors that signal a corrupt schema rather than bad input.
    pub fn is_schema_corruption(&self) -> bool {
        matches!(
            self,
            Self::MissingAccessor { .. } | Self::AccessorMismatch { .. } | Self::Uninstantiable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MappingError>;
