//! Error types for schema construction, document I/O and validation.
//!
//! Schema-construction failures ([`CtdError::ModelParsing`],
//! [`CtdError::UnsupportedType`]) are always fatal. Argument failures are
//! wrapped in [`CtdError::Argument`] and only surface when the matching
//! enforcement level is [`Enforcement::Reject`](crate::Enforcement::Reject).

use thiserror::Error;

use crate::validate::ArgumentError;

/// Errors produced by the parameter model and its codecs.
#[derive(Debug, Error)]
pub enum CtdError {
    /// Malformed restriction, unconvertible default or malformed document.
    #[error("an error occurred while parsing the CTD model: {0}")]
    ModelParsing(String),

    /// A declared type token has no counterpart in [`ParamType`](crate::ParamType).
    #[error("unsupported type encountered during model construction: {0}")]
    UnsupportedType(String),

    /// A child name was registered twice under [`DuplicatePolicy::Reject`](crate::DuplicatePolicy::Reject).
    #[error("group '{group}' already has a child named '{name}'")]
    DuplicateName { group: String, name: String },

    /// An argument was rejected during validation.
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML reading or writing failure.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<quick_xml::events::attributes::AttrError> for CtdError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(quick_xml::Error::from(err))
    }
}

/// Convenience alias for results with [`CtdError`].
pub type Result<T> = std::result::Result<T, CtdError>;
