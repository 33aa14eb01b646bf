//! Error types for stage operations.

use std::fmt;

/// Coarse classification of an [`Error`], stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DocumentNotOpen,
    PrimNotFound,
    UnsupportedValue,
    LayerNotFound,
    NestedEditContext,
    InvalidPath,
    OutsideEditTarget,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DocumentNotOpen => "DocumentNotOpen",
            ErrorKind::PrimNotFound => "PrimNotFound",
            ErrorKind::UnsupportedValue => "UnsupportedValue",
            ErrorKind::LayerNotFound => "LayerNotFound",
            ErrorKind::NestedEditContext => "NestedEditContext",
            ErrorKind::InvalidPath => "InvalidPath",
            ErrorKind::OutsideEditTarget => "OutsideEditTarget",
            ErrorKind::Storage => "Storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by stage, variant and composition operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("document '{id}' is not open")]
    DocumentNotOpen { id: String },

    #[error("no prim at <{path}> in '{id}'")]
    PrimNotFound { id: String, path: String },

    #[error("value does not fit kind '{kind}': {message}")]
    UnsupportedValue { kind: String, message: String },

    #[error("composition input '{id}' is not open")]
    LayerNotFound { id: String },

    #[error("an edit context is already active over <{active}>, cannot enter one on <{requested}>")]
    NestedEditContext { active: String, requested: String },

    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    #[error("<{path}> is outside the edit target <{target}>")]
    OutsideEditTarget { path: String, target: String },

    /// Failure in the persistence backend.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DocumentNotOpen { .. } => ErrorKind::DocumentNotOpen,
            Error::PrimNotFound { .. } => ErrorKind::PrimNotFound,
            Error::UnsupportedValue { .. } => ErrorKind::UnsupportedValue,
            Error::LayerNotFound { .. } => ErrorKind::LayerNotFound,
            Error::NestedEditContext { .. } => ErrorKind::NestedEditContext,
            Error::InvalidPath { .. } => ErrorKind::InvalidPath,
            Error::OutsideEditTarget { .. } => ErrorKind::OutsideEditTarget,
            Error::Storage(_) => ErrorKind::Storage,
        }
    }

    /// `"<Kind>: <message>"`, the form surfaced to users.
    pub fn report(&self) -> String {
        match self {
            Error::Storage(e) => format!("{}: {e:#}", self.kind()),
            other => format!("{}: {other}", other.kind()),
        }
    }

    pub(crate) fn document_not_open(id: impl Into<String>) -> Self {
        Error::DocumentNotOpen { id: id.into() }
    }

    pub(crate) fn prim_not_found(id: impl Into<String>, path: impl fmt::Display) -> Self {
        Error::PrimNotFound {
            id: id.into(),
            path: path.to_string(),
        }
    }

    pub(crate) fn unsupported(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Error::UnsupportedValue {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
