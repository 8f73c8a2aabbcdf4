//! Error types for sfem operations.

use thiserror::Error;

/// Result type alias using the sfem [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, assembling or solving a problem.
#[derive(Error, Debug)]
pub enum Error {
    /// Unknown mesh format or malformed mesh section.
    #[error("mesh format error: {0}")]
    MeshFormat(String),

    /// Expression syntax errors, unbalanced brackets and undefined variables.
    #[error("parse error: {0}")]
    Parse(String),

    /// Expression evaluation errors (division by zero, square root of a negative number).
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Missing or invalid problem parameters.
    #[error("config error: {0}")]
    Config(String),

    /// Factorization failures and degenerate geometry.
    #[error("numeric error: {0}")]
    Numeric(String),

    /// Failures of the assembly worker pool itself.
    #[error("assembly error: {0}")]
    Assembly(String),

    /// Problem file decoding errors.
    #[error("problem file error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors (mesh, problem and result files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Prefix the message with `location` (e.g. "element 12").
    pub(crate) fn at(self, location: impl std::fmt::Display) -> Self {
        match self {
            Error::MeshFormat(m) => Error::MeshFormat(format!("{}: {}", location, m)),
            Error::Parse(m) => Error::Parse(format!("{}: {}", location, m)),
            Error::Evaluation(m) => Error::Evaluation(format!("{}: {}", location, m)),
            Error::Config(m) => Error::Config(format!("{}: {}", location, m)),
            Error::Numeric(m) => Error::Numeric(format!("{}: {}", location, m)),
            Error::Assembly(m) => Error::Assembly(format!("{}: {}", location, m)),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_prefix() {
        let err = Error::Config("thickness must be positive".into()).at("element 3");
        assert_eq!(err.to_string(), "config error: element 3: thickness must be positive");
        let io = Error::Io(std::io::Error::other("disk")).at("element 3");
        assert!(matches!(io, Error::Io(_)));
    }
}
