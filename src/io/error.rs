use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while turning a mesh file into a [`Mesh`](crate::scene::mesh::Mesh).
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read mesh file: {0}")]
    Io(#[from] std::io::Error),

    /// `line` is 1-based.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("malformed mesh data: {0}")]
    Format(String),

    #[error("missing field '{0}'")]
    MissingField(String),

    /// `index` is reported 0-based after conversion.
    #[error("{what} index {index} out of range (have {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: i64,
        len: usize,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot infer mesh format from '{}'", .0.display())]
    UnknownFormat(PathBuf),

    #[error(
        "triangle {triangle} has degenerate texture coordinates; tangent basis is not finite \
         (try model.tangent_formula = \"standard\")"
    )]
    DegenerateTangentSpace { triangle: usize },
}

impl ImportError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}
