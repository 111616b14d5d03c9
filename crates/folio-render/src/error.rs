//! Render pass errors.

use folio_runtime::RuntimeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error(transparent)]
    Eval(#[from] RuntimeError),

    #[error("node {node}: visibleIf must resolve to a boolean, got {got}")]
    VisibleIfNotBoolean { node: String, got: &'static str },
}
