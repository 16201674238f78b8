use geom_kernel::KernelError;

/// Errors that abort (part of) an evaluation pass.
///
/// Unresolved references and kernel failures are not errors: the affected
/// object is simply absent from the result.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("import of {object} failed: {source}")]
    Import {
        object: String,
        #[source]
        source: KernelError,
    },

    #[error("failed to serialize construction tree: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl EvalError {
    /// Name of the object whose evaluation raised the error, if known.
    pub fn object(&self) -> Option<&str> {
        match self {
            EvalError::Import { object, .. } => Some(object),
            EvalError::Serialize(_) => None,
        }
    }
}
