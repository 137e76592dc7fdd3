use std::path::PathBuf;

/// Errors raised by the pipeline stages. Every stage fails fast; the
/// first error aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("could not load dataset from {url}: {reason}")]
    Load { url: String, reason: String },

    #[error("column '{column}' missing or malformed on feature {feature}: {reason}")]
    Schema {
        column: String,
        feature: usize,
        reason: String,
    },

    #[error("no record matches {0}")]
    NotFound(String),

    #[error("cannot repair '{name}': {reason}")]
    Repair { name: String, reason: String },

    #[error("cannot classify population column: {0}")]
    Classify(String),

    #[error("refusing to render: {0}")]
    Render(String),

    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Name of the pipeline stage this error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Load { .. } => "load",
            PipelineError::Schema { .. } => "normalize",
            PipelineError::NotFound(_) | PipelineError::Repair { .. } => "repair",
            PipelineError::Classify(_) => "classify",
            PipelineError::Render(_) | PipelineError::Io { .. } => "render",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        let err = PipelineError::NotFound("name 'Atlantis'".into());
        assert_eq!(err.stage(), "repair");
        assert_eq!(err.to_string(), "no record matches name 'Atlantis'");

        let err = PipelineError::Render("empty collection".into());
        assert_eq!(err.stage(), "render");
    }
}
