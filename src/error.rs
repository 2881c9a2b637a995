use std::path::PathBuf;

use thiserror::Error;

use crate::config::RagConfig;

/// The three ways a run can end badly. Every error is fatal; the kind only
/// decides which remediation the user is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MissingSource,
    ServiceUnavailable,
    Unexpected,
}

#[derive(Debug, Error)]
pub enum RagError {
    #[error("the file '{}' was not found", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("failed to read '{}': {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("inference service at {endpoint} is unreachable: {reason}")]
    ServiceUnreachable { endpoint: String, reason: String },

    #[error("model '{model}' is not available: {reason}")]
    ModelUnavailable { model: String, reason: String },

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("vector store error: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;

impl RagError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RagError::SourceNotFound { .. } => FailureKind::MissingSource,
            RagError::ServiceUnreachable { .. } | RagError::ModelUnavailable { .. } => {
                FailureKind::ServiceUnavailable
            }
            _ => FailureKind::Unexpected,
        }
    }

    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Lines shown to the user before the process exits.
    pub fn report(&self, config: &RagConfig) -> Vec<String> {
        let service_hint = format!(
            "Please ensure Ollama is running ('ollama serve') and you have pulled the '{}' model ('ollama pull {}').",
            config.llm_model, config.llm_model
        );

        match self.kind() {
            FailureKind::MissingSource => {
                let file = config.data_file.display();
                vec![
                    format!("Error: The file '{file}' was not found."),
                    format!("Please make sure '{file}' is in the working directory."),
                ]
            }
            FailureKind::ServiceUnavailable => {
                let mut lines = vec![format!("Error: {self}")];
                match self {
                    RagError::ModelUnavailable { model, .. } => lines.push(format!(
                        "Please pull the model first ('ollama pull {model}')."
                    )),
                    _ => lines.push(service_hint),
                }
                lines
            }
            FailureKind::Unexpected => vec![
                format!("An unexpected error occurred: {self}"),
                service_hint,
            ],
        }
    }
}
