use thiserror::Error;

use crate::types::ErrorDetail;

/// Failure of a call to the forge itself, as opposed to application errors
/// carried inside an activity envelope.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// The API rejected the credential (HTTP 401).
    #[error("not authorized to {operation}; check the GitHub token")]
    Unauthorized { operation: String },

    #[error("failed to {operation}: {source}")]
    Transport {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{operation} returned errors: {}", join_details(.errors))]
    Query {
        operation: String,
        errors: Vec<ErrorDetail>,
    },

    #[error("team '{team}' not found in organization '{owner}'")]
    TeamNotFound { owner: String, team: String },
}

impl ForgeError {
    pub fn transport(operation: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        ForgeError::Transport {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ForgeError::Unauthorized { .. })
    }
}

fn join_details(errors: &[ErrorDetail]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failures that abort a whole run.
#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("could not resolve members of {owner}/{team}")]
    TeamResolution {
        owner: String,
        team: String,
        #[source]
        source: ForgeError,
    },

    #[error("failed to write report")]
    Output(#[from] std::io::Error),
}
