use thiserror::Error;

/// Errors surfaced by the container runtime collaborator
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("docker api error: {0}")]
    Api(#[from] bollard::errors::Error),

    #[error("encoding inspect output: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("empty response from runtime")]
    EmptyResponse,

    #[error("runtime unavailable: {0}")]
    Unavailable(String),
}
