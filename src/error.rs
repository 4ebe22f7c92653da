//! Error types shared by the services and the HTTP layer

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Request rejected before touching any model
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The model could not be downloaded or constructed
    #[error("Model {model_id} unavailable: {reason}")]
    ModelUnavailable { model_id: String, reason: String },

    /// The model loaded but generation failed
    #[error("Inference with {model_id} failed: {reason}")]
    Inference { model_id: String, reason: String },
}

impl ServiceError {
    pub fn unavailable(model_id: impl Into<String>, err: anyhow::Error) -> Self {
        ServiceError::ModelUnavailable {
            model_id: model_id.into(),
            reason: format!("{err:#}"),
        }
    }

    pub fn inference(model_id: impl Into<String>, err: anyhow::Error) -> Self {
        ServiceError::Inference {
            model_id: model_id.into(),
            reason: format!("{err:#}"),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
