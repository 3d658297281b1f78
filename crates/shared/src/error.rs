use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure body returned by every booking service endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub conflict: bool,
}

impl ApiErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: Some(false),
            message: Some(message.into()),
            conflict: false,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            conflict: true,
            ..Self::new(message)
        }
    }
}

#[derive(Debug, Error)]
#[error("{}", .message.as_deref().unwrap_or("request was not successful"))]
pub struct ServiceRejection {
    pub message: Option<String>,
    pub conflict: bool,
}

impl From<ApiErrorBody> for ServiceRejection {
    fn from(value: ApiErrorBody) -> Self {
        Self {
            message: value.message,
            conflict: value.conflict,
        }
    }
}
