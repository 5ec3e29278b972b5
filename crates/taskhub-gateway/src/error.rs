use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use taskhub_core::TaskhubError;
use tracing::error;

/// Error returned by the HTTP handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request input the handler rejected itself.
    BadRequest(String),
    /// A failure from the executor.
    Taskhub(TaskhubError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Taskhub(TaskhubError::TaskNotRoutable(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Taskhub(TaskhubError::TaskNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Taskhub(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(message) => message.clone(),
            ApiError::Taskhub(e) => e.to_string(),
        }
    }
}

impl From<TaskhubError> for ApiError {
    fn from(e: TaskhubError) -> Self {
        ApiError::Taskhub(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            error!(error = %message, "Request failed");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(TaskhubError::TaskNotRoutable("x".into())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(TaskhubError::TaskNotFound(Uuid::new_v4())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(TaskhubError::TaskExecution("queue closed".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::BadRequest("nope".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_response_status() {
        let resp = ApiError::from(TaskhubError::TaskNotRoutable("x".into())).into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
