pub mod profiler;
pub use profiler::{DEFAULT_CONTEXT, ProfilerService, ProfilerSession, REPORT_NOT_OPEN};

use axum::{
    response::IntoResponse,
    http::StatusCode,
    Json
};
use crate::api::models::ApiResponse;

pub struct AppError(pub common::Error);

impl AppError {
    pub fn bad_request(message: String) -> Self {
        AppError(common::Error::InvalidInput(message))
    }

    pub fn status_code(&self) -> StatusCode {
        match self.0 {
            common::Error::Precondition(_)
            | common::Error::InvalidInput(_)
            | common::Error::EmptyReport(_)
            | common::Error::MixedReportModes
            | common::Error::Json(_) => StatusCode::BAD_REQUEST,
            common::Error::NotFound(_) => StatusCode::NOT_FOUND,
            common::Error::RunInProgress => StatusCode::CONFLICT,
            common::Error::Api { .. } | common::Error::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        let body = Json(ApiResponse::<()>::error(self.0.user_message()));
        (status_code, body).into_response()
    }
}

impl From<common::Error> for AppError {
    fn from(err: common::Error) -> Self {
        AppError(err)
    }
}
