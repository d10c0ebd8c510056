use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Serialize, Serializer};

use crate::services::secrets_store::SecretsStoreError;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: Option<String>,
    #[serde(serialize_with = "serialize_status_code")]
    pub code: StatusCode,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.code, Json(self)).into_response()
    }
}

impl From<SecretsStoreError> for ApiError {
    fn from(err: SecretsStoreError) -> Self {
        tracing::warn!("{err}");
        ApiError {
            message: Some(err.to_string()),
            code: StatusCode::NOT_FOUND,
        }
    }
}

fn serialize_status_code<S>(x: &StatusCode, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_u16(x.as_u16())
}
