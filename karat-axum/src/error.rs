use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use karat_auth::AuthError;
use karat_core::store::StoreError;
use karat_core::KaratError;
use serde_json::json;
use tracing::{debug, error};

/// Any handler failure, rendered as the console's JSON error body.
#[derive(Debug)]
pub struct KaratAxumError(pub anyhow::Error);

impl From<anyhow::Error> for KaratAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<KaratError> for KaratAxumError {
    fn from(e: KaratError) -> Self {
        Self(e.into_anyhow())
    }
}

impl From<AuthError> for KaratAxumError {
    fn from(e: AuthError) -> Self {
        Self::from(KaratError::from(e))
    }
}

pub(crate) fn map_json_rejection(rejection: JsonRejection) -> KaratAxumError {
    KaratError::bad_request("Failed to parse the request body as JSON")
        .with_errors(json!({ "_schema": [rejection.body_text()] }))
        .into()
}

impl KaratAxumError {
    /// Find the structured error in the chain, converting crate-local
    /// errors that were never mapped.
    fn resolve(self) -> KaratError {
        let found = KaratError::find_in(&self.0).map(KaratError::sanitize_for_client);
        if let Some(found) = found {
            return found.with_source(self.0);
        }
        match self.0.downcast::<AuthError>() {
            Ok(auth) => auth.into(),
            Err(other) => match other.downcast::<StoreError>() {
                Ok(store) => store.into(),
                Err(other) => KaratError::normalize(other),
            },
        }
    }
}

impl IntoResponse for KaratAxumError {
    fn into_response(self) -> Response {
        let err = self.resolve();
        if err.code() >= 500 {
            error!(code = err.code(), error = %err, source = ?err.source, "request failed");
        } else {
            debug!(code = err.code(), error = %err, "request rejected");
        }
        let safe = err.sanitize_for_client();
        let status = StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}
