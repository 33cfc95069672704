use std::future::Future;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use karat_auth::SessionContext;
use karat_catalog::Catalog;
use karat_core::{ConnectionParams, KaratError};

use crate::KaratAxumError;

#[derive(Clone)]
pub struct ConsoleState {
    pub session: Arc<SessionContext>,
    pub catalog: Arc<Catalog>,
}

impl ConsoleState {
    pub fn new(session: Arc<SessionContext>, catalog: Arc<Catalog>) -> Self {
        Self { session, catalog }
    }

    /// Run feature work under the current session; results that arrive
    /// after a logout are dropped.
    pub async fn guarded<T, F>(&self, work: F) -> Result<T, KaratAxumError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        Ok(self.session.guard().run(work).await?)
    }
}

/// Extracts the logged-in shop, rejecting the request with 401 otherwise.
pub struct Authenticated(pub ConnectionParams);

impl FromRequestParts<ConsoleState> for Authenticated {
    type Rejection = KaratAxumError;

    async fn from_request_parts(_parts: &mut Parts, state: &ConsoleState) -> Result<Self, Self::Rejection> {
        state
            .session
            .current_params()
            .map(Authenticated)
            .ok_or_else(|| KaratError::not_authenticated("Not authenticated").into())
    }
}
