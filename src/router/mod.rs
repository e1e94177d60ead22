//! HTTP API.
pub mod customers;
pub mod login;
pub mod status;

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ServerError;

/// JSON body checked against its [`Validate`] rules before reaching the
/// handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct Valid<T>(pub T);

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// Application state backed by memory storage, MUST NEVER be used in
/// production.
#[cfg(test)]
pub(crate) fn state() -> crate::AppState {
    use std::sync::Arc;

    use crate::config::Configuration;
    use crate::customer::memory::MemoryCustomerRepository;
    use crate::customer::{CustomerService, StubEncoder};
    use crate::token::TokenManager;

    let config = Configuration::default();

    crate::AppState {
        token: TokenManager::new(&config.url, "test-secret")
            .expect("cannot create token manager"),
        config: Arc::new(config),
        customers: CustomerService::new(
            Arc::new(MemoryCustomerRepository::new()),
            Arc::new(StubEncoder),
        ),
        metrics: None,
    }
}

/// Create a customer and sign a token for it.
#[cfg(test)]
pub(crate) async fn register(
    state: &crate::AppState,
    email: &str,
    password: &str,
) -> (crate::customer::CustomerId, String) {
    let id = state
        .customers
        .create(email, "Ann", password)
        .await
        .expect("cannot create customer");
    let token = state.token.create(id).expect("cannot create JWT");

    (id, token)
}
