//! Permanently delete the authenticated customer.

use axum::Extension;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::AppState;
use crate::customer::CustomerId;
use crate::error::Result;
use crate::router::Valid;

#[derive(Debug, Validate, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Body {
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

/// Handler of `DELETE /api/customers/me`.
pub async fn handler(
    State(state): State<AppState>,
    Extension(id): Extension<CustomerId>,
    Valid(body): Valid<Body>,
) -> Result<StatusCode> {
    state.customers.delete(id, &body.password).await?;
    Ok(StatusCode::NO_CONTENT)
}
