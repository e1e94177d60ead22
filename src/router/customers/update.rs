//! Update the authenticated customer.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::IdResponse;
use crate::AppState;
use crate::customer::CustomerId;
use crate::error::Result;
use crate::router::Valid;

#[derive(Debug, Validate, Serialize, Deserialize)]
pub struct ProfileBody {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Name must be 1 to 255 characters long."
    ))]
    pub name: String,
}

#[derive(Debug, Validate, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct PasswordBody {
    #[validate(length(min = 1, message = "Current password is required."))]
    pub old_password: String,
    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must contain at least 8 characters."
    ))]
    pub new_password: String,
}

/// Handler of `PATCH /api/customers/me`.
pub async fn profile(
    State(state): State<AppState>,
    Extension(id): Extension<CustomerId>,
    Valid(body): Valid<ProfileBody>,
) -> Result<Json<IdResponse>> {
    let id = state.customers.update_profile(id, &body.name).await?;
    Ok(Json(IdResponse { id }))
}

/// Handler of `PATCH /api/customers/me/password`.
pub async fn password(
    State(state): State<AppState>,
    Extension(id): Extension<CustomerId>,
    Valid(body): Valid<PasswordBody>,
) -> Result<Json<IdResponse>> {
    let id = state
        .customers
        .update_password(id, &body.old_password, &body.new_password)
        .await?;
    Ok(Json(IdResponse { id }))
}
