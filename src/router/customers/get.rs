//! Read the authenticated customer.

use axum::extract::State;
use axum::{Extension, Json};

use crate::AppState;
use crate::customer::{CustomerId, CustomerProfile};
use crate::error::Result;

/// Handler of `GET /api/customers/me`.
pub async fn handler(
    State(state): State<AppState>,
    Extension(id): Extension<CustomerId>,
) -> Result<Json<CustomerProfile>> {
    Ok(Json(state.customers.find_by_id(id).await?))
}
