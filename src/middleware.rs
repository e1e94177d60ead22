//! Middlewares for routes.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::AppState;
use crate::error::{Result, ServerError};

const BEARER: &str = "Bearer ";

/// Require a valid bearer token and expose the authenticated
/// [`crate::customer::CustomerId`] to handlers.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER))
        .ok_or(ServerError::Unauthorized)?;

    let customer_id = state
        .token
        .decode(token)
        .and_then(|claims| claims.customer_id())
        .map_err(|err| {
            tracing::debug!(error = %err, "rejected bearer token");
            ServerError::Unauthorized
        })?;

    req.extensions_mut().insert(customer_id);
    Ok(next.run(req).await)
}
