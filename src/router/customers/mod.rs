//! Customer account HTTP API.
pub mod create;
pub mod delete;
pub mod get;
pub mod update;

use axum::routing::{get, patch, post};
use axum::{Router, middleware};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::customer::CustomerId;

/// Body returned by routes acting on one customer.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct IdResponse {
    pub id: CustomerId,
}

pub fn router(state: AppState) -> Router<AppState> {
    // `/me` routes act on the customer owning the bearer token.
    let me = Router::new()
        // `GET /api/customers/me` goes to `get`.
        .route(
            "/me",
            get(get::handler)
                // `PATCH /api/customers/me` goes to `update::profile`.
                .patch(update::profile)
                // `DELETE /api/customers/me` goes to `delete`.
                .delete(delete::handler),
        )
        // `PATCH /api/customers/me/password` goes to `update::password`.
        .route("/me/password", patch(update::password))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::authenticate,
        ));

    Router::new()
        // `POST /api/customers` goes to `create`.
        .route("/", post(create::handler))
        .merge(me)
}
