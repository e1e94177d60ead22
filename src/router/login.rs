//! Exchange credentials for an access token.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::AppState;
use crate::customer::AccountError;
use crate::error::{Result, ServerError};
use crate::router::Valid;

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Validate, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Body {
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password must not be empty."))]
    pub password: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub token_type: String,
    pub access_token: String,
    pub expires_in: u64,
}

/// Handler of `POST /api/auth/login`.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    let customer = match state.customers.login(&body.email, &body.password).await
    {
        Ok(customer) => customer,
        Err(
            AccountError::CustomerNotFound | AccountError::PasswordIncorrect,
        ) => return Err(ServerError::LoginFailure),
        Err(err) => return Err(err.into()),
    };

    let id = customer.id.ok_or(ServerError::LoginFailure)?;
    let access_token = state
        .token
        .create(id)
        .map_err(|err| ServerError::internal("cannot sign token", err))?;

    tracing::info!(customer_id = %id, "customer logged in");

    Ok(Json(Response {
        token_type: TOKEN_TYPE.to_owned(),
        access_token,
        expires_in: state.token.lifetime(),
    }))
}
