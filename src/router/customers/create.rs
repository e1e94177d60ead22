//! Customer registration.

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::IdResponse;
use crate::AppState;
use crate::error::Result;
use crate::router::Valid;

const LOCATION: &str = "/api/customers/me";

#[derive(Debug, Validate, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Body {
    #[validate(
        email(message = "Email must be formatted."),
        length(max = 255, message = "Email must be at most 255 characters.")
    )]
    pub email: String,
    #[validate(length(
        min = 1,
        max = 255,
        message = "Name must be 1 to 255 characters long."
    ))]
    pub name: String,
    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must contain at least 8 characters."
    ))]
    pub password: String,
}

/// Handler of `POST /api/customers`.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<impl IntoResponse> {
    let id = state
        .customers
        .create(&body.email, &body.name, &body.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, LOCATION)],
        Json(IdResponse { id }),
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::json;

    use crate::customer::CustomerId;
    use crate::router::customers::IdResponse;
    use crate::*;

    fn body(email: &str, password: &str) -> String {
        json!({ "email": email, "name": "Ann", "password": password })
            .to_string()
    }

    #[tokio::test]
    async fn test_create_handler() {
        let state = router::state();
        let app = app(state.clone());

        let response = make_request(
            None,
            app,
            Method::POST,
            "/api/customers",
            body("ann@example.com", "correct horse"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/api/customers/me"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: IdResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.id, CustomerId(1));

        let profile = state.customers.find_by_id(body.id).await.unwrap();
        assert_eq!(profile.email, "ann@example.com");
    }

    #[tokio::test]
    async fn test_create_duplicate_email() {
        let state = router::state();
        router::register(&state, "ann@example.com", "correct horse").await;

        let response = make_request(
            None,
            app(state),
            Method::POST,
            "/api/customers",
            body("ann@example.com", "battery staple"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_create_with_short_password() {
        let state = router::state();

        let response = make_request(
            None,
            app(state.clone()),
            Method::POST,
            "/api/customers",
            body("ann@example.com", "short"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["errors"][0]["field"], "password");

        // Nothing was persisted.
        assert!(state.customers.find_by_email("ann@example.com").await.is_err());
    }
}
