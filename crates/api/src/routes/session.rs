use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use common::LoginCredentials;

use crate::{ApiError, AppState};

const LOGIN_FAILED: &str = "Login failed";

pub fn session_router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LoginRequest {
    api_key: String,
    username: String,
    password: String,
    #[serde(default)]
    totp: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    message: &'static str,
    refresh_token: String,
    feed_token: String,
    user_profile: Value,
}

/// Password login, followed by a profile fetch for the new session.
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = body.map_err(|r| ApiError::rejected(LOGIN_FAILED, r))?;
    let credentials = LoginCredentials {
        username: req.username,
        password: req.password,
        totp: req.totp,
    };

    let session = state
        .broker
        .generate_session(&req.api_key, &credentials)
        .await
        .map_err(|e| ApiError::new(LOGIN_FAILED, e))?;
    let user_profile = state
        .broker
        .get_profile(&session)
        .await
        .map_err(|e| ApiError::new(LOGIN_FAILED, e))?;

    info!(user = %credentials.username, "Login successful");
    Ok(Json(LoginResponse {
        message: "Login successful",
        refresh_token: session.refresh_token.clone(),
        feed_token: session.feed_token().to_string(),
        user_profile,
    }))
}
