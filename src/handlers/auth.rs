use axum::{
    extract::{Query, State},
    response::{Json, Redirect},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    errors::{AppError, Result},
    handlers::AppState,
    middleware::auth::CurrentUser,
    models::UserRecord,
};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
}

/// Sends the browser to the identity provider's authorize page.
pub async fn login(State(state): State<AppState>) -> Redirect {
    let authorize_url = format!(
        "{}/authc?app_id={}&redirect_uri={}",
        state.config.auth_server_url, state.config.auth_app_id, state.config.auth_redirect_uri
    );
    Redirect::to(&authorize_url)
}

/// Identity-provider callback. Any provider-side failure surfaces as one
/// generic denial.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<UserRecord>> {
    match state.auth.resolve_callback(&query.code).await {
        Some(user) => Ok(Json(user)),
        None => Err(AppError::Auth("Login failed".to_string())),
    }
}

pub async fn current_user(CurrentUser(user): CurrentUser) -> Result<Json<UserRecord>> {
    Ok(Json(user))
}

/// Tokens are cached until restart; logout is acknowledged without evicting
/// anything, matching the provider-delegated session model.
pub async fn logout(CurrentUser(_user): CurrentUser) -> Result<Json<serde_json::Value>> {
    Ok(Json(json!({
        "message": "Logged out successfully"
    })))
}
