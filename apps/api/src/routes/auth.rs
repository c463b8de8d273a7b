use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfigResponse {
    pub client_id: String,
    pub auth_server: String,
}

/// GET /api/auth/config
/// Public identity-provider settings the frontend needs to start sign-in.
pub async fn auth_config_handler(State(state): State<AppState>) -> Json<AuthConfigResponse> {
    Json(AuthConfigResponse {
        client_id: state.config.civic_client_id.clone(),
        auth_server: state.config.civic_auth_server.clone(),
    })
}
