//! Session endpoints.

use axum::{extract::State, Json};

use super::{success, ApiResult};
use crate::auth::{LoginOutcome, SessionState};
use crate::models::{LoginRequest, SessionView, StatusView};
use crate::AppState;

/// GET /api/status - Storage availability and startup notice.
pub async fn get_status(State(state): State<AppState>) -> ApiResult<StatusView> {
    success(StatusView {
        binary_store_ready: state.gallery.binary_store_ready().await,
        notice: state.notice.clone(),
    })
}

/// GET /api/session - Current mode.
pub async fn get_session(State(state): State<AppState>) -> ApiResult<SessionView> {
    let is_owner = state.gallery.session_state().await == SessionState::Owner;
    success(SessionView {
        is_owner,
        message: String::new(),
    })
}

/// POST /api/session/login - Switch to owner mode.
///
/// A wrong passphrase is not an HTTP error; the message is meant for display
/// beside the form.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<SessionView> {
    match state.gallery.login(&request.passphrase).await {
        LoginOutcome::Granted => success(SessionView {
            is_owner: true,
            message: String::new(),
        }),
        LoginOutcome::Denied { message } => success(SessionView {
            is_owner: false,
            message,
        }),
    }
}

/// POST /api/session/logout - Back to viewer mode.
pub async fn logout(State(state): State<AppState>) -> ApiResult<SessionView> {
    state.gallery.logout().await;
    success(SessionView {
        is_owner: false,
        message: String::new(),
    })
}
