//! Authentication handlers.

use actix_web::{HttpResponse, web};

use quill_core::services::SignupInput;
use quill_shared::dto::{
    LoginRequest, LoginResponse, MessageResponse, SignupRequest, SignupResponse, StatusResponse,
    StatusUpdateRequest,
};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// PUT /auth/signup
pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let user = state
        .auth
        .signup(SignupInput::new(&req.email, &req.password, &req.name))
        .await?;

    Ok(HttpResponse::Created().json(SignupResponse {
        message: "User created!".to_string(),
        user_id: user.id,
    }))
}

/// POST /auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let outcome = state.auth.login(&req.email, &req.password).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        token: outcome.token,
        user_id: outcome.user_id,
        expires_in: outcome.expires_in,
    }))
}

/// GET /auth/status - Protected route
pub async fn get_status(
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let status = state.auth.status(identity.user_id).await?;

    Ok(HttpResponse::Ok().json(StatusResponse { status }))
}

/// PATCH /auth/status - Protected route
pub async fn update_status(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<StatusUpdateRequest>,
) -> AppResult<HttpResponse> {
    state
        .auth
        .update_status(identity.user_id, &body.status)
        .await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("User updated.")))
}
