//! Authentication extractor.

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use std::future::{Ready, ready};

use quill_core::ports::TokenClaims;

use crate::middleware::error::AppError;
use crate::state::AppState;

/// Authenticated user identity extractor.
///
/// Use this in handlers to require a valid bearer token:
/// ```ignore
/// async fn protected_route(identity: Identity) -> impl Responder {
///     format!("Hello, user {}!", identity.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: uuid::Uuid,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
        }
    }
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<Identity, AppError> {
    let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
        AppError::Internal("AppState not found in app data".to_string())
    })?;

    let token = bearer_token(req).ok_or_else(AppError::not_authenticated)?;

    match state.tokens.validate_token(token) {
        Ok(claims) => Ok(Identity::from(claims)),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            Err(AppError::not_authenticated())
        }
    }
}

/// The token of an `Authorization: Bearer <token>` header.
fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let Some(value) = req.headers().get(header::AUTHORIZATION) else {
        tracing::debug!("Missing Authorization header");
        return None;
    };

    let Ok(value) = value.to_str() else {
        tracing::debug!("Authorization header is not valid ASCII");
        return None;
    };

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Some(token.trim()),
        _ => {
            tracing::debug!("Authorization header is not a Bearer token");
            None
        }
    }
}
