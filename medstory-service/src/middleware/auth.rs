use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{services::TokenKind, AppState};

/// Authenticated caller, resolved from the bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn unauthorized(msg: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
}

/// Middleware to require authentication. Validates the bearer access
/// token, then resolves the subject against the store so a deactivated
/// account stops working as soon as its access token is next presented.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let token = match token {
        Some(token) => token,
        None => return Err(unauthorized("Missing or invalid Authorization header")),
    };

    let claims = state
        .jwt
        .verify(token, TokenKind::Access)
        .map_err(|_| unauthorized("Invalid or expired token"))?;

    let user = state
        .store
        .find_user_by_email(&claims.sub)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Store error resolving authenticated user");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Internal server error".to_string(),
                }),
            )
        })?
        .ok_or_else(|| unauthorized("Invalid or expired token"))?;

    if !user.is_active {
        return Err(unauthorized("Account disabled"));
    }

    req.extensions_mut().insert(CurrentUser {
        user_id: user.user_id,
        email: user.email,
    });

    Ok(next.run(req).await)
}

/// Extractor to easily get the caller in handlers.
pub struct AuthUser(pub CurrentUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<CurrentUser>().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Auth context missing from request extensions".to_string(),
            }),
        ))?;

        Ok(AuthUser(user.clone()))
    }
}
