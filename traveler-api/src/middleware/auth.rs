use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use traveler_core::{Caller, Role};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

// ============================================================================
// JWT Claims
// ============================================================================

/// Claims issued by the identity provider. `role` is `CUSTOMER`, `ADMIN` or `SUPER_ADMIN`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    pub exp: usize,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Caller {
            user_id: claims.sub,
            email: claims.email,
            role: Role::from_claim(&claims.role),
        }
    }
}

pub fn decode_caller(token: &str, secret: &str) -> Result<Caller, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::AuthenticationError(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims.into())
}

async fn bearer_caller(parts: &mut Parts, state: &AppState) -> Result<Option<Caller>, AppError> {
    match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
        Ok(TypedHeader(Authorization(bearer))) => decode_caller(bearer.token(), &state.auth.secret).map(Some),
        Err(rejection) if rejection.is_missing() => Ok(None),
        Err(rejection) => Err(AppError::AuthenticationError(rejection.to_string())),
    }
}

// ============================================================================
// Request Context Extractors
// ============================================================================

/// An authenticated caller; rejects the request with 401 when no valid token is present.
pub struct CurrentCaller(pub Caller);

impl FromRequestParts<AppState> for CurrentCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        bearer_caller(parts, state)
            .await?
            .map(CurrentCaller)
            .ok_or_else(|| {
                AppError::AuthenticationError("Authentication credentials were not provided.".to_string())
            })
    }
}

/// A caller that may be anonymous. A present but invalid token is still a 401.
pub struct MaybeCaller(pub Option<Caller>);

impl FromRequestParts<AppState> for MaybeCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeCaller(bearer_caller(parts, state).await?))
    }
}
