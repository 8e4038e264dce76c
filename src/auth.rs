use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{StatusCode, header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{AppConfig, Env};

/// Role that satisfies the admin tier.
pub const ADMIN_ROLE: &str = "admin";

/// Role of any identity that is not listed as an admin.
pub const DEFAULT_ROLE: &str = "user";

/// Claims
///
/// Payload expected inside the bearer JWT. The role travels in the token, the host
/// keeps no user store of its own.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    /// Role used for tier checks, `admin` unlocks the admin tier.
    pub role: String,
    /// Expiration time, always validated.
    pub exp: usize,
    /// Issued at.
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Inserted into the request
/// extensions by the tier middleware so module handlers can pull it with
/// `Extension<AuthUser>` or extract it again directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// AuthUser Extractor Implementation
///
/// 1. Local bypass: in `Env::Local` an `x-user-id` header is accepted as the identity.
///    The role is looked up in `AppConfig::local_admin_ids`, never read from the request.
/// 2. Token extraction: `Authorization: Bearer <token>`.
/// 3. Decoding: HS256 with the configured secret, expiration enforced.
///
/// Rejection: `401 Unauthorized` on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 0. Already resolved by an outer tier middleware.
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        // 1. Dependency Resolution
        let config = AppConfig::from_ref(state);

        // 2. Local Development Bypass Check
        // Guarded by the Env check. A bypass header that does not parse falls through
        // to the token.
        if config.env == Env::Local {
            if let Some(user) = local_bypass(parts, &config) {
                return Ok(user);
            }
        }

        // 3. Token Extraction
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        // 4. Decoding and Validation (signature + expiration)
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            StatusCode::UNAUTHORIZED
        })?;

        Ok(AuthUser {
            id: token_data.claims.sub,
            role: token_data.claims.role,
        })
    }
}

fn local_bypass(parts: &Parts, config: &AppConfig) -> Option<AuthUser> {
    let id = parts
        .headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())?;

    let role = if config.local_admin_ids.contains(&id) {
        ADMIN_ROLE
    } else {
        DEFAULT_ROLE
    };

    Some(AuthUser {
        id,
        role: role.to_string(),
    })
}

/// require_auth
///
/// Middleware behind `Requirement::Auth`. Extraction failure rejects with 401 before the
/// handler runs, success stores the identity in the request extensions.
pub async fn require_auth(user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(user);
    next.run(request).await
}

/// require_superuser
///
/// Middleware behind `Requirement::Superuser`. Same as `require_auth`, then rejects
/// non-admin identities with 403.
pub async fn require_superuser(
    user: AuthUser,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
