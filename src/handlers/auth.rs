//! Registration, login, and the current-user endpoint.

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::dtos::auth::{LoginRequest, RegisterRequest, RegisterResponse};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::{CreateUser, SanitizedUser, UserRole};
use crate::services::TokenResponse;
use crate::utils::password::{HashedPassword, RawPassword};
use crate::utils::validation::ValidatedJson;
use crate::AppState;

/// Register a new user account.
///
/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let password_hash = RawPassword::new(req.password).hash()?;

    let user = state
        .db
        .create_user(&CreateUser {
            email: req.email.to_lowercase(),
            password_hash: password_hash.into_string(),
            name: req.name,
            role: UserRole::User,
        })
        .await?;

    info!(user_id = %user.user_id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.user_id,
            message: "Registration successful".to_string(),
        }),
    ))
}

/// Exchange credentials for an access token.
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = state
        .db
        .get_user_by_email(&req.email.to_lowercase())
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Invalid email or password")))?;

    let stored = HashedPassword::from_stored(user.password_hash.clone());
    if stored.verify(&RawPassword::new(req.password)).is_err() {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Invalid email or password"
        )));
    }

    let access_token =
        state
            .jwt
            .generate_access_token(user.user_id, &user.email, user.role().as_str())?;
    let response = state.jwt.token_response(access_token);

    info!(user_id = %user.user_id, "User logged in");

    Ok(Json(response))
}

/// The authenticated user's own record.
///
/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<SanitizedUser>, AppError> {
    let user = state
        .db
        .get_user(auth.user_id()?)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    Ok(Json(SanitizedUser::from(user)))
}
