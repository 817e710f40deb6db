use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    config::AppConfig,
    dto::auth::{
        Claims, ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
        ResetPasswordRequest,
    },
    entity::users::{self, Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    lifecycle::Role,
    models::User,
    response::ApiResponse,
    state::AppState,
};

const RESET_TOKEN_TTL_HOURS: i64 = 1;
const FORGOT_PASSWORD_MESSAGE: &str =
    "If the email is registered, a password reset link has been issued";

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Rejects blank passwords and passwords equal to the account email.
pub fn validate_password(email: &str, password: &str) -> AppResult<()> {
    if password.trim().is_empty() {
        return Err(AppError::BadRequest("password is required".into()));
    }
    if password.eq_ignore_ascii_case(email) {
        return Err(AppError::BadRequest(
            "Password cannot be the same as email".into(),
        ));
    }
    Ok(())
}

pub fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".into()));
    }
    Ok(email)
}

pub fn issue_token(config: &AppConfig, user_id: Uuid, role: Role) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.jwt_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let email = normalize_email(&payload.email)?;
    validate_password(&email, &payload.password)?;
    let phone = payload.phone.trim().to_string();
    if phone.is_empty() {
        return Err(AppError::BadRequest("phone is required".into()));
    }

    let exists = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict("Email is already taken".into()));
    }

    let now = Utc::now();
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(hash_password(&payload.password)?),
        role: Set(Role::Customer),
        name: Set(payload.name.map(|n| n.trim().to_string()).unwrap_or_default()),
        phone: Set(phone),
        is_available: Set(true),
        rating: Set(5.0),
        total_deliveries: Set(0),
        total_earnings: Set(0),
        incentives: Set(0),
        bonus: Set(0),
        online_status: Set(false),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.id,
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::ok("User created", User::from(user)))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let email = payload.email.trim().to_lowercase();
    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    let token = issue_token(&state.config, user.id, user.role)?;

    audit::record(
        &state.pool,
        user.id,
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::ok(
        "Logged in",
        LoginResponse {
            token,
            user: User::from(user),
        },
    ))
}

pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let email = payload.email.trim().to_lowercase();
    if let Some(user) = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?
    {
        let token = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        let user_id = user.id;

        let mut active = user.into_active_model();
        active.reset_token = Set(Some(token));
        active.reset_token_expires_at = Set(Some(expires_at.into()));
        active.updated_at = Set(Utc::now().into());
        active.update(&state.orm).await?;

        tracing::info!(%user_id, %expires_at, "password reset token issued");
    }

    Ok(ApiResponse::ok(
        FORGOT_PASSWORD_MESSAGE,
        serde_json::json!({}),
    ))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let token = payload.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("Invalid or expired reset token".into()));
    }

    let user = Users::find()
        .filter(UserCol::ResetToken.eq(token))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".into()))?;

    let expired = user
        .reset_token_expires_at
        .is_none_or(|expires_at| expires_at.with_timezone(&Utc) < Utc::now());
    if expired {
        return Err(AppError::BadRequest("Invalid or expired reset token".into()));
    }

    validate_password(&user.email, &payload.new_password)?;

    let user_id = user.id;
    let mut active = user.into_active_model();
    active.password_hash = Set(hash_password(&payload.new_password)?);
    active.reset_token = Set(None);
    active.reset_token_expires_at = Set(None);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user_id,
        "password_reset",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::ok("Password has been reset", serde_json::json!({})))
}
