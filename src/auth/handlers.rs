use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
            MessageResponse, ProfileResponse, PublicUser, RegisterRequest, ResetPasswordRequest,
            UpdateProfileRequest,
        },
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
        recovery,
        repo::User,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile))
        .route("/profile/details", put(update_details))
        .route("/profile/password", put(change_password))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let email = normalize_email(&payload.email);
    let full_name = payload.full_name.trim().to_string();

    if full_name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation("Please fill in all fields.".into()));
    }
    if !is_valid_email(&email) {
        warn!("invalid email on register");
        return Err(ApiError::Validation("Invalid email address.".into()));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters.".into(),
        ));
    }

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!("email already registered");
        return Err(ApiError::Conflict("This email is already registered.".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &email, &full_name, &hash).await?;

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Registration successful! Please log in.".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Please enter your email and password.".into(),
        ));
    }

    // Unknown email and wrong password share one message.
    let invalid = || ApiError::Validation("Incorrect email or password.".into());

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!("login with unknown email");
        return Err(invalid());
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(invalid());
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.email, &user.full_name)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful!".into(),
        token,
        user: PublicUser {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
        },
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = normalize_email(&payload.email);
    recovery::request_reset(&state.db, state.mailer.as_ref(), &email).await?;
    Ok(Json(MessageResponse {
        message: recovery::GENERIC_RESET_MESSAGE.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = normalize_email(&payload.email);
    recovery::consume_reset(&state.db, &email, payload.otp.trim(), &payload.new_password).await?;
    Ok(Json(MessageResponse {
        message: "Password has been reset. Please log in.".into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".into()))?;

    Ok(Json(ProfileResponse {
        id: user.id,
        full_name: user.full_name,
        email: user.email,
        profile_picture: user.profile_picture,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_details(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let full_name = payload.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(ApiError::Validation("Full name cannot be empty.".into()));
    }

    let user = User::update_profile(
        &state.db,
        claims.sub,
        &full_name,
        payload.profile_picture.as_deref(),
    )
    .await?;

    // Old tokens still carry the previous name; hand back a fresh one.
    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.email, &user.full_name)?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(AuthResponse {
        message: "Profile updated successfully.".into(),
        token,
        user: PublicUser {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
        },
    }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.current_password.is_empty() || payload.new_password.is_empty() {
        return Err(ApiError::Validation("Please fill in all fields.".into()));
    }
    if payload.new_password.len() < 6 {
        return Err(ApiError::Validation(
            "New password must be at least 6 characters.".into(),
        ));
    }

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".into()))?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!(user_id = %user.id, "password change with wrong current password");
        return Err(ApiError::Validation("Current password is incorrect.".into()));
    }

    let new_hash = hash_password(&payload.new_password)?;
    User::update_password(&state.db, user.id, &new_hash).await?;

    info!(user_id = %user.id, "password changed");
    Ok(Json(MessageResponse {
        message: "Password changed successfully.".into(),
    }))
}
