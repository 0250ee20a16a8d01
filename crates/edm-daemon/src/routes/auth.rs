//! `/api/auth`: registration, login, account profile, logout.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use edm_db::StoreError;
use edm_gamify::AchievementId;
use edm_schemas::{AchievementKind, LearningStyle, NewAchievementRecord, NewUser, Role, UserPatch};
use tracing::{info, warn};

use super::{credit_record, current_user};
use crate::{
    api_types::{
        AccountProfile, AuthResponse, LoginRequest, MessageResponse, ProfileUpdateRequest,
        RegisterRequest, UserEnvelope,
    },
    auth::{hash_password, verify_password, AuthUser},
    error::{capitalize, ApiError, ApiResult},
    state::AppState,
    validate::{normalize_email, valid_email, ApiJson, Checks},
};

pub(super) const WELCOME_POINTS: i32 = 25;
const BIO_MAX: usize = 500;

pub(super) fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(profile).put(update_profile))
        .route("/logout", post(logout))
}

// ---------------------------------------------------------------------------
// POST /api/auth/register
// ---------------------------------------------------------------------------

pub(crate) async fn register(
    State(st): State<Arc<AppState>>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut c = Checks::new();
    let email = normalize_email(body.email.as_deref().unwrap_or_default());
    c.check(valid_email(&email), "email", "must be a valid email address");
    let password = body.password.unwrap_or_default();
    c.check(
        password.chars().count() >= 6,
        "password",
        "must be at least 6 characters",
    );
    let first_name = c.required(body.first_name.as_deref(), "firstName");
    let last_name = c.required(body.last_name.as_deref(), "lastName");
    let username = body.username.as_deref().unwrap_or_default().trim().to_string();
    c.check(
        username.chars().count() >= 3,
        "username",
        "must be at least 3 characters",
    );
    let learning_style = c
        .one_of(body.learning_style.as_deref(), "learningStyle", LearningStyle::parse)
        .unwrap_or_default();
    c.finish()?;

    let password_hash = hash_password(&password, st.config.auth.bcrypt_cost).await?;
    let user = st
        .store
        .create_user(NewUser {
            email,
            username,
            first_name,
            last_name,
            password_hash,
            role: Role::Student,
            learning_style,
            grade: body.grade,
            school: body.school,
            bio: None,
            points: 0,
            level: 1,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(msg) => ApiError::Conflict {
                error: "User already exists".into(),
                message: capitalize(&msg),
            },
            other => other.into(),
        })?;

    credit_record(
        &st,
        NewAchievementRecord {
            user_id: user.id,
            kind: AchievementKind::Engagement,
            title: "Welcome to EduMind!".into(),
            description: "Successfully created your account".into(),
            points: WELCOME_POINTS,
            metadata: None,
        },
    )
    .await?;

    let now = Utc::now();
    let granted = st
        .progress
        .update(user.id, now, |p| {
            edm_gamify::award(p, &[AchievementId::Welcome], now)
        })
        .await;
    st.announce_achievements(user.id, &granted);

    let token = st.tokens.issue(&user, now)?;
    let user = st.store.user_by_id(user.id).await?.unwrap_or(user);
    info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            user: user.public(),
            token,
        }),
    ))
}

// ---------------------------------------------------------------------------
// POST /api/auth/login
// ---------------------------------------------------------------------------

pub(crate) async fn login(
    State(st): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut c = Checks::new();
    let email = normalize_email(body.email.as_deref().unwrap_or_default());
    c.check(valid_email(&email), "email", "must be a valid email address");
    c.check(body.password.is_some(), "password", "is required");
    c.finish()?;
    let password = body.password.unwrap_or_default();

    // Unknown emails still pay for one bcrypt verify.
    let found = st.store.user_by_email(&email).await?;
    let hash = match &found {
        Some(u) => u.password_hash.clone(),
        None => st.login_decoy_hash().await?.to_string(),
    };
    let matches = verify_password(&password, &hash).await?;
    let Some(mut user) = found else {
        return Err(ApiError::InvalidCredentials);
    };
    if !matches {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let now = Utc::now();
    st.store.touch_last_active(user.id, now).await?;
    user.last_active = Some(now);
    let token = st.tokens.issue(&user, now)?;
    info!(user_id = %user.id, "user logged in");

    Ok(Json(AuthResponse {
        message: "Login successful",
        user: user.public(),
        token,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/auth/profile
// ---------------------------------------------------------------------------

pub(crate) async fn profile(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let user = current_user(&st, &auth).await?;
    let enrolled_courses = st.store.enrollments_for_user(user.id).await?;
    let achievements = st.store.achievement_records(user.id, 10).await?;
    Ok(Json(UserEnvelope {
        message: None,
        user: AccountProfile {
            user: user.public(),
            enrolled_courses,
            achievements,
        },
    }))
}

// ---------------------------------------------------------------------------
// PUT /api/auth/profile
// ---------------------------------------------------------------------------

fn trimmed(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string())
}

pub(crate) async fn update_profile(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<ProfileUpdateRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut c = Checks::new();
    let first_name = trimmed(body.first_name);
    let last_name = trimmed(body.last_name);
    let bio = trimmed(body.bio);
    c.check(
        first_name.as_deref().map_or(true, |s| !s.is_empty()),
        "firstName",
        "must not be empty",
    );
    c.check(
        last_name.as_deref().map_or(true, |s| !s.is_empty()),
        "lastName",
        "must not be empty",
    );
    c.check(
        bio.as_deref().map_or(true, |s| s.chars().count() <= BIO_MAX),
        "bio",
        "must be at most 500 characters",
    );
    let learning_style =
        c.one_of(body.learning_style.as_deref(), "learningStyle", LearningStyle::parse);
    c.finish()?;

    let patch = UserPatch {
        first_name,
        last_name,
        bio,
        learning_style,
        grade: trimmed(body.grade),
        school: trimmed(body.school),
        timezone: trimmed(body.timezone),
    };
    let user = st
        .store
        .update_user(auth.id(), patch)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::not_found("User"),
            other => other.into(),
        })?;

    if let Some(style) = learning_style {
        st.progress
            .update(user.id, Utc::now(), |p| {
                if let Some(prefs) = p.preferences.as_mut() {
                    prefs.learning_style = style;
                }
            })
            .await;
    }

    Ok(Json(UserEnvelope {
        message: Some("Profile updated successfully"),
        user: user.public(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/auth/logout
// ---------------------------------------------------------------------------

pub(crate) async fn logout(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
) -> impl IntoResponse {
    let ttl = auth.claims.remaining(Utc::now());
    st.denylist.revoke(&auth.claims.jti, ttl).await;
    info!(user_id = %auth.id(), "token revoked");
    Json(MessageResponse {
        message: "Logout successful".into(),
    })
}
