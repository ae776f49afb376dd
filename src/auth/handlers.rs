use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, Pagination, PublicUser, RegisterRequest,
            UpdateOwnRequest, UpdateUserRequest,
        },
        error::AuthError,
        jwt::AuthUser,
    },
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn user_routes() -> Router<AppState> {
    // One parameter name per segment position: GET takes a free-text term,
    // the mutating verbs parse it as an id.
    Router::new()
        .route("/users", get(list_users))
        .route(
            "/users/:term",
            get(find_users).patch(update_user).delete(deactivate_user),
        )
        .route("/users/:term/credentials", patch(update_own_user))
}

/// Failures at the HTTP boundary: either the request itself is malformed or
/// the service rejected it.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(e) => e.status_code(),
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_email(email: &str) -> Result<(), ApiError> {
    if is_valid_email(email.trim()) {
        Ok(())
    } else {
        warn!(email = %email, "malformed email rejected");
        Err(ApiError::Invalid("email is not well-formed".into()))
    }
}

fn check_password(plain: &str) -> Result<(), ApiError> {
    if plain.len() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        warn!("password below minimum length rejected");
        Err(ApiError::Invalid(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )))
    }
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    check_email(&payload.email)?;
    check_password(&payload.password)?;
    let user = state.service.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    check_email(&payload.email)?;
    let envelope = state.service.login(&payload.email, &payload.password).await?;
    Ok(Json(envelope))
}

#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = state.service.list(page.limit, page.offset).await?;
    Ok(Json(users))
}

#[instrument(skip_all)]
pub async fn find_users(
    State(state): State<AppState>,
    Path(term): Path<String>,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = state.service.lookup(&term).await?;
    Ok(Json(users))
}

#[instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    if let Some(email) = &payload.email {
        check_email(email)?;
    }
    if let Some(password) = &payload.password {
        check_password(password)?;
    }
    debug!(caller = %caller, target = %id, "administrative update");
    let user = state.service.update(id, payload).await?;
    Ok(Json(user))
}

#[instrument(skip_all)]
pub async fn update_own_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOwnRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    if let Some(email) = &payload.email {
        check_email(email)?;
    }
    if let Some(new_password) = &payload.new_password {
        check_password(new_password)?;
    }
    debug!(caller = %caller, target = %id, "self-service update");
    let user = state.service.update_own(id, payload).await?;
    Ok(Json(user))
}

#[instrument(skip_all)]
pub async fn deactivate_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    debug!(caller = %caller, target = %id, "deactivation");
    state.service.deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_check_accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@x.com"));
    }

    #[test]
    fn password_check_enforces_minimum_length() {
        assert!(check_password("12345678").is_ok());
        assert!(check_password("1234567").is_err());
    }

    #[test]
    fn api_error_bodies_are_json_with_an_error_field() {
        let response = ApiError::Invalid("email is not well-formed".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::from(AuthError::AccountDisabled).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
