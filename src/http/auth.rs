//! Registration and login handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user::{Role, User};
use crate::error::Result;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    name: String,
    email: String,
    password: String,
    /// Accepted for wire compatibility, never honored.
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

/// Account fields safe to return to clients.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    id: Uuid,
    name: String,
    email: String,
    role: Role,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    message: String,
    token: String,
    user: PublicUser,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let (token, user) = state
        .identity
        .register(&req.name, &req.email, &req.password, req.role.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Registration successful.".to_string(),
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let (token, user) = state.identity.login(&req.email, &req.password).await?;

    Ok(Json(AuthResponse {
        message: "Login successful.".to_string(),
        token,
        user: PublicUser::from(&user),
    }))
}
