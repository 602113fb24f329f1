use std::sync::{Arc, LazyLock};

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Json, extract::State};
use rand_core::OsRng;
use tracing::{info, warn};

use belay_db::Database;
use belay_types::BelayError;
use belay_types::api::{AuthResponse, CredentialsRequest};
use belay_types::models::UserId;

use crate::error::{ApiError, unavailable};
use crate::extract::ApiJson;
use crate::state::AppState;

/// Verified against when the user does not exist, so an unknown name costs
/// the same Argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("belay-dummy-password").unwrap_or_default());

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

fn password_matches(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Owns user records and password verification. Hashes never leave here.
#[derive(Clone)]
pub struct CredentialStore {
    db: Arc<Database>,
}

impl CredentialStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn register(&self, name: &str, password: &str) -> Result<UserId, BelayError> {
        if name.trim().is_empty() {
            return Err(BelayError::InvalidInput("username must not be empty".into()));
        }
        if password.trim().is_empty() {
            return Err(BelayError::InvalidInput("password must not be empty".into()));
        }

        let password_hash = hash_password(password)
            .map_err(|e| unavailable(anyhow::anyhow!("password hashing failed: {}", e)))?;

        match self.db.create_user(name, &password_hash).map_err(unavailable)? {
            Some(id) => {
                info!("Registered user {} ({})", id, name);
                Ok(UserId(id))
            }
            None => Err(BelayError::NameTaken(name.to_string())),
        }
    }

    /// Unknown name and wrong password fail identically.
    pub fn verify(&self, name: &str, password: &str) -> Result<UserId, BelayError> {
        let Some(user) = self.db.get_user_by_name(name).map_err(unavailable)? else {
            let _ = password_matches(password, &DUMMY_HASH);
            warn!("Failed login attempt");
            return Err(BelayError::InvalidCredentials);
        };

        if password_matches(password, &user.password_hash) {
            Ok(UserId(user.id))
        } else {
            warn!("Failed login attempt");
            Err(BelayError::InvalidCredentials)
        }
    }
}

pub async fn credentials_check(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let credentials = state.credentials.clone();
    let (username, password) = (req.username.clone(), req.password);
    let user_id = state
        .run_blocking(move || credentials.verify(&username, &password))
        .await?;

    let token = state.tokens.issue(user_id, &req.username).map_err(unavailable)?;

    Ok(Json(AuthResponse {
        success: true,
        message: format!("Logged in, welcome back {}", req.username),
        user: Some(req.username),
        id: Some(user_id),
        token: Some(token),
    }))
}

pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let credentials = state.credentials.clone();
    let (username, password) = (req.username.clone(), req.password);
    let user_id = state
        .run_blocking(move || credentials.register(&username, &password))
        .await?;

    let token = state.tokens.issue(user_id, &req.username).map_err(unavailable)?;

    Ok(Json(AuthResponse {
        success: true,
        message: format!("Successfully created {}", req.username),
        user: Some(req.username),
        id: Some(user_id),
        token: Some(token),
    }))
}
