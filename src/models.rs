use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::model::role::Role;

/// Usernames are stored trimmed, so the length rule applies to the trimmed value.
fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.trim().chars().count();
    if (1..=64).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::new("length")
            .with_message("Username must be 1-64 characters".into()))
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterReq {
    #[validate(custom(function = "validate_username"))]
    #[schema(example = "jdoe")]
    pub username: String,
    #[validate(email)]
    #[schema(example = "jdoe@example.com", format = "email")]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "correct-horse-battery")]
    pub password: String,
}

/// Member creation by an admin; same rules as registration plus an optional role.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMemberReq {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    #[schema(example = "jdoe@example.com")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenReq {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
}

impl TokenPair {
    pub fn bearer(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's email.
    pub sub: String,
    pub user_id: u64,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub token_type: TokenType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}
