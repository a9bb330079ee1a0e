use std::str::FromStr;

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::role::Role;

/// Raw `users` row; `role` is validated when converting into [`User`].
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub role: Role,
}

impl TryFrom<UserRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role).map_err(|e| sqlx::Error::ColumnDecode {
            index: "role".into(),
            source: Box::new(e),
        })?;

        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            hashed_password: row.hashed_password,
            role,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(
    example = json!({
        "id": 7,
        "username": "jdoe",
        "email": "jdoe@example.com",
        "role": "viewer"
    })
)]
pub struct UserResponse {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}
