use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::{
    error::ApiError,
    model::{role::Role, user::User},
};

/// Authenticated caller, resolved by the bearer middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ApiError::unauthorized("Not authenticated")),
        )
    }
}

impl AuthUser {
    fn require(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if self.role.is_any_of(allowed) {
            Ok(())
        } else {
            Err(ApiError::forbidden("User not authorized"))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        self.require(&[Role::Admin])
    }

    pub fn require_editor_or_admin(&self) -> Result<(), ApiError> {
        self.require(&[Role::Admin, Role::Editor])
    }
}
