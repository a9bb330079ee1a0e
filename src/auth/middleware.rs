use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::TokenType;
use crate::repo;
use crate::utils::user_cache;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::AUTHORIZATION,
    web::Data,
};
use sqlx::MySqlPool;
use tracing::debug;

fn reject(req: ServiceRequest, err: ApiError) -> Result<ServiceResponse<BoxBody>, Error> {
    debug!(path = %req.path(), reason = %err, "Rejected request");
    let resp = err.error_response();
    Ok(req.into_response(resp.map_into_boxed_body()))
}

/// `Authorization: Bearer <token>` value, or the rejection to send.
pub fn bearer_token(header: Option<&str>) -> Result<&str, ApiError> {
    let value = header.ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Authorization header must start with Bearer"))
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| ApiError::internal("App config missing"))?;

    let header = match req.headers().get(AUTHORIZATION).map(|h| h.to_str()) {
        Some(Ok(value)) => Some(value.to_owned()),
        Some(Err(_)) => {
            return reject(
                req,
                ApiError::unauthorized("Invalid Authorization header encoding"),
            );
        }
        None => None,
    };

    let token = match bearer_token(header.as_deref()) {
        Ok(t) => t,
        Err(e) => return reject(req, e),
    };

    let claims = match verify_token(token, &config.jwt_secret)
        .ok()
        .and_then(|c| c.ensure_type(TokenType::Access))
    {
        Some(c) => c,
        None => return reject(req, ApiError::unauthorized("Invalid or expired token")),
    };

    let auth_user = match user_cache::get(&claims.sub).await {
        Some(user) => user,
        None => {
            let pool = req
                .app_data::<Data<MySqlPool>>()
                .cloned()
                .ok_or_else(|| ApiError::internal("Database pool missing"))?;

            let user = match repo::user::get_by_email(pool.get_ref(), &claims.sub).await {
                Ok(Some(user)) => AuthUser::from(&user),
                Ok(None) => return reject(req, ApiError::unauthorized("User not found")),
                Err(e) => return reject(req, ApiError::from(e)),
            };
            user_cache::insert(user.clone()).await;
            user
        }
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
