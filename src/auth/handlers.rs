use crate::{
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{ApiError, ApiResult},
    model::{
        role::Role,
        user::{User, UserResponse},
    },
    models::{LoginForm, RefreshTokenReq, RegisterReq, TokenPair, TokenType},
    repo::{self, user::NewUser},
    response,
};
use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::{Executor, MySql, MySqlPool};
use tracing::{debug, error, info, instrument};
use validator::Validate;

/// Inserts a new account after the duplicate checks.
/// Shared by self-registration and admin member creation.
pub(crate) async fn create_account(
    pool: &MySqlPool,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> ApiResult<User> {
    let username = username.trim();
    let email = email.trim();

    if repo::user::username_exists(pool, username).await? {
        return Err(ApiError::bad_request("Username already registered"));
    }

    if repo::user::email_exists(pool, email).await? {
        return Err(ApiError::bad_request("Email already registered"));
    }

    let hashed = hash_password(password)?;

    let new_user = NewUser {
        username,
        email,
        hashed_password: &hashed,
        role,
    };

    match repo::user::create(pool, new_user).await {
        Ok(user) => {
            info!(user_id = user.id, role = %user.role, "Account created");
            Ok(user)
        }
        // Lost a race with a concurrent insert of the same username/email.
        Err(e) if repo::user::is_unique_violation(&e) => {
            Err(ApiError::bad_request("User already registered"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Signs an access/refresh pair and records the refresh `jti`.
async fn issue_tokens<'c, E>(executor: E, config: &Config, user: &User) -> ApiResult<TokenPair>
where
    E: Executor<'c, Database = MySql>,
{
    let access_token = generate_access_token(user, &config.jwt_secret, config.access_token_ttl)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(user, &config.jwt_secret, config.refresh_token_ttl)?;

    debug!(user_id = user.id, jti = %refresh_claims.jti, "Storing refresh token");
    repo::refresh_token::store(executor, &refresh_claims).await?;

    Ok(TokenPair::bearer(access_token, refresh_token))
}

/// Every login failure looks the same to the client.
pub(crate) fn bad_credentials() -> ApiError {
    ApiError::bad_request_with(
        "Incorrect username or password",
        json!({ "WWW-Authenticate": "Bearer" }),
    )
}

fn invalid_refresh() -> ApiError {
    ApiError::unauthorized("Invalid refresh token")
}

/// Register a new viewer account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered", body = Object, example = json!({
            "message": "User registered successfully",
            "data": { "id": 7, "username": "jdoe", "email": "jdoe@example.com", "role": "viewer" }
        })),
        (status = 400, description = "Validation failure or duplicate user", body = Object, example = json!({
            "message": "Email already registered"
        }))
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(pool, body), fields(username = %body.username))]
pub async fn register(
    body: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
) -> ApiResult<HttpResponse> {
    body.validate()?;

    let user = create_account(
        pool.get_ref(),
        &body.username,
        &body.email,
        &body.password,
        Role::Viewer,
    )
    .await?;

    Ok(response::created(
        "User registered successfully",
        UserResponse::from(user),
    ))
}

/// Exchange email and password for a token pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Login successful", body = Object, example = json!({
            "message": "Login successful",
            "data": { "access_token": "eyJ...", "refresh_token": "eyJ...", "token_type": "bearer" }
        })),
        (status = 400, description = "Bad credentials", body = Object, example = json!({
            "message": "Incorrect username or password",
            "details": { "WWW-Authenticate": "Bearer" }
        }))
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, form), fields(email = %form.email))]
pub async fn login(
    form: web::Form<LoginForm>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    info!("Login request received");

    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Err(bad_credentials());
    }

    let user = match repo::user::get_by_email(pool.get_ref(), email).await? {
        Some(user) => user,
        None => {
            info!("Invalid credentials: user not found");
            return Err(bad_credentials());
        }
    };

    match verify_password(&form.password, &user.hashed_password) {
        Ok(true) => debug!(user_id = user.id, "Password verified"),
        Ok(false) => {
            info!(user_id = user.id, "Invalid credentials: password mismatch");
            return Err(bad_credentials());
        }
        Err(e) => {
            error!(error = %e, user_id = user.id, "Stored password hash is unreadable");
            return Err(bad_credentials());
        }
    }

    let tokens = issue_tokens(pool.get_ref(), &config, &user).await?;

    info!(user_id = user.id, "Login successful");
    Ok(response::ok("Login successful", tokens))
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshTokenReq,
    responses(
        (status = 200, description = "New token pair; the old refresh token is revoked", body = Object, example = json!({
            "message": "Token refreshed successfully",
            "data": { "access_token": "eyJ...", "refresh_token": "eyJ...", "token_type": "bearer" }
        })),
        (status = 401, description = "Invalid, expired, revoked or reused refresh token", body = Object, example = json!({
            "message": "Invalid refresh token"
        }))
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_refresh", skip_all)]
pub async fn refresh_token(
    body: web::Json<RefreshTokenReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    let claims = verify_token(&body.refresh_token, &config.jwt_secret)
        .ok()
        .and_then(|c| c.ensure_type(TokenType::Refresh))
        .ok_or_else(invalid_refresh)?;

    let mut tx = pool.begin().await?;

    // Revoke the presented token; fails if it was already used or revoked.
    if !repo::refresh_token::consume(&mut *tx, &claims.jti).await? {
        info!(jti = %claims.jti, "Refresh token not live");
        return Err(invalid_refresh());
    }

    let user = repo::user::get_by_email(&mut *tx, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    let tokens = issue_tokens(&mut *tx, &config, &user).await?;
    tx.commit().await?;

    info!(user_id = user.id, "Refresh token rotated");
    Ok(response::ok("Token refreshed successfully", tokens))
}

/// Revoke a refresh token
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    request_body = RefreshTokenReq,
    responses(
        (status = 204, description = "Refresh token revoked (idempotent)")
    ),
    tag = "Auth"
)]
pub async fn logout(
    body: web::Json<RefreshTokenReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    // Anything that is not a valid refresh token has nothing to revoke.
    if let Some(claims) = verify_token(&body.refresh_token, &config.jwt_secret)
        .ok()
        .and_then(|c| c.ensure_type(TokenType::Refresh))
    {
        repo::refresh_token::revoke(pool.get_ref(), &claims.jti).await?;
        info!(user_id = claims.user_id, "Refresh token revoked");
    }

    Ok(HttpResponse::NoContent().finish())
}
