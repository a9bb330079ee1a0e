use std::str::FromStr;

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    auth::{auth::AuthUser, handlers::create_account},
    error::{ApiError, ApiResult},
    model::{
        role::Role,
        user::UserResponse,
    },
    models::CreateMemberReq,
    repo,
    response::{self, Page, paginate},
    utils::user_cache,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct MemberQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn member_not_found() -> ApiError {
    ApiError::not_found("User not found")
}

/// Create a member account (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/members",
    request_body = CreateMemberReq,
    responses(
        (status = 201, description = "Member created", body = UserResponse),
        (status = 400, description = "Validation failure or duplicate user", body = Object, example = json!({
            "message": "Username already registered"
        })),
        (status = 403, description = "Admin only")
    ),
    tag = "Members",
    security(("bearer_auth" = []))
)]
pub async fn create_member(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateMemberReq>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    payload.validate()?;

    let user = create_account(
        pool.get_ref(),
        &payload.username,
        &payload.email,
        &payload.password,
        payload.role.unwrap_or_default(),
    )
    .await?;

    Ok(response::created(
        "User created successfully",
        UserResponse::from(user),
    ))
}

/// List members
#[utoipa::path(
    get,
    path = "/api/v1/members",
    params(MemberQuery),
    responses(
        (status = 200, description = "Paginated member list", body = Object, example = json!({
            "message": "Members fetched successfully",
            "data": { "items": [{ "id": 1, "username": "root", "email": "root@example.com", "role": "admin" }], "page": 1, "per_page": 20, "total": 1 }
        })),
        (status = 403, description = "Editor or admin only")
    ),
    tag = "Members",
    security(("bearer_auth" = []))
)]
pub async fn list_members(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MemberQuery>,
) -> ApiResult<HttpResponse> {
    auth.require_editor_or_admin()?;

    let (page, per_page, offset) = paginate(query.page, query.per_page);
    let (users, total) = repo::user::list(pool.get_ref(), per_page, offset).await?;

    Ok(response::ok(
        "Members fetched successfully",
        Page {
            items: users.into_iter().map(UserResponse::from).collect(),
            page,
            per_page,
            total,
        },
    ))
}

/// Change a member's role (admin only)
#[utoipa::path(
    put,
    path = "/api/v1/members/{user_id}/change-role/{role}",
    params(
        ("user_id", Path, description = "Member id"),
        ("role", Path, description = "admin, editor or viewer")
    ),
    responses(
        (status = 200, description = "Role changed", body = UserResponse),
        (status = 400, description = "Invalid role"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    tag = "Members",
    security(("bearer_auth" = []))
)]
pub async fn change_role(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<(u64, String)>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;

    let (user_id, raw_role) = path.into_inner();
    let role = Role::from_str(&raw_role).map_err(|_| ApiError::bad_request("Invalid role"))?;

    let user = repo::user::set_role(pool.get_ref(), user_id, role)
        .await?
        .ok_or_else(member_not_found)?;
    user_cache::invalidate(&user.email).await;
    info!(user_id, %role, by = auth.id, "Member role changed");

    Ok(response::ok(
        "User role changed successfully",
        UserResponse::from(user),
    ))
}

/// Delete a member (admin only)
#[utoipa::path(
    delete,
    path = "/api/v1/members/{user_id}",
    params(("user_id", Path, description = "Member id")),
    responses(
        (status = 200, description = "Deleted member", body = UserResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    tag = "Members",
    security(("bearer_auth" = []))
)]
pub async fn delete_member(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;

    let user_id = path.into_inner();
    let user = repo::user::delete(pool.get_ref(), user_id)
        .await?
        .ok_or_else(member_not_found)?;
    user_cache::invalidate(&user.email).await;
    info!(user_id, by = auth.id, "Member deleted");

    Ok(response::ok(
        "User deleted successfully",
        UserResponse::from(user),
    ))
}
