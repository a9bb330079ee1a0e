use std::str::FromStr;

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::auth::AuthUser,
    error::{ApiError, ApiResult},
    model::job::{Job, JobLocation, JobStatus, JobTiming, NewJob, UpdateJob},
    repo::{self, job::JobFilter},
    response::{self, Page, paginate},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct JobQuery {
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page (1-100)
    pub per_page: Option<u32>,
    pub status: Option<JobStatus>,
    pub location: Option<JobLocation>,
    pub timing: Option<JobTiming>,
    pub category: Option<String>,
    /// Matches title, category or about
    pub search: Option<String>,
}

fn job_not_found() -> ApiError {
    ApiError::not_found("Job not found")
}

/// List jobs
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    params(JobQuery),
    responses(
        (status = 200, description = "Paginated job list", body = Object, example = json!({
            "message": "Jobs fetched successfully",
            "data": { "items": [], "page": 1, "per_page": 20, "total": 0 }
        })),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "Jobs",
    security(("bearer_auth" = []))
)]
pub async fn list_jobs(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<JobQuery>,
) -> ApiResult<HttpResponse> {
    let query = query.into_inner();
    let (page, per_page, offset) = paginate(query.page, query.per_page);

    let filter = JobFilter {
        status: query.status,
        location: query.location,
        timing: query.timing,
        category: query.category,
        search: query.search,
    };

    let (items, total) = repo::job::list(pool.get_ref(), &filter, per_page, offset).await?;

    Ok(response::ok(
        "Jobs fetched successfully",
        Page {
            items,
            page,
            per_page,
            total,
        },
    ))
}

/// Get a job by id
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{job_id}",
    params(("job_id", Path, description = "Job UUID")),
    responses(
        (status = 200, description = "Job found", body = Job),
        (status = 404, description = "Job not found", body = Object, example = json!({
            "message": "Job not found"
        }))
    ),
    tag = "Jobs",
    security(("bearer_auth" = []))
)]
pub async fn get_job(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let job = repo::job::get_by_id(pool.get_ref(), path.into_inner())
        .await?
        .ok_or_else(job_not_found)?;

    Ok(response::ok("Job fetched successfully", job))
}

/// Create a job posting
#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    request_body = NewJob,
    responses(
        (status = 201, description = "Job created", body = Job),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Editor or admin only")
    ),
    tag = "Jobs",
    security(("bearer_auth" = []))
)]
pub async fn create_job(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<NewJob>,
) -> ApiResult<HttpResponse> {
    auth.require_editor_or_admin()?;
    payload.validate()?;

    let job = repo::job::create(pool.get_ref(), &payload).await?;
    info!(job_id = %job.id, by = auth.id, "Job created");

    Ok(response::created("Job created successfully", job))
}

/// Update a job posting; only the provided fields change
#[utoipa::path(
    put,
    path = "/api/v1/jobs/{job_id}",
    params(("job_id", Path, description = "Job UUID")),
    request_body = UpdateJob,
    responses(
        (status = 200, description = "Job updated", body = Job),
        (status = 400, description = "No fields or invalid values"),
        (status = 403, description = "Editor or admin only"),
        (status = 404, description = "Job not found")
    ),
    tag = "Jobs",
    security(("bearer_auth" = []))
)]
pub async fn update_job(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateJob>,
) -> ApiResult<HttpResponse> {
    auth.require_editor_or_admin()?;
    payload.validate()?;

    if payload.is_empty() {
        return Err(ApiError::bad_request("No fields provided for update"));
    }

    let job_id = path.into_inner();
    let job = repo::job::update(pool.get_ref(), job_id, &payload)
        .await?
        .ok_or_else(job_not_found)?;
    info!(%job_id, by = auth.id, "Job updated");

    Ok(response::ok("Job updated successfully", job))
}

/// Change the status of a job posting
#[utoipa::path(
    put,
    path = "/api/v1/jobs/{job_id}/status/{status}",
    params(
        ("job_id", Path, description = "Job UUID"),
        ("status", Path, description = "active, private or closed")
    ),
    responses(
        (status = 200, description = "Status changed", body = Job),
        (status = 400, description = "Invalid status"),
        (status = 403, description = "Editor or admin only"),
        (status = 404, description = "Job not found")
    ),
    tag = "Jobs",
    security(("bearer_auth" = []))
)]
pub async fn change_job_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<(Uuid, String)>,
) -> ApiResult<HttpResponse> {
    auth.require_editor_or_admin()?;

    let (job_id, raw_status) = path.into_inner();
    let status =
        JobStatus::from_str(&raw_status).map_err(|_| ApiError::bad_request("Invalid job status"))?;

    let job = repo::job::set_status(pool.get_ref(), job_id, status)
        .await?
        .ok_or_else(job_not_found)?;
    info!(%job_id, %status, by = auth.id, "Job status changed");

    Ok(response::ok("Job status updated successfully", job))
}

/// Delete a job posting
#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{job_id}",
    params(("job_id", Path, description = "Job UUID")),
    responses(
        (status = 200, description = "Deleted job", body = Job),
        (status = 403, description = "Editor or admin only"),
        (status = 404, description = "Job not found")
    ),
    tag = "Jobs",
    security(("bearer_auth" = []))
)]
pub async fn delete_job(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_editor_or_admin()?;

    let job_id = path.into_inner();
    let job = repo::job::delete(pool.get_ref(), job_id)
        .await?
        .ok_or_else(job_not_found)?;
    info!(%job_id, by = auth.id, "Job deleted");

    Ok(response::ok("Job deleted successfully", job))
}
