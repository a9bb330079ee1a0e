use crate::model::job::{Job, JobLocation, JobStatus, JobTiming, NewJob, UpdateJob};
use crate::model::role::Role;
use crate::model::user::UserResponse;
use crate::models::{CreateMemberReq, LoginForm, RefreshTokenReq, RegisterReq, TokenPair};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Job Board API",
        version = "1.0.0",
        description = r#"
## Job Board

Backend for a job-listing platform.

### Key Features
- **Accounts**: register, log in, refresh and revoke tokens
- **Jobs**: create, list, filter, update, change status and delete postings
- **Members**: admins create members, change roles and remove accounts

### Security
Everything outside `/auth` needs a **JWT Bearer** access token.

| Role | Jobs | Members |
|------|------|---------|
| viewer | read | - |
| editor | read / write | list |
| admin | read / write | full |

### Response Format
`{"message": ..., "data": ...}` on success, `{"message": ..., "details": ...}` on error.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::jobs::list_jobs,
        crate::api::jobs::get_job,
        crate::api::jobs::create_job,
        crate::api::jobs::update_job,
        crate::api::jobs::change_job_status,
        crate::api::jobs::delete_job,

        crate::api::members::create_member,
        crate::api::members::list_members,
        crate::api::members::change_role,
        crate::api::members::delete_member
    ),
    components(
        schemas(
            Job,
            JobStatus,
            JobLocation,
            JobTiming,
            NewJob,
            UpdateJob,
            Role,
            UserResponse,
            RegisterReq,
            CreateMemberReq,
            LoginForm,
            RefreshTokenReq,
            TokenPair
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and token APIs"),
        (name = "Jobs", description = "Job posting APIs"),
        (name = "Members", description = "Member management APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
