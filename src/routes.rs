use crate::{
    api::{jobs, members},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::payload_error,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Result, anyhow};
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-route limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    login: Limiter,
    register: Limiter,
    refresh: Limiter,
    protected: Limiter,
}

impl Limiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: build_limiter(config.rate_login_per_min)?,
            register: build_limiter(config.rate_register_per_min)?,
            refresh: build_limiter(config.rate_refresh_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit: {requests_per_min}/min"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

/// Route bad JSON/form/query/path input through the error envelope.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| payload_error(err).into()))
        .app_data(web::FormConfig::default().error_handler(|err, _| payload_error(err).into()))
        .app_data(web::QueryConfig::default().error_handler(|err, _| payload_error(err).into()))
        .app_data(web::PathConfig::default().error_handler(|err, _| payload_error(err).into()));
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    extractor_configs(cfg);

    let prefix = config.api_prefix.trim_end_matches('/');

    // Public routes
    cfg.service(
        web::scope(&format!("{prefix}/auth"))
            .service(
                web::resource("/login")
                    .app_data(
                        web::FormConfig::default()
                            .error_handler(|_, _| handlers::bad_credentials().into()),
                    )
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(limiters.register.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .service(
                web::scope("/jobs")
                    // /jobs
                    .service(
                        web::resource("")
                            .route(web::get().to(jobs::list_jobs))
                            .route(web::post().to(jobs::create_job)),
                    )
                    // /jobs/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(jobs::get_job))
                            .route(web::put().to(jobs::update_job))
                            .route(web::delete().to(jobs::delete_job)),
                    )
                    // /jobs/{id}/status/{status}
                    .service(
                        web::resource("/{id}/status/{status}")
                            .route(web::put().to(jobs::change_job_status)),
                    ),
            )
            .service(
                web::scope("/members")
                    // /members
                    .service(
                        web::resource("")
                            .route(web::get().to(members::list_members))
                            .route(web::post().to(members::create_member)),
                    )
                    // /members/{id}
                    .service(
                        web::resource("/{id}").route(web::delete().to(members::delete_member)),
                    )
                    // /members/{id}/change-role/{role}
                    .service(
                        web::resource("/{id}/change-role/{role}")
                            .route(web::put().to(members::change_role)),
                    ),
            ),
    );
}

// LOGIN (form: email, password)
//  ├─ access_token  (ACCESS_TOKEN_TTL, default 30 min)
//  └─ refresh_token (REFRESH_TOKEN_TTL, default 24 h, jti stored)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh {refresh_token}
//       └─ old jti revoked, new access + refresh pair returned

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{auth::AuthUser, jwt},
        model::{role::Role, user::User},
        utils::user_cache,
    };
    use actix_web::{
        App,
        body::MessageBody,
        dev::ServiceResponse,
        http::{StatusCode, header},
        test::{self, TestRequest},
        web::Data,
    };
    use serde_json::{Value, json};
    use sqlx::MySqlPool;
    use std::net::SocketAddr;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    /// Pool that never connects unless a handler actually queries.
    fn lazy_pool(config: &Config) -> MySqlPool {
        MySqlPool::connect_lazy(&config.database_url).unwrap()
    }

    macro_rules! app {
        ($config:expr) => {{
            let config: Config = $config;
            let limiters = Limiters::from_config(&config).unwrap();
            let pool = lazy_pool(&config);
            test::init_service(
                App::new()
                    .app_data(Data::new(pool))
                    .app_data(Data::new(config.clone()))
                    .configure(|cfg| configure(cfg, &config, &limiters)),
            )
            .await
        }};
    }

    /// Seeds the identity cache so the middleware resolves the caller without the database.
    async fn token_for(email: &str, role: Role, config: &Config) -> String {
        let user = User {
            id: 1000,
            username: email.split('@').next().unwrap_or("probe").to_string(),
            email: email.to_string(),
            hashed_password: String::new(),
            role,
        };
        user_cache::insert(AuthUser::from(&user)).await;
        jwt::generate_access_token(&user, &config.jwt_secret, 300).unwrap()
    }

    async fn json_body(resp: ServiceResponse<impl MessageBody>) -> Value {
        let bytes = test::read_body(resp).await;
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn zero_rate_is_clamped_not_rejected() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(120_000).is_ok());
    }

    #[actix_web::test]
    async fn protected_route_requires_bearer() {
        let app = app!(Config::for_tests());
        let req = TestRequest::get()
            .uri("/api/v1/jobs")
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["message"], "Missing Authorization header");
    }

    #[actix_web::test]
    async fn garbage_token_is_rejected() {
        let app = app!(Config::for_tests());
        let req = TestRequest::get()
            .uri("/api/v1/members")
            .insert_header((header::AUTHORIZATION, "Bearer not.a.jwt"))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["message"], "Invalid or expired token");
    }

    #[actix_web::test]
    async fn refresh_token_is_not_an_access_token() {
        let config = Config::for_tests();
        let user = User {
            id: 1,
            username: "r".into(),
            email: "refresh-misuse@example.com".into(),
            hashed_password: String::new(),
            role: Role::Admin,
        };
        let (refresh, _) = jwt::generate_refresh_token(&user, &config.jwt_secret, 300).unwrap();
        let app = app!(config);
        let req = TestRequest::get()
            .uri("/api/v1/jobs")
            .insert_header((header::AUTHORIZATION, format!("Bearer {refresh}")))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn viewer_cannot_create_jobs() {
        let config = Config::for_tests();
        let token = token_for("viewer-create@example.com", Role::Viewer, &config).await;
        let app = app!(config);
        let req = TestRequest::post()
            .uri("/api/v1/jobs")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .set_json(json!({
                "title": "Backend Engineer",
                "category": "Engineering",
                "experience_required": 2,
                "location": "remote",
                "timing": "full-time",
                "about": "APIs",
                "responsibilities": "Ship"
            }))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(resp).await["message"], "User not authorized");
    }

    #[actix_web::test]
    async fn editor_cannot_manage_members() {
        let config = Config::for_tests();
        let token = token_for("editor-members@example.com", Role::Editor, &config).await;
        let app = app!(config);
        let req = TestRequest::delete()
            .uri("/api/v1/members/5")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn empty_update_is_rejected() {
        let config = Config::for_tests();
        let token = token_for("editor-update@example.com", Role::Editor, &config).await;
        let app = app!(config);
        let req = TestRequest::put()
            .uri("/api/v1/jobs/0b6f2d0e-6a0e-4a53-9d9e-2f3e0c1f7a11")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .set_json(json!({}))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["message"], "No fields provided for update");
    }

    #[actix_web::test]
    async fn malformed_job_id_is_bad_request() {
        let config = Config::for_tests();
        let token = token_for("viewer-path@example.com", Role::Viewer, &config).await;
        let app = app!(config);
        let req = TestRequest::get()
            .uri("/api/v1/jobs/not-a-uuid")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["message"], "Invalid request payload");
    }

    #[actix_web::test]
    async fn unknown_role_and_status_are_rejected() {
        let config = Config::for_tests();
        let token = token_for("admin-enums@example.com", Role::Admin, &config).await;
        let app = app!(config);

        let req = TestRequest::put()
            .uri("/api/v1/members/3/change-role/owner")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["message"], "Invalid role");

        let req = TestRequest::put()
            .uri("/api/v1/jobs/0b6f2d0e-6a0e-4a53-9d9e-2f3e0c1f7a11/status/archived")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["message"], "Invalid job status");
    }

    #[actix_web::test]
    async fn register_validates_before_storage() {
        let app = app!(Config::for_tests());
        let req = TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({ "username": "jdoe", "email": "not-an-email", "password": "long-enough" }))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["message"], "Invalid email address");
    }

    #[actix_web::test]
    async fn malformed_json_uses_error_envelope() {
        let app = app!(Config::for_tests());
        let req = TestRequest::post()
            .uri("/api/v1/auth/register")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{ not json")
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["message"], "Invalid request payload");
        assert!(body.get("details").is_some());
    }

    #[actix_web::test]
    async fn login_with_blank_fields_is_bad_credentials() {
        let app = app!(Config::for_tests());
        let req = TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_form([("email", ""), ("password", "")])
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["message"], "Incorrect username or password");
        assert_eq!(body["details"]["WWW-Authenticate"], "Bearer");
    }

    #[actix_web::test]
    async fn login_with_missing_field_is_bad_credentials() {
        let app = app!(Config::for_tests());
        let req = TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_form([("email", "jdoe@example.com")])
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["message"], "Incorrect username or password");
        assert_eq!(body["details"]["WWW-Authenticate"], "Bearer");
    }

    #[actix_web::test]
    async fn register_rejects_blank_username() {
        let app = app!(Config::for_tests());
        let req = TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({ "username": "   ", "email": "a@b.io", "password": "longenough" }))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["message"], "Validation failed");
        assert!(body["details"].get("username").is_some());
    }

    #[actix_web::test]
    async fn refresh_with_garbage_is_unauthorized() {
        let app = app!(Config::for_tests());
        let req = TestRequest::post()
            .uri("/api/v1/auth/refresh")
            .set_json(json!({ "refresh_token": "garbage" }))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["message"], "Invalid refresh token");
    }

    #[actix_web::test]
    async fn logout_is_idempotent_for_unknown_tokens() {
        let app = app!(Config::for_tests());
        let req = TestRequest::post()
            .uri("/api/v1/auth/logout")
            .set_json(json!({ "refresh_token": "garbage" }))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
}
