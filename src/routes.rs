use std::sync::Arc;

use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{
    ResponseError,
    error::{JsonPayloadError, PathError, QueryPayloadError},
    middleware::{Condition, from_fn},
    web,
};
use anyhow::{Context, Result};

use crate::{
    api::{admin, attendance, employee, leave, payroll, salary},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::HrError,
};

type IpLimiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// One limiter per route class, shared by every worker. A limit of zero disables it.
#[derive(Clone)]
pub struct RateLimiters {
    login: Arc<IpLimiter>,
    refresh: Arc<IpLimiter>,
    protected: Arc<IpLimiter>,
    login_on: bool,
    refresh_on: bool,
    protected_on: bool,
}

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Result<IpLimiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);

    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .context("invalid rate limiter settings")?;
    Ok(Governor::new(&cfg))
}

impl RateLimiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: Arc::new(build_limiter(config.rate_login_per_min)?),
            refresh: Arc::new(build_limiter(config.rate_refresh_per_min)?),
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
            login_on: config.rate_login_per_min > 0,
            refresh_on: config.rate_refresh_per_min > 0,
            protected_on: config.rate_protected_per_min > 0,
        })
    }
}

/// Malformed bodies, queries and paths answer with the same `{ errors }` shape as domain validation.
fn extractor_errors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err: JsonPayloadError, _| {
        let resp = HrError::invalid("body", err.to_string()).error_response();
        actix_web::error::InternalError::from_response(err, resp).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err: QueryPayloadError, _| {
        let resp = HrError::invalid("query", err.to_string()).error_response();
        actix_web::error::InternalError::from_response(err, resp).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err: PathError, _| {
        let resp = HrError::invalid("path", err.to_string()).error_response();
        actix_web::error::InternalError::from_response(err, resp).into()
    }));
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &RateLimiters) {
    extractor_errors(cfg);

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(Condition::new(limiters.login_on, limiters.login.clone()))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(Condition::new(limiters.refresh_on, limiters.refresh.clone()))
                    .route(web::post().to(handlers::refresh)),
            )
            .service(
                web::resource("/logout")
                    .wrap(Condition::new(limiters.login_on, limiters.login.clone()))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Condition::new(
                limiters.protected_on,
                limiters.protected.clone(),
            )) // rate limiting
            .configure(api),
    );
}

/// Everything behind the bearer token. Literal segments are registered before `/{id}`.
pub fn api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/me", web::get().to(handlers::me))
            .route("/change-password", web::post().to(handlers::change_password)),
    )
    .service(
        web::scope("/employee")
            // /employee
            .service(
                web::resource("")
                    .route(web::post().to(employee::create_employee))
                    .route(web::get().to(employee::list_employees)),
            )
            // /employee/{id}
            .service(
                web::resource("/{id}")
                    .route(web::put().to(employee::update_employee))
                    .route(web::get().to(employee::get_employee))
                    .route(web::delete().to(employee::deactivate_employee)),
            ),
    )
    .service(web::scope("/admin").route("/dashboard", web::get().to(admin::dashboard)))
    .service(
        web::scope("/attendance")
            .service(
                web::resource("")
                    .route(web::get().to(attendance::list_attendance)),
            )
            .route("/mark", web::post().to(attendance::mark_attendance))
            .route("/checkin", web::post().to(attendance::check_in))
            .route("/checkout", web::post().to(attendance::check_out))
            .route("/today", web::get().to(attendance::today))
            .route("/status", web::get().to(attendance::day_status))
            .route("/monthly", web::get().to(attendance::monthly))
            .route("/stats", web::get().to(attendance::stats))
            .route("/admin", web::get().to(attendance::admin_roster)),
    )
    .service(
        web::scope("/leave")
            // /leave
            .service(
                web::resource("")
                    .route(web::get().to(leave::list_leaves))
                    .route(web::post().to(leave::apply_leave)),
            )
            .route("/apply", web::post().to(leave::apply_leave))
            .route("/balance", web::get().to(leave::leave_balance))
            .route("/stats", web::get().to(leave::leave_stats))
            // /leave/approve/{id} takes the decision in the body
            .route("/approve/{id}", web::put().to(leave::decide_leave))
            .route("/{id}", web::get().to(leave::get_leave))
            .route("/{id}/approve", web::put().to(leave::approve_leave))
            .route("/{id}/reject", web::put().to(leave::reject_leave)),
    )
    .service(
        web::scope("/salary")
            .service(
                web::resource("")
                    .route(web::post().to(salary::upsert_salary))
                    .route(web::get().to(salary::list_salaries)),
            )
            .route("/{employee_id}", web::get().to(salary::get_salary))
            .route("/{employee_id}/payroll", web::get().to(salary::payroll_preview)),
    )
    .service(
        web::scope("/payroll")
            // /payroll
            .service(web::resource("").route(web::get().to(payroll::list_payrolls)))
            .route("/generate", web::post().to(payroll::generate_payroll))
            .route("/lock/{id}", web::put().to(payroll::lock_payroll))
            //payroll/{id}
            .route("/{id}", web::get().to(payroll::get_payroll)),
    );
}

// LOGIN
//  ├─ access_token (ACCESS_TOKEN_TTL)
//  └─ refresh_token (REFRESH_TOKEN_TTL, stored by jti)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ old refresh token revoked, new pair returned
