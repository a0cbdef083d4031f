use crate::{
    api::{calendar, leave_request, schedule, users},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        // only None for a zero period or burst, both excluded above
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth").service(
            web::resource("/login")
                .wrap(login_limiter)
                .route(web::post().to(handlers::login)),
        ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .route("/me", web::get().to(users::me))
            .route("/request-time-off", web::post().to(leave_request::request_time_off))
            .route("/my-requests", web::get().to(leave_request::my_requests))
            .route(
                "/requests/{id}/cancel",
                web::post().to(leave_request::cancel_request),
            )
            .route("/calendar", web::get().to(calendar::month))
            .route("/calendar/{date}", web::get().to(calendar::day))
            .service(
                web::scope("/admin")
                    // /admin/requests
                    .route("/requests", web::get().to(leave_request::pending_requests))
                    .route(
                        "/requests/{id}/approve",
                        web::put().to(leave_request::approve_request),
                    )
                    .route(
                        "/requests/{id}/deny",
                        web::put().to(leave_request::deny_request),
                    )
                    .route("/history", web::get().to(leave_request::request_history))
                    // /admin/users
                    .service(
                        web::resource("/users")
                            .route(web::get().to(users::list_users))
                            .route(web::post().to(users::create_user)),
                    )
                    // /admin/users/{id}
                    .route("/users/{id}", web::patch().to(users::update_user))
                    .route("/users/{id}/role", web::put().to(users::set_role))
                    .route("/users/{id}/archive", web::post().to(users::archive_user))
                    .route("/users/{id}/unarchive", web::post().to(users::unarchive_user))
                    .route(
                        "/users/{id}/adjust-vacation",
                        web::post().to(users::adjust_vacation),
                    )
                    .route("/users/{id}/adjust-sick", web::post().to(users::adjust_sick))
                    .route("/users/{id}/audit", web::get().to(users::audit_trail))
                    .route("/day-status", web::post().to(schedule::set_day_status))
                    .route("/shifts", web::put().to(schedule::set_shift))
                    .route("/reset-sick-ytd", web::post().to(users::reset_sick_ytd))
                    .route("/vacation-accrual", web::post().to(users::run_accrual)),
            ),
    );
}
