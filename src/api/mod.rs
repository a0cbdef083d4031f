pub mod calendar;
pub mod leave_request;
pub mod schedule;
pub mod users;

#[cfg(test)]
pub(crate) mod testing {
    use crate::auth::auth::AuthUser;
    use crate::auth::jwt::generate_access_token;
    use crate::config::Config;

    /// Builds the full application around a test pool, as `main` does.
    macro_rules! test_app {
        ($pool:expr) => {{
            let config = crate::config::Config::for_tests();
            actix_web::test::init_service(
                actix_web::App::new()
                    .app_data(actix_web::web::Data::new($pool.clone()))
                    .app_data(actix_web::web::Data::new(config.clone()))
                    .configure(|cfg| crate::routes::configure(cfg, config.clone())),
            )
            .await
        }};
    }
    pub(crate) use test_app;

    pub fn bearer(who: &AuthUser) -> (&'static str, String) {
        let token = generate_access_token(
            who.user_id,
            &who.username,
            who.role,
            &Config::for_tests().jwt_secret,
            900,
        )
        .unwrap();
        ("Authorization", format!("Bearer {token}"))
    }

    /// Governor keys requests by peer address.
    pub fn peer() -> std::net::SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }
}
