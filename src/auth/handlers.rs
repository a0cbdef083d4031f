use crate::{
    auth::jwt::generate_access_token,
    config::Config,
    engine::accounts,
    error::AppError,
    models::{LoginReqDto, LoginResponse},
};
use actix_web::{HttpResponse, Responder, web};
use sqlx::SqlitePool;
use tracing::{debug, error, info, instrument};

/// Swagger doc for login endpoint
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body(content = LoginReqDto, content_type = "application/json"),
    responses(
        (status = 200, description = "Access token issued", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many login attempts")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<impl Responder, AppError> {
    info!("Login request received");

    // 1️⃣ Basic validation
    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Ok(HttpResponse::BadRequest().body("Username or password required"));
    }

    // 2️⃣ Verify credentials (migrates legacy passwords)
    debug!("Verifying credentials");

    let who = match accounts::authenticate(pool.get_ref(), &user.username, &user.password).await? {
        Some(who) => who,
        None => {
            info!("Invalid credentials");
            return Ok(HttpResponse::Unauthorized().body("Invalid credentials"));
        }
    };

    // 3️⃣ Generate access token
    debug!(user_id = who.user_id, "Generating access token");

    let access_token = match generate_access_token(
        who.user_id,
        &who.username,
        who.role,
        &config.jwt_secret,
        config.access_token_ttl,
    ) {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "Failed to sign access token");
            return Ok(HttpResponse::InternalServerError().finish());
        }
    };

    info!(user_id = who.user_id, role = %who.role, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: config.access_token_ttl,
    }))
}
