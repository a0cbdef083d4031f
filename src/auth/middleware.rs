use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::store::users;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, warn};

fn unauthorized(req: ServiceRequest, body: serde_json::Value) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(body);
    req.into_response(resp.map_into_boxed_body())
}

/// Resolves the bearer token into an [`AuthUser`] stored in request extensions.
///
/// The token only names the account: role and archive state are read from
/// the users table on every request, so a demotion or archive takes effect
/// immediately.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let secret = req
        .app_data::<Data<Config>>()
        .map(|config| config.jwt_secret.clone())
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;
    let pool = req
        .app_data::<Data<SqlitePool>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Database pool missing"))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => h.to_str().map_err(|_| {
            actix_web::error::ErrorUnauthorized(
                json!({"error": "Invalid Authorization header encoding"}),
            )
        })?,
        None => {
            return Ok(unauthorized(req, json!({"error": "Missing Authorization header"})));
        }
    };

    let claims = match header_value.strip_prefix("Bearer ") {
        Some(token) => verify_token(token, &secret),
        None => {
            return Ok(unauthorized(
                req,
                json!({"error": "Authorization header must start with Bearer"}),
            ));
        }
    };

    let claims = match claims {
        Ok(c) => c,
        Err(e) => {
            return Ok(unauthorized(
                req,
                json!({"error": "Invalid or expired token", "details": e}),
            ));
        }
    };

    let user = match users::find_by_id(pool.get_ref(), claims.user_id).await {
        Ok(Some(user)) if user.is_active => user,
        Ok(_) => {
            warn!(user_id = claims.user_id, "Token presented for a missing or archived account");
            return Ok(unauthorized(req, json!({"error": "Account is not active"})));
        }
        Err(e) => return Ok(req.into_response(e.error_response())),
    };

    if Role::from_id(claims.role) != Some(user.role) {
        debug!(user_id = user.id, role = %user.role, "Role changed since the token was issued");
    }

    req.extensions_mut().insert(AuthUser {
        user_id: user.id,
        username: user.username,
        role: user.role,
    });

    next.call(req).await
}
