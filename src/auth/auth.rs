use crate::error::AppError;
use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

/// Identity of the caller, resolved once per request and passed explicitly
/// to every operation that needs it.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware from the stored account
        match req.extensions().get::<AuthUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(ErrorUnauthorized("Missing token"))),
        }
    }
}

impl AuthUser {
    /// Gate for operations needing at least `required`.
    pub fn require(&self, required: Role) -> Result<(), AppError> {
        if self.role.allows(required) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = self.user_id,
                role = %self.role,
                required = %required,
                "Access denied"
            );
            Err(AppError::NotAuthorized { required })
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require(Role::Admin)
    }

    pub fn require_webmaster(&self) -> Result<(), AppError> {
        self.require(Role::Webmaster)
    }

    /// Users act on their own records; admins on anyone's.
    pub fn require_self_or_admin(&self, user_id: i64) -> Result<(), AppError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            self.require_admin()
        }
    }
}
