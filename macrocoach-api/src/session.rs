use actix_web::HttpRequest;
use log::debug;
use macrocoach_db::user::UserStore;
use macrocoach_model::user::Session;
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_HEADER: &str = "X-User-Id";

/// Resolves the caller from the `X-User-Id` header. A missing header means an
/// anonymous caller; an unparsable or unknown id is rejected.
pub async fn resolve(req: &HttpRequest, users: &dyn UserStore) -> Result<Option<Session>, ApiError> {
    let Some(header) = req.headers().get(USER_HEADER) else {
        return Ok(None);
    };
    let user_id = header
        .to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .ok_or(ApiError::Unauthorized)?;

    match users.get_user(user_id).await? {
        Some(user) => Ok(Some(user.session())),
        None => {
            debug!("Unknown user {} in request header", user_id);
            Err(ApiError::Unauthorized)
        }
    }
}

pub async fn require(req: &HttpRequest, users: &dyn UserStore) -> Result<Session, ApiError> {
    resolve(req, users).await?.ok_or(ApiError::Unauthorized)
}

pub async fn require_admin(req: &HttpRequest, users: &dyn UserStore) -> Result<Session, ApiError> {
    let session = require(req, users).await?;
    if session.is_admin() {
        Ok(session)
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Admins may act on any user, everyone else only on themselves.
pub fn check_owner(session: &Session, user_id: Uuid) -> Result<(), ApiError> {
    if session.is_admin() || session.user_id() == user_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
