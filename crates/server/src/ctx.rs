use crate::error::ChatError;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Header carrying the session identity
pub const USER_HEADER: &str = "x-user";

/// Identity used when no session is present
pub const GUEST_USER: &str = "Guest";

/// Caller identity for a request.
///
/// Taken verbatim from the `x-user` header, which must be set by a trusted
/// upstream (auth proxy or gateway) that strips any client-supplied value.
#[derive(Clone, Debug)]
pub struct Ctx {
    user_id: String,
}

impl Ctx {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_guest(&self) -> bool {
        self.user_id == GUEST_USER
    }
}

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = ChatError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(GUEST_USER);

        Ok(Ctx::new(user))
    }
}
