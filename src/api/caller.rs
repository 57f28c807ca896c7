//! Caller identity.
//!
//! The portal sits behind an authentication gateway that verifies the user's token and forwards
//! the result as `X-User-ID` and `X-User-Role` headers. Those headers are trusted as-is.

use crate::{
    entities::UserRole,
    errors::{Error, Result},
};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "X-User-ID";

/// Header carrying the authenticated user's role.
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// The authenticated user making a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller {
    /// Value of `X-User-ID`
    pub user_id: i32,
    /// Value of `X-User-Role`
    pub role: UserRole,
}

impl Caller {
    /// Whether the caller holds the administrator role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Fails with [`Error::Forbidden`] unless the caller is an administrator.
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden {
                message: "Administrator role required".to_string(),
            })
        }
    }
}

fn parse_role(raw: &str) -> Option<UserRole> {
    match raw.trim() {
        r if r.eq_ignore_ascii_case("admin") => Some(UserRole::Admin),
        r if r.eq_ignore_ascii_case("student") => Some(UserRole::Student),
        _ => None,
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized {
            message: format!("Missing {name} header"),
        })
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let user_id = header(parts, USER_ID_HEADER)?
            .trim()
            .parse::<i32>()
            .map_err(|_| Error::Unauthorized {
                message: format!("Invalid {USER_ID_HEADER} header"),
            })?;
        let role = parse_role(header(parts, USER_ROLE_HEADER)?).ok_or_else(|| Error::Unauthorized {
            message: format!("Invalid {USER_ROLE_HEADER} header"),
        })?;

        tracing::Span::current().record("user_id", user_id);
        Ok(Self { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use axum::http::Request;

    async fn extract(builder: axum::http::request::Builder) -> Result<Caller> {
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_extracts_admin() {
        let caller = extract(
            Request::builder()
                .header(USER_ID_HEADER, "7")
                .header(USER_ROLE_HEADER, "Admin"),
        )
        .await
        .unwrap();
        assert_eq!(caller, Caller { user_id: 7, role: UserRole::Admin });
        assert!(caller.require_admin().is_ok());
    }

    #[tokio::test]
    async fn test_student_is_not_admin() {
        let caller = extract(
            Request::builder()
                .header(USER_ID_HEADER, "8")
                .header(USER_ROLE_HEADER, "student"),
        )
        .await
        .unwrap();
        assert!(matches!(caller.require_admin(), Err(Error::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_missing_or_bad_headers_are_unauthorized() {
        let missing = extract(Request::builder().header(USER_ROLE_HEADER, "Admin")).await;
        assert!(matches!(missing, Err(Error::Unauthorized { .. })));

        let bad_id = extract(
            Request::builder()
                .header(USER_ID_HEADER, "abc")
                .header(USER_ROLE_HEADER, "Admin"),
        )
        .await;
        assert!(matches!(bad_id, Err(Error::Unauthorized { .. })));

        let bad_role = extract(
            Request::builder()
                .header(USER_ID_HEADER, "1")
                .header(USER_ROLE_HEADER, "Registrar"),
        )
        .await;
        assert!(matches!(bad_role, Err(Error::Unauthorized { .. })));
    }
}
