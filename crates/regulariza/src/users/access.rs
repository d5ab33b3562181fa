use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::domain::{Permission, User, UserDirectory};
use crate::error::RepositoryError;
use crate::http::json_error;

/// Header carrying the username of the acting back-office user.
pub const ACTOR_HEADER: &str = "x-usuario";

/// Directory handle installed as a request extension by the server.
#[derive(Clone)]
pub struct DirectoryHandle(pub Arc<dyn UserDirectory>);

/// Kind of access requested against a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("missing x-usuario header")]
    MissingActor,
    #[error("unknown user '{0}'")]
    UnknownActor(String),
    #[error("user '{username}' lacks permission {permission}")]
    Forbidden {
        username: String,
        permission: &'static str,
    },
    #[error("user '{0}' is read-only")]
    ReadOnly(String),
    #[error("user directory unavailable")]
    DirectoryUnavailable,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let status = match self {
            AccessError::MissingActor | AccessError::UnknownActor(_) => StatusCode::UNAUTHORIZED,
            AccessError::Forbidden { .. } | AccessError::ReadOnly(_) => StatusCode::FORBIDDEN,
            AccessError::DirectoryUnavailable | AccessError::Repository(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        json_error(status, self.to_string())
    }
}

/// Authenticated user behind the current request.
#[derive(Debug, Clone)]
pub struct Actor(pub User);

impl Actor {
    pub fn username(&self) -> &str {
        &self.0.username
    }

    pub fn authorize(&self, permission: Permission, access: Access) -> Result<(), AccessError> {
        if !self.0.has_perm(permission) {
            return Err(AccessError::Forbidden {
                username: self.0.username.clone(),
                permission: permission.code(),
            });
        }
        if access == Access::Write && !self.0.is_admin() {
            return Err(AccessError::ReadOnly(self.0.username.clone()));
        }
        Ok(())
    }

    /// Admin-only operations that are not tied to a module permission.
    pub fn require_admin(&self) -> Result<(), AccessError> {
        if self.0.is_admin() {
            Ok(())
        } else {
            Err(AccessError::ReadOnly(self.0.username.clone()))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AccessError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let directory = parts
            .extensions
            .get::<DirectoryHandle>()
            .cloned()
            .ok_or(AccessError::DirectoryUnavailable)?;

        let username = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AccessError::MissingActor)?;

        match directory.0.find(username)? {
            Some(user) => Ok(Actor(user)),
            None => Err(AccessError::UnknownActor(username.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::Role;

    fn actor(role: Role, permissions: &[Permission]) -> Actor {
        Actor(User {
            username: "operador".to_string(),
            full_name: "Operador".to_string(),
            email: None,
            cedula: None,
            telefono: None,
            role,
            is_superuser: false,
            permissions: permissions.iter().copied().collect(),
        })
    }

    #[test]
    fn reader_may_read_but_not_write() {
        let actor = actor(Role::User, &[Permission::VerGestorRecibos]);
        assert!(actor
            .authorize(Permission::VerGestorRecibos, Access::Read)
            .is_ok());
        assert!(matches!(
            actor.authorize(Permission::VerGestorRecibos, Access::Write),
            Err(AccessError::ReadOnly(_))
        ));
    }

    #[test]
    fn missing_permission_is_forbidden() {
        let actor = actor(Role::User, &[]);
        let err = actor
            .authorize(Permission::VerGestorContratos, Access::Read)
            .expect_err("permission missing");
        assert!(err.to_string().contains("ver_gestor_contratos"));
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn admin_writes_everywhere() {
        let actor = actor(Role::Admin, &[]);
        for permission in Permission::ALL {
            assert!(actor.authorize(permission, Access::Write).is_ok());
        }
    }
}
