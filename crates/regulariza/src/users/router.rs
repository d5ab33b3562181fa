use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use super::access::Actor;
use super::domain::{NewUser, Permission, User, UserDirectory};
use crate::error::RepositoryError;
use crate::http::json_error;

/// Public projection of an account, with permissions expanded.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub username: String,
    pub full_name: String,
    pub role: &'static str,
    pub is_admin: bool,
    pub permissions: Vec<&'static str>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role.label(),
            is_admin: user.is_admin(),
            permissions: user
                .effective_permissions()
                .iter()
                .map(Permission::code)
                .collect(),
        }
    }
}

pub fn user_router<D>(directory: Arc<D>) -> Router
where
    D: UserDirectory + 'static,
{
    Router::new()
        .route("/api/v1/users/me", get(me_handler))
        .route(
            "/api/v1/users",
            get(list_handler::<D>).post(create_handler::<D>),
        )
        .with_state(directory)
}

pub(crate) async fn me_handler(actor: Actor) -> Json<UserView> {
    Json(UserView::from(&actor.0))
}

pub(crate) async fn list_handler<D>(State(directory): State<Arc<D>>, actor: Actor) -> Response
where
    D: UserDirectory + 'static,
{
    if let Err(err) = actor.require_admin() {
        return err.into_response();
    }
    match directory.list() {
        Ok(users) => {
            let views: Vec<UserView> = users.iter().map(UserView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

pub(crate) async fn create_handler<D>(
    State(directory): State<Arc<D>>,
    actor: Actor,
    Json(payload): Json<NewUser>,
) -> Response
where
    D: UserDirectory + 'static,
{
    if let Err(err) = actor.require_admin() {
        return err.into_response();
    }
    let user = payload.into_user();
    if user.username.is_empty() {
        return json_error(StatusCode::UNPROCESSABLE_ENTITY, "username is required");
    }
    match directory.insert(user) {
        Ok(user) => {
            info!(username = %user.username, created_by = %actor.username(), "user registered");
            (StatusCode::CREATED, Json(UserView::from(&user))).into_response()
        }
        Err(RepositoryError::Conflict(detail)) => json_error(StatusCode::CONFLICT, detail),
        Err(err) => json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}
