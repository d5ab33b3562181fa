use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;

use super::domain::ReceiptInput;
use super::filter::{ReceiptFilter, ReceiptFilterQuery};
use super::importer::ImportPolicy;
use super::repository::ReceiptRepository;
use super::service::{ReceiptError, ReceiptService};
use crate::http::{attachment, json_error, multipart_rejection, MultipartForm, XLSX_CONTENT_TYPE};
use crate::users::{Access, Actor, Permission};

/// Router builder exposing the receipt registry endpoints.
pub fn receipt_router<R>(service: Arc<ReceiptService<R>>) -> Router
where
    R: ReceiptRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/recibos",
            get(list_handler::<R>).post(create_handler::<R>),
        )
        .route("/api/v1/recibos/importar", post(import_handler::<R>))
        .route("/api/v1/recibos/dashboard", get(dashboard_handler::<R>))
        .route("/api/v1/recibos/reportes/excel", get(excel_handler::<R>))
        .route("/api/v1/recibos/reportes/pdf", get(report_pdf_handler::<R>))
        .route(
            "/api/v1/recibos/:id",
            get(detail_handler::<R>).put(update_handler::<R>),
        )
        .route("/api/v1/recibos/:id/anular", post(void_handler::<R>))
        .route("/api/v1/recibos/:id/pdf", get(pdf_handler::<R>))
        .with_state(service)
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, ReceiptError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}

fn filter_from(query: ReceiptFilterQuery) -> Result<ReceiptFilter, Response> {
    ReceiptFilter::try_from(query)
        .map_err(|message| json_error(StatusCode::UNPROCESSABLE_ENTITY, message))
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<ReceiptService<R>>>,
    actor: Actor,
    Query(query): Query<ReceiptFilterQuery>,
) -> Response
where
    R: ReceiptRepository + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorRecibos, Access::Read) {
        return err.into_response();
    }
    match filter_from(query) {
        Ok(filter) => respond(StatusCode::OK, service.list(&filter)),
        Err(response) => response,
    }
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<ReceiptService<R>>>,
    actor: Actor,
    Json(input): Json<ReceiptInput>,
) -> Response
where
    R: ReceiptRepository + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorRecibos, Access::Write) {
        return err.into_response();
    }
    respond(
        StatusCode::CREATED,
        service.create(input, actor.username(), Local::now().naive_local()),
    )
}

pub(crate) async fn detail_handler<R>(
    State(service): State<Arc<ReceiptService<R>>>,
    actor: Actor,
    Path(id): Path<u64>,
) -> Response
where
    R: ReceiptRepository + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorRecibos, Access::Read) {
        return err.into_response();
    }
    respond(StatusCode::OK, service.get(id))
}

pub(crate) async fn update_handler<R>(
    State(service): State<Arc<ReceiptService<R>>>,
    actor: Actor,
    Path(id): Path<u64>,
    Json(input): Json<ReceiptInput>,
) -> Response
where
    R: ReceiptRepository + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorRecibos, Access::Write) {
        return err.into_response();
    }
    respond(
        StatusCode::OK,
        service.update(id, input, actor.username(), Local::now().naive_local()),
    )
}

pub(crate) async fn void_handler<R>(
    State(service): State<Arc<ReceiptService<R>>>,
    actor: Actor,
    Path(id): Path<u64>,
) -> Response
where
    R: ReceiptRepository + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorRecibos, Access::Write) {
        return err.into_response();
    }
    respond(
        StatusCode::OK,
        service.void(id, actor.username(), Local::now().naive_local()),
    )
}

pub(crate) async fn pdf_handler<R>(
    State(service): State<Arc<ReceiptService<R>>>,
    actor: Actor,
    Path(id): Path<u64>,
) -> Response
where
    R: ReceiptRepository + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorRecibos, Access::Read) {
        return err.into_response();
    }
    match service.render_pdf(id) {
        Ok((bytes, filename)) => attachment(bytes, mime::APPLICATION_PDF.as_ref(), &filename),
        Err(err) => err.into_response(),
    }
}

/// Multipart upload: the workbook in `archivo` and an optional `politica`
/// (`atomic` or `skip_invalid`).
pub(crate) async fn import_handler<R>(
    State(service): State<Arc<ReceiptService<R>>>,
    actor: Actor,
    multipart: Multipart,
) -> Response
where
    R: ReceiptRepository + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorRecibos, Access::Write) {
        return err.into_response();
    }
    let form = match MultipartForm::read(multipart).await {
        Ok(form) => form,
        Err(err) => return multipart_rejection(err),
    };
    let policy = match form.text("politica").map(str::parse::<ImportPolicy>) {
        None => ImportPolicy::default(),
        Some(Ok(policy)) => policy,
        Some(Err(message)) => return json_error(StatusCode::UNPROCESSABLE_ENTITY, message),
    };
    let Some(file) = form.files_named("archivo").next() else {
        return json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "no workbook was uploaded in 'archivo'",
        );
    };

    let options = service.import_options(policy);
    respond(
        StatusCode::CREATED,
        service.import(
            &file.bytes,
            &options,
            actor.username(),
            Local::now().naive_local(),
        ),
    )
}

pub(crate) async fn excel_handler<R>(
    State(service): State<Arc<ReceiptService<R>>>,
    actor: Actor,
    Query(query): Query<ReceiptFilterQuery>,
) -> Response
where
    R: ReceiptRepository + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorRecibos, Access::Read) {
        return err.into_response();
    }
    let filter = match filter_from(query) {
        Ok(filter) => filter,
        Err(response) => return response,
    };
    match service.report_excel(&filter, actor.username(), Local::now().naive_local()) {
        Ok((bytes, filename)) => attachment(bytes, XLSX_CONTENT_TYPE, &filename),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn report_pdf_handler<R>(
    State(service): State<Arc<ReceiptService<R>>>,
    actor: Actor,
    Query(query): Query<ReceiptFilterQuery>,
) -> Response
where
    R: ReceiptRepository + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorRecibos, Access::Read) {
        return err.into_response();
    }
    let filter = match filter_from(query) {
        Ok(filter) => filter,
        Err(response) => return response,
    };
    match service.report_pdf(&filter, actor.username(), Local::now().naive_local()) {
        Ok((bytes, filename)) => attachment(bytes, mime::APPLICATION_PDF.as_ref(), &filename),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn dashboard_handler<R>(
    State(service): State<Arc<ReceiptService<R>>>,
    actor: Actor,
    Query(query): Query<ReceiptFilterQuery>,
) -> Response
where
    R: ReceiptRepository + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorRecibos, Access::Read) {
        return err.into_response();
    }
    match filter_from(query) {
        Ok(filter) => respond(StatusCode::OK, service.dashboard(&filter)),
        Err(response) => response,
    }
}
