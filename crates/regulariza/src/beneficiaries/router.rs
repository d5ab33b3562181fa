use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use super::domain::{BeneficiaryInput, VisitInput};
use super::repository::BeneficiaryRepository;
use super::service::{BeneficiaryService, UploadedDocument};
use crate::http::{
    attachment, inline, json_error, multipart_rejection, MultipartForm, XLSX_CONTENT_TYPE,
};
use crate::storage::FileStore;
use crate::users::{Access, Actor, Permission};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    pub(crate) q: Option<String>,
}

/// Router builder exposing the registry, expediente and visit endpoints.
pub fn beneficiary_router<R, F>(service: Arc<BeneficiaryService<R, F>>) -> Router
where
    R: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/beneficiarios",
            get(list_handler::<R, F>).post(create_handler::<R, F>),
        )
        .route("/api/v1/beneficiarios/buscar", get(search_handler::<R, F>))
        .route("/api/v1/beneficiarios/exportar", get(export_handler::<R, F>))
        .route(
            "/api/v1/beneficiarios/:id",
            get(detail_handler::<R, F>)
                .put(update_handler::<R, F>)
                .delete(delete_handler::<R, F>),
        )
        .route(
            "/api/v1/beneficiarios/:id/documentos",
            post(upload_handler::<R, F>),
        )
        .route(
            "/api/v1/beneficiarios/:id/visitas",
            post(visit_handler::<R, F>),
        )
        .route(
            "/api/v1/expediente/documentos/:document_id",
            get(download_document_handler::<R, F>).delete(delete_document_handler::<R, F>),
        )
        .with_state(service)
}

pub(crate) async fn list_handler<R, F>(
    State(service): State<Arc<BeneficiaryService<R, F>>>,
    actor: Actor,
    Query(query): Query<SearchQuery>,
) -> Response
where
    R: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorClientes, Access::Read) {
        return err.into_response();
    }
    match service.list(query.q.as_deref()) {
        Ok(beneficiaries) => (StatusCode::OK, Json(beneficiaries)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn create_handler<R, F>(
    State(service): State<Arc<BeneficiaryService<R, F>>>,
    actor: Actor,
    Json(input): Json<BeneficiaryInput>,
) -> Response
where
    R: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorClientes, Access::Write) {
        return err.into_response();
    }
    match service.create(input) {
        Ok(beneficiary) => (StatusCode::CREATED, Json(beneficiary)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn search_handler<R, F>(
    State(service): State<Arc<BeneficiaryService<R, F>>>,
    actor: Actor,
    Query(query): Query<SearchQuery>,
) -> Response
where
    R: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorClientes, Access::Read) {
        return err.into_response();
    }
    match service.search(query.q.as_deref().unwrap_or_default()) {
        Ok(matches) => (StatusCode::OK, Json(json!({ "resultados": matches }))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn export_handler<R, F>(
    State(service): State<Arc<BeneficiaryService<R, F>>>,
    actor: Actor,
) -> Response
where
    R: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorClientes, Access::Read) {
        return err.into_response();
    }
    match service.export_excel() {
        Ok(bytes) => {
            let filename = format!(
                "beneficiarios_{}.xlsx",
                Local::now().format("%Y%m%d_%H%M")
            );
            attachment(bytes, XLSX_CONTENT_TYPE, &filename)
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn detail_handler<R, F>(
    State(service): State<Arc<BeneficiaryService<R, F>>>,
    actor: Actor,
    Path(id): Path<u64>,
) -> Response
where
    R: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorClientes, Access::Read) {
        return err.into_response();
    }
    match service.detail(id) {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn update_handler<R, F>(
    State(service): State<Arc<BeneficiaryService<R, F>>>,
    actor: Actor,
    Path(id): Path<u64>,
    Json(input): Json<BeneficiaryInput>,
) -> Response
where
    R: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorClientes, Access::Write) {
        return err.into_response();
    }
    match service.update(id, input) {
        Ok(beneficiary) => (StatusCode::OK, Json(beneficiary)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn delete_handler<R, F>(
    State(service): State<Arc<BeneficiaryService<R, F>>>,
    actor: Actor,
    Path(id): Path<u64>,
) -> Response
where
    R: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorClientes, Access::Write) {
        return err.into_response();
    }
    match service.delete(id) {
        Ok(beneficiary) => (
            StatusCode::OK,
            Json(json!({
                "deleted": beneficiary.id,
                "message": format!("Beneficiario {} ha sido eliminado.", beneficiary.nombre_completo),
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn upload_handler<R, F>(
    State(service): State<Arc<BeneficiaryService<R, F>>>,
    actor: Actor,
    Path(id): Path<u64>,
    multipart: Multipart,
) -> Response
where
    R: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorDocumental, Access::Write) {
        return err.into_response();
    }
    let form = match MultipartForm::read(multipart).await {
        Ok(form) => form,
        Err(err) => return multipart_rejection(err),
    };
    let uploads = form
        .files_named("archivos")
        .map(|file| UploadedDocument {
            file_name: file.file_name.clone(),
            bytes: file.bytes.clone(),
        })
        .collect();
    let label = form.text("nombre_documento").map(str::to_string);

    match service.attach_documents(id, label, uploads, Local::now().naive_local()) {
        Ok(documents) => (
            StatusCode::CREATED,
            Json(json!({
                "message": format!("Se cargaron {} archivo(s) correctamente.", documents.len()),
                "documentos": documents,
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn download_document_handler<R, F>(
    State(service): State<Arc<BeneficiaryService<R, F>>>,
    actor: Actor,
    Path(document_id): Path<u64>,
) -> Response
where
    R: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorDocumental, Access::Read) {
        return err.into_response();
    }
    match service.read_document(document_id) {
        Ok((document, bytes)) => {
            let file_name = document
                .archivo
                .rsplit('/')
                .next()
                .unwrap_or(document.archivo.as_str())
                .to_string();
            let mime = mime_guess::from_path(&file_name).first_or_octet_stream();
            inline(bytes, mime.essence_str(), &file_name)
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn delete_document_handler<R, F>(
    State(service): State<Arc<BeneficiaryService<R, F>>>,
    actor: Actor,
    Path(document_id): Path<u64>,
) -> Response
where
    R: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorDocumental, Access::Write) {
        return err.into_response();
    }
    match service.delete_document(document_id) {
        Ok(beneficiary_id) => (
            StatusCode::OK,
            Json(json!({
                "beneficiary_id": beneficiary_id,
                "message": "Archivo eliminado del expediente.",
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn visit_handler<R, F>(
    State(service): State<Arc<BeneficiaryService<R, F>>>,
    actor: Actor,
    Path(id): Path<u64>,
    Json(input): Json<VisitInput>,
) -> Response
where
    R: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorClientes, Access::Read) {
        return err.into_response();
    }
    match service.register_visit(id, input, actor.username(), Local::now().naive_local()) {
        Ok(visit) => (StatusCode::CREATED, Json(visit)).into_response(),
        Err(err) => err.into_response(),
    }
}
