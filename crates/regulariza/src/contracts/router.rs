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

use super::domain::{ContractFilter, ContractInput};
use super::institution::InstitutionalConfig;
use super::repository::ContractRepository;
use super::service::{ContractError, ContractService, ScannedContract};
use crate::beneficiaries::BeneficiaryRepository;
use crate::http::{
    attachment, inline, json_error, multipart_rejection, MultipartForm, XLSX_CONTENT_TYPE,
};
use crate::storage::FileStore;
use crate::users::{Access, Actor, Permission};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AnnulRequest {
    #[serde(default)]
    pub(crate) motivo: Option<String>,
}

/// Router builder exposing the contract workflow endpoints.
pub fn contract_router<C, B, F>(service: Arc<ContractService<C, B, F>>) -> Router
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/contratos",
            get(list_handler::<C, B, F>).post(create_handler::<C, B, F>),
        )
        .route(
            "/api/v1/contratos/estadisticas",
            get(stats_handler::<C, B, F>),
        )
        .route("/api/v1/contratos/exportar", get(export_handler::<C, B, F>))
        .route("/api/v1/contratos/importar", post(import_handler::<C, B, F>))
        .route(
            "/api/v1/contratos/configuracion",
            get(get_institution_handler::<C, B, F>).put(put_institution_handler::<C, B, F>),
        )
        .route(
            "/api/v1/contratos/:id",
            get(detail_handler::<C, B, F>).put(update_handler::<C, B, F>),
        )
        .route("/api/v1/contratos/:id/pdf", get(pdf_handler::<C, B, F>))
        .route(
            "/api/v1/contratos/:id/escaneado",
            get(scan_handler::<C, B, F>),
        )
        .route(
            "/api/v1/contratos/:id/regenerar",
            post(regenerate_handler::<C, B, F>),
        )
        .route(
            "/api/v1/contratos/:id/revision",
            post(review_handler::<C, B, F>),
        )
        .route(
            "/api/v1/contratos/:id/aprobar",
            post(approve_handler::<C, B, F>),
        )
        .route(
            "/api/v1/contratos/:id/anular",
            post(annul_handler::<C, B, F>),
        )
        .with_state(service)
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, ContractError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn list_handler<C, B, F>(
    State(service): State<Arc<ContractService<C, B, F>>>,
    actor: Actor,
    Query(filter): Query<ContractFilter>,
) -> Response
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorContratos, Access::Read) {
        return err.into_response();
    }
    respond(StatusCode::OK, service.list(&filter))
}

pub(crate) async fn create_handler<C, B, F>(
    State(service): State<Arc<ContractService<C, B, F>>>,
    actor: Actor,
    Json(input): Json<ContractInput>,
) -> Response
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorContratos, Access::Write) {
        return err.into_response();
    }
    respond(
        StatusCode::CREATED,
        service.create_draft(input, actor.username(), Local::now().naive_local()),
    )
}

pub(crate) async fn detail_handler<C, B, F>(
    State(service): State<Arc<ContractService<C, B, F>>>,
    actor: Actor,
    Path(id): Path<u64>,
) -> Response
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorContratos, Access::Read) {
        return err.into_response();
    }
    respond(StatusCode::OK, service.detail(id))
}

pub(crate) async fn update_handler<C, B, F>(
    State(service): State<Arc<ContractService<C, B, F>>>,
    actor: Actor,
    Path(id): Path<u64>,
    Json(input): Json<ContractInput>,
) -> Response
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorContratos, Access::Write) {
        return err.into_response();
    }
    respond(
        StatusCode::OK,
        service.update(id, input, actor.username(), Local::now().naive_local()),
    )
}

pub(crate) async fn regenerate_handler<C, B, F>(
    State(service): State<Arc<ContractService<C, B, F>>>,
    actor: Actor,
    Path(id): Path<u64>,
) -> Response
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorContratos, Access::Write) {
        return err.into_response();
    }
    respond(
        StatusCode::OK,
        service.regenerate_body(id, actor.username(), Local::now().naive_local()),
    )
}

pub(crate) async fn review_handler<C, B, F>(
    State(service): State<Arc<ContractService<C, B, F>>>,
    actor: Actor,
    Path(id): Path<u64>,
) -> Response
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorContratos, Access::Write) {
        return err.into_response();
    }
    respond(
        StatusCode::OK,
        service.submit_for_review(id, actor.username(), Local::now().naive_local()),
    )
}

/// Approval only needs the contracts permission, not the admin role.
pub(crate) async fn approve_handler<C, B, F>(
    State(service): State<Arc<ContractService<C, B, F>>>,
    actor: Actor,
    Path(id): Path<u64>,
) -> Response
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorContratos, Access::Read) {
        return err.into_response();
    }
    respond(
        StatusCode::OK,
        service.approve(id, actor.username(), Local::now().naive_local()),
    )
}

pub(crate) async fn annul_handler<C, B, F>(
    State(service): State<Arc<ContractService<C, B, F>>>,
    actor: Actor,
    Path(id): Path<u64>,
    body: Option<Json<AnnulRequest>>,
) -> Response
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorContratos, Access::Write) {
        return err.into_response();
    }
    let request = body.map(|Json(request)| request).unwrap_or_default();
    respond(
        StatusCode::OK,
        service.annul(
            id,
            request.motivo.as_deref(),
            actor.username(),
            Local::now().naive_local(),
        ),
    )
}

pub(crate) async fn stats_handler<C, B, F>(
    State(service): State<Arc<ContractService<C, B, F>>>,
    actor: Actor,
) -> Response
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorContratos, Access::Read) {
        return err.into_response();
    }
    respond(StatusCode::OK, service.stats())
}

pub(crate) async fn pdf_handler<C, B, F>(
    State(service): State<Arc<ContractService<C, B, F>>>,
    actor: Actor,
    Path(id): Path<u64>,
) -> Response
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorContratos, Access::Read) {
        return err.into_response();
    }
    match service.render_pdf(id) {
        Ok((bytes, filename)) => attachment(bytes, mime::APPLICATION_PDF.as_ref(), &filename),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn scan_handler<C, B, F>(
    State(service): State<Arc<ContractService<C, B, F>>>,
    actor: Actor,
    Path(id): Path<u64>,
) -> Response
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorContratos, Access::Read) {
        return err.into_response();
    }
    match service.read_scan(id) {
        Ok((bytes, filename)) => {
            let mime = mime_guess::from_path(&filename).first_or_octet_stream();
            inline(bytes, mime.essence_str(), &filename)
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn export_handler<C, B, F>(
    State(service): State<Arc<ContractService<C, B, F>>>,
    actor: Actor,
) -> Response
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorContratos, Access::Read) {
        return err.into_response();
    }
    match service.export_excel() {
        Ok(bytes) => {
            let filename = format!(
                "reporte_contratos_{}.xlsx",
                Local::now().format("%Y%m%d_%H%M")
            );
            attachment(bytes, XLSX_CONTENT_TYPE, &filename)
        }
        Err(err) => err.into_response(),
    }
}

/// Comma separated ids; blanks are skipped.
fn parse_ids(raw: &str) -> Result<Vec<u64>, ContractError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>().map_err(|_| {
                ContractError::Validation(format!("invalid beneficiary id '{part}'"))
            })
        })
        .collect()
}

pub(crate) async fn import_handler<C, B, F>(
    State(service): State<Arc<ContractService<C, B, F>>>,
    actor: Actor,
    multipart: Multipart,
) -> Response
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorContratos, Access::Write) {
        return err.into_response();
    }
    let form = match MultipartForm::read(multipart).await {
        Ok(form) => form,
        Err(err) => return multipart_rejection(err),
    };
    let ids = match parse_ids(form.text("beneficiario_ids").unwrap_or_default()) {
        Ok(ids) => ids,
        Err(err) => return err.into_response(),
    };
    let scans = form
        .files_named("archivos")
        .map(|file| ScannedContract {
            file_name: file.file_name.clone(),
            bytes: file.bytes.clone(),
        })
        .collect();

    match service.import_scanned(&ids, scans, actor.username(), Local::now().naive_local()) {
        Ok(contracts) => (
            StatusCode::CREATED,
            Json(json!({
                "message": format!("Se importaron {} expediente(s) escaneado(s).", contracts.len()),
                "contratos": contracts,
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn get_institution_handler<C, B, F>(
    State(service): State<Arc<ContractService<C, B, F>>>,
    actor: Actor,
) -> Response
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorContratos, Access::Read) {
        return err.into_response();
    }
    respond(StatusCode::OK, service.institution())
}

pub(crate) async fn put_institution_handler<C, B, F>(
    State(service): State<Arc<ContractService<C, B, F>>>,
    actor: Actor,
    Json(config): Json<InstitutionalConfig>,
) -> Response
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    if let Err(err) = actor.authorize(Permission::VerGestorContratos, Access::Write) {
        return err.into_response();
    }
    respond(
        StatusCode::OK,
        service.update_institution(config, actor.username()),
    )
}
