use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::{Extension, Router};
use regulariza::beneficiaries::{beneficiary_router, BeneficiaryService};
use regulariza::contracts::{contract_router, ContractService};
use regulariza::memory::{InMemoryStore, MemoryFileStore};
use regulariza::receipts::{receipt_router, ReceiptService};
use regulariza::users::{user_router, DirectoryHandle, Role, User, UserDirectory, ACTOR_HEADER};
use serde_json::{json, Value};
use tower::ServiceExt;

fn back_office() -> Router {
    let store = Arc::new(InMemoryStore::new());
    let files = Arc::new(MemoryFileStore::new());
    UserDirectory::insert(
        store.as_ref(),
        User {
            username: "admin".to_string(),
            full_name: "Administrador".to_string(),
            email: None,
            cedula: None,
            telefono: None,
            role: Role::Admin,
            is_superuser: true,
            permissions: Default::default(),
        },
    )
    .expect("admin");

    let beneficiaries = Arc::new(BeneficiaryService::new(store.clone(), files.clone()));
    let contracts = Arc::new(ContractService::new(store.clone(), store.clone(), files));
    let receipts = Arc::new(ReceiptService::new(store.clone()));
    user_router(store.clone())
        .merge(beneficiary_router(beneficiaries))
        .merge(contract_router(contracts))
        .merge(receipt_router(receipts))
        .layer(Extension(DirectoryHandle(store)))
}

async fn send(router: &Router, method: &str, uri: &str, actor: &str, body: Option<Value>) -> Response {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(ACTOR_HEADER, actor);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");
    router.clone().oneshot(request).await.expect("response")
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn permissions_gate_each_module() {
    let router = back_office();

    let created = send(
        &router,
        "POST",
        "/api/v1/users",
        "admin",
        Some(json!({
            "username": "caja",
            "full_name": "Taquilla",
            "permissions": ["ver_gestor_recibos"]
        })),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    assert_eq!(json_body(created).await["permissions"], json!(["ver_gestor_recibos"]));

    let listed = send(&router, "GET", "/api/v1/recibos", "caja", None).await;
    assert_eq!(listed.status(), StatusCode::OK);

    let write = send(
        &router,
        "POST",
        "/api/v1/recibos",
        "caja",
        Some(json!({
            "nombre": "Ana",
            "rif_cedula_identidad": "V-1",
            "fecha": "2025-05-02",
            "total_monto_bs": "10"
        })),
    )
    .await;
    assert_eq!(write.status(), StatusCode::FORBIDDEN);

    let contracts = send(&router, "GET", "/api/v1/contratos", "caja", None).await;
    assert_eq!(contracts.status(), StatusCode::FORBIDDEN);

    let users = send(&router, "GET", "/api/v1/users", "caja", None).await;
    assert_eq!(users.status(), StatusCode::FORBIDDEN);

    let stranger = send(&router, "GET", "/api/v1/recibos", "nadie", None).await;
    assert_eq!(stranger.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn receipts_are_numbered_and_voided_over_http() {
    let router = back_office();
    let payload = |transfer: &str| {
        json!({
            "nombre": "Luis Mora",
            "rif_cedula_identidad": "v-2000",
            "fecha": "2025-05-02",
            "total_monto_bs": "150.25",
            "numero_transferencia": transfer,
            "categorias": [1, 4]
        })
    };

    let first = send(&router, "POST", "/api/v1/recibos", "admin", Some(payload("T-1"))).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = json_body(first).await;
    assert_eq!(first["numero_recibo"], 1);

    let duplicate = send(&router, "POST", "/api/v1/recibos", "admin", Some(payload("T-1"))).await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let second = send(&router, "POST", "/api/v1/recibos", "admin", Some(payload("T-2"))).await;
    assert_eq!(json_body(second).await["numero_recibo"], 2);

    let id = first["id"].as_u64().expect("id");
    let voided = send(&router, "POST", &format!("/api/v1/recibos/{id}/anular"), "admin", None).await;
    assert_eq!(voided.status(), StatusCode::OK);
    let again = send(&router, "POST", &format!("/api/v1/recibos/{id}/anular"), "admin", None).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let active = send(&router, "GET", "/api/v1/recibos?estado=activo", "admin", None).await;
    assert_eq!(json_body(active).await.as_array().map(Vec::len), Some(1));

    let bad_filter = send(
        &router,
        "GET",
        "/api/v1/recibos?fecha_inicio=02/05/2025",
        "admin",
        None,
    )
    .await;
    assert_eq!(bad_filter.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let pdf = send(&router, "GET", &format!("/api/v1/recibos/{id}/pdf"), "admin", None).await;
    assert_eq!(pdf.status(), StatusCode::OK);
    assert_eq!(pdf.headers()["content-type"], "application/pdf");
}

#[tokio::test]
async fn contracts_flow_from_draft_to_approval() {
    let router = back_office();
    let owner = send(
        &router,
        "POST",
        "/api/v1/beneficiarios",
        "admin",
        Some(json!({"documento_identidad": "9876543", "nombre_completo": "Elena Paz", "genero": "F"})),
    )
    .await;
    assert_eq!(owner.status(), StatusCode::CREATED);
    let owner_id = json_body(owner).await["id"].as_u64().expect("id");

    let draft = send(
        &router,
        "POST",
        "/api/v1/contratos",
        "admin",
        Some(json!({"beneficiary_ids": [owner_id], "codigo_catastral": "01-02"})),
    )
    .await;
    assert_eq!(draft.status(), StatusCode::CREATED);
    let draft = json_body(draft).await;
    let id = draft["id"].as_u64().expect("id");
    assert!(draft["codigo_contrato"]
        .as_str()
        .is_some_and(|code| code.starts_with("CT-")));

    for step in ["revision", "aprobar"] {
        let response = send(&router, "POST", &format!("/api/v1/contratos/{id}/{step}"), "admin", None).await;
        assert_eq!(response.status(), StatusCode::OK, "step {step}");
    }

    let edit = send(
        &router,
        "PUT",
        &format!("/api/v1/contratos/{id}"),
        "admin",
        Some(json!({"beneficiary_ids": [owner_id]})),
    )
    .await;
    assert_eq!(edit.status(), StatusCode::CONFLICT);

    let removal = send(&router, "DELETE", &format!("/api/v1/beneficiarios/{owner_id}"), "admin", None).await;
    assert_eq!(removal.status(), StatusCode::CONFLICT);
}
