use crate::infra::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use regulariza::beneficiaries::{beneficiary_router, BeneficiaryService};
use regulariza::config::ImportConfig;
use regulariza::contracts::{contract_router, ContractService};
use regulariza::memory::InMemoryStore;
use regulariza::receipts::{receipt_router, ReceiptService};
use regulariza::storage::FileStore;
use regulariza::users::{user_router, DirectoryHandle};
use serde_json::json;
use std::sync::Arc;

/// Shared backends behind every module router.
pub(crate) struct BackOffice<F> {
    pub(crate) store: Arc<InMemoryStore>,
    pub(crate) files: Arc<F>,
    pub(crate) import: ImportConfig,
    pub(crate) max_upload_bytes: usize,
}

pub(crate) fn with_back_office_routes<F>(back_office: BackOffice<F>) -> Router
where
    F: FileStore + 'static,
{
    let BackOffice {
        store,
        files,
        import,
        max_upload_bytes,
    } = back_office;

    let beneficiaries = Arc::new(BeneficiaryService::new(store.clone(), files.clone()));
    let contracts = Arc::new(ContractService::new(store.clone(), store.clone(), files));
    let receipts = Arc::new(ReceiptService::new(store.clone()).with_import_config(import));

    user_router(store.clone())
        .merge(beneficiary_router(beneficiaries))
        .merge(contract_router(contracts))
        .merge(receipt_router(receipts))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(Extension(DirectoryHandle(store)))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::bootstrap_admin;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use regulariza::memory::MemoryFileStore;
    use regulariza::users::ACTOR_HEADER;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    const UPLOAD_LIMIT: usize = 4 * 1024 * 1024;

    fn app(ready: bool) -> (Router, Arc<AtomicBool>) {
        let store = Arc::new(InMemoryStore::new());
        bootstrap_admin(store.as_ref(), "admin").expect("bootstrap");
        let readiness = Arc::new(AtomicBool::new(ready));
        let state = AppState {
            readiness: readiness.clone(),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let router = with_back_office_routes(BackOffice {
            store,
            files: Arc::new(MemoryFileStore::new()),
            import: ImportConfig::default(),
            max_upload_bytes: UPLOAD_LIMIT,
        })
        .layer(Extension(state));
        (router, readiness)
    }

    fn document_upload(beneficiary_id: u64, payload_len: usize) -> Request<Body> {
        let boundary = "regulariza-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"nombre_documento\"\r\n\r\n\
             Plano\r\n--{boundary}\r\nContent-Disposition: form-data; name=\"archivos\"; \
             filename=\"plano.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend(std::iter::repeat(b'x').take(payload_len));
        body.extend(format!("\r\n--{boundary}--\r\n").into_bytes());
        Request::post(format!("/api/v1/beneficiarios/{beneficiary_id}/documentos"))
            .header(ACTOR_HEADER, "admin")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_follows_the_startup_flag() {
        let (router, readiness) = app(false);
        let pending = router
            .clone()
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(pending.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(pending).await["status"], "initializing");

        readiness.store(true, Ordering::Release);
        let ready = router
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(ready.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_are_exposed_as_plain_text() {
        let (router, _) = app(true);
        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn module_routes_share_the_user_directory() {
        let (router, _) = app(true);
        let me = router
            .clone()
            .oneshot(
                Request::get("/api/v1/users/me")
                    .header(ACTOR_HEADER, "admin")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(me.status(), StatusCode::OK);
        assert_eq!(body_json(me).await["is_admin"], true);

        let receipts = router
            .clone()
            .oneshot(
                Request::get("/api/v1/recibos")
                    .header(ACTOR_HEADER, "admin")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(receipts.status(), StatusCode::OK);

        let anonymous = router
            .oneshot(
                Request::get("/api/v1/contratos")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn uploads_follow_the_configured_body_limit() {
        let (router, _) = app(true);
        let created = router
            .clone()
            .oneshot(
                Request::post("/api/v1/beneficiarios")
                    .header(ACTOR_HEADER, "admin")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({
                            "documento_identidad": "12345678",
                            "nombre_completo": "Ana Perez",
                            "genero": "F"
                        })
                        .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(created.status(), StatusCode::CREATED);
        let id = body_json(created).await["id"].as_u64().expect("beneficiary id");

        let accepted = router
            .clone()
            .oneshot(document_upload(id, 3 * 1024 * 1024))
            .await
            .expect("response");
        assert_eq!(accepted.status(), StatusCode::CREATED);

        let rejected = router
            .oneshot(document_upload(id, UPLOAD_LIMIT + 1024))
            .await
            .expect("response");
        assert_eq!(rejected.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
