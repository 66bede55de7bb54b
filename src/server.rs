//!
//! bridgebook HTTP server
//! -----------------------
//! This module defines the `RequestRouter` (the listing and append entry points)
//! and the Axum surface that exposes it.
//!
//! Responsibilities:
//! - Listing: resolve the configured root, walk it and answer
//!   `{status, bridges, folderName}`.
//! - Append: parse the raw body for the active schema variant, resolve the
//!   document and sheet, append one row and answer `{success, message, sheetName}`.
//! - Every failure, panics included, is answered with a structured error body;
//!   nothing escapes the boundary unshaped.
//! - Startup configuration logging.

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::FutureExt; // for catch_unwind on async blocks
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::config::ValidatedConfig;
use crate::document_store::{AppendResult, DocumentStore};
use crate::error::{AppError, AppResult};
use crate::folder_index::{BridgeListEntry, EntryFormat, FolderIndex};
use crate::host::{DocumentHost, FolderProvider};
use crate::record::AppendRequest;
use crate::storage::{DocumentRecord, SharedStore};

/// A successful listing.
#[derive(Debug, Clone)]
pub struct Listing {
    pub folder_name: String,
    pub bridges: Vec<BridgeListEntry>,
}

/// Translates inbound requests into folder index / document store calls.
/// Holds no per-request state.
#[derive(Clone)]
pub struct RequestRouter<H> {
    host: H,
    config: Arc<ValidatedConfig>,
}

impl<H: FolderProvider + DocumentHost> RequestRouter<H> {
    pub fn new(host: H, config: Arc<ValidatedConfig>) -> Self { Self { host, config } }

    pub fn config(&self) -> &ValidatedConfig { &self.config }

    pub fn host(&self) -> &H { &self.host }

    pub fn list_bridges(&self) -> AppResult<Listing> {
        let root = self.config.root_folder()?;
        let index = FolderIndex::new(&self.host);
        let folder = index.folder(root)?;
        let format = EntryFormat { public_base_url: self.config.public_base_url.clone(), offset: self.config.offset };
        let bridges = index.list_all_documents(&folder.id, &format)?;
        Ok(Listing { folder_name: folder.name, bridges })
    }

    pub fn append(&self, body: &[u8]) -> AppResult<AppendResult> {
        let req = AppendRequest::parse(body, self.config.schema_variant)?;
        let store = DocumentStore::new(&self.host, self.config.schema_variant, self.config.offset);
        let doc = store.open_document(&req.file_id)?;
        let sheet_name = req.sheet_name.as_deref().unwrap_or(&self.config.default_sheet_name);
        let sheet = store.get_or_create_sheet(&doc, sheet_name)?;
        store.append_record(&sheet, &req.record)
    }

    pub fn document(&self, id: &str) -> AppResult<DocumentRecord> { Ok(self.host.document(id)?) }

    /// Listing response body. Configuration problems are reported under
    /// `message`, everything else under `error`.
    pub fn list_response(&self) -> (StatusCode, Value) {
        match self.list_bridges() {
            Ok(listing) => {
                info!(target: "bridgebook::router", "list: folder='{}' bridges={}", listing.folder_name, listing.bridges.len());
                (StatusCode::OK, json!({
                    "status": "success",
                    "bridges": listing.bridges,
                    "folderName": listing.folder_name,
                }))
            }
            Err(e) => {
                warn!(target: "bridgebook::router", "list failed: {}", e);
                let field = if e.is_configuration() { "message" } else { "error" };
                let mut body = json!({ "status": "error", "code": e.code_str() });
                body[field] = Value::String(e.message().to_string());
                (status_of(&e), body)
            }
        }
    }

    pub fn append_response(&self, body: &[u8]) -> (StatusCode, Value) {
        match self.append(body) {
            Ok(res) => {
                info!(target: "bridgebook::router", "append: doc='{}' sheet='{}' no={}", res.document_name, res.sheet_name, res.sequence);
                (StatusCode::OK, json!({
                    "success": true,
                    "message": format!("{} > {} に保存しました", res.document_name, res.sheet_name),
                    "sheetName": res.sheet_name,
                }))
            }
            Err(e) => {
                warn!(target: "bridgebook::router", "append failed: {}", e);
                (status_of(&e), json!({ "success": false, "error": e.message(), "code": e.code_str() }))
            }
        }
    }

    pub fn document_response(&self, id: &str) -> (StatusCode, Value) {
        match self.document(id) {
            Ok(doc) => (StatusCode::OK, json!({ "status": "success", "document": doc })),
            Err(e) => {
                warn!(target: "bridgebook::router", "document '{}' failed: {}", id, e);
                (status_of(&e), json!({ "status": "error", "error": e.message(), "code": e.code_str() }))
            }
        }
    }
}

fn status_of(e: &AppError) -> StatusCode {
    StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() { s }
    else if let Some(s) = payload.downcast_ref::<String>() { s.as_str() }
    else { "panic" }
}

/// Axum state: the router over the on-disk store.
#[derive(Clone)]
pub struct AppState {
    pub router: RequestRouter<SharedStore>,
}

async fn list_handler(State(state): State<AppState>) -> impl IntoResponse {
    let fut = async { state.router.list_response() };
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok((status, body)) => (status, Json(body)),
        Err(panic_payload) => {
            error!(target: "panic", "HTTP list_handler panic: {}", panic_message(panic_payload.as_ref()));
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({
                "status": "error",
                "code": "internal_panic",
                "error": "internal server error"
            })))
        }
    }
}

// Raw bytes so that text/plain posts are accepted as well as application/json.
async fn append_handler(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let fut = async { state.router.append_response(&body) };
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok((status, body)) => (status, Json(body)),
        Err(panic_payload) => {
            error!(target: "panic", "HTTP append_handler panic: {}", panic_message(panic_payload.as_ref()));
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({
                "success": false,
                "code": "internal_panic",
                "error": "internal server error"
            })))
        }
    }
}

async fn document_handler(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let fut = async { state.router.document_response(&id) };
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok((status, body)) => (status, Json(body)),
        Err(panic_payload) => {
            error!(target: "panic", "HTTP document_handler panic: {}", panic_message(panic_payload.as_ref()));
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({
                "status": "error",
                "code": "internal_panic",
                "error": "internal server error"
            })))
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_handler).post(append_handler))
        .route("/documents/{id}", get(document_handler))
        .route("/healthz", get(|| async { "bridgebook ok" }))
        .with_state(state)
}

fn log_startup_config(cfg: &ValidatedConfig) {
    let cwd = std::env::current_dir().ok();
    info!(
        target: "startup",
        "bridgebook starting: cwd={:?}, data_root={:?}, http_port={}, variant={}, default_sheet='{}', public_url='{}', utc_offset={}",
        cwd, cfg.data_root, cfg.http_port, cfg.schema_variant, cfg.default_sheet_name, cfg.public_base_url, cfg.offset
    );
    match cfg.root_folder() {
        Ok(root) => info!(target: "startup", "root folder: {}", root),
        Err(e) => warn!(target: "startup", "{}; listing requests will answer with a configuration error", e.message()),
    }
}

/// Start the HTTP server for an already validated configuration.
pub async fn run_with_config(cfg: ValidatedConfig) -> anyhow::Result<()> {
    log_startup_config(&cfg);
    std::fs::create_dir_all(&cfg.data_root)
        .with_context(|| format!("Failed to create or access data root: {}", cfg.data_root.display()))?;
    let store = SharedStore::new(&cfg.data_root)
        .with_context(|| format!("While creating SharedStore with root: {}", cfg.data_root.display()))?;

    let port = cfg.http_port;
    let state = AppState { router: RequestRouter::new(store, Arc::new(cfg)) };

    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
    info!(target: "startup", "Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::record::SchemaVariant;
    use crate::storage::{DocumentInfo, DocumentKind, FolderInfo, StoreError, StoreResult};

    fn router(root: Option<&str>, variant: SchemaVariant) -> (tempfile::TempDir, RequestRouter<SharedStore>) {
        let tmp = tempfile::tempdir().unwrap();
        let store = SharedStore::new(tmp.path()).unwrap();
        let mut cfg = ServiceConfig { schema_variant: variant, ..Default::default() };
        if let Some(r) = root { cfg.root_folder_id = r.to_string(); }
        (tmp, RequestRouter::new(store, Arc::new(cfg.validate().unwrap())))
    }

    #[test]
    fn unset_root_answers_configuration_message() {
        let (_tmp, r) = router(None, SchemaVariant::B);
        let (status, body) = r.list_response();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("root folder"));
        assert!(body.get("error").is_none());
    }

    #[test]
    fn unknown_root_answers_error_field() {
        let (_tmp, r) = router(Some("no-such-folder"), SchemaVariant::B);
        let (status, body) = r.list_response();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");
        assert!(body["error"].is_string());
    }

    #[test]
    fn append_then_list() {
        let (_tmp, seed) = router(None, SchemaVariant::B);
        let root = seed.host().create_root_folder("点検データ").unwrap();
        let doc = seed.host().create_document("○○橋", DocumentKind::Spreadsheet).unwrap();
        seed.host().move_document(&doc.id, &root.id).unwrap();
        let r = RequestRouter::new(seed.host().clone(), {
            let cfg = ServiceConfig { root_folder_id: root.id.clone(), ..Default::default() };
            Arc::new(cfg.validate().unwrap())
        });

        let body = format!(r#"{{"fileId":"{}","member":"主桁","crackWidth":0.2}}"#, doc.id);
        let (status, resp) = r.append_response(body.as_bytes());
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["success"], true);
        assert_eq!(resp["sheetName"], "点検データ");
        assert_eq!(resp["message"], "○○橋 > 点検データ に保存しました");

        let (status, listing) = r.list_response();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listing["folderName"], "点検データ");
        assert_eq!(listing["bridges"][0]["name"], "○○橋");
        assert!(listing["bridges"][0]["url"].as_str().unwrap().ends_with(&format!("/documents/{}", doc.id)));
    }

    #[test]
    fn append_without_file_id_mutates_nothing() {
        let (tmp, r) = router(None, SchemaVariant::A);
        let doc = r.host().create_document("○○橋", DocumentKind::Spreadsheet).unwrap();
        let before = r.host().document(&doc.id).unwrap();
        let files_before = std::fs::read_dir(tmp.path().join("documents")).unwrap().count();

        let (status, resp) = r.append_response(r#"{"member":"床版","sheetName":"下面"}"#.as_bytes());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["success"], false);
        assert!(resp["error"].as_str().unwrap().contains("fileId"));
        assert_eq!(resp["code"], "file_id_missing");

        let after = r.host().document(&doc.id).unwrap();
        assert_eq!(after, before);
        assert!(after.sheets.is_empty());
        assert_eq!(after.updated_at, before.updated_at);
        assert_eq!(std::fs::read_dir(tmp.path().join("documents")).unwrap().count(), files_before);
    }

    #[test]
    fn append_to_non_spreadsheet_is_not_found() {
        let (_tmp, r) = router(None, SchemaVariant::B);
        let pdf = r.host().create_document("写真.pdf", DocumentKind::Other).unwrap();
        let body = format!(r#"{{"fileId":"{}","member":"主桁"}}"#, pdf.id);
        let (status, resp) = r.append_response(body.as_bytes());
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(resp["success"], false);
        assert_eq!(resp["code"], "document_not_found");
        assert!(r.host().document(&pdf.id).unwrap().sheets.is_empty());
    }

    /// Host whose every document is unreadable for the caller.
    struct DeniedHost;

    impl FolderProvider for DeniedHost {
        fn folder(&self, id: &str) -> StoreResult<FolderInfo> { Err(StoreError::PermissionDenied(format!("folder {}", id))) }
        fn child_folders(&self, id: &str) -> StoreResult<Vec<FolderInfo>> { Err(StoreError::PermissionDenied(format!("folder {}", id))) }
        fn documents_in(&self, id: &str) -> StoreResult<Vec<DocumentInfo>> { Err(StoreError::PermissionDenied(format!("folder {}", id))) }
        fn create_folder(&self, parent_id: &str, _name: &str) -> StoreResult<FolderInfo> { Err(StoreError::PermissionDenied(format!("folder {}", parent_id))) }
    }

    impl DocumentHost for DeniedHost {
        fn document(&self, id: &str) -> StoreResult<DocumentRecord> { Err(StoreError::PermissionDenied(format!("document {}", id))) }
        fn update_document<R>(&self, id: &str, _f: impl FnOnce(&mut DocumentRecord) -> R) -> StoreResult<R> {
            Err(StoreError::PermissionDenied(format!("document {}", id)))
        }
        fn create_document(&self, name: &str, _kind: DocumentKind) -> StoreResult<DocumentInfo> { Err(StoreError::PermissionDenied(format!("document {}", name))) }
        fn move_document(&self, document_id: &str, _folder_id: &str) -> StoreResult<()> { Err(StoreError::PermissionDenied(format!("document {}", document_id))) }
    }

    #[test]
    fn access_denied_is_surfaced_as_403() {
        let cfg = ServiceConfig { root_folder_id: "root".into(), ..Default::default() };
        let r = RequestRouter::new(DeniedHost, Arc::new(cfg.validate().unwrap()));

        let (status, resp) = r.append_response(r#"{"fileId":"locked-doc"}"#.as_bytes());
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(resp["success"], false);
        assert_eq!(resp["code"], "access_denied");
        assert!(resp["error"].as_str().unwrap().contains("locked-doc"));

        let (status, body) = r.list_response();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["status"], "error");
        assert!(body["error"].is_string());
    }

    #[test]
    fn document_read_back() {
        let (_tmp, r) = router(None, SchemaVariant::B);
        let (status, _) = r.document_response("missing");
        assert_eq!(status, StatusCode::NOT_FOUND);
        let doc = r.host().create_document("x", DocumentKind::Spreadsheet).unwrap();
        let (status, body) = r.document_response(&doc.id);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["document"]["name"], "x");
    }
}
