use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::{get, post, put}};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::export::{self, Download};
use crate::models::TextGenerator;
use crate::session::{HistoryEntry, Session};
use crate::studio::{self, GenerationForm};
use crate::text;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<Vec<Session>>>,
    pub generator: Arc<dyn TextGenerator>,
    pub catalog: Arc<Catalog>,
}

impl AppState {
    pub fn new(generator: Arc<dyn TextGenerator>, catalog: Catalog) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(Vec::new())),
            generator,
            catalog: Arc::new(catalog),
        }
    }
}

#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError(StatusCode::NOT_FOUND, format!("{} not found", what))
}

fn find(sessions: &[Session], id: Uuid) -> Result<&Session, ApiError> {
    sessions.iter().find(|s| s.id == id).ok_or_else(|| not_found("session"))
}

fn find_mut(sessions: &mut [Session], id: Uuid) -> Result<&mut Session, ApiError> {
    sessions.iter_mut().find(|s| s.id == id).ok_or_else(|| not_found("session"))
}

async fn get_catalog(State(state): State<AppState>) -> Json<Catalog> {
    Json(state.catalog.as_ref().clone())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub id: Uuid,
}

async fn create_session(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let session = Session::new();
    let id = session.id;
    state.sessions.write().await.push(session);
    info!(%id, "session created");
    Json(CreateSessionResponse { id })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub entries: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<SessionSummary>,
}

async fn list_sessions(State(state): State<AppState>) -> Json<ListSessionsResponse> {
    let sessions = state.sessions.read().await;
    let sessions = sessions
        .iter()
        .map(|s| SessionSummary { id: s.id, created_at: s.created_at, entries: s.ledger.len() })
        .collect();
    Json(ListSessionsResponse { sessions })
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    let mut sessions = state.sessions.write().await;
    let before = sessions.len();
    sessions.retain(|s| s.id != id);
    if sessions.len() < before {
        info!(%id, "session ended");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratedVariant {
    pub version: u32,
    pub text: String,
    pub word_count: usize,
    pub target: String,
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub variants: Vec<GeneratedVariant>,
}

async fn generate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<GenerationForm>,
) -> Result<Json<GenerateResponse>, ApiError> {
    find(&state.sessions.read().await, id)?;

    // no lock held across the provider round trips
    let entries = studio::run_generation(state.generator.clone(), &state.catalog, &form)
        .await
        .map_err(|e| ApiError(StatusCode::BAD_REQUEST, e.to_string()))?;

    {
        let mut sessions = state.sessions.write().await;
        let session = find_mut(&mut sessions, id).inspect_err(|_| {
            warn!(%id, discarded = entries.len(), "session ended during generation; results dropped");
        })?;
        studio::record(&mut session.ledger, &entries);
    }

    let target = state
        .catalog
        .length(&form.length)
        .map(|l| l.bounds.to_string())
        .unwrap_or_default();
    let variants = entries
        .iter()
        .map(|e| GeneratedVariant {
            version: e.version,
            text: e.text.clone(),
            word_count: text::count_words(&e.text),
            target: target.clone(),
            filename: export::download_for(e, form.versions).filename,
        })
        .collect();
    Ok(Json(GenerateResponse { variants }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryItem {
    pub index: usize,
    pub title: String,
    pub content_type: String,
    pub tone: String,
    pub length: String,
    pub version: u32,
    pub preview: String,
    pub word_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub total: usize,
    pub items: Vec<HistoryItem>,
}

async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let sessions = state.sessions.read().await;
    let ledger = &find(&sessions, id)?.ledger;
    let items = ledger
        .newest_first()
        .map(|(index, e)| HistoryItem {
            index,
            title: text::entry_title(&e.prompt),
            content_type: e.content_type.clone(),
            tone: e.tone.clone(),
            length: e.length.clone(),
            version: e.version,
            preview: text::preview(&e.text),
            word_count: text::count_words(&e.text),
            created_at: e.created_at,
        })
        .collect();
    Ok(Json(HistoryResponse { total: ledger.len(), items }))
}

async fn clear_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut sessions = state.sessions.write().await;
    let ledger = &mut find_mut(&mut sessions, id)?.ledger;
    if !ledger.is_empty() {
        info!(%id, cleared = ledger.len(), "history cleared");
    }
    ledger.clear();
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectBody {
    pub index: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectionResponse {
    pub entry: HistoryEntry,
    pub word_count: usize,
}

async fn select_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SelectBody>,
) -> Result<Json<SelectionResponse>, ApiError> {
    let mut sessions = state.sessions.write().await;
    let ledger = &mut find_mut(&mut sessions, id)?.ledger;
    let entry = ledger.get(body.index).cloned().ok_or_else(|| not_found("history entry"))?;
    ledger.select(entry.clone());
    let word_count = text::count_words(&entry.text);
    Ok(Json(SelectionResponse { entry, word_count }))
}

async fn get_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SelectionResponse>, ApiError> {
    let sessions = state.sessions.read().await;
    let entry = find(&sessions, id)?
        .ledger
        .selected()
        .cloned()
        .ok_or_else(|| not_found("selection"))?;
    let word_count = text::count_words(&entry.text);
    Ok(Json(SelectionResponse { entry, word_count }))
}

async fn deselect_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut sessions = state.sessions.write().await;
    find_mut(&mut sessions, id)?.ledger.deselect();
    Ok(StatusCode::NO_CONTENT)
}

fn attachment(d: Download) -> Response {
    (
        [
            (header::CONTENT_TYPE, format!("{}; charset=utf-8", d.mime)),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", d.filename)),
        ],
        d.data,
    )
        .into_response()
}

async fn download_entry(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Response, ApiError> {
    let sessions = state.sessions.read().await;
    let entry = find(&sessions, id)?.ledger.get(index).ok_or_else(|| not_found("history entry"))?;
    Ok(attachment(export::history_download(entry)))
}

async fn download_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let sessions = state.sessions.read().await;
    let entry = find(&sessions, id)?.ledger.selected().ok_or_else(|| not_found("selection"))?;
    Ok(attachment(export::selection_download(entry)))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/catalog", get(get_catalog))
        .route("/v1/sessions", post(create_session).get(list_sessions))
        .route("/v1/sessions/:id", axum::routing::delete(delete_session))
        .route("/v1/sessions/:id/generate", post(generate))
        .route("/v1/sessions/:id/history", get(get_history).delete(clear_history))
        .route("/v1/sessions/:id/history/:index/download", get(download_entry))
        .route(
            "/v1/sessions/:id/selection",
            put(select_entry).get(get_selection).delete(deselect_entry),
        )
        .route("/v1/sessions/:id/selection/download", get(download_selection))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}
