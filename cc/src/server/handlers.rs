//! HTTP handlers
//!
//! Uploads land in the caller's session under [`CONTRACT_KEY`] and
//! [`TASKS_KEY`]; analysis reads both back.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, Multipart, State};
use axum::response::Html;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::binder::SessionId;
use super::{ApiError, AppState};
use crate::documents::{read_contract_text, read_tasks};
use crate::domain::{CONTRACT_KEY, Contract, TASKS_KEY, Task};

const FILE_FIELD: &str = "file";

pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../assets/index.html"))
}

pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "sessions": state.sessions.len() }))
}

pub async fn upload_contract(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    debug!("upload_contract: called");
    let (filename, bytes) = file_field(multipart).await?;
    let text = read_contract_text(&filename, &bytes)?;
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("Contract '{}' contains no text", filename)));
    }

    let contract = state.extractor.extract(&text).await?;
    let contract_json = serde_json::to_value(&contract).map_err(|e| ApiError::Internal(e.to_string()))?;
    state.sessions.set(session.as_str(), CONTRACT_KEY, contract_json.clone())?;

    info!(%filename, terms = contract.term_count(), "Contract uploaded");
    Ok(Json(json!({
        "message": "Contract uploaded and processed successfully.",
        "contract_filename": filename,
        "contract": contract_json,
    })))
}

pub async fn upload_tasks(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    debug!("upload_tasks: called");
    let (filename, bytes) = file_field(multipart).await?;
    let tasks = read_tasks(&filename, &bytes)?;
    let tasks_json = serde_json::to_value(&tasks).map_err(|e| ApiError::Internal(e.to_string()))?;
    state.sessions.set(session.as_str(), TASKS_KEY, tasks_json)?;

    info!(%filename, count = tasks.len(), "Tasks uploaded");
    Ok(Json(json!({
        "message": "Tasks uploaded successfully.",
        "tasks_uploaded": tasks.len(),
    })))
}

pub async fn analyze_tasks(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<Value>, ApiError> {
    debug!("analyze_tasks: called");
    let data = state.sessions.get(session.as_str());

    let contract: Contract = session_value(&data, CONTRACT_KEY, "No contract uploaded. Upload a contract first.")?;
    let tasks: Vec<Task> = session_value(&data, TASKS_KEY, "No tasks uploaded. Upload a task list first.")?;

    let results = state.analyzer.analyze_all(&contract, &tasks).await;
    Ok(Json(json!({ "results": results })))
}

/// Name and contents of the `file` part of a multipart upload
async fn file_field(mut multipart: Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Uploaded file has no file name".to_string()))?;
        let bytes = field.bytes().await?;
        debug!(%filename, size = bytes.len(), "file_field: received");
        return Ok((filename, bytes));
    }
    Err(ApiError::BadRequest(format!("Missing '{}' field in upload", FILE_FIELD)))
}

fn session_value<T: DeserializeOwned>(
    data: &sessionstore::SessionData,
    key: &str,
    missing: &str,
) -> Result<T, ApiError> {
    let value = data.get(key).ok_or_else(|| ApiError::BadRequest(missing.to_string()))?;
    serde_json::from_value(value.clone()).map_err(|e| ApiError::Internal(format!("Corrupt session value '{}': {}", key, e)))
}
