use axum::{
    extract::{DefaultBodyLimit, Json, Multipart, Query, State},
    response::Html,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::spawn_blocking;
use tracing::info;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    ingest,
    llm::AnswerSource,
    models::{DatasetStats, DirectoryMap},
    prompt, scan, ui,
};

// --- Payloads y Respuestas de la API ---

#[derive(Deserialize)]
pub struct SearchParams {
    question: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    question: String,
    answer: String,
    source: AnswerSource,
}

#[derive(Serialize)]
pub struct UploadResponse {
    message: String,
    folder: String,
    files_extracted: usize,
    extracted_at: String,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    let body_limit = app_state.config.max_upload_bytes;
    Router::new()
        .route("/", get(home_handler))
        .route("/upload", post(upload_handler))
        .route("/structure", get(structure_handler))
        .route("/stats", get(stats_handler))
        .route("/search", get(search_query_handler).post(search_json_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}

// --- Handlers ---

#[axum::debug_handler]
async fn home_handler(State(state): State<AppState>) -> AppResult<Html<String>> {
    let root = state.config.upload_dir.clone();
    let structure = match spawn_blocking(move || scan::scan_structure(&root)).await? {
        Ok(map) => Some(map),
        Err(AppError::NotFound(_)) => None,
        Err(e) => return Err(e),
    };
    Ok(Html(ui::render_home(structure.as_ref())))
}

#[axum::debug_handler]
async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Formulario multipart inválido: {e}")))?
    {
        let is_file_field = field.name() == Some("file") || field.file_name().is_some();
        if !is_file_field {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("No se pudo leer el fichero subido: {e}")))?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let (file_name, content) = upload.ok_or_else(|| {
        AppError::Validation("Falta el campo 'file' en el formulario.".to_string())
    })?;
    ingest::archive_names(&file_name)?;
    info!("Subida recibida: '{}' ({} bytes).", file_name, content.len());

    let upload_dir = state.config.upload_dir.clone();
    let summary =
        spawn_blocking(move || ingest::save_and_extract(&upload_dir, &file_name, &content))
            .await??;

    Ok(Json(UploadResponse {
        message: "Archivo subido y extraído.".to_string(),
        folder: summary.folder,
        files_extracted: summary.files_extracted,
        extracted_at: Utc::now().to_rfc3339(),
    }))
}

#[axum::debug_handler]
async fn structure_handler(State(state): State<AppState>) -> AppResult<Json<DirectoryMap>> {
    let root = state.config.upload_dir.clone();
    let structure = spawn_blocking(move || scan::scan_structure(&root)).await??;
    Ok(Json(structure))
}

#[axum::debug_handler]
async fn stats_handler(State(state): State<AppState>) -> AppResult<Json<DatasetStats>> {
    let root = state.config.upload_dir.clone();
    let stats = spawn_blocking(move || scan::compute_stats(&root)).await??;
    Ok(Json(stats))
}

#[axum::debug_handler]
async fn search_query_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<SearchResponse>> {
    run_search(&state, params.question).await.map(Json)
}

#[axum::debug_handler]
async fn search_json_handler(
    State(state): State<AppState>,
    Json(params): Json<SearchParams>,
) -> AppResult<Json<SearchResponse>> {
    run_search(&state, params.question).await.map(Json)
}

/// Escanea el dataset, construye el prompt y consulta al LLM. Los fallos de
/// inferencia no son errores HTTP: vienen en `answer` con su `source`.
async fn run_search(state: &AppState, question: String) -> AppResult<SearchResponse> {
    if question.trim().is_empty() {
        return Err(AppError::Validation(
            "El parámetro 'question' no puede estar vacío.".to_string(),
        ));
    }

    let root = state.config.upload_dir.clone();
    let dataset = spawn_blocking(move || scan::scan_dataset(&root)).await??;
    let root_entry = dataset
        .structure
        .get(scan::ROOT_KEY)
        .cloned()
        .unwrap_or_default();

    let prompt = prompt::build_prompt(&root_entry, &dataset.stats, &question);
    info!(
        "Consulta '{}' con un prompt de {} caracteres.",
        question,
        prompt.len()
    );
    let answer = state.llm_manager.answer(&prompt).await;

    Ok(SearchResponse {
        question,
        answer: answer.text,
        source: answer.source,
    })
}
