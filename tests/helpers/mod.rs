//! In-process journal API servers for exercising the client end to end.
//!
//! Instead of an HTTP-mocking layer the suite scripts a real axum server:
//! status responses are replayed in order, with the final script entry
//! repeating once the queue runs down to it.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use dreamlog::models::entry::JournalEntry;

/// One scripted reply from `GET /api/entries/{id}/status`.
#[derive(Debug, Clone)]
pub enum StatusScript {
    /// 200 with an image URL.
    Completed { image_url: &'static str },
    /// 200 whose body is missing the image URL.
    CompletedMalformed,
    /// 202 with a queue position (0 = actively running).
    Processing { position: u32 },
    /// 204: no generation in progress.
    NoJob,
    /// Arbitrary error status with a `{"message": ...}` body.
    Error { status: u16, message: &'static str },
}

/// Scripted reply from `POST /api/entries/{id}/generate-image`.
#[derive(Debug, Clone)]
pub enum SubmitScript {
    Accepted { position: u32, message: &'static str },
    Rejected { status: u16, message: &'static str },
}

#[derive(Clone)]
struct ScriptState {
    submit: Arc<Mutex<VecDeque<SubmitScript>>>,
    status: Arc<Mutex<VecDeque<StatusScript>>>,
    status_hits: Arc<AtomicU32>,
}

pub struct ScriptedServer {
    pub base_url: String,
    status_hits: Arc<AtomicU32>,
}

impl ScriptedServer {
    /// Number of status probes the server has answered.
    pub fn probes(&self) -> u32 {
        self.status_hits.load(Ordering::SeqCst)
    }
}

/// Spawn a generation server replaying the given scripts.
pub async fn spawn_scripted(
    submit: Vec<SubmitScript>,
    status: Vec<StatusScript>,
) -> ScriptedServer {
    let state = ScriptState {
        submit: Arc::new(Mutex::new(submit.into())),
        status: Arc::new(Mutex::new(status.into())),
        status_hits: Arc::new(AtomicU32::new(0)),
    };
    let status_hits = state.status_hits.clone();

    let app = Router::new()
        .route("/api/entries/{id}/generate-image", post(handle_submit))
        .route("/api/entries/{id}/status", get(handle_status))
        .with_state(state);

    ScriptedServer {
        base_url: serve(app).await,
        status_hits,
    }
}

async fn handle_submit(State(state): State<ScriptState>, Path(_id): Path<u64>) -> Response {
    match next(&state.submit) {
        SubmitScript::Accepted { position, message } => (
            StatusCode::ACCEPTED,
            Json(json!({ "queuePosition": position, "message": message })),
        )
            .into_response(),
        SubmitScript::Rejected { status, message } => (
            StatusCode::from_u16(status).expect("valid status code"),
            Json(json!({ "message": message })),
        )
            .into_response(),
    }
}

async fn handle_status(State(state): State<ScriptState>, Path(_id): Path<u64>) -> Response {
    state.status_hits.fetch_add(1, Ordering::SeqCst);
    match next(&state.status) {
        StatusScript::Completed { image_url } => {
            (StatusCode::OK, Json(json!({ "imageUrl": image_url }))).into_response()
        }
        StatusScript::CompletedMalformed => {
            (StatusCode::OK, Json(json!({ "status": "completed" }))).into_response()
        }
        StatusScript::Processing { position } => (
            StatusCode::ACCEPTED,
            Json(json!({
                "queuePosition": position,
                "message": "Image generation in progress"
            })),
        )
            .into_response(),
        StatusScript::NoJob => StatusCode::NO_CONTENT.into_response(),
        StatusScript::Error { status, message } => (
            StatusCode::from_u16(status).expect("valid status code"),
            Json(json!({ "message": message })),
        )
            .into_response(),
    }
}

/// Pop the next script entry, keeping the last one in place so it repeats.
fn next<T: Clone>(queue: &Arc<Mutex<VecDeque<T>>>) -> T {
    let mut q = queue.lock().expect("script lock");
    if q.len() > 1 {
        q.pop_front().expect("non-empty script")
    } else {
        q.front().cloned().expect("script exhausted")
    }
}

// ---- in-memory entries server ----

#[derive(Clone, Default)]
struct EntriesState {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
    next_id: Arc<AtomicU64>,
}

#[derive(Deserialize)]
struct EntryBody {
    text: String,
}

/// Spawn an in-memory CRUD server for journal entries; returns its base URL.
pub async fn spawn_entries_server() -> String {
    let state = EntriesState {
        entries: Arc::new(Mutex::new(Vec::new())),
        next_id: Arc::new(AtomicU64::new(1)),
    };

    let app = Router::new()
        .route("/api/entries", get(list_entries).post(create_entry))
        .route(
            "/api/entries/{id}",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
        .with_state(state);

    serve(app).await
}

async fn list_entries(State(state): State<EntriesState>) -> Json<Vec<JournalEntry>> {
    Json(state.entries.lock().expect("entries lock").clone())
}

async fn create_entry(
    State(state): State<EntriesState>,
    Json(body): Json<EntryBody>,
) -> Response {
    let now = chrono::Utc::now();
    let entry = JournalEntry {
        id: state.next_id.fetch_add(1, Ordering::SeqCst),
        text: body.text,
        image_url: None,
        created_at: now,
        updated_at: now,
    };
    state.entries.lock().expect("entries lock").push(entry.clone());
    (StatusCode::CREATED, Json(entry)).into_response()
}

async fn get_entry(State(state): State<EntriesState>, Path(id): Path<u64>) -> Response {
    let entries = state.entries.lock().expect("entries lock");
    match entries.iter().find(|e| e.id == id) {
        Some(entry) => Json(entry.clone()).into_response(),
        None => not_found(),
    }
}

async fn update_entry(
    State(state): State<EntriesState>,
    Path(id): Path<u64>,
    Json(body): Json<EntryBody>,
) -> Response {
    let mut entries = state.entries.lock().expect("entries lock");
    match entries.iter_mut().find(|e| e.id == id) {
        Some(entry) => {
            entry.text = body.text;
            entry.updated_at = chrono::Utc::now();
            Json(entry.clone()).into_response()
        }
        None => not_found(),
    }
}

async fn delete_entry(State(state): State<EntriesState>, Path(id): Path<u64>) -> Response {
    let mut entries = state.entries.lock().expect("entries lock");
    let before = entries.len();
    entries.retain(|e| e.id != id);
    if entries.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "entry not found" })),
    )
        .into_response()
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    format!("http://{addr}")
}
