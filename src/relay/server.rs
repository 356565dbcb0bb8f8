// SPDX-License-Identifier: MIT

//! HTTP transport over the workflow engine
//!
//! Accepts a conversation history, runs it through the workflow, and returns
//! the reply plus the final state. The streaming variant forwards the side
//! channel as SSE while the run is in flight.

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::relay::emitter::{ChannelEmitter, ProgressEvent};
use crate::relay::graph::Workflow;
use crate::relay::state::{Message, StateUpdate, WorkflowState};
use crate::relay::step::RunContext;

#[derive(Clone)]
struct AppState {
    workflow: Arc<Workflow>,
}

pub async fn serve(
    workflow: Arc<Workflow>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(workflow);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(workflow: Arc<Workflow>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/invoke", post(invoke))
        .route("/invoke/stream", post(invoke_stream))
        .route("/runs/{id}/checkpoints", get(list_checkpoints))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { workflow })
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct InvokeRequest {
    #[serde(default)]
    messages: Vec<Message>,
    /// Passthrough fields merged into the initial state
    #[serde(default)]
    fields: HashMap<String, Value>,
}

impl InvokeRequest {
    fn into_update(self) -> StateUpdate {
        StateUpdate {
            messages: self.messages,
            fields: self.fields,
        }
    }
}

fn reply_of(state: &WorkflowState) -> String {
    state.last_assistant_text().unwrap_or_default().to_string()
}

async fn invoke(State(app): State<AppState>, Json(payload): Json<InvokeRequest>) -> Json<Value> {
    let run_id = Uuid::new_v4().to_string();
    let ctx = RunContext::with_run_id(&run_id);

    match app.workflow.run(payload.into_update(), &ctx).await {
        Ok(state) => Json(json!({
            "run_id": run_id,
            "reply": reply_of(&state),
            "state": state.to_json(),
        })),
        Err(e) => {
            log::error!("Run {} failed: {}", run_id, e);
            Json(json!({ "run_id": run_id, "error": e.to_string() }))
        }
    }
}

/// Events sent over the SSE stream: side-channel progress, then one final
/// reply or error
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    Status { text: String },
    Snapshot { fields: Value },
    Reply { run_id: String, reply: String, state: Value },
    Error { run_id: String, message: String },
}

impl From<ProgressEvent> for StreamEvent {
    fn from(event: ProgressEvent) -> Self {
        match event {
            ProgressEvent::Status { text } => StreamEvent::Status { text },
            ProgressEvent::Snapshot { fields } => StreamEvent::Snapshot { fields },
        }
    }
}

async fn invoke_stream(
    State(app): State<AppState>,
    Json(payload): Json<InvokeRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<StreamEvent>(100);

    tokio::spawn(async move {
        let run_id = Uuid::new_v4().to_string();
        let (emitter, mut progress_rx) = ChannelEmitter::new();
        let ctx = RunContext::with_run_id(&run_id).with_emitter(Arc::new(emitter));

        log::info!("Run {} starting streaming invocation", run_id);

        let run = app.workflow.run(payload.into_update(), &ctx);
        tokio::pin!(run);

        // Forward progress while the run is in flight, then drain whatever
        // is left so the final event arrives last
        let result = loop {
            tokio::select! {
                Some(event) = progress_rx.recv() => {
                    let _ = tx.send(event.into()).await;
                }
                result = &mut run => break result,
            }
        };
        while let Ok(event) = progress_rx.try_recv() {
            let _ = tx.send(event.into()).await;
        }

        let final_event = match result {
            Ok(state) => StreamEvent::Reply {
                run_id,
                reply: reply_of(&state),
                state: state.to_json(),
            },
            Err(e) => {
                log::error!("Run {} failed: {}", run_id, e);
                StreamEvent::Error {
                    run_id,
                    message: e.to_string(),
                }
            }
        };
        let _ = tx.send(final_event).await;
    });

    let stream =
        ReceiverStream::new(rx).map(|event| Ok(Event::default().json_data(event).unwrap()));

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new().interval(std::time::Duration::from_secs(1)),
    )
}

async fn list_checkpoints(State(app): State<AppState>, Path(id): Path<String>) -> Json<Value> {
    match app.workflow.store().list(&id).await {
        Ok(checkpoints) => {
            let entries: Vec<Value> = checkpoints
                .iter()
                .map(|c| {
                    json!({
                        "sequence": c.sequence,
                        "step": c.step,
                        "created_at": c.created_at,
                        "state": c.state.to_json(),
                    })
                })
                .collect();
            Json(json!({ "run_id": id, "checkpoints": entries }))
        }
        Err(e) => Json(json!({ "run_id": id, "error": e.to_string() })),
    }
}
