use actix_web::http::header;
use actix_web::web::Bytes;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use dc_agent_loop::{HistoryMessage, TurnRequest};

use crate::state::{spawn_sse_sender, AppState};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub question: String,
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
}

pub async fn handler(state: web::Data<AppState>, req: web::Json<AnalyzeRequest>) -> impl Responder {
    let AnalyzeRequest { question, history } = req.into_inner();

    if question.trim().is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "question cannot be empty"
        }));
    }

    log::info!(
        "Analyze stream started ({} history messages): {}",
        history.len(),
        question.chars().take(50).collect::<String>()
    );

    let cancel_token = CancellationToken::new();
    let event_rx = state.agent.predict_stream(
        TurnRequest::new(question).with_history(history),
        cancel_token.clone(),
    );

    let (sse_tx, mut sse_rx) = mpsc::channel::<Bytes>(100);
    let _sse_handle = spawn_sse_sender(event_rx, sse_tx);

    // Dropping the body (client went away) cancels the turn.
    let disconnect_guard = cancel_token.drop_guard();

    HttpResponse::Ok()
        .append_header((header::CONTENT_TYPE, "text/event-stream"))
        .append_header((header::CACHE_CONTROL, "no-cache"))
        .append_header((header::CONNECTION, "keep-alive"))
        .append_header(("X-Accel-Buffering", "no"))
        .streaming(async_stream::stream! {
            let _disconnect_guard = disconnect_guard;
            while let Some(item) = sse_rx.recv().await {
                yield Ok::<_, actix_web::Error>(item);
            }
        })
}
