use actix_web::{web, HttpResponse, Result};

use crate::state::AppState;

pub async fn handler(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    let session_id = path.into_inner();

    if state.sessions.reset_session(&session_id).await {
        log::info!("[{}] Session deleted", session_id);
        return Ok(HttpResponse::Ok().finish());
    }

    Ok(HttpResponse::NotFound().json(serde_json::json!({
        "error": "Session not found"
    })))
}
