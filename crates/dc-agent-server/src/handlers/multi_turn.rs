use actix_web::{web, HttpResponse, Responder};

use dc_agent_loop::SessionTurnRequest;

use crate::state::AppState;

pub async fn handler(
    state: web::Data<AppState>,
    req: web::Json<SessionTurnRequest>,
) -> impl Responder {
    let request = req.into_inner();

    if request.question.trim().is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "question cannot be empty"
        }));
    }

    match state.sessions.handle(request).await {
        Ok(response) => {
            log::info!(
                "[{}] Multi-turn response ready (trace {})",
                response.session_id,
                response.trace_id
            );
            HttpResponse::Ok().json(response)
        }
        Err(error) => {
            log::error!("Multi-turn request failed: {}", error);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": error.to_string()
            }))
        }
    }
}
