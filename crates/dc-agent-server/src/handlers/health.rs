use actix_web::{web, HttpResponse, Responder};

use crate::state::AppState;

pub async fn handler(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().timestamp_millis(),
        "tools": state.agent.registry().names(),
    }))
}
