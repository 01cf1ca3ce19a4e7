use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::Value;

use dc_agent_core::Role;
use dc_agent_loop::{HistoryMessage, TurnRequest};

use crate::state::AppState;

/// Responses-style request: the final `input` entry is the new user
/// message, everything before it is replayed as history.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub input: Vec<HistoryMessage>,
    #[serde(default)]
    pub custom_inputs: Option<Value>,
}

impl PredictRequest {
    fn into_turn_request(self) -> Result<TurnRequest, &'static str> {
        let mut history = self.input;
        let message = match history.pop() {
            Some(entry) if entry.role == Role::User => entry.content,
            Some(_) => return Err("last input message must have role 'user'"),
            None => return Err("input cannot be empty"),
        };

        let mut request = TurnRequest::new(message).with_history(history);
        request.custom_inputs = self.custom_inputs;
        Ok(request)
    }
}

pub async fn handler(state: web::Data<AppState>, req: web::Json<PredictRequest>) -> impl Responder {
    let request = match req.into_inner().into_turn_request() {
        Ok(request) => request,
        Err(message) => {
            return HttpResponse::BadRequest().json(serde_json::json!({ "error": message }));
        }
    };

    match state.agent.predict(request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(error) => {
            log::error!("Predict failed: {}", error);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": error.to_string()
            }))
        }
    }
}
