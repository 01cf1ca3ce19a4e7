use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::feedback::FeedbackRating;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub trace_id: String,
    pub rating: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub message: String,
}

impl FeedbackResponse {
    fn rejected(message: impl Into<String>) -> HttpResponse {
        HttpResponse::BadRequest().json(Self {
            success: false,
            message: message.into(),
        })
    }
}

pub async fn handler(
    state: web::Data<AppState>,
    req: web::Json<FeedbackRequest>,
) -> impl Responder {
    let request = req.into_inner();

    if request.trace_id.trim().is_empty() {
        return FeedbackResponse::rejected("trace_id cannot be empty");
    }

    let rating = match request.rating.parse::<FeedbackRating>() {
        Ok(rating) => rating,
        Err(message) => {
            log::warn!("[{}] Rejected feedback: {}", request.trace_id, message);
            return FeedbackResponse::rejected(message);
        }
    };

    state
        .feedback
        .record(&request.trace_id, rating, request.comment, request.user_name);
    log::info!(
        "Feedback logged for trace {}: {}",
        request.trace_id,
        request.rating
    );

    HttpResponse::Ok().json(FeedbackResponse {
        success: true,
        message: "Feedback submitted successfully".to_string(),
    })
}
