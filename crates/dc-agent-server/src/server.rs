use std::io;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};

use crate::handlers;
use crate::state::AppState;

pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health::handler))
            .service(
                web::scope("/dc-assistant")
                    .route(
                        "/analyze-stream",
                        web::post().to(handlers::analyze_stream::handler),
                    )
                    .route("/multi-turn", web::post().to(handlers::multi_turn::handler))
                    .route("/predict", web::post().to(handlers::predict::handler))
                    .route("/feedback", web::post().to(handlers::feedback::handler))
                    .route(
                        "/sessions/{session_id}",
                        web::delete().to(handlers::delete::handler),
                    ),
            ),
    );
}

pub async fn run_server_with_state(host: &str, port: u16, state: AppState) -> io::Result<()> {
    log::info!("Listening on {}:{}", host, port);
    let state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .configure(app_config)
    })
    .bind((host, port))?
    .run()
    .await
}
