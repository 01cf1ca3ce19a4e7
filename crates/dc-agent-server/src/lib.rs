pub mod config;
pub mod feedback;
pub mod handlers;
pub mod logging;
pub mod server;
pub mod state;
pub mod tools;

pub use config::{AssistantConfig, ConfigError};
pub use server::{app_config, run_server_with_state};
pub use state::AppState;
