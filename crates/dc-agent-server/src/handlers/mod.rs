pub mod analyze_stream;
pub mod delete;
pub mod feedback;
pub mod health;
pub mod multi_turn;
pub mod predict;
