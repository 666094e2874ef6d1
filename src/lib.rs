pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod jobs;
pub mod meta;
pub mod middleware;
pub mod notify;
pub mod routes;
pub mod sealing;
pub mod services;
pub mod state;

pub use error::ApiError;
pub use routes::app;
pub use state::AppState;
