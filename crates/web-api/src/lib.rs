//! HTTP and WebSocket surface over the application services.

pub mod error;
pub mod routes;
pub mod state;
pub mod websocket;

pub use routes::router;
pub use state::AppState;
