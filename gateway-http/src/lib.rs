pub mod auth;
pub mod dto;
pub mod error;
pub mod exchange_stub;
pub mod middleware;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
