//! HTTP layer: routes, state, error mapping.

pub mod routes;
pub mod state;


pub use routes::{create_router, ApiError};
pub use state::AppState;
