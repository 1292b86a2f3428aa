pub mod handler;
pub mod types;

pub use handler::{configure_routes, EventsApiDoc};
pub use types::AppState;
