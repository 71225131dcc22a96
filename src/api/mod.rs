pub mod extract;
pub mod handler;
pub mod types;

pub use extract::AuthUser;
pub use handler::{create_router, AppState};
