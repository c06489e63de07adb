mod app;
mod middleware;
mod state;

pub use app::create_app;
pub use middleware::rate_limit_middleware;
pub use state::AppState;
