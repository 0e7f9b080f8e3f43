mod health;
mod market;
mod orders;
mod session;

pub use health::{health_router, index_router};
pub use market::market_router;
pub use orders::orders_router;
pub use session::session_router;
