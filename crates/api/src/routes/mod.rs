mod health;
mod status;

pub use health::health_router;
pub use status::status_router;
