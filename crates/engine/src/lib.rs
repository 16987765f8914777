pub mod exchanges;
pub mod lifecycle;
pub mod monitor;

pub use exchanges::{http_client, SourceRegistry};
pub use lifecycle::{Engine, EngineHandle};
pub use monitor::{CycleOutcome, Monitor, RetryPolicy};
