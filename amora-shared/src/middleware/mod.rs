pub mod auth_extractor;
pub mod metrics_layer;
pub mod tracing_layer;

pub use metrics_layer::{init_metrics, metrics_middleware};
pub use tracing_layer::init_tracing;
