//! System commands: health check and metrics.

mod metrics;
mod ping;

pub use metrics::MetricsCommand;
pub use ping::PingCommand;
