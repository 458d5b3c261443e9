pub mod config;
pub mod constants;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod table;
pub mod timing;
pub mod transform;
