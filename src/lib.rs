pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod extract;
pub mod load;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod transform;
pub mod types;
pub mod validate;
