pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod resilience;
pub mod service;
pub mod source;

#[cfg(test)]
pub mod test_helpers;

pub use cache::{CacheManager, KeyBuilder};
pub use config::Config;
pub use error::{Error, Result};
