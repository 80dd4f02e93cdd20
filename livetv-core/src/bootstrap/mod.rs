//! Bootstrap module for initializing the live TV engine
//!
//! This module handles:
//! - Configuration loading
//! - Component initialization and dependency injection

pub mod config;
pub mod services;

pub use config::{load_config, load_config_from};
pub use services::{init_engine, init_engine_with_fetcher, Engine, EngineTasks};
