pub mod key_builder;
pub mod manager;
pub mod store;

pub use key_builder::KeyBuilder;
pub use manager::{CacheManager, CacheStats};
pub use store::CacheStore;
