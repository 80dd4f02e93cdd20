pub mod merge;
pub mod query;
pub mod refresh;
pub mod verifier;
pub mod watcher;

pub use merge::merge;
pub use query::QueryService;
pub use refresh::{
    RefreshCoordinator, RefreshHandle, RefreshOutcome, RefreshState, RefreshTrigger,
    SnapshotLoader,
};
pub use verifier::{ProbeTarget, ProxyKind, StreamVerifier};
pub use watcher::OverlayWatcher;
