pub mod channel;
pub mod filter;
pub mod genre;
pub mod manifest;
pub mod meta;
pub mod query;
pub mod snapshot;
pub mod verification;

pub use channel::{Channel, ChannelRecord, Stream, StreamRecord, FALLBACK_CATEGORY};
pub use filter::FilterPolicy;
pub use genre::{collect_custom_genres, is_standard_genre, STANDARD_GENRES};
pub use manifest::{CatalogDescriptor, CatalogManifest};
pub use meta::{MergedMeta, StreamDescriptor, META_TYPE};
pub use query::GenreFilter;
pub use snapshot::Snapshot;
pub use verification::VerificationEntry;
