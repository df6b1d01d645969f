//! Shared definitions passed between the feed fetcher, the relay pipeline and
//! the remote API clients.
pub mod defs;

pub use defs::Feed;
pub use defs::FeedEntry;
pub use defs::MediaItem;
pub use defs::PostPayload;
pub use defs::Visibility;
