//! Client for the `YouTube` Data API v3: channel resolution, upload listing,
//! and per-video statistics.

pub mod client;
pub mod error;
mod retry;
pub mod types;

pub use client::{is_channel_id, YouTubeClient};
pub use error::YouTubeError;
pub use types::{ChannelInfo, VideoDetails, VideoSummary};
