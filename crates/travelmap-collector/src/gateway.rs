//! Upstream video platform seam.

use async_trait::async_trait;
use travelmap_youtube::{ChannelInfo, VideoDetails, VideoSummary, YouTubeClient};

use crate::error::GatewayError;

/// Fetch side of collection. Every call is idempotent from the collector's
/// point of view; retries for transient failures live behind this trait.
#[async_trait]
pub trait VideoGateway: Send + Sync {
    /// Resolves a search query or channel id to a channel.
    async fn resolve_channel(&self, query: &str) -> Result<ChannelInfo, GatewayError>;

    /// Lists up to `max_results` of the channel's newest uploads.
    async fn fetch_latest_videos(
        &self,
        channel_id: &str,
        max_results: u32,
    ) -> Result<Vec<VideoSummary>, GatewayError>;

    /// Fetches statistics for one video.
    async fn fetch_video_details(&self, video_id: &str) -> Result<VideoDetails, GatewayError>;
}

#[async_trait]
impl VideoGateway for YouTubeClient {
    async fn resolve_channel(&self, query: &str) -> Result<ChannelInfo, GatewayError> {
        Ok(YouTubeClient::resolve_channel(self, query).await?)
    }

    async fn fetch_latest_videos(
        &self,
        channel_id: &str,
        max_results: u32,
    ) -> Result<Vec<VideoSummary>, GatewayError> {
        Ok(YouTubeClient::fetch_latest_videos(self, channel_id, max_results).await?)
    }

    async fn fetch_video_details(&self, video_id: &str) -> Result<VideoDetails, GatewayError> {
        Ok(YouTubeClient::fetch_video_details(self, video_id).await?)
    }
}
