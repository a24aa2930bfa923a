//! HTTP client for the `YouTube` Data API v3.
//!
//! Every request carries the API key as the `key` query parameter. Non-2xx
//! responses are decoded from the standard `{"error": {...}}` envelope so a
//! quota rejection can be told apart from other failures.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::YouTubeError;
use crate::retry::retry_with_backoff;
use crate::types::{
    channel_url, parse_count, video_url, ChannelInfo, ChannelItem, ErrorEnvelope, ListResponse,
    PlaylistItem, SearchItem, VideoDetails, VideoItem, VideoSummary,
};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";
const MAX_PAGE_SIZE: u32 = 50;
const QUOTA_REASONS: &[&str] = &["quotaExceeded", "dailyLimitExceeded", "rateLimitExceeded"];
const UNAVAILABLE_TITLES: &[&str] = &["Private video", "Deleted video"];

/// Whether `query` is a literal channel id (`UC` + 22 URL-safe characters).
#[must_use]
pub fn is_channel_id(query: &str) -> bool {
    query.len() == 24
        && query.starts_with("UC")
        && query[2..]
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Client for the `YouTube` Data API.
///
/// Use [`YouTubeClient::new`] for production or [`YouTubeClient::with_base_url`]
/// to point at a mock server in tests.
pub struct YouTubeClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl YouTubeClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`YouTubeError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, YouTubeError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`YouTubeError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`YouTubeError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, YouTubeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("travelmap/0.1 (video-country-tagging)")
            .build()?;

        // Exactly one trailing slash so `join` appends the resource name
        // instead of replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| YouTubeError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            max_retries: 3,
            backoff_base_ms: 1_000,
        })
    }

    /// Overrides the transient-error retry policy.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Resolves a channel id, `@handle` or free-text query to a channel.
    ///
    /// A free-text query costs one `search.list` call to find the top channel
    /// before the `channels.list` lookup.
    ///
    /// # Errors
    ///
    /// - [`YouTubeError::NotFound`] if nothing matches.
    /// - [`YouTubeError::QuotaExceeded`] / [`YouTubeError::Api`] on API rejection.
    /// - [`YouTubeError::Http`] / [`YouTubeError::Deserialize`] on transport
    ///   or decode failure.
    pub async fn resolve_channel(&self, query: &str) -> Result<ChannelInfo, YouTubeError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(YouTubeError::NotFound("empty channel query".to_string()));
        }

        if is_channel_id(query) {
            return self.channel_by("id", query).await;
        }
        if let Some(handle) = query.strip_prefix('@') {
            return self.channel_by("forHandle", handle).await;
        }

        let url = self.build_url(
            "search",
            &[
                ("part", "snippet"),
                ("type", "channel"),
                ("maxResults", "1"),
                ("q", query),
            ],
        )?;
        let found: ListResponse<SearchItem> = self.get_json(&url, "search.list").await?;
        let channel_id = found
            .items
            .into_iter()
            .find_map(|item| item.id.channel_id)
            .ok_or_else(|| YouTubeError::NotFound(format!("no channel matches '{query}'")))?;

        tracing::debug!(query, channel_id = %channel_id, "search resolved channel");
        self.channel_by("id", &channel_id).await
    }

    /// Lists up to `max_results` of the channel's most recent uploads, newest first.
    ///
    /// Private and deleted entries in the uploads playlist are skipped.
    ///
    /// # Errors
    ///
    /// - [`YouTubeError::NotFound`] if the channel or its uploads playlist is missing.
    /// - Any transport, decode or API error from the underlying calls.
    pub async fn fetch_latest_videos(
        &self,
        channel_id: &str,
        max_results: u32,
    ) -> Result<Vec<VideoSummary>, YouTubeError> {
        let uploads = self.uploads_playlist(channel_id).await?;
        let wanted = max_results as usize;
        let mut videos: Vec<VideoSummary> = Vec::with_capacity(wanted.min(200));
        let mut page_token: Option<String> = None;

        while videos.len() < wanted {
            let remaining = u32::try_from(wanted - videos.len()).unwrap_or(MAX_PAGE_SIZE);
            let page_size = remaining.min(MAX_PAGE_SIZE).to_string();
            let mut params = vec![
                ("part", "snippet,contentDetails"),
                ("playlistId", uploads.as_str()),
                ("maxResults", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let url = self.build_url("playlistItems", &params)?;
            let page: ListResponse<PlaylistItem> =
                self.get_json(&url, "playlistItems.list").await?;

            let room = wanted - videos.len();
            videos.extend(
                page.items
                    .into_iter()
                    .filter_map(playlist_item_to_summary)
                    .take(room),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(videos)
    }

    /// Fetches statistics and duration for one video.
    ///
    /// # Errors
    ///
    /// - [`YouTubeError::NotFound`] if the video does not exist or is private.
    /// - Any transport, decode or API error.
    pub async fn fetch_video_details(&self, video_id: &str) -> Result<VideoDetails, YouTubeError> {
        let url = self.build_url(
            "videos",
            &[("part", "statistics,contentDetails"), ("id", video_id)],
        )?;
        let response: ListResponse<VideoItem> = self.get_json(&url, "videos.list").await?;
        let item = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| YouTubeError::NotFound(format!("video {video_id}")))?;

        let stats = item.statistics.unwrap_or_default();
        Ok(VideoDetails {
            video_id: item.id,
            view_count: parse_count(stats.view_count.as_deref()),
            like_count: parse_count(stats.like_count.as_deref()),
            comment_count: parse_count(stats.comment_count.as_deref()),
            duration: item.content_details.and_then(|details| details.duration),
        })
    }

    async fn channel_by(&self, filter: &str, value: &str) -> Result<ChannelInfo, YouTubeError> {
        let url = self.build_url(
            "channels",
            &[("part", "snippet,statistics"), (filter, value)],
        )?;
        let response: ListResponse<ChannelItem> = self.get_json(&url, "channels.list").await?;
        let item = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| YouTubeError::NotFound(format!("channel {value}")))?;

        let snippet = item
            .snippet
            .ok_or_else(|| YouTubeError::NotFound(format!("channel {value} has no snippet")))?;
        let stats = item.statistics.unwrap_or_default();

        Ok(ChannelInfo {
            channel_url: channel_url(&item.id),
            channel_id: item.id,
            title: snippet.title,
            description: snippet.description.filter(|d| !d.is_empty()),
            thumbnail_url: snippet.thumbnails.best(),
            subscriber_count: parse_count(stats.subscriber_count.as_deref()),
            view_count: parse_count(stats.view_count.as_deref()),
            video_count: parse_count(stats.video_count.as_deref()),
        })
    }

    async fn uploads_playlist(&self, channel_id: &str) -> Result<String, YouTubeError> {
        let url = self.build_url("channels", &[("part", "contentDetails"), ("id", channel_id)])?;
        let response: ListResponse<ChannelItem> = self.get_json(&url, "channels.list").await?;
        response
            .items
            .into_iter()
            .next()
            .and_then(|item| item.content_details)
            .and_then(|details| details.related_playlists.uploads)
            .ok_or_else(|| YouTubeError::NotFound(format!("uploads playlist for {channel_id}")))
    }

    /// Builds `<base>/<resource>?key=...&<params>` with encoded query values.
    fn build_url(&self, resource: &str, params: &[(&str, &str)]) -> Result<Url, YouTubeError> {
        let mut url = self
            .base_url
            .join(resource)
            .map_err(|e| YouTubeError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("key", &self.api_key);
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        context: &str,
    ) -> Result<T, YouTubeError> {
        let body = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.request_text(url)
        })
        .await?;

        serde_json::from_str(&body).map_err(|e| YouTubeError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }

    async fn request_text(&self, url: &Url) -> Result<String, YouTubeError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(api_error(status, &body))
        }
    }
}

fn api_error(status: StatusCode, body: &str) -> YouTubeError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = envelope
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

    let quota_hit = envelope.as_ref().is_some_and(|e| {
        e.error
            .errors
            .iter()
            .any(|detail| QUOTA_REASONS.contains(&detail.reason.as_str()))
    });

    if status == StatusCode::FORBIDDEN && quota_hit {
        return YouTubeError::QuotaExceeded(message);
    }
    if status == StatusCode::NOT_FOUND {
        return YouTubeError::NotFound(message);
    }
    YouTubeError::Api {
        status: status.as_u16(),
        message,
    }
}

fn playlist_item_to_summary(item: PlaylistItem) -> Option<VideoSummary> {
    let snippet = item.snippet;
    let video_id = snippet.resource_id.video_id?;
    if UNAVAILABLE_TITLES.contains(&snippet.title.as_str()) {
        tracing::debug!(video = %video_id, "skipping unavailable playlist entry");
        return None;
    }

    let published_at = item
        .content_details
        .and_then(|details| details.video_published_at)
        .or(snippet.published_at);

    Some(VideoSummary {
        video_url: video_url(&video_id),
        video_id,
        title: snippet.title,
        description: snippet.description.filter(|d| !d.is_empty()),
        published_at,
        thumbnail_url: snippet.thumbnails.best(),
    })
}
