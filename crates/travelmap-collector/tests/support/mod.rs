//! In-memory fakes of the collector seams.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Notify;
use travelmap_collector::{
    CollectorStore, GatewayError, RunType, StoreError, TriggerSource, VideoGateway,
};
use travelmap_db::{
    ChannelRow, ChannelStats, CountryTagRow, NewChannel, NewCountryTag, NewVideo, TagUpdate,
    VideoRow, VideoStats,
};
use travelmap_youtube::{ChannelInfo, VideoDetails, VideoSummary};

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub run_type: &'static str,
    pub trigger: &'static str,
    pub status: &'static str,
    pub processed: i32,
    pub total: i32,
    pub error: Option<String>,
}

#[derive(Default)]
struct StoreState {
    next_id: i64,
    channels: Vec<ChannelRow>,
    videos: Vec<VideoRow>,
    tags: Vec<CountryTagRow>,
    runs: Vec<RunRecord>,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
    pub fail_tag_loads: AtomicBool,
    pub fail_tag_inserts: AtomicBool,
    pub fail_runs: AtomicBool,
    pub fail_channel_list: AtomicBool,
    failing_tag_codes: Mutex<HashSet<String>>,
    tag_gate: Mutex<Option<Arc<Gate>>>,
}

fn unavailable(what: &str) -> StoreError {
    StoreError::Unavailable(what.to_string())
}

impl FakeStore {
    pub fn seed_channel(&self, external_id: &str, name: &str) -> ChannelRow {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let row = ChannelRow {
            id: state.next_id(),
            external_id: external_id.to_string(),
            name: name.to_string(),
            search_query: None,
            description: None,
            channel_url: None,
            profile_image_url: None,
            subscriber_count: 0,
            view_count: 0,
            video_count: 0,
            gender: None,
            created_at: now,
            updated_at: now,
        };
        state.channels.push(row.clone());
        row
    }

    pub fn fail_tag_code(&self, code: &str) {
        self.failing_tag_codes
            .lock()
            .unwrap()
            .insert(code.to_string());
    }

    /// Parks the first tag load until the gate is released.
    pub fn gate_tag_loads(&self, gate: Arc<Gate>) {
        *self.tag_gate.lock().unwrap() = Some(gate);
    }

    pub fn channels(&self) -> Vec<ChannelRow> {
        self.state.lock().unwrap().channels.clone()
    }

    pub fn videos(&self) -> Vec<VideoRow> {
        self.state.lock().unwrap().videos.clone()
    }

    pub fn all_tags(&self) -> Vec<CountryTagRow> {
        self.state.lock().unwrap().tags.clone()
    }

    pub fn runs(&self) -> Vec<RunRecord> {
        self.state.lock().unwrap().runs.clone()
    }

    pub fn video(&self, external_id: &str) -> VideoRow {
        self.videos()
            .into_iter()
            .find(|v| v.external_id == external_id)
            .unwrap_or_else(|| panic!("video {external_id} not stored"))
    }

    pub fn tags_for(&self, external_id: &str) -> Vec<CountryTagRow> {
        let video_id = self.video(external_id).id;
        self.all_tags()
            .into_iter()
            .filter(|t| t.video_id == video_id)
            .collect()
    }

    pub fn rename_tag(&self, tag_id: i64, name: &str) {
        let mut state = self.state.lock().unwrap();
        let tag = state.tags.iter_mut().find(|t| t.id == tag_id).unwrap();
        tag.country_name = name.to_string();
    }

    pub fn add_video(&self, channel_id: i64, external_id: &str, title: &str) -> VideoRow {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let row = VideoRow {
            id: state.next_id(),
            external_id: external_id.to_string(),
            channel_id,
            title: title.to_string(),
            description: None,
            thumbnail_url: None,
            video_url: None,
            uploaded_at: None,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            duration: None,
            processed: false,
            ocr_processed: false,
            created_at: now,
            updated_at: now,
        };
        state.videos.push(row.clone());
        row
    }
}

#[async_trait]
impl CollectorStore for FakeStore {
    async fn find_channel(&self, external_id: &str) -> Result<Option<ChannelRow>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .channels
            .iter()
            .find(|c| c.external_id == external_id)
            .cloned())
    }

    async fn save_channel(
        &self,
        channel: &NewChannel<'_>,
    ) -> Result<(ChannelRow, bool), StoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state
            .channels
            .iter()
            .find(|c| c.external_id == channel.external_id)
        {
            return Ok((existing.clone(), false));
        }
        let now = Utc::now();
        let row = ChannelRow {
            id: state.next_id(),
            external_id: channel.external_id.to_string(),
            name: channel.name.to_string(),
            search_query: channel.search_query.map(str::to_string),
            description: channel.description.map(str::to_string),
            channel_url: channel.channel_url.map(str::to_string),
            profile_image_url: channel.profile_image_url.map(str::to_string),
            subscriber_count: channel.subscriber_count,
            view_count: channel.view_count,
            video_count: channel.video_count,
            gender: channel.gender.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        state.channels.push(row.clone());
        Ok((row, true))
    }

    async fn list_channels(&self) -> Result<Vec<ChannelRow>, StoreError> {
        if self.fail_channel_list.load(Ordering::SeqCst) {
            return Err(unavailable("channel list"));
        }
        Ok(self.channels())
    }

    async fn update_channel_stats(&self, id: i64, stats: ChannelStats) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let channel = state
            .channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound)?;
        channel.subscriber_count = stats.subscriber_count;
        channel.view_count = stats.view_count;
        channel.video_count = stats.video_count;
        Ok(())
    }

    async fn video_exists(&self, external_id: &str) -> Result<bool, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.videos.iter().any(|v| v.external_id == external_id))
    }

    async fn save_video(&self, video: &NewVideo<'_>) -> Result<Option<VideoRow>, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.videos.iter().any(|v| v.external_id == video.external_id) {
            return Ok(None);
        }
        let now = Utc::now();
        let row = VideoRow {
            id: state.next_id(),
            external_id: video.external_id.to_string(),
            channel_id: video.channel_id,
            title: video.title.to_string(),
            description: video.description.map(str::to_string),
            thumbnail_url: video.thumbnail_url.map(str::to_string),
            video_url: video.video_url.map(str::to_string),
            uploaded_at: video.uploaded_at,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            duration: None,
            processed: false,
            ocr_processed: false,
            created_at: now,
            updated_at: now,
        };
        state.videos.push(row.clone());
        Ok(Some(row))
    }

    async fn list_unprocessed_videos(&self) -> Result<Vec<VideoRow>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.videos.iter().filter(|v| !v.processed).cloned().collect())
    }

    async fn update_video_stats(&self, id: i64, stats: &VideoStats) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let video = state
            .videos
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or(StoreError::NotFound)?;
        video.view_count = stats.view_count;
        video.like_count = stats.like_count;
        video.comment_count = stats.comment_count;
        if stats.duration.is_some() {
            video.duration.clone_from(&stats.duration);
        }
        Ok(())
    }

    async fn mark_video_processed(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let video = state
            .videos
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or(StoreError::NotFound)?;
        video.processed = true;
        Ok(())
    }

    async fn find_tags(&self, video_id: i64) -> Result<Vec<CountryTagRow>, StoreError> {
        let gate = self.tag_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if self.fail_tag_loads.load(Ordering::SeqCst) {
            return Err(unavailable("tag load"));
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .tags
            .iter()
            .filter(|t| t.video_id == video_id)
            .cloned()
            .collect())
    }

    async fn insert_tag(
        &self,
        tag: &NewCountryTag<'_>,
    ) -> Result<Option<CountryTagRow>, StoreError> {
        if self.fail_tag_inserts.load(Ordering::SeqCst)
            || self
                .failing_tag_codes
                .lock()
                .unwrap()
                .contains(tag.country_code)
        {
            return Err(unavailable("tag insert"));
        }
        let mut state = self.state.lock().unwrap();
        if state
            .tags
            .iter()
            .any(|t| t.video_id == tag.video_id && t.country_code == tag.country_code)
        {
            return Ok(None);
        }
        let now = Utc::now();
        let row = CountryTagRow {
            id: state.next_id(),
            video_id: tag.video_id,
            country_code: tag.country_code.to_string(),
            country_name: tag.country_name.to_string(),
            emoji: tag.emoji.map(str::to_string),
            continent: tag.continent.to_string(),
            detection_method: tag.detection_method.to_string(),
            confidence: tag.confidence,
            visit_order: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        state.tags.push(row.clone());
        Ok(Some(row))
    }

    async fn update_tag(
        &self,
        id: i64,
        update: &TagUpdate<'_>,
    ) -> Result<CountryTagRow, StoreError> {
        let mut state = self.state.lock().unwrap();
        let tag = state
            .tags
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound)?;
        tag.country_name = update.country_name.to_string();
        tag.emoji = update.emoji.map(str::to_string);
        tag.continent = update.continent.to_string();
        tag.detection_method = update.detection_method.to_string();
        tag.confidence = update.confidence;
        tag.updated_at = Utc::now();
        Ok(tag.clone())
    }

    async fn begin_run(
        &self,
        run_type: RunType,
        trigger: TriggerSource,
    ) -> Result<i64, StoreError> {
        if self.fail_runs.load(Ordering::SeqCst) {
            return Err(unavailable("run ledger"));
        }
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.runs.push(RunRecord {
            id,
            run_type: run_type.as_str(),
            trigger: trigger.as_str(),
            status: "running",
            processed: 0,
            total: 0,
            error: None,
        });
        Ok(id)
    }

    async fn complete_run(&self, id: i64, processed: i32, total: i32) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let run = state
            .runs
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;
        run.status = "succeeded";
        run.processed = processed;
        run.total = total;
        Ok(())
    }

    async fn fail_run(&self, id: i64, message: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let run = state
            .runs
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;
        run.status = "failed";
        run.error = Some(message.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Parks the first call that passes through it until released.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
    armed: AtomicBool,
}

impl Gate {
    pub fn armed() -> Arc<Self> {
        let gate = Self::default();
        gate.armed.store(true, Ordering::SeqCst);
        Arc::new(gate)
    }

    pub async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

#[derive(Default)]
pub struct FakeGateway {
    channels: HashMap<String, ChannelInfo>,
    uploads: HashMap<String, Vec<VideoSummary>>,
    details: HashMap<String, VideoDetails>,
    broken_channels: HashSet<String>,
    gate: Option<Arc<Gate>>,
    detail_gate: Option<Arc<Gate>>,
}

pub fn channel_info(channel_id: &str, title: &str) -> ChannelInfo {
    ChannelInfo {
        channel_id: channel_id.to_string(),
        title: title.to_string(),
        description: Some(format!("{title} travel diaries")),
        channel_url: format!("https://www.youtube.com/channel/{channel_id}"),
        thumbnail_url: Some(format!("https://img/{channel_id}.jpg")),
        subscriber_count: 120_000,
        view_count: 9_000_000,
        video_count: 310,
    }
}

pub fn video_summary(video_id: &str, title: &str) -> VideoSummary {
    VideoSummary {
        video_id: video_id.to_string(),
        title: title.to_string(),
        description: None,
        published_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single(),
        thumbnail_url: None,
        video_url: format!("https://www.youtube.com/watch?v={video_id}"),
    }
}

impl FakeGateway {
    /// Registers a channel reachable both by `query` and by its id.
    pub fn with_channel(mut self, query: &str, info: ChannelInfo) -> Self {
        self.channels.insert(info.channel_id.clone(), info.clone());
        self.channels.insert(query.to_string(), info);
        self
    }

    pub fn with_uploads(mut self, channel_id: &str, videos: &[(&str, &str)]) -> Self {
        self.uploads.insert(
            channel_id.to_string(),
            videos
                .iter()
                .map(|(id, title)| video_summary(id, title))
                .collect(),
        );
        self
    }

    pub fn with_details(mut self, video_id: &str, views: u64) -> Self {
        self.details.insert(
            video_id.to_string(),
            VideoDetails {
                video_id: video_id.to_string(),
                view_count: views,
                like_count: views / 10,
                comment_count: views / 100,
                duration: Some("PT10M".to_string()),
            },
        );
        self
    }

    /// Every call for this channel fails with an upstream error.
    pub fn with_broken_channel(mut self, channel_id: &str) -> Self {
        self.broken_channels.insert(channel_id.to_string());
        self
    }

    /// Parks the first `resolve_channel` call on `gate`.
    pub fn with_gate(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Parks the first `fetch_video_details` call on `gate`.
    pub fn with_detail_gate(mut self, gate: Arc<Gate>) -> Self {
        self.detail_gate = Some(gate);
        self
    }
}

#[async_trait]
impl VideoGateway for FakeGateway {
    async fn resolve_channel(&self, query: &str) -> Result<ChannelInfo, GatewayError> {
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        if self.broken_channels.contains(query) {
            return Err(GatewayError::Upstream("HTTP 500".to_string()));
        }
        self.channels
            .get(query)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("channel {query}")))
    }

    async fn fetch_latest_videos(
        &self,
        channel_id: &str,
        max_results: u32,
    ) -> Result<Vec<VideoSummary>, GatewayError> {
        if self.broken_channels.contains(channel_id) {
            return Err(GatewayError::Upstream("HTTP 500".to_string()));
        }
        let limit = usize::try_from(max_results).unwrap();
        Ok(self
            .uploads
            .get(channel_id)
            .map(|videos| videos.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch_video_details(&self, video_id: &str) -> Result<VideoDetails, GatewayError> {
        if let Some(gate) = &self.detail_gate {
            gate.pass().await;
        }
        self.details
            .get(video_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("video {video_id}")))
    }
}
