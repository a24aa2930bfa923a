//! Collection workflows.
//!
//! `collect_all` and `update_all` share one single-flight guard: while either
//! runs, both are rejected with [`CollectError::AlreadyRunning`]. Single-channel
//! calls and the unprocessed-video sweep are not gated; they report through the
//! shared counters only while no gated run holds them. Every batch handles its
//! channels or videos one at a time and records per-item failures in its
//! [`BatchReport`] instead of aborting.

use std::sync::Arc;

use travelmap_core::{AppConfig, Gender};
use travelmap_db::{ChannelRow, ChannelStats, NewChannel, NewVideo, VideoRow, VideoStats};
use travelmap_detect::CountryDetector;
use travelmap_youtube::{ChannelInfo, VideoSummary};

use crate::dispatch::{DetectionJob, DispatchMode, Dispatcher};
use crate::error::{CollectError, StoreError};
use crate::gateway::VideoGateway;
use crate::progress::{CollectionStatus, Lease, Progress};
use crate::reconcile::Reconciler;
use crate::report::{BatchReport, ChannelReport};
use crate::store::{CollectorStore, RunType, TriggerSource};

const DEFAULT_COLLECT_VIDEO_LIMIT: u32 = 50;
const DEFAULT_UPDATE_VIDEO_LIMIT: u32 = 20;

/// Per-channel page sizes.
#[derive(Debug, Clone, Copy)]
pub struct CollectorSettings {
    pub collect_video_limit: u32,
    pub update_video_limit: u32,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            collect_video_limit: DEFAULT_COLLECT_VIDEO_LIMIT,
            update_video_limit: DEFAULT_UPDATE_VIDEO_LIMIT,
        }
    }
}

impl CollectorSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            collect_video_limit: config.collect_video_limit,
            update_video_limit: config.update_video_limit,
        }
    }
}

/// Optional attributes applied when `add_channel` registers a new channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewChannelOptions<'a> {
    /// Display name to store instead of the upstream title.
    pub name: Option<&'a str>,
    pub gender: Option<Gender>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelBatch {
    Collect,
    Update,
}

impl ChannelBatch {
    fn run_type(self) -> RunType {
        match self {
            Self::Collect => RunType::CollectAll,
            Self::Update => RunType::UpdateAll,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Collect => "collecting",
            Self::Update => "updating",
        }
    }
}

/// Orchestrates ingestion from a [`VideoGateway`] into a [`CollectorStore`]
/// and dispatches country detection for new videos.
pub struct Collector {
    store: Arc<dyn CollectorStore>,
    gateway: Arc<dyn VideoGateway>,
    reconciler: Arc<Reconciler>,
    dispatcher: Dispatcher,
    progress: Progress,
    settings: CollectorSettings,
}

impl Collector {
    /// Builds a collector. With [`DispatchMode::Background`] this must be
    /// called inside a Tokio runtime.
    #[must_use]
    pub fn new(
        store: Arc<dyn CollectorStore>,
        gateway: Arc<dyn VideoGateway>,
        detector: Arc<CountryDetector>,
        settings: CollectorSettings,
        mode: DispatchMode,
    ) -> Self {
        let reconciler = Arc::new(Reconciler::new(Arc::clone(&store), detector));
        let dispatcher = Dispatcher::new(Arc::clone(&reconciler), mode);
        Self {
            store,
            gateway,
            reconciler,
            dispatcher,
            progress: Progress::default(),
            settings,
        }
    }

    #[must_use]
    pub fn detector(&self) -> &CountryDetector {
        self.reconciler.detector()
    }

    /// Snapshot of the shared progress counters.
    #[must_use]
    pub fn status(&self) -> CollectionStatus {
        self.progress.snapshot()
    }

    /// Waits until all queued background detection has finished.
    pub async fn wait_for_detection(&self) {
        self.dispatcher.wait_idle().await;
    }

    /// Runs [`Collector::collect_channel`] for every stored channel, using its
    /// external id as the query.
    ///
    /// # Errors
    ///
    /// - [`CollectError::AlreadyRunning`] if a gated workflow is in flight.
    /// - [`CollectError::Store`] if the channel list cannot be loaded.
    pub async fn collect_all(&self, trigger: TriggerSource) -> Result<BatchReport, CollectError> {
        self.channel_batch(ChannelBatch::Collect, trigger).await
    }

    /// Refreshes every stored channel's statistics and stores its newest
    /// videos. New videos are left for the unprocessed-video sweep.
    ///
    /// # Errors
    ///
    /// Same as [`Collector::collect_all`].
    pub async fn update_all(&self, trigger: TriggerSource) -> Result<BatchReport, CollectError> {
        self.channel_batch(ChannelBatch::Update, trigger).await
    }

    /// Resolves `query` to a channel (registering it when unknown), stores its
    /// newest unseen videos and queues them for detection. Returns before
    /// background detection completes.
    ///
    /// # Errors
    ///
    /// - [`CollectError::NotFound`] if no channel matches `query`.
    /// - [`CollectError::Gateway`] / [`CollectError::Store`] on upstream or
    ///   storage failure for the channel itself.
    pub async fn collect_channel(&self, query: &str) -> Result<ChannelReport, CollectError> {
        let lease = self
            .progress
            .begin_ungated(&format!("collecting channel: {query}"));
        let result = self.collect_one(query, Some(&lease)).await;
        lease.finish(result.is_ok());
        result
    }

    /// Registers a channel and collects it like [`Collector::collect_channel`].
    /// A channel that is already stored keeps its profile and is collected
    /// as is; `options` only apply to a newly registered channel.
    ///
    /// # Errors
    ///
    /// - [`CollectError::AlreadyRegistered`] if another caller registered the
    ///   same channel between lookup and insert; no videos are ingested.
    /// - Otherwise as [`Collector::collect_channel`].
    pub async fn add_channel(
        &self,
        query: &str,
        options: NewChannelOptions<'_>,
    ) -> Result<ChannelReport, CollectError> {
        tracing::info!(query, name = ?options.name, "adding channel");
        let lease = self
            .progress
            .begin_ungated(&format!("adding channel: {query}"));
        let result = self.add_one(query, options, &lease).await;
        lease.finish(result.is_ok());
        result
    }

    /// Refreshes statistics, tags and marks processed every video with
    /// `processed = false`. Detection runs inline, one video at a time.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Store`] if the unprocessed list cannot be
    /// loaded. Per-video failures are reported in the batch.
    pub async fn process_unprocessed(
        &self,
        trigger: TriggerSource,
    ) -> Result<BatchReport, CollectError> {
        let lease = self.progress.begin_ungated("processing unprocessed videos");
        tracing::info!(%trigger, "unprocessed-video sweep started");
        let run = self.begin_run(RunType::ProcessUnprocessed, trigger).await;

        let videos = match self.store.list_unprocessed_videos().await {
            Ok(videos) => videos,
            Err(e) => {
                self.fail_run(run, &e.to_string()).await;
                lease.finish(false);
                return Err(e.into());
            }
        };

        lease.set_total(videos.len());
        let mut report = BatchReport::new(videos.len());
        for video in &videos {
            match self.process_video(video).await {
                Ok(tags) => {
                    tracing::debug!(video = %video.external_id, tags, "video processed");
                    report.record_success();
                    lease.advance();
                }
                Err(e) => {
                    tracing::warn!(
                        video = %video.external_id,
                        error = %e,
                        "video processing failed; skipping"
                    );
                    report.record_skip(&video.external_id, &e);
                }
            }
        }

        report.message = if videos.is_empty() {
            "no unprocessed videos".to_string()
        } else {
            format!(
                "processed {}/{} videos",
                report.processed_count, report.total_count
            )
        };
        self.finish_run(run, &report).await;
        lease.finish(!report.all_failed());
        tracing::info!(
            processed = report.processed_count,
            total = report.total_count,
            "unprocessed-video sweep finished"
        );
        Ok(report)
    }

    async fn collect_one(
        &self,
        query: &str,
        lease: Option<&Lease<'_>>,
    ) -> Result<ChannelReport, CollectError> {
        tracing::info!(query, "collecting channel");
        let info = self.gateway.resolve_channel(query).await?;
        let channel = match self.store.find_channel(&info.channel_id).await? {
            Some(existing) => existing,
            None => {
                self.register_channel(query, &info, NewChannelOptions::default())
                    .await?
                    .0
            }
        };

        let stored = self
            .ingest_videos(&channel, self.settings.collect_video_limit, true, lease)
            .await?;
        Ok(ChannelReport::new(
            format!("collected {stored} new videos"),
            &channel,
            stored,
        ))
    }

    async fn add_one(
        &self,
        query: &str,
        options: NewChannelOptions<'_>,
        lease: &Lease<'_>,
    ) -> Result<ChannelReport, CollectError> {
        let info = self.gateway.resolve_channel(query).await?;
        let channel = match self.store.find_channel(&info.channel_id).await? {
            Some(existing) => {
                tracing::info!(
                    channel = %existing.external_id,
                    "channel already stored; collecting it"
                );
                existing
            }
            None => {
                let (channel, created) = self.register_channel(query, &info, options).await?;
                if !created {
                    return Err(CollectError::AlreadyRegistered {
                        external_id: channel.external_id,
                        name: channel.name,
                    });
                }
                channel
            }
        };

        let stored = self
            .ingest_videos(
                &channel,
                self.settings.collect_video_limit,
                true,
                Some(lease),
            )
            .await?;
        Ok(ChannelReport::new(
            format!("added channel {} with {stored} videos", channel.name),
            &channel,
            stored,
        ))
    }

    async fn channel_batch(
        &self,
        batch: ChannelBatch,
        trigger: TriggerSource,
    ) -> Result<BatchReport, CollectError> {
        let lease = self
            .progress
            .try_begin(&format!("{} all channels", batch.label()))
            .ok_or(CollectError::AlreadyRunning)?;
        let run_type = batch.run_type();
        tracing::info!(run_type = %run_type, %trigger, "batch started");
        let run = self.begin_run(run_type, trigger).await;

        let channels = match self.store.list_channels().await {
            Ok(channels) => channels,
            Err(e) => {
                self.fail_run(run, &e.to_string()).await;
                lease.finish(false);
                return Err(e.into());
            }
        };

        lease.set_total(channels.len());
        let mut report = BatchReport::new(channels.len());
        for channel in &channels {
            lease.set_phase(format!("{} channel: {}", batch.label(), channel.name));
            let outcome = match batch {
                ChannelBatch::Collect => self
                    .collect_one(&channel.external_id, None)
                    .await
                    .map(|collected| collected.video_count),
                ChannelBatch::Update => self.refresh_channel(channel).await,
            };
            match outcome {
                Ok(stored) => {
                    tracing::info!(
                        channel = %channel.external_id,
                        new_videos = stored,
                        "channel done"
                    );
                    report.record_success();
                    lease.advance();
                }
                Err(e) => {
                    tracing::warn!(
                        channel = %channel.external_id,
                        error = %e,
                        "channel failed; continuing"
                    );
                    report.record_skip(&channel.external_id, &e);
                }
            }
        }

        report.message = format!(
            "{} {}/{} channels",
            match batch {
                ChannelBatch::Collect => "collected",
                ChannelBatch::Update => "updated",
            },
            report.processed_count,
            report.total_count
        );
        self.finish_run(run, &report).await;
        lease.finish(!report.all_failed());
        tracing::info!(
            run_type = %run_type,
            processed = report.processed_count,
            total = report.total_count,
            "batch finished"
        );
        Ok(report)
    }

    async fn register_channel(
        &self,
        query: &str,
        info: &ChannelInfo,
        options: NewChannelOptions<'_>,
    ) -> Result<(ChannelRow, bool), CollectError> {
        let name = options
            .name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(info.title.as_str());
        let (channel, created) = self
            .store
            .save_channel(&NewChannel {
                external_id: &info.channel_id,
                name,
                search_query: Some(query),
                description: info.description.as_deref(),
                channel_url: Some(&info.channel_url),
                profile_image_url: info.thumbnail_url.as_deref(),
                subscriber_count: count(info.subscriber_count),
                view_count: count(info.view_count),
                video_count: count(info.video_count),
                gender: options.gender.map(Gender::as_str),
            })
            .await?;
        if created {
            tracing::info!(
                channel = %channel.external_id,
                name = %channel.name,
                "registered channel"
            );
        }
        Ok((channel, created))
    }

    async fn refresh_channel(&self, channel: &ChannelRow) -> Result<u32, CollectError> {
        let info = self.gateway.resolve_channel(&channel.external_id).await?;
        self.store
            .update_channel_stats(
                channel.id,
                ChannelStats {
                    subscriber_count: count(info.subscriber_count),
                    view_count: count(info.view_count),
                    video_count: count(info.video_count),
                },
            )
            .await?;
        self.ingest_videos(channel, self.settings.update_video_limit, false, None)
            .await
    }

    /// Stores the channel's newest unseen videos; returns how many were new.
    /// With a lease, the fetched page is the total and each stored video
    /// advances it.
    async fn ingest_videos(
        &self,
        channel: &ChannelRow,
        limit: u32,
        detect: bool,
        lease: Option<&Lease<'_>>,
    ) -> Result<u32, CollectError> {
        let videos = self
            .gateway
            .fetch_latest_videos(&channel.external_id, limit)
            .await?;
        if let Some(lease) = lease {
            lease.set_total(videos.len());
        }

        let mut stored = 0u32;
        for summary in &videos {
            match self.store_video(channel.id, summary).await {
                Ok(Some(video)) => {
                    stored += 1;
                    if let Some(lease) = lease {
                        lease.advance();
                    }
                    if detect {
                        self.dispatcher
                            .submit(DetectionJob {
                                video_id: video.id,
                                external_id: video.external_id,
                                title: video.title,
                            })
                            .await;
                    }
                }
                Ok(None) => {
                    tracing::debug!(video = %summary.video_id, "video already stored");
                }
                Err(e) => {
                    tracing::warn!(
                        channel = %channel.external_id,
                        video = %summary.video_id,
                        error = %e,
                        "failed to store video; skipping"
                    );
                }
            }
        }
        Ok(stored)
    }

    async fn store_video(
        &self,
        channel_id: i64,
        summary: &VideoSummary,
    ) -> Result<Option<VideoRow>, StoreError> {
        if self.store.video_exists(&summary.video_id).await? {
            return Ok(None);
        }
        self.store
            .save_video(&NewVideo {
                external_id: &summary.video_id,
                channel_id,
                title: &summary.title,
                description: summary.description.as_deref(),
                thumbnail_url: summary.thumbnail_url.as_deref(),
                video_url: Some(&summary.video_url),
                uploaded_at: summary.published_at,
            })
            .await
    }

    async fn process_video(&self, video: &VideoRow) -> Result<usize, CollectError> {
        let details = self.gateway.fetch_video_details(&video.external_id).await?;
        self.store
            .update_video_stats(
                video.id,
                &VideoStats {
                    view_count: count(details.view_count),
                    like_count: count(details.like_count),
                    comment_count: count(details.comment_count),
                    duration: details.duration,
                },
            )
            .await?;
        let tags = self.reconciler.tag_video(video.id, &video.title).await;
        self.store.mark_video_processed(video.id).await?;
        Ok(tags.len())
    }

    async fn begin_run(&self, run_type: RunType, trigger: TriggerSource) -> Option<i64> {
        match self.store.begin_run(run_type, trigger).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(run_type = %run_type, error = %e, "failed to record collection run");
                None
            }
        }
    }

    async fn finish_run(&self, run: Option<i64>, report: &BatchReport) {
        let Some(id) = run else { return };
        let result = if report.all_failed() {
            self.store.fail_run(id, &report.message).await
        } else {
            self.store
                .complete_run(
                    id,
                    i32::try_from(report.processed_count).unwrap_or(i32::MAX),
                    i32::try_from(report.total_count).unwrap_or(i32::MAX),
                )
                .await
        };
        if let Err(e) = result {
            tracing::warn!(run_id = id, error = %e, "failed to record run outcome");
        }
    }

    async fn fail_run(&self, run: Option<i64>, message: &str) {
        let Some(id) = run else { return };
        if let Err(e) = self.store.fail_run(id, message).await {
            tracing::warn!(run_id = id, error = %e, "failed to mark run failed");
        }
    }
}

fn count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
