//! Persistence seam for the collector, plus the Postgres adapter.

use std::fmt;

use async_trait::async_trait;
use sqlx::PgPool;
use travelmap_db::{
    ChannelRow, ChannelStats, CountryTagRow, NewChannel, NewCountryTag, NewVideo, TagUpdate,
    VideoRow, VideoStats,
};

use crate::error::StoreError;

/// Batch workflow recorded in `collection_runs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunType {
    CollectAll,
    UpdateAll,
    ProcessUnprocessed,
}

impl RunType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CollectAll => "collect_all",
            Self::UpdateAll => "update_all",
            Self::ProcessUnprocessed => "process_unprocessed",
        }
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What started a batch workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Api,
    Scheduler,
    Cli,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Scheduler => "scheduler",
            Self::Cli => "cli",
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable records the collector reads and writes, keyed by external ids.
#[async_trait]
pub trait CollectorStore: Send + Sync {
    async fn find_channel(&self, external_id: &str) -> Result<Option<ChannelRow>, StoreError>;

    /// Inserts a channel unless its external id exists; returns the stored
    /// row and whether it was created.
    async fn save_channel(
        &self,
        channel: &NewChannel<'_>,
    ) -> Result<(ChannelRow, bool), StoreError>;

    async fn list_channels(&self) -> Result<Vec<ChannelRow>, StoreError>;

    async fn update_channel_stats(&self, id: i64, stats: ChannelStats) -> Result<(), StoreError>;

    async fn video_exists(&self, external_id: &str) -> Result<bool, StoreError>;

    /// Inserts a video; `None` when the external id is already stored.
    async fn save_video(&self, video: &NewVideo<'_>) -> Result<Option<VideoRow>, StoreError>;

    async fn list_unprocessed_videos(&self) -> Result<Vec<VideoRow>, StoreError>;

    async fn update_video_stats(&self, id: i64, stats: &VideoStats) -> Result<(), StoreError>;

    async fn mark_video_processed(&self, id: i64) -> Result<(), StoreError>;

    async fn find_tags(&self, video_id: i64) -> Result<Vec<CountryTagRow>, StoreError>;

    /// Inserts a tag; `None` when the `(video, code)` pair already exists.
    async fn insert_tag(
        &self,
        tag: &NewCountryTag<'_>,
    ) -> Result<Option<CountryTagRow>, StoreError>;

    async fn update_tag(
        &self,
        id: i64,
        update: &TagUpdate<'_>,
    ) -> Result<CountryTagRow, StoreError>;

    /// Creates a run row and moves it to `running`; returns its id.
    async fn begin_run(
        &self,
        run_type: RunType,
        trigger: TriggerSource,
    ) -> Result<i64, StoreError>;

    async fn complete_run(&self, id: i64, processed: i32, total: i32) -> Result<(), StoreError>;

    async fn fail_run(&self, id: i64, message: &str) -> Result<(), StoreError>;
}

/// [`CollectorStore`] over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CollectorStore for PgStore {
    async fn find_channel(&self, external_id: &str) -> Result<Option<ChannelRow>, StoreError> {
        Ok(travelmap_db::get_channel_by_external_id(&self.pool, external_id).await?)
    }

    async fn save_channel(
        &self,
        channel: &NewChannel<'_>,
    ) -> Result<(ChannelRow, bool), StoreError> {
        Ok(travelmap_db::insert_channel(&self.pool, channel).await?)
    }

    async fn list_channels(&self) -> Result<Vec<ChannelRow>, StoreError> {
        Ok(travelmap_db::list_channels(&self.pool).await?)
    }

    async fn update_channel_stats(&self, id: i64, stats: ChannelStats) -> Result<(), StoreError> {
        Ok(travelmap_db::update_channel_stats(&self.pool, id, stats).await?)
    }

    async fn video_exists(&self, external_id: &str) -> Result<bool, StoreError> {
        Ok(travelmap_db::video_exists(&self.pool, external_id).await?)
    }

    async fn save_video(&self, video: &NewVideo<'_>) -> Result<Option<VideoRow>, StoreError> {
        Ok(travelmap_db::insert_video(&self.pool, video).await?)
    }

    async fn list_unprocessed_videos(&self) -> Result<Vec<VideoRow>, StoreError> {
        Ok(travelmap_db::list_unprocessed_videos(&self.pool).await?)
    }

    async fn update_video_stats(&self, id: i64, stats: &VideoStats) -> Result<(), StoreError> {
        Ok(travelmap_db::update_video_stats(&self.pool, id, stats).await?)
    }

    async fn mark_video_processed(&self, id: i64) -> Result<(), StoreError> {
        Ok(travelmap_db::mark_video_processed(&self.pool, id).await?)
    }

    async fn find_tags(&self, video_id: i64) -> Result<Vec<CountryTagRow>, StoreError> {
        Ok(travelmap_db::list_tags_for_video(&self.pool, video_id).await?)
    }

    async fn insert_tag(
        &self,
        tag: &NewCountryTag<'_>,
    ) -> Result<Option<CountryTagRow>, StoreError> {
        Ok(travelmap_db::insert_country_tag(&self.pool, tag).await?)
    }

    async fn update_tag(
        &self,
        id: i64,
        update: &TagUpdate<'_>,
    ) -> Result<CountryTagRow, StoreError> {
        Ok(travelmap_db::update_country_tag(&self.pool, id, update).await?)
    }

    async fn begin_run(
        &self,
        run_type: RunType,
        trigger: TriggerSource,
    ) -> Result<i64, StoreError> {
        let run =
            travelmap_db::create_collection_run(&self.pool, run_type.as_str(), trigger.as_str())
                .await?;
        travelmap_db::start_collection_run(&self.pool, run.id).await?;
        Ok(run.id)
    }

    async fn complete_run(&self, id: i64, processed: i32, total: i32) -> Result<(), StoreError> {
        Ok(travelmap_db::complete_collection_run(&self.pool, id, processed, total).await?)
    }

    async fn fail_run(&self, id: i64, message: &str) -> Result<(), StoreError> {
        Ok(travelmap_db::fail_collection_run(&self.pool, id, message).await?)
    }
}
