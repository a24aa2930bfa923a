//! Collection command handlers for the CLI.
//!
//! Detection runs inline so the process cannot exit with queued work.
//! Batch workflows log and skip per-item failures; the command fails only
//! when every item failed.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use travelmap_collector::{
    BatchReport, ChannelReport, CollectError, Collector, CollectorSettings, DispatchMode,
    NewChannelOptions, PgStore, TriggerSource,
};
use travelmap_core::{AppConfig, Gender};
use travelmap_db::ChannelRow;
use travelmap_detect::{CountryDetector, PatternCatalog};
use travelmap_youtube::YouTubeClient;

/// # Errors
///
/// Returns an error if `YOUTUBE_API_KEY` is unset, the home country is not
/// in the catalog, or the HTTP client cannot be built.
pub(crate) fn build_collector(
    config: &AppConfig,
    pool: sqlx::PgPool,
) -> anyhow::Result<Collector> {
    let api_key = config
        .youtube_api_key
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("YOUTUBE_API_KEY must be set for collection commands"))?;

    let client = YouTubeClient::with_base_url(
        api_key,
        config.youtube_timeout_secs,
        &config.youtube_base_url,
    )
    .map_err(|e| anyhow::anyhow!("failed to build YouTube client: {e}"))?
    .with_retry(config.youtube_max_retries, config.youtube_backoff_base_ms);

    let detector = CountryDetector::new(PatternCatalog::builtin(), &config.home_country)?;

    Ok(Collector::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(client),
        Arc::new(detector),
        CollectorSettings::from_app_config(config),
        DispatchMode::Inline,
    ))
}

fn print_batch(report: &BatchReport) -> anyhow::Result<()> {
    println!("{}", report.message);
    for item in &report.skipped {
        println!("  skipped {}: {}", item.key, item.reason);
    }
    if report.all_failed() {
        anyhow::bail!("every item failed: {}", report.message);
    }
    Ok(())
}

fn print_channel(report: &ChannelReport) {
    println!(
        "{} ({}: {})",
        report.message, report.channel_name, report.channel_id
    );
}

pub(crate) async fn run_collect_all(collector: &Collector) -> anyhow::Result<()> {
    let report = collector.collect_all(TriggerSource::Cli).await?;
    print_batch(&report)
}

pub(crate) async fn run_update_all(collector: &Collector) -> anyhow::Result<()> {
    let report = collector.update_all(TriggerSource::Cli).await?;
    print_batch(&report)
}

pub(crate) async fn run_process(collector: &Collector) -> anyhow::Result<()> {
    let report = collector.process_unprocessed(TriggerSource::Cli).await?;
    print_batch(&report)
}

pub(crate) async fn run_collect_channel(collector: &Collector, query: &str) -> anyhow::Result<()> {
    let report = collector.collect_channel(query).await?;
    print_channel(&report);
    Ok(())
}

pub(crate) async fn run_add_channel(
    collector: &Collector,
    query: &str,
    name: Option<&str>,
    gender: Option<Gender>,
) -> anyhow::Result<()> {
    let report = collector
        .add_channel(query, NewChannelOptions { name, gender })
        .await?;
    print_channel(&report);
    Ok(())
}

/// Tally of a seed run.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SeedSummary {
    pub added: usize,
    pub already_registered: usize,
    pub failed: usize,
}

impl SeedSummary {
    fn record(&mut self, name: &str, outcome: Result<ChannelReport, CollectError>) {
        match outcome {
            Ok(report) => {
                tracing::info!(
                    channel = %report.channel_id,
                    videos = report.video_count,
                    "seeded channel"
                );
                self.added += 1;
            }
            Err(CollectError::AlreadyRegistered { external_id, .. }) => {
                tracing::info!(channel = %external_id, name, "already registered; skipping");
                self.already_registered += 1;
            }
            Err(e) => {
                tracing::warn!(name, error = %e, "failed to seed channel; skipping");
                self.failed += 1;
            }
        }
    }

    fn message(&self) -> String {
        format!(
            "seeded {} channel(s), {} already registered, {} failed",
            self.added, self.already_registered, self.failed
        )
    }
}

/// Queries a stored channel answers to: its external id and the query it
/// was registered with.
fn registered_queries(channels: &[ChannelRow]) -> HashSet<&str> {
    channels
        .iter()
        .flat_map(|c| std::iter::once(c.external_id.as_str()).chain(c.search_query.as_deref()))
        .collect()
}

/// Adds every channel in the seed file that is not stored yet, one at a time.
///
/// # Errors
///
/// Returns an error if the seed file or the stored channels cannot be
/// loaded, or if every channel in the file failed.
pub(crate) async fn run_seed(
    collector: &Collector,
    pool: &sqlx::PgPool,
    path: &Path,
) -> anyhow::Result<SeedSummary> {
    let file = travelmap_core::load_channels(path)?;
    let stored = travelmap_db::list_channels(pool).await?;
    let registered = registered_queries(&stored);
    let mut summary = SeedSummary::default();

    for seed in &file.channels {
        if registered.contains(seed.query.as_str()) {
            tracing::info!(name = %seed.name, query = %seed.query, "already registered; skipping");
            summary.already_registered += 1;
            continue;
        }
        let outcome = collector
            .add_channel(
                &seed.query,
                NewChannelOptions {
                    name: Some(&seed.name),
                    gender: seed.gender,
                },
            )
            .await;
        summary.record(&seed.name, outcome);
    }

    println!("{}", summary.message());
    if !file.channels.is_empty() && summary.failed == file.channels.len() {
        anyhow::bail!("no channel could be seeded from {}", path.display());
    }
    Ok(summary)
}
