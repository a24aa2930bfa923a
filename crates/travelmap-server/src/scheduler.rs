//! Background job scheduler.
//!
//! Registers the three periodic collection triggers on a [`JobScheduler`].
//! Each job calls the matching [`Collector`] workflow with
//! [`TriggerSource::Scheduler`] and only logs the outcome.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use travelmap_collector::{BatchReport, CollectError, Collector, TriggerSource};
use travelmap_core::ScheduleConfig;

type WorkflowFuture = Pin<Box<dyn Future<Output = Result<BatchReport, CollectError>> + Send>>;

/// Builds and starts the scheduler.
///
/// The returned handle must be kept alive for the lifetime of the process;
/// dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if a cron expression is invalid or the
/// scheduler fails to start.
pub async fn build_scheduler(
    collector: Arc<Collector>,
    schedule: &ScheduleConfig,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register(
        &scheduler,
        "collect_all",
        &schedule.collect_all,
        Arc::clone(&collector),
        collect_all,
    )
    .await?;
    register(
        &scheduler,
        "update_all",
        &schedule.update_all,
        Arc::clone(&collector),
        update_all,
    )
    .await?;
    register(
        &scheduler,
        "process_unprocessed",
        &schedule.process_unprocessed,
        collector,
        process_unprocessed,
    )
    .await?;

    scheduler.start().await?;
    Ok(scheduler)
}

fn collect_all(collector: Arc<Collector>) -> WorkflowFuture {
    Box::pin(async move { collector.collect_all(TriggerSource::Scheduler).await })
}

fn update_all(collector: Arc<Collector>) -> WorkflowFuture {
    Box::pin(async move { collector.update_all(TriggerSource::Scheduler).await })
}

fn process_unprocessed(collector: Arc<Collector>) -> WorkflowFuture {
    Box::pin(async move { collector.process_unprocessed(TriggerSource::Scheduler).await })
}

async fn register(
    scheduler: &JobScheduler,
    name: &'static str,
    cron: &str,
    collector: Arc<Collector>,
    workflow: fn(Arc<Collector>) -> WorkflowFuture,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let collector = Arc::clone(&collector);

        Box::pin(async move {
            tracing::info!(job = name, "scheduler: starting run");
            log_outcome(name, workflow(collector).await);
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(job = name, cron, "scheduler: registered job");
    Ok(())
}

fn log_outcome(name: &'static str, outcome: Result<BatchReport, CollectError>) {
    match outcome {
        Ok(report) => tracing::info!(
            job = name,
            processed = report.processed_count,
            total = report.total_count,
            skipped = report.skipped.len(),
            "scheduler: run complete"
        ),
        Err(CollectError::AlreadyRunning) => {
            tracing::info!(job = name, "scheduler: another collection is running; skipped");
        }
        Err(e) => tracing::error!(job = name, error = %e, "scheduler: run failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_cron_is_rejected() {
        let job = Job::new_async("not a cron", |_uuid, _lock| Box::pin(async {}));
        assert!(job.is_err());
    }

    #[tokio::test]
    async fn default_schedule_expressions_parse() {
        for cron in ["0 0 2 * * *", "0 0 13 * * SUN", "0 0 * * * *"] {
            assert!(
                Job::new_async(cron, |_uuid, _lock| Box::pin(async {})).is_ok(),
                "{cron} should parse"
            );
        }
    }
}
