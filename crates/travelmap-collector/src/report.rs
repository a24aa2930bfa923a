use std::fmt;

use serde::Serialize;
use travelmap_db::ChannelRow;

/// An item a batch workflow skipped, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub key: String,
    pub reason: String,
}

/// Outcome of a batch workflow. `skipped` holds every item that failed;
/// the batch itself never aborts on a per-item failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub message: String,
    pub processed_count: u32,
    pub total_count: u32,
    pub skipped: Vec<SkippedItem>,
}

impl BatchReport {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            message: String::new(),
            processed_count: 0,
            total_count: u32::try_from(total).unwrap_or(u32::MAX),
            skipped: Vec::new(),
        }
    }

    pub(crate) fn record_success(&mut self) {
        self.processed_count = (self.processed_count + 1).min(self.total_count);
    }

    pub(crate) fn record_skip(&mut self, key: &str, reason: &dyn fmt::Display) {
        self.skipped.push(SkippedItem {
            key: key.to_string(),
            reason: reason.to_string(),
        });
    }

    /// True when there was work and none of it succeeded.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.total_count > 0 && self.processed_count == 0
    }
}

/// Outcome of the single-channel pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelReport {
    pub message: String,
    pub channel_name: String,
    pub channel_id: String,
    /// Videos newly stored by this run.
    pub video_count: u32,
}

impl ChannelReport {
    pub(crate) fn new(message: String, channel: &ChannelRow, video_count: u32) -> Self {
        Self {
            message,
            channel_name: channel.name.clone(),
            channel_id: channel.external_id.clone(),
            video_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_is_not_a_failure() {
        let report = BatchReport::new(0);
        assert!(!report.all_failed());
    }

    #[test]
    fn success_count_saturates_at_total() {
        let mut report = BatchReport::new(1);
        report.record_success();
        report.record_success();
        assert_eq!(report.processed_count, 1);
    }

    #[test]
    fn all_skipped_batch_failed() {
        let mut report = BatchReport::new(2);
        report.record_skip("UCa", &"quota");
        report.record_skip("UCb", &"quota");
        assert!(report.all_failed());
        assert_eq!(report.skipped[1].key, "UCb");
    }

    #[test]
    fn serializes_camel_case() {
        let mut report = BatchReport::new(3);
        report.message = "collected 1/3 channels".to_string();
        report.record_success();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["processedCount"], 1);
        assert_eq!(json["totalCount"], 3);
        assert!(json["skipped"].as_array().unwrap().is_empty());
    }
}
