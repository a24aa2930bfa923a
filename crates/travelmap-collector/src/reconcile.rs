//! Merging detected countries into a video's stored tags.
//!
//! [`plan`] is pure: it compares the detector output with the stored tags and
//! decides, per country code, whether to insert, update in place, or leave
//! the tag alone. [`Reconciler`] applies the plan through a
//! [`CollectorStore`]. Tags for codes no longer detected are never deleted.

use std::collections::HashMap;
use std::sync::Arc;

use travelmap_core::{CountryDescriptor, DetectionMethod};
use travelmap_db::{CountryTagRow, NewCountryTag, TagUpdate};
use travelmap_detect::{CountryDetector, DetectedCountry};

use crate::error::StoreError;
use crate::store::CollectorStore;

/// What to do with one detected country.
#[derive(Debug, Clone)]
pub enum TagAction<'a> {
    /// No tag for this code yet.
    Insert(&'a DetectedCountry),
    /// A tag exists but its name, emoji or continent differs.
    Update {
        tag: &'a CountryTagRow,
        country: &'a DetectedCountry,
    },
    /// A matching tag exists.
    Unchanged(&'a CountryTagRow),
}

/// Decides per detected country how the stored tags must change.
#[must_use]
pub fn plan<'a>(
    existing: &'a [CountryTagRow],
    detected: &'a [DetectedCountry],
) -> Vec<TagAction<'a>> {
    let by_code: HashMap<&str, &CountryTagRow> = existing
        .iter()
        .map(|tag| (tag.country_code.as_str(), tag))
        .collect();

    detected
        .iter()
        .map(|hit| match by_code.get(hit.country.code.as_str()).copied() {
            None => TagAction::Insert(hit),
            Some(tag) if descriptor_differs(tag, &hit.country) => {
                TagAction::Update { tag, country: hit }
            }
            Some(tag) => TagAction::Unchanged(tag),
        })
        .collect()
}

fn descriptor_differs(tag: &CountryTagRow, country: &CountryDescriptor) -> bool {
    tag.country_name != country.name
        || tag.emoji.as_deref() != Some(country.emoji.as_str())
        || tag.continent != country.continent.as_str()
}

/// Runs detection for a video and persists the result.
pub struct Reconciler {
    store: Arc<dyn CollectorStore>,
    detector: Arc<CountryDetector>,
}

impl Reconciler {
    #[must_use]
    pub fn new(store: Arc<dyn CollectorStore>, detector: Arc<CountryDetector>) -> Self {
        Self { store, detector }
    }

    #[must_use]
    pub fn detector(&self) -> &CountryDetector {
        &self.detector
    }

    /// Detects countries in `title` and merges them into the video's tags.
    ///
    /// Never fails. When the stored tags cannot be loaded, only the default
    /// tag is persisted; when that fails too, the result is empty.
    pub async fn tag_video(&self, video_id: i64, title: &str) -> Vec<CountryTagRow> {
        let detected = self.detector.detect(title);
        tracing::debug!(video_id, hits = detected.len(), "detected countries");

        match self.reconcile(video_id, &detected).await {
            Ok(tags) => tags,
            Err(e) => {
                tracing::warn!(
                    video_id,
                    error = %e,
                    "tag reconciliation failed; persisting default tag only"
                );
                self.persist_default(video_id).await
            }
        }
    }

    /// Applies [`plan`] for `detected`, returning the tags now stored for
    /// those codes. A tag that fails to persist is logged and left out.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only when the existing tags cannot be loaded.
    pub async fn reconcile(
        &self,
        video_id: i64,
        detected: &[DetectedCountry],
    ) -> Result<Vec<CountryTagRow>, StoreError> {
        let existing = self.store.find_tags(video_id).await?;
        let mut tags = Vec::with_capacity(detected.len());

        for action in plan(&existing, detected) {
            let code = match &action {
                TagAction::Insert(hit) | TagAction::Update { country: hit, .. } => {
                    hit.country.code.clone()
                }
                TagAction::Unchanged(tag) => tag.country_code.clone(),
            };

            let outcome = match action {
                TagAction::Insert(hit) => self.store.insert_tag(&new_tag(video_id, hit)).await,
                TagAction::Update { tag, country } => self
                    .store
                    .update_tag(tag.id, &refreshed_tag(&country.country))
                    .await
                    .map(Some),
                TagAction::Unchanged(tag) => Ok(Some(tag.clone())),
            };

            match outcome {
                Ok(Some(tag)) => tags.push(tag),
                Ok(None) => {
                    tracing::debug!(
                        video_id,
                        country = %code,
                        "tag inserted concurrently; skipping"
                    );
                }
                Err(e) => {
                    tracing::warn!(video_id, country = %code, error = %e, "skipping country tag");
                }
            }
        }

        Ok(tags)
    }

    async fn persist_default(&self, video_id: i64) -> Vec<CountryTagRow> {
        let fallback = self.detector.fallback();
        match self.store.insert_tag(&new_tag(video_id, &fallback)).await {
            Ok(tag) => tag.into_iter().collect(),
            Err(e) => {
                tracing::error!(video_id, error = %e, "failed to persist default tag");
                Vec::new()
            }
        }
    }
}

fn new_tag(video_id: i64, hit: &DetectedCountry) -> NewCountryTag<'_> {
    NewCountryTag {
        video_id,
        country_code: &hit.country.code,
        country_name: &hit.country.name,
        emoji: Some(&hit.country.emoji),
        continent: hit.country.continent.as_str(),
        detection_method: hit.method.as_str(),
        confidence: hit.confidence,
    }
}

fn refreshed_tag(country: &CountryDescriptor) -> TagUpdate<'_> {
    TagUpdate {
        country_name: &country.name,
        emoji: Some(&country.emoji),
        continent: country.continent.as_str(),
        detection_method: DetectionMethod::Update.as_str(),
        confidence: DetectionMethod::Update.confidence(),
    }
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
