use std::collections::HashMap;

use serde::Serialize;
use travelmap_core::{CountryDescriptor, DetectionMethod};

use crate::catalog::PatternCatalog;
use crate::flags::flag_tokens;
use crate::DetectError;

/// One country found in a title, with provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedCountry {
    #[serde(flatten)]
    pub country: CountryDescriptor,
    pub method: DetectionMethod,
    pub confidence: f64,
}

impl DetectedCountry {
    fn new(country: &CountryDescriptor, method: DetectionMethod) -> Self {
        Self {
            country: country.clone(),
            method,
            confidence: method.confidence(),
        }
    }
}

/// Stateless title scanner over a [`PatternCatalog`].
#[derive(Debug, Clone)]
pub struct CountryDetector {
    catalog: PatternCatalog,
    home: CountryDescriptor,
}

impl CountryDetector {
    /// `home_code` names the country used when a title matches nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::UnknownHomeCountry`] if the catalog has no entry
    /// for `home_code`.
    pub fn new(catalog: PatternCatalog, home_code: &str) -> Result<Self, DetectError> {
        let home = catalog
            .country(home_code)
            .cloned()
            .ok_or_else(|| DetectError::UnknownHomeCountry(home_code.to_string()))?;
        Ok(Self { catalog, home })
    }

    #[must_use]
    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn home_country(&self) -> &CountryDescriptor {
        &self.home
    }

    /// The tag used when nothing matches.
    #[must_use]
    pub fn fallback(&self) -> DetectedCountry {
        DetectedCountry::new(&self.home, DetectionMethod::Default)
    }

    /// Flag and keyword hits for `title`, one per country code.
    ///
    /// When a code is hit more than once the highest-confidence hit wins; on a
    /// tie the earlier hit is kept. Output follows the order in which each code
    /// was first seen: flags left to right, then keywords by position in the
    /// title. Empty input gives an empty list.
    #[must_use]
    pub fn matches(&self, title: &str) -> Vec<DetectedCountry> {
        if title.trim().is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<DetectedCountry> = Vec::new();

        for token in flag_tokens(title) {
            if let Some(country) = self.catalog.flag(token) {
                tracing::debug!(code = %country.code, token, "flag match");
                hits.push(DetectedCountry::new(country, DetectionMethod::FlagEmoji));
            }
        }

        let lowered = title.to_lowercase();
        let mut keyword_hits: Vec<(usize, &CountryDescriptor)> = self
            .catalog
            .keywords()
            .filter_map(|(keyword, country)| {
                lowered.find(keyword).map(|pos| {
                    tracing::debug!(code = %country.code, keyword, "keyword match");
                    (pos, country)
                })
            })
            .collect();
        keyword_hits.sort_by_key(|(pos, _)| *pos);
        hits.extend(
            keyword_hits
                .into_iter()
                .map(|(_, country)| DetectedCountry::new(country, DetectionMethod::Keyword)),
        );

        dedup_by_code(hits)
    }

    /// Like [`CountryDetector::matches`], but never empty: a title with no hit
    /// yields the home country tagged [`DetectionMethod::Default`].
    #[must_use]
    pub fn detect(&self, title: &str) -> Vec<DetectedCountry> {
        let found = self.matches(title);
        if found.is_empty() {
            vec![self.fallback()]
        } else {
            found
        }
    }
}

fn dedup_by_code(hits: Vec<DetectedCountry>) -> Vec<DetectedCountry> {
    let mut out: Vec<DetectedCountry> = Vec::with_capacity(hits.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for hit in hits {
        match index.get(&hit.country.code) {
            Some(&i) => {
                if hit.confidence > out[i].confidence {
                    out[i] = hit;
                }
            }
            None => {
                index.insert(hit.country.code.clone(), out.len());
                out.push(hit);
            }
        }
    }

    out
}
