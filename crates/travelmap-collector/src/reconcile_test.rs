use chrono::Utc;
use travelmap_detect::PatternCatalog;

use super::*;

fn detector() -> CountryDetector {
    CountryDetector::new(PatternCatalog::builtin(), "KR").expect("KR is in the builtin catalog")
}

fn stored_tag(id: i64, hit: &DetectedCountry) -> CountryTagRow {
    let now = Utc::now();
    CountryTagRow {
        id,
        video_id: 1,
        country_code: hit.country.code.clone(),
        country_name: hit.country.name.clone(),
        emoji: Some(hit.country.emoji.clone()),
        continent: hit.country.continent.as_str().to_string(),
        detection_method: hit.method.as_str().to_string(),
        confidence: hit.confidence,
        visit_order: None,
        notes: None,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn new_codes_are_inserted() {
    let detected = detector().detect("Trip to 🇯🇵");
    let actions = plan(&[], &detected);

    assert_eq!(actions.len(), 1);
    assert!(matches!(actions[0], TagAction::Insert(hit) if hit.country.code == "JP"));
}

#[test]
fn identical_tags_are_left_alone() {
    let detected = detector().detect("Trip to 🇯🇵");
    let existing = vec![stored_tag(7, &detected[0])];

    let actions = plan(&existing, &detected);

    assert!(matches!(actions[0], TagAction::Unchanged(tag) if tag.id == 7));
}

#[test]
fn changed_descriptor_is_updated_in_place() {
    let detected = detector().detect("Trip to 🇯🇵");
    let mut stale = stored_tag(7, &detected[0]);
    stale.country_name = "Nippon".to_string();
    let existing = vec![stale];

    let actions = plan(&existing, &detected);

    assert!(matches!(
        actions[0],
        TagAction::Update { tag, country } if tag.id == 7 && country.country.code == "JP"
    ));
}

#[test]
fn missing_emoji_counts_as_a_change() {
    let detected = detector().detect("Trip to 🇯🇵");
    let mut stale = stored_tag(3, &detected[0]);
    stale.emoji = None;
    let existing = vec![stale];

    assert!(matches!(plan(&existing, &detected)[0], TagAction::Update { .. }));
}

#[test]
fn tags_for_codes_no_longer_detected_are_not_planned() {
    let detector = detector();
    let japan = detector.detect("Trip to 🇯🇵");
    let existing = vec![stored_tag(1, &japan[0])];

    let thailand = detector.detect("방콕 먹방");
    let actions = plan(&existing, &thailand);

    assert_eq!(actions.len(), 1);
    assert!(matches!(actions[0], TagAction::Insert(hit) if hit.country.code == "TH"));
}

#[test]
fn refreshed_tag_uses_update_method() {
    let detected = detector().detect("Trip to 🇯🇵");
    let update = refreshed_tag(&detected[0].country);

    assert_eq!(update.detection_method, "update");
    assert!((update.confidence - 0.8).abs() < f64::EPSILON);
    assert_eq!(update.emoji, Some("🇯🇵"));
}

#[test]
fn default_fallback_keeps_default_method() {
    let detector = detector();
    let fallback = detector.fallback();
    let tag = new_tag(42, &fallback);

    assert_eq!(tag.country_code, "KR");
    assert_eq!(tag.detection_method, "default");
    assert!((tag.confidence - 0.5).abs() < f64::EPSILON);
}
