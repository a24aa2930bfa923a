//! `detect` command: runs the title scanner and prints the result.

use travelmap_detect::{CountryDetector, DetectedCountry, PatternCatalog};

pub(crate) fn run_detect(title: &str, home: &str, json: bool) -> anyhow::Result<()> {
    let detector = CountryDetector::new(PatternCatalog::builtin(), home)?;
    let found = detector.detect(title);

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
    } else {
        for line in found.iter().map(format_line) {
            println!("{line}");
        }
    }
    Ok(())
}

fn format_line(hit: &DetectedCountry) -> String {
    format!(
        "{} {} {} ({}, {:.1})",
        hit.country.emoji, hit.country.code, hit.country.name, hit.method, hit.confidence
    )
}
