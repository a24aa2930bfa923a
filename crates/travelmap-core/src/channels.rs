use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Mixed,
}

impl Gender {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Mixed => "mixed",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked channel from `config/channels.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSeed {
    pub name: String,
    /// Channel id (`UC...`) or a free-text search query.
    pub query: String,
    pub gender: Option<Gender>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelsFile {
    pub channels: Vec<ChannelSeed>,
}

/// Load and validate the channel seed list from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_channels(path: &Path) -> Result<ChannelsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ChannelsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_channels(&content)
}

/// Parse and validate channel seed YAML.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_channels(content: &str) -> Result<ChannelsFile, ConfigError> {
    let channels_file: ChannelsFile = serde_yaml::from_str(content)?;
    validate_channels(&channels_file)?;
    Ok(channels_file)
}

fn validate_channels(channels_file: &ChannelsFile) -> Result<(), ConfigError> {
    let mut seen_queries = HashSet::new();

    for channel in &channels_file.channels {
        if channel.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "channel name must be non-empty".to_string(),
            ));
        }

        if channel.query.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "channel '{}' has an empty query",
                channel.name
            )));
        }

        if !seen_queries.insert(channel.query.trim().to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate channel query: '{}' (from channel '{}')",
                channel.query, channel.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn parses_minimal_entry() {
        let file = parse_channels(
            r#"
channels:
  - name: Wanderer
    query: "wanderer travel"
"#,
        )
        .unwrap();
        assert_eq!(file.channels.len(), 1);
        assert_eq!(file.channels[0].name, "Wanderer");
        assert!(file.channels[0].gender.is_none());
    }

    #[test]
    fn parses_gender() {
        let file = parse_channels(
            r"
channels:
  - name: A
    query: a
    gender: female
  - name: B
    query: b
    gender: mixed
",
        )
        .unwrap();
        assert_eq!(file.channels[0].gender, Some(Gender::Female));
        assert_eq!(file.channels[1].gender, Some(Gender::Mixed));
    }

    #[test]
    fn rejects_unknown_gender() {
        let result = parse_channels("channels:\n  - name: A\n    query: a\n    gender: robot\n");
        assert!(matches!(result, Err(ConfigError::ChannelsFileParse(_))));
    }

    #[test]
    fn rejects_empty_query() {
        let result = parse_channels("channels:\n  - name: A\n    query: \"  \"\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_duplicate_query_case_insensitive() {
        let result = parse_channels(
            "channels:\n  - name: A\n    query: Seoul Walks\n  - name: B\n    query: seoul walks\n",
        );
        assert!(
            matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("duplicate")),
            "got: {result:?}"
        );
    }

    #[test]
    fn missing_file_reports_path() {
        let path = PathBuf::from("/nonexistent/channels.yaml");
        let result = load_channels(&path);
        assert!(
            matches!(result, Err(ConfigError::ChannelsFileIo { ref path, .. }) if path.contains("nonexistent"))
        );
    }

    #[test]
    fn load_channels_from_real_file() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("channels.yaml");
        let channels_file = load_channels(&path).expect("failed to load channels.yaml");
        assert!(!channels_file.channels.is_empty());
    }
}
