use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Continent {
    Africa,
    Asia,
    Europe,
    #[serde(rename = "North America")]
    NorthAmerica,
    #[serde(rename = "South America")]
    SouthAmerica,
    Oceania,
}

impl Continent {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Continent::Africa => "Africa",
            Continent::Asia => "Asia",
            Continent::Europe => "Europe",
            Continent::NorthAmerica => "North America",
            Continent::SouthAmerica => "South America",
            Continent::Oceania => "Oceania",
        }
    }
}

impl std::fmt::Display for Continent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown continent: {0}")]
pub struct ParseContinentError(pub String);

impl std::str::FromStr for Continent {
    type Err = ParseContinentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Africa" => Ok(Continent::Africa),
            "Asia" => Ok(Continent::Asia),
            "Europe" => Ok(Continent::Europe),
            "North America" => Ok(Continent::NorthAmerica),
            "South America" => Ok(Continent::SouthAmerica),
            "Oceania" => Ok(Continent::Oceania),
            other => Err(ParseContinentError(other.to_string())),
        }
    }
}

/// A catalog entry: the country a flag or keyword resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryDescriptor {
    /// ISO 3166-1 alpha-2, upper case.
    pub code: String,
    pub name: String,
    pub continent: Continent,
    pub emoji: String,
}

impl CountryDescriptor {
    /// Builds a descriptor whose emoji is the regional-indicator flag for `code`.
    ///
    /// Returns `None` when `code` is not two ASCII letters.
    #[must_use]
    pub fn new(code: &str, name: &str, continent: Continent) -> Option<Self> {
        let emoji = flag_emoji(code)?;
        Some(Self {
            code: code.to_ascii_uppercase(),
            name: name.to_string(),
            continent,
            emoji,
        })
    }
}

/// Renders the flag emoji for an alpha-2 code as a pair of regional indicators.
#[must_use]
pub fn flag_emoji(code: &str) -> Option<String> {
    if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    code.to_ascii_uppercase()
        .bytes()
        .map(|b| char::from_u32(0x1F1E6 + u32::from(b - b'A')))
        .collect()
}

/// How a country tag was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    FlagEmoji,
    Keyword,
    Update,
    Default,
}

impl DetectionMethod {
    /// Confidence score stored alongside a tag produced by this method.
    #[must_use]
    pub fn confidence(self) -> f64 {
        match self {
            DetectionMethod::FlagEmoji => 0.9,
            DetectionMethod::Update => 0.8,
            DetectionMethod::Keyword => 0.7,
            DetectionMethod::Default => 0.5,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionMethod::FlagEmoji => "flag_emoji",
            DetectionMethod::Keyword => "keyword",
            DetectionMethod::Update => "update",
            DetectionMethod::Default => "default",
        }
    }
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown detection method: {0}")]
pub struct ParseDetectionMethodError(pub String);

impl std::str::FromStr for DetectionMethod {
    type Err = ParseDetectionMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flag_emoji" => Ok(DetectionMethod::FlagEmoji),
            "keyword" => Ok(DetectionMethod::Keyword),
            "update" => Ok(DetectionMethod::Update),
            "default" => Ok(DetectionMethod::Default),
            other => Err(ParseDetectionMethodError(other.to_string())),
        }
    }
}
