use std::collections::HashMap;

use travelmap_core::{Continent, CountryDescriptor};

use crate::flags::is_flag_token;

/// Countries known to the detector: code, display name, continent.
const COUNTRIES: &[(&str, &str, Continent)] = &[
    ("KR", "대한민국", Continent::Asia),
    ("JP", "일본", Continent::Asia),
    ("CN", "중국", Continent::Asia),
    ("US", "미국", Continent::NorthAmerica),
    ("FR", "프랑스", Continent::Europe),
    ("GB", "영국", Continent::Europe),
    ("DE", "독일", Continent::Europe),
    ("IT", "이탈리아", Continent::Europe),
    ("ES", "스페인", Continent::Europe),
    ("AU", "호주", Continent::Oceania),
    ("CA", "캐나다", Continent::NorthAmerica),
    ("TH", "태국", Continent::Asia),
    ("VN", "베트남", Continent::Asia),
    ("SG", "싱가포르", Continent::Asia),
    ("MY", "말레이시아", Continent::Asia),
    ("ID", "인도네시아", Continent::Asia),
    ("PH", "필리핀", Continent::Asia),
    ("IN", "인도", Continent::Asia),
    ("RU", "러시아", Continent::Europe),
    ("BR", "브라질", Continent::SouthAmerica),
];

/// Subdivision flags that resolve to a country-level entry.
const FLAG_ALIASES: &[(&str, &str)] = &[
    // England, Scotland, Wales
    (
        "\u{1F3F4}\u{E0067}\u{E0062}\u{E0065}\u{E006E}\u{E0067}\u{E007F}",
        "GB",
    ),
    (
        "\u{1F3F4}\u{E0067}\u{E0062}\u{E0073}\u{E0063}\u{E0074}\u{E007F}",
        "GB",
    ),
    (
        "\u{1F3F4}\u{E0067}\u{E0062}\u{E0077}\u{E006C}\u{E0073}\u{E007F}",
        "GB",
    ),
];

/// Keyword → country code. Korean and English names plus well-known cities.
///
/// No keyword may be a substring of a keyword for another country: "인도" is
/// left out because it sits inside "인도네시아", "busan" because of "usa".
const KEYWORDS: &[(&str, &str)] = &[
    ("한국", "KR"),
    ("대한민국", "KR"),
    ("korea", "KR"),
    ("seoul", "KR"),
    ("서울", "KR"),
    ("부산", "KR"),
    ("제주", "KR"),
    ("일본", "JP"),
    ("japan", "JP"),
    ("tokyo", "JP"),
    ("도쿄", "JP"),
    ("오사카", "JP"),
    ("osaka", "JP"),
    ("후쿠오카", "JP"),
    ("중국", "CN"),
    ("china", "CN"),
    ("beijing", "CN"),
    ("베이징", "CN"),
    ("상하이", "CN"),
    ("shanghai", "CN"),
    ("미국", "US"),
    ("america", "US"),
    ("usa", "US"),
    ("new york", "US"),
    ("뉴욕", "US"),
    ("프랑스", "FR"),
    ("france", "FR"),
    ("paris", "FR"),
    ("파리", "FR"),
    ("영국", "GB"),
    ("england", "GB"),
    ("london", "GB"),
    ("런던", "GB"),
    ("독일", "DE"),
    ("germany", "DE"),
    ("berlin", "DE"),
    ("베를린", "DE"),
    ("이탈리아", "IT"),
    ("italy", "IT"),
    ("rome", "IT"),
    ("로마", "IT"),
    ("스페인", "ES"),
    ("spain", "ES"),
    ("barcelona", "ES"),
    ("바르셀로나", "ES"),
    ("호주", "AU"),
    ("australia", "AU"),
    ("sydney", "AU"),
    ("시드니", "AU"),
    ("캐나다", "CA"),
    ("canada", "CA"),
    ("vancouver", "CA"),
    ("밴쿠버", "CA"),
    ("태국", "TH"),
    ("thailand", "TH"),
    ("bangkok", "TH"),
    ("방콕", "TH"),
    ("베트남", "VN"),
    ("vietnam", "VN"),
    ("hanoi", "VN"),
    ("하노이", "VN"),
    ("다낭", "VN"),
    ("싱가포르", "SG"),
    ("singapore", "SG"),
    ("말레이시아", "MY"),
    ("malaysia", "MY"),
    ("쿠알라룸푸르", "MY"),
    ("인도네시아", "ID"),
    ("indonesia", "ID"),
    ("발리", "ID"),
    ("필리핀", "PH"),
    ("philippines", "PH"),
    ("세부", "PH"),
    ("india", "IN"),
    ("뭄바이", "IN"),
    ("mumbai", "IN"),
    ("러시아", "RU"),
    ("russia", "RU"),
    ("moscow", "RU"),
    ("모스크바", "RU"),
    ("브라질", "BR"),
    ("brazil", "BR"),
    ("리우데자네이루", "BR"),
];

/// Immutable flag and keyword tables.
///
/// Built once at startup via [`PatternCatalog::builtin`] or a
/// [`CatalogBuilder`]; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    countries: HashMap<String, CountryDescriptor>,
    flags: HashMap<String, String>,
    keywords: Vec<(String, String)>,
}

impl PatternCatalog {
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// The built-in catalog: each country's own flag, subdivision aliases and
    /// the keyword table.
    #[must_use]
    pub fn builtin() -> Self {
        let mut builder = Self::builder();
        for &(code, name, continent) in COUNTRIES {
            builder = builder.country(code, name, continent);
        }
        for &(token, code) in FLAG_ALIASES {
            builder = builder.flag(token, code);
        }
        for &(keyword, code) in KEYWORDS {
            builder = builder.keyword(keyword, code);
        }
        builder.build()
    }

    #[must_use]
    pub fn country(&self, code: &str) -> Option<&CountryDescriptor> {
        self.countries.get(&code.to_ascii_uppercase())
    }

    /// Country for a single flag token, if the token is in the table.
    #[must_use]
    pub fn flag(&self, token: &str) -> Option<&CountryDescriptor> {
        self.flags.get(token).and_then(|code| self.countries.get(code))
    }

    /// Lower-cased keywords paired with their country, in insertion order.
    pub fn keywords(&self) -> impl Iterator<Item = (&str, &CountryDescriptor)> {
        self.keywords.iter().filter_map(|(keyword, code)| {
            self.countries
                .get(code)
                .map(|country| (keyword.as_str(), country))
        })
    }

    pub fn countries(&self) -> impl Iterator<Item = &CountryDescriptor> {
        self.countries.values()
    }

    #[must_use]
    pub fn flag_count(&self) -> usize {
        self.flags.len()
    }

    #[must_use]
    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

enum Entry {
    Country {
        code: String,
        name: String,
        continent: Continent,
    },
    Flag {
        token: String,
        code: String,
    },
    Keyword {
        keyword: String,
        code: String,
    },
}

/// Collects catalog entries and validates them in [`CatalogBuilder::build`].
///
/// Invalid entries are logged and dropped; building never fails.
#[derive(Default)]
pub struct CatalogBuilder {
    entries: Vec<Entry>,
}

impl CatalogBuilder {
    /// Registers a country; its regional-indicator flag is added automatically.
    #[must_use]
    pub fn country(mut self, code: &str, name: &str, continent: Continent) -> Self {
        self.entries.push(Entry::Country {
            code: code.to_string(),
            name: name.to_string(),
            continent,
        });
        self
    }

    /// Maps an extra flag token to an already registered country.
    #[must_use]
    pub fn flag(mut self, token: &str, code: &str) -> Self {
        self.entries.push(Entry::Flag {
            token: token.to_string(),
            code: code.to_string(),
        });
        self
    }

    #[must_use]
    pub fn keyword(mut self, keyword: &str, code: &str) -> Self {
        self.entries.push(Entry::Keyword {
            keyword: keyword.to_string(),
            code: code.to_string(),
        });
        self
    }

    #[must_use]
    pub fn build(self) -> PatternCatalog {
        let mut countries: HashMap<String, CountryDescriptor> = HashMap::new();
        let mut flags: HashMap<String, String> = HashMap::new();
        let mut keywords: Vec<(String, String)> = Vec::new();

        let (country_entries, alias_entries): (Vec<_>, Vec<_>) = self
            .entries
            .into_iter()
            .partition(|entry| matches!(entry, Entry::Country { .. }));

        for entry in country_entries {
            let Entry::Country {
                code,
                name,
                continent,
            } = entry
            else {
                continue;
            };
            let Some(descriptor) = CountryDescriptor::new(&code, &name, continent) else {
                tracing::warn!(code = %code, "skipping catalog country with invalid code");
                continue;
            };
            if countries.contains_key(&descriptor.code) {
                tracing::warn!(code = %descriptor.code, "skipping duplicate catalog country");
                continue;
            }
            flags.insert(descriptor.emoji.clone(), descriptor.code.clone());
            countries.insert(descriptor.code.clone(), descriptor);
        }

        for entry in alias_entries {
            match entry {
                Entry::Flag { token, code } => {
                    let code = code.to_ascii_uppercase();
                    if !countries.contains_key(&code) {
                        tracing::warn!(code = %code, "skipping flag alias for unknown country");
                        continue;
                    }
                    if !is_flag_token(&token) {
                        tracing::warn!(code = %code, "skipping flag alias that is not a single flag sequence");
                        continue;
                    }
                    flags.entry(token).or_insert(code);
                }
                Entry::Keyword { keyword, code } => {
                    let code = code.to_ascii_uppercase();
                    let keyword = keyword.trim().to_lowercase();
                    if keyword.is_empty() {
                        tracing::warn!(code = %code, "skipping empty keyword");
                        continue;
                    }
                    if !countries.contains_key(&code) {
                        tracing::warn!(keyword = %keyword, code = %code, "skipping keyword for unknown country");
                        continue;
                    }
                    match keywords.iter().find(|(existing, _)| *existing == keyword) {
                        Some((_, owner)) if *owner != code => {
                            tracing::warn!(
                                keyword = %keyword,
                                code = %code,
                                owner = %owner,
                                "skipping keyword already mapped to another country"
                            );
                        }
                        Some(_) => {}
                        None => keywords.push((keyword, code)),
                    }
                }
                Entry::Country { .. } => {}
            }
        }

        PatternCatalog {
            countries,
            flags,
            keywords,
        }
    }
}
