use std::collections::BTreeMap;

use regex_lite::Regex;

use crate::error::BridgeError;

/// URL patterns the gateway can fetch itself, keyed by MIME pattern.
///
/// A key is either a full media type (`application/pdf`) or a wildcard on
/// the subtype (`image/*`, `*/*`).
#[derive(Debug, Clone)]
pub struct SupportedUrls {
    entries: BTreeMap<String, Vec<Regex>>,
}

impl SupportedUrls {
    /// Compile a pattern table.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] when a pattern is not a valid regex.
    pub fn from_patterns(patterns: &BTreeMap<String, Vec<String>>) -> Result<Self, BridgeError> {
        let mut entries = BTreeMap::new();
        for (media_type, sources) in patterns {
            let compiled = sources
                .iter()
                .map(|source| {
                    Regex::new(source).map_err(|err| {
                        BridgeError::Config(format!(
                            "invalid URL pattern for {media_type}: {err}"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            entries.insert(media_type.to_ascii_lowercase(), compiled);
        }
        Ok(Self { entries })
    }

    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, Vec<Regex>> {
        &self.entries
    }

    /// Patterns registered for exactly this MIME key.
    #[must_use]
    pub fn patterns(&self, media_type: &str) -> &[Regex] {
        self.entries
            .get(&media_type.to_ascii_lowercase())
            .map_or(&[], Vec::as_slice)
    }

    /// Whether `url` matches a pattern under any key covering `media_type`.
    #[must_use]
    pub fn is_supported(&self, media_type: &str, url: &url::Url) -> bool {
        let media_type = media_type.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(|(key, _)| mime_matches(key, &media_type))
            .flat_map(|(_, patterns)| patterns)
            .any(|pattern| pattern.is_match(url.as_str()))
    }
}

impl Default for SupportedUrls {
    fn default() -> Self {
        let patterns = crate::config::default_supported_urls();
        Self::from_patterns(&patterns).unwrap_or_else(|_| Self {
            entries: BTreeMap::new(),
        })
    }
}

fn mime_matches(key: &str, media_type: &str) -> bool {
    if key == "*/*" || key == media_type {
        return true;
    }
    match key.strip_suffix("/*") {
        Some(top) => media_type
            .split_once('/')
            .is_some_and(|(media_top, _)| media_top == top),
        None => false,
    }
}
