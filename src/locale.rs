//! Canonical locale identifiers
//!
//! Every locale the library handles is stored in one canonical form:
//! lowercase, with `_` separating subtags (`en-US` → `en_us`). Translation
//! files, render requests and phrase-tag arguments all go through the same
//! normalization, so lookups never depend on how a caller spelled a locale.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LocaleError;

/// A normalized locale identifier such as `en` or `en_us`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    /// Normalize any string into a locale without validating it.
    ///
    /// Normalization is total and deterministic: surrounding whitespace is
    /// trimmed, ASCII letters are lowercased and `-` becomes `_`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// assert_eq!(Locale::new("en-US").as_str(), "en_us");
    /// assert_eq!(Locale::new(" FR ").as_str(), "fr");
    /// ```
    pub fn new(locale: &str) -> Self {
        Locale(normalize_locale(locale))
    }

    /// Parse a BCP 47 language tag, rejecting anything that is not one.
    ///
    /// Both `-` and `_` are accepted as subtag separators. The result is in
    /// canonical form.
    ///
    /// # Errors
    ///
    /// * `LocaleError::Empty` - the input is empty or whitespace
    /// * `LocaleError::Invalid` - the input is not a well-formed language tag
    pub fn parse_tag(tag: &str) -> Result<Self, LocaleError> {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(LocaleError::Empty);
        }

        let candidate = trimmed.replace('_', "-");
        let parsed: icu_locale::Locale = candidate.parse().map_err(|e| LocaleError::Invalid {
            tag: tag.to_string(),
            reason: format!("{:?}", e),
        })?;

        Ok(Locale::new(&parsed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The primary language subtag (`en_us` → `en`).
    pub fn language(&self) -> &str {
        self.0.split('_').next().unwrap_or(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Lowercase a locale string and use `_` between subtags.
pub fn normalize_locale(locale: &str) -> String {
    locale.trim().to_lowercase().replace('-', "_")
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Locale {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::parse_tag(s)
    }
}

impl From<&str> for Locale {
    fn from(locale: &str) -> Self {
        Locale::new(locale)
    }
}

impl From<String> for Locale {
    fn from(locale: String) -> Self {
        Locale::new(&locale)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.0
    }
}

impl AsRef<str> for Locale {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
