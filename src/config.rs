//! Renderer configuration from a JSON file and `MINIPHRASE_*` environment
//! variables.
//!
//! # Example
//!
//! ```ignore
//! let config = RendererConfig::from_json_file("miniphrase.json")?.with_env()?;
//! let renderer = config.renderer()?;
//! renderer.store().reload().await?;
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, ConfigError};
use crate::markup::{DEFAULT_MAX_DEPTH, MarkupEngine};
use crate::renderer::{DEFAULT_LOCALE, Renderer};
use crate::store::{JsonSource, PropertiesSource, TranslationStore};

pub const ENV_DEFAULT_LOCALE: &str = "MINIPHRASE_DEFAULT_LOCALE";
pub const ENV_TRANSLATIONS: &str = "MINIPHRASE_TRANSLATIONS";
pub const ENV_FORMAT: &str = "MINIPHRASE_FORMAT";
pub const ENV_INCLUDE_PHRASE_TAG: &str = "MINIPHRASE_INCLUDE_PHRASE_TAG";
pub const ENV_FALLBACK_TO_DEFAULT_LOCALE: &str = "MINIPHRASE_FALLBACK_TO_DEFAULT_LOCALE";
pub const ENV_MAX_DEPTH: &str = "MINIPHRASE_MAX_DEPTH";

/// On-disk layout of a translations directory.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// One `<locale>.properties` file per locale
    #[default]
    Properties,
    /// One `<locale>.json` file per locale
    Json,
}

impl SourceFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Properties => "properties",
            SourceFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for SourceFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "properties" => Ok(SourceFormat::Properties),
            "json" => Ok(SourceFormat::Json),
            other => Err(format!("Unknown translation format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub default_locale: String,
    pub include_phrase_tag: bool,
    pub fallback_to_default_locale: bool,
    pub max_depth: usize,
    /// Translations directory; no translations are loaded when unset.
    pub translations: Option<PathBuf>,
    pub format: SourceFormat,
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            default_locale: DEFAULT_LOCALE.to_string(),
            include_phrase_tag: true,
            fallback_to_default_locale: false,
            max_depth: DEFAULT_MAX_DEPTH,
            translations: None,
            format: SourceFormat::default(),
        }
    }
}

impl RendererConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults overridden by `MINIPHRASE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        RendererConfig::default().with_env()
    }

    /// This config overridden by `MINIPHRASE_*` environment variables.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// * `ConfigError::InvalidValue` - a boolean, number or format could not
    ///   be read
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(locale) = lookup(ENV_DEFAULT_LOCALE) {
            self.default_locale = locale;
        }
        if let Some(dir) = lookup(ENV_TRANSLATIONS) {
            self.translations = Some(PathBuf::from(dir));
        }
        if let Some(format) = lookup(ENV_FORMAT) {
            self.format = format.parse().map_err(|_| invalid(ENV_FORMAT, &format))?;
        }
        if let Some(value) = lookup(ENV_INCLUDE_PHRASE_TAG) {
            self.include_phrase_tag = parse_bool(ENV_INCLUDE_PHRASE_TAG, &value)?;
        }
        if let Some(value) = lookup(ENV_FALLBACK_TO_DEFAULT_LOCALE) {
            self.fallback_to_default_locale = parse_bool(ENV_FALLBACK_TO_DEFAULT_LOCALE, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_DEPTH) {
            self.max_depth = value
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_MAX_DEPTH, &value))?;
        }
        Ok(self)
    }

    /// A store over the configured directory. It is empty until reloaded.
    pub fn store(&self) -> TranslationStore {
        match (&self.translations, self.format) {
            (None, _) => TranslationStore::empty(),
            (Some(dir), SourceFormat::Properties) => {
                TranslationStore::new(PropertiesSource::new(dir))
            }
            (Some(dir), SourceFormat::Json) => TranslationStore::new(JsonSource::new(dir)),
        }
    }

    /// A renderer over a fresh, not yet loaded [`store`](Self::store).
    pub fn renderer(&self) -> Result<Renderer, BuildError> {
        Renderer::builder()
            .store(self.store())
            .engine(MarkupEngine::with_max_depth(self.max_depth))
            .default_locale(self.default_locale.as_str())
            .include_phrase_tag(self.include_phrase_tag)
            .fallback_to_default_locale(self.fallback_to_default_locale)
            .build()
    }
}

fn invalid(variable: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        variable: variable.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(variable: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(variable, value)),
    }
}
