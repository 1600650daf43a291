//! Translation storage
//!
//! A [`TranslationStore`] holds one immutable [`Catalog`] snapshot at a time.
//! `reload` builds a complete new catalog from its [`TranslationSource`] and
//! swaps it in atomically, so concurrent lookups observe either the old
//! snapshot or the new one, never a mixture.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, info};

use crate::error::StoreResult;
use crate::locale::Locale;

pub mod loader;
pub mod source;

pub use loader::{JsonSource, PropertiesSource, parse_properties};
pub use source::{EmptySource, MapSource, TranslationSource};

/// Translations keyed by locale and then by message key.
///
/// e.g. translations["en"]["greeting"] = "Hello, <name>!"
///      translations["fr"]["greeting"] = "Bonjour, <name> !"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    translations: HashMap<Locale, HashMap<String, String>>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    pub fn with_message(&mut self, locale: &Locale, key: &str, message: &str) -> &mut Self {
        self.translations
            .entry(locale.clone())
            .or_default()
            .insert(key.to_owned(), message.to_owned());
        self
    }

    /// Replace every message of `locale`.
    pub fn with_messages_for_locale(
        &mut self,
        locale: Locale,
        messages: HashMap<String, String>,
    ) -> &mut Self {
        self.translations.insert(locale, messages);
        self
    }

    pub fn get(&self, key: &str, locale: &Locale) -> Option<&str> {
        self.translations
            .get(locale)
            .and_then(|messages| messages.get(key))
            .map(String::as_str)
    }

    pub fn locales(&self) -> BTreeSet<Locale> {
        self.translations.keys().cloned().collect()
    }

    /// Number of messages across all locales.
    pub fn len(&self) -> usize {
        self.translations.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L, K, V> FromIterator<(L, K, V)> for Catalog
where
    L: Into<Locale>,
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (L, K, V)>>(iter: I) -> Self {
        let mut catalog = Catalog::new();
        for (locale, key, message) in iter {
            catalog
                .translations
                .entry(locale.into())
                .or_default()
                .insert(key.into(), message.into());
        }
        catalog
    }
}

pub struct TranslationStore {
    source: Box<dyn TranslationSource>,
    snapshot: ArcSwap<Catalog>,
}

impl TranslationStore {
    /// A store over `source`. It is empty until the first [`reload`](Self::reload).
    pub fn new(source: impl TranslationSource + 'static) -> Self {
        TranslationStore {
            source: Box::new(source),
            snapshot: ArcSwap::from_pointee(Catalog::new()),
        }
    }

    /// A store that never holds any translation.
    pub fn empty() -> Self {
        TranslationStore::new(EmptySource)
    }

    /// Load or reload all translations.
    ///
    /// # Errors
    ///
    /// Whatever the source reports. The previous snapshot stays active.
    pub async fn reload(&self) -> StoreResult<()> {
        let catalog = self.source.load().await?;
        info!(
            source = self.source.source_name(),
            locales = catalog.locales().len(),
            messages = catalog.len(),
            "translations reloaded"
        );
        self.snapshot.store(Arc::new(catalog));
        Ok(())
    }

    /// Returns the translation for `key` in exactly `locale`.
    ///
    /// The store never falls back to another locale; that decision belongs
    /// to the caller.
    pub fn lookup(&self, key: &str, locale: &Locale) -> Option<String> {
        let translation = self.snapshot.load().get(key, locale).map(str::to_owned);
        if translation.is_none() {
            debug!(key, locale = %locale, "no translation");
        }
        translation
    }

    /// Returns the lines of a list translation; list members are separated
    /// by `\n`. A missing translation yields the key as the only member.
    pub fn lookup_list(&self, key: &str, locale: &Locale) -> Vec<String> {
        match self.lookup(key, locale) {
            Some(translation) => translation.split('\n').map(str::to_owned).collect(),
            None => vec![key.to_string()],
        }
    }

    pub fn locales(&self) -> BTreeSet<Locale> {
        self.snapshot.load().locales()
    }

    /// The current catalog, for several reads against one consistent view.
    pub fn snapshot(&self) -> Arc<Catalog> {
        self.snapshot.load_full()
    }

    pub fn source_name(&self) -> &str {
        self.source.source_name()
    }
}

impl std::fmt::Debug for TranslationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationStore")
            .field("source", &self.source.source_name())
            .field("messages", &self.snapshot.load().len())
            .finish()
    }
}
