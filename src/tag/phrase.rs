//! The `<phrase:key:[locale]>` tag: embeds another translation in place.

use std::sync::Arc;

use tracing::debug;

use crate::error::ParseError;
use crate::locale::Locale;
use crate::markup::{ArgumentQueue, Context, Tag};
use crate::store::TranslationStore;

/// Name under which the phrase tag is registered.
pub const PHRASE_TAG_NAME: &str = "phrase";

/// Looks up a translation by key and inserts it as markup.
///
/// The locale used is, in order of precedence:
/// 1. the tag's second argument (`<phrase:manual_link:fr>`)
/// 2. the locale the tag was installed with
/// 3. the renderer's default locale
///
/// A missing translation inserts the key itself as plain text.
#[derive(Debug, Clone)]
pub struct PhraseTag {
    store: Arc<TranslationStore>,
    default_locale: Locale,
    locale: Option<Locale>,
}

impl PhraseTag {
    pub fn new(store: Arc<TranslationStore>, default_locale: Locale, locale: Option<Locale>) -> Self {
        PhraseTag {
            store,
            default_locale,
            locale,
        }
    }

    /// # Errors
    ///
    /// * no key argument: `No key provided.`
    /// * a locale argument that is not a language tag: `Invalid language tag <value>.`
    pub fn resolve(&self, arguments: &mut ArgumentQueue, ctx: &Context) -> Result<Tag, ParseError> {
        let key = arguments.pop_or("No key provided.")?;

        let explicit = match arguments.peek() {
            Some(argument) => {
                let index = arguments.position();
                let locale = Locale::parse_tag(argument.value()).map_err(|_| {
                    ctx.argument_error(
                        format!("Invalid language tag {}.", argument.value()),
                        index,
                        argument,
                    )
                })?;
                Some(locale)
            }
            None => None,
        };

        let locale = explicit
            .or_else(|| self.locale.clone())
            .unwrap_or_else(|| self.default_locale.clone());

        match self.store.lookup(key.value(), &locale) {
            Some(translation) => Ok(Tag::parsed(translation)),
            None => {
                debug!(key = key.value(), locale = %locale, "phrase inserted as key");
                Ok(Tag::text(key.value()))
            }
        }
    }
}
