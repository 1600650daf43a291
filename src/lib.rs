//! Localized rich-text messages.
//!
//! Translations are kept per locale in a [`TranslationStore`] that can be
//! reloaded while in use. A [`Renderer`] looks a message up, builds the tags
//! for that one render and hands both to a [`TemplateEngine`], which returns
//! a [`TextNode`] tree.
//!
//! # Overview
//!
//! 1. **Store** - Immutable catalog snapshots, swapped atomically on reload
//! 2. **Tags** - Per-render placeholder registries, including the `phrase`
//!    tag that embeds another translation
//! 3. **Renderer** - The facade; missing translations render as their key
//! 4. **Dispatch** - One message rendered per recipient, in the recipient's
//!    locale and with recipient-specific tags
//!
//! # Example
//!
//! ```ignore
//! use miniphrase::{Catalog, Locale, MapSource, Renderer, TranslationStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = TranslationStore::new(MapSource::fixed(Catalog::from_iter([
//!         ("en", "greeting", "Hello, <name>!"),
//!         ("en", "help", "See <phrase:manual>"),
//!         ("en", "manual", "the <bold>manual</bold>"),
//!     ])));
//!     store.reload().await?;
//!
//!     let renderer = Renderer::builder().store(store).build()?;
//!     let node = renderer.render_with("greeting", Some(&Locale::new("en")), |tags| {
//!         tags.unparsed("name", "Ada");
//!     })?;
//!     assert_eq!(node.plain_text(), "Hello, Ada!");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod locale;
pub mod markup;
pub mod renderer;
pub mod store;
pub mod tag;

pub use config::{RendererConfig, SourceFormat};
pub use dispatch::{Audience, Audiences, DispatchReport, HasLocale};
pub use error::{
    BuildError, ConfigError, DeliveryError, LocaleError, ParseError, RenderError, StoreError,
    StoreResult,
};
pub use locale::{Locale, normalize_locale};
pub use markup::{
    ArgumentQueue, Context, Decoration, MarkupEngine, NamedColor, Style, Tag, TagResolver,
    TemplateEngine, TextNode,
};
pub use renderer::{Renderer, RendererBuilder};
pub use store::{
    Catalog, EmptySource, JsonSource, MapSource, PropertiesSource, TranslationSource,
    TranslationStore,
};
pub use tag::{PHRASE_TAG_NAME, PhraseTag, TagRegistry, TagRegistryBuilder};
