//! The renderer facade: key + locale + tags in, rich text out.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{BuildError, RenderError};
use crate::locale::Locale;
use crate::markup::{MarkupEngine, TemplateEngine, TextNode};
use crate::store::TranslationStore;
use crate::tag::{TagRegistry, TagRegistryBuilder};

/// Locale used when none is configured.
pub const DEFAULT_LOCALE: &str = "en";

/// Looks translations up and renders them through a template engine.
///
/// Cloning is cheap; clones share the store and the engine.
///
/// # Example
///
/// ```ignore
/// let renderer = Renderer::builder()
///     .store(store)
///     .default_locale("en")
///     .build()?;
///
/// let greeting = renderer.render_with("greeting", Some(&Locale::new("fr")), |tags| {
///     tags.unparsed("name", "Ada");
/// })?;
/// ```
#[derive(Clone)]
pub struct Renderer {
    store: Arc<TranslationStore>,
    engine: Arc<dyn TemplateEngine>,
    default_locale: Locale,
    include_phrase_tag: bool,
    fallback_to_default_locale: bool,
}

impl Renderer {
    pub fn builder() -> RendererBuilder {
        RendererBuilder::default()
    }

    /// A renderer over `store` with every other setting at its default.
    pub fn from_store(store: Arc<TranslationStore>) -> Self {
        Renderer {
            store,
            engine: Arc::new(MarkupEngine::default()),
            default_locale: Locale::new(DEFAULT_LOCALE),
            include_phrase_tag: true,
            fallback_to_default_locale: false,
        }
    }

    pub fn store(&self) -> &Arc<TranslationStore> {
        &self.store
    }

    pub fn engine(&self) -> &dyn TemplateEngine {
        self.engine.as_ref()
    }

    pub fn default_locale(&self) -> &Locale {
        &self.default_locale
    }

    pub fn include_phrase_tag(&self) -> bool {
        self.include_phrase_tag
    }

    pub fn fallback_to_default_locale(&self) -> bool {
        self.fallback_to_default_locale
    }

    /// A fresh tag builder whose phrase tag reads from this renderer's store.
    pub fn tags(&self) -> TagRegistryBuilder {
        TagRegistryBuilder::for_renderer(self)
    }

    /// `locale`, or the default locale when none is given.
    pub fn target_locale(&self, locale: Option<&Locale>) -> Locale {
        locale.cloned().unwrap_or_else(|| self.default_locale.clone())
    }

    /// The raw template for `key`, honouring `fallback_to_default_locale`.
    pub fn translation(&self, key: &str, locale: &Locale) -> Option<String> {
        if self.fallback_to_default_locale {
            self.translation_or_default(key, locale)
        } else {
            self.store.lookup(key, locale)
        }
    }

    /// The raw template for `key` in `locale`, or else in the default locale.
    pub fn translation_or_default(&self, key: &str, locale: &Locale) -> Option<String> {
        self.store.lookup(key, locale).or_else(|| {
            if locale == &self.default_locale {
                return None;
            }
            debug!(key, locale = %locale, fallback = %self.default_locale, "falling back to default locale");
            self.store.lookup(key, &self.default_locale)
        })
    }

    /// Render `key` without caller tags.
    ///
    /// A missing translation renders as the key itself, as plain text.
    pub fn render(&self, key: &str, locale: Option<&Locale>) -> Result<TextNode, RenderError> {
        self.render_with(key, locale, |_| {})
    }

    /// Render `key` with the tags `configure` registers.
    ///
    /// # Arguments
    ///
    /// * `key` - Message key
    /// * `locale` - Target locale; the default locale when `None`
    /// * `configure` - Registers placeholders; runs after the phrase tag is
    ///   installed, so it may replace it
    ///
    /// # Returns
    ///
    /// * `Ok(TextNode)` - The rendered message, or the key as plain text if
    ///   there is no translation
    /// * `Err(RenderError)` - A tag failed to resolve or a tag name is invalid
    pub fn render_with<F>(
        &self,
        key: &str,
        locale: Option<&Locale>,
        configure: F,
    ) -> Result<TextNode, RenderError>
    where
        F: FnOnce(&mut TagRegistryBuilder),
    {
        Ok(self
            .render_or_none_with(key, locale, configure)?
            .unwrap_or_else(|| TextNode::text(key)))
    }

    /// Like [`render`](Self::render), but `None` when there is no translation.
    pub fn render_or_none(
        &self,
        key: &str,
        locale: Option<&Locale>,
    ) -> Result<Option<TextNode>, RenderError> {
        self.render_or_none_with(key, locale, |_| {})
    }

    pub fn render_or_none_with<F>(
        &self,
        key: &str,
        locale: Option<&Locale>,
        configure: F,
    ) -> Result<Option<TextNode>, RenderError>
    where
        F: FnOnce(&mut TagRegistryBuilder),
    {
        let target = self.target_locale(locale);
        let Some(template) = self.translation(key, &target) else {
            return Ok(None);
        };
        let registry = self.registry(&target, configure)?;
        Ok(Some(self.engine.parse(&template, &registry)?))
    }

    /// Render every line of a list translation. A missing translation
    /// yields the key as the only line.
    pub fn render_lines(
        &self,
        key: &str,
        locale: Option<&Locale>,
    ) -> Result<Vec<TextNode>, RenderError> {
        self.render_lines_with(key, locale, |_| {})
    }

    pub fn render_lines_with<F>(
        &self,
        key: &str,
        locale: Option<&Locale>,
        configure: F,
    ) -> Result<Vec<TextNode>, RenderError>
    where
        F: FnOnce(&mut TagRegistryBuilder),
    {
        let target = self.target_locale(locale);
        let Some(template) = self.translation(key, &target) else {
            return Ok(vec![TextNode::text(key)]);
        };
        let registry = self.registry(&target, configure)?;
        template
            .split('\n')
            .map(|line| self.engine.parse(line, &registry).map_err(RenderError::from))
            .collect()
    }

    fn registry<F>(&self, target: &Locale, configure: F) -> Result<TagRegistry, BuildError>
    where
        F: FnOnce(&mut TagRegistryBuilder),
    {
        let mut tags = self.tags();
        if self.include_phrase_tag {
            tags.with_phrase_tag(Some(target.clone()));
        }
        configure(&mut tags);
        tags.build()
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("store", &self.store)
            .field("default_locale", &self.default_locale)
            .field("include_phrase_tag", &self.include_phrase_tag)
            .field("fallback_to_default_locale", &self.fallback_to_default_locale)
            .finish_non_exhaustive()
    }
}

/// Fluent configuration for a [`Renderer`].
#[derive(Clone)]
pub struct RendererBuilder {
    store: Option<Arc<TranslationStore>>,
    engine: Option<Arc<dyn TemplateEngine>>,
    default_locale: Locale,
    include_phrase_tag: bool,
    fallback_to_default_locale: bool,
}

impl Default for RendererBuilder {
    fn default() -> Self {
        RendererBuilder {
            store: None,
            engine: None,
            default_locale: Locale::new(DEFAULT_LOCALE),
            include_phrase_tag: true,
            fallback_to_default_locale: false,
        }
    }
}

impl RendererBuilder {
    /// Defaults to an empty store.
    pub fn store(&mut self, store: impl Into<Arc<TranslationStore>>) -> &mut Self {
        self.store = Some(store.into());
        self
    }

    /// Defaults to [`MarkupEngine`].
    pub fn engine(&mut self, engine: impl TemplateEngine + 'static) -> &mut Self {
        self.engine = Some(Arc::new(engine));
        self
    }

    pub fn default_locale(&mut self, locale: impl Into<Locale>) -> &mut Self {
        self.default_locale = locale.into();
        self
    }

    /// Whether every render gets the phrase tag. Defaults to `true`.
    pub fn include_phrase_tag(&mut self, include: bool) -> &mut Self {
        self.include_phrase_tag = include;
        self
    }

    /// Whether a translation missing in the target locale is looked up in
    /// the default locale before falling back to the key. Defaults to `false`.
    pub fn fallback_to_default_locale(&mut self, fallback: bool) -> &mut Self {
        self.fallback_to_default_locale = fallback;
        self
    }

    /// # Errors
    ///
    /// * `BuildError::EmptyDefaultLocale` - the default locale is empty
    pub fn build(&self) -> Result<Renderer, BuildError> {
        if self.default_locale.is_empty() {
            return Err(BuildError::EmptyDefaultLocale);
        }
        Ok(Renderer {
            store: self
                .store
                .clone()
                .unwrap_or_else(|| Arc::new(TranslationStore::empty())),
            engine: self
                .engine
                .clone()
                .unwrap_or_else(|| Arc::new(MarkupEngine::default())),
            default_locale: self.default_locale.clone(),
            include_phrase_tag: self.include_phrase_tag,
            fallback_to_default_locale: self.fallback_to_default_locale,
        })
    }
}

impl fmt::Debug for RendererBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererBuilder")
            .field("store", &self.store)
            .field("engine", &self.engine.is_some())
            .field("default_locale", &self.default_locale)
            .field("include_phrase_tag", &self.include_phrase_tag)
            .field("fallback_to_default_locale", &self.fallback_to_default_locale)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::markup::{Decoration, Style, Tag};
    use crate::store::{Catalog, MapSource};
    use pretty_assertions::assert_eq;

    async fn renderer() -> Renderer {
        let store = TranslationStore::new(MapSource::fixed(Catalog::from_iter([
            ("en", "greeting", "Hello, <name>!"),
            ("en", "a", "See <phrase:b>"),
            ("en", "b", "the manual"),
            ("en", "only_en", "English only"),
            ("en", "rules", "1. <bold>Be nice</bold>\n2. Have fun, <name>"),
            ("fr", "greeting", "Bonjour, <name> !"),
            ("fr", "b", "le manuel"),
            ("fr", "a", "Voir <phrase:b>"),
        ])));
        store.reload().await.unwrap();
        Renderer::builder().store(store).build().unwrap()
    }

    #[tokio::test]
    async fn test_greeting() {
        let renderer = renderer().await;
        let node = renderer
            .render_with("greeting", Some(&Locale::new("en")), |tags| {
                tags.unparsed("name", "Ada");
            })
            .unwrap();
        assert_eq!(node, TextNode::text("Hello, Ada!"));
    }

    #[tokio::test]
    async fn test_phrase_tag() {
        let renderer = renderer().await;
        let node = renderer.render("a", Some(&Locale::new("en"))).unwrap();
        assert_eq!(node.plain_text(), "See the manual");
    }

    #[tokio::test]
    async fn test_phrase_tag_uses_target_locale() {
        let renderer = renderer().await;
        let node = renderer.render("a", Some(&Locale::new("fr"))).unwrap();
        assert_eq!(node.plain_text(), "Voir le manuel");
    }

    #[tokio::test]
    async fn test_missing_locale_renders_key() {
        let renderer = renderer().await;
        assert_eq!(
            renderer.render("x", Some(&Locale::new("fr"))).unwrap(),
            TextNode::text("x")
        );
        assert_eq!(
            renderer.render("only_en", Some(&Locale::new("fr"))).unwrap(),
            TextNode::text("only_en")
        );
        assert_eq!(
            renderer.render_or_none("x", Some(&Locale::new("fr"))).unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_never_markup() {
        let renderer = renderer().await;
        assert_eq!(
            renderer.render("<bold>oops</bold>", None).unwrap(),
            TextNode::text("<bold>oops</bold>")
        );
    }

    #[tokio::test]
    async fn test_default_locale_is_used() {
        let renderer = renderer().await;
        assert_eq!(renderer.render("b", None).unwrap().plain_text(), "the manual");
    }

    #[tokio::test]
    async fn test_fallback_to_default_locale() {
        let base = renderer().await;
        let renderer = Renderer::builder()
            .store(Arc::clone(base.store()))
            .fallback_to_default_locale(true)
            .build()
            .unwrap();
        assert_eq!(
            renderer
                .render("only_en", Some(&Locale::new("fr")))
                .unwrap()
                .plain_text(),
            "English only"
        );
        assert_eq!(
            renderer.render("x", Some(&Locale::new("fr"))).unwrap(),
            TextNode::text("x")
        );
    }

    #[tokio::test]
    async fn test_identical_renders_are_equal() {
        let renderer = renderer().await;
        let render = || {
            renderer
                .render_with("rules", None, |tags| {
                    tags.unparsed("name", "Ada");
                })
                .unwrap()
        };
        let first = render();
        assert_eq!(first, render());

        let other = renderer
            .render_with("greeting", None, |tags| {
                tags.unparsed("name", "Grace");
            })
            .unwrap();
        assert_eq!(other.plain_text(), "Hello, Grace!");
    }

    #[tokio::test]
    async fn test_caller_may_replace_phrase_tag() {
        let renderer = renderer().await;
        let node = renderer
            .render_with("a", None, |tags| {
                tags.unparsed("phrase", "nothing");
            })
            .unwrap();
        assert_eq!(node.plain_text(), "See nothing");
    }

    #[tokio::test]
    async fn test_without_phrase_tag() {
        let base = renderer().await;
        let renderer = Renderer::builder()
            .store(Arc::clone(base.store()))
            .include_phrase_tag(false)
            .build()
            .unwrap();
        assert_eq!(
            renderer.render("a", None).unwrap().plain_text(),
            "See <phrase:b>"
        );
    }

    #[tokio::test]
    async fn test_render_lines() {
        let renderer = renderer().await;
        let lines = renderer
            .render_lines_with("rules", None, |tags| {
                tags.unparsed("name", "Ada");
            })
            .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].plain_text(), "1. Be nice");
        assert_eq!(lines[0].content, "1. ");
        assert_eq!(
            lines[0].children,
            vec![TextNode::text("Be nice").with_style(Style::decorated(Decoration::Bold))]
        );
        assert_eq!(lines[1].plain_text(), "2. Have fun, Ada");

        assert_eq!(
            renderer.render_lines("nope", None).unwrap(),
            vec![TextNode::text("nope")]
        );
    }

    #[tokio::test]
    async fn test_tag_errors_fail_the_render() {
        let renderer = renderer().await;
        let error = renderer
            .render_with("greeting", None, |tags| {
                tags.tag_fn("name", |_, ctx| Err(ctx.error("boom")));
            })
            .unwrap_err();
        assert!(matches!(error, RenderError::Parse(ParseError::Tag { .. })));

        let error = renderer
            .render_with("greeting", None, |tags| {
                tags.tag("Not Valid", Tag::text("x"));
            })
            .unwrap_err();
        assert_eq!(
            error,
            RenderError::Tags(BuildError::InvalidTagName("Not Valid".to_string()))
        );
    }

    #[test]
    fn test_builder_rejects_empty_locale() {
        assert_eq!(
            Renderer::builder().default_locale("  ").build().unwrap_err(),
            BuildError::EmptyDefaultLocale
        );
    }

    #[test]
    fn test_builder_defaults() {
        let renderer = Renderer::builder().build().unwrap();
        assert_eq!(renderer.default_locale().as_str(), "en");
        assert!(renderer.include_phrase_tag());
        assert!(!renderer.fallback_to_default_locale());
        assert_eq!(renderer.store().source_name(), "empty");
    }

    #[tokio::test]
    async fn test_phrase_cycle_hits_depth_limit() {
        let store = TranslationStore::new(MapSource::fixed(Catalog::from_iter([
            ("en", "a", "<phrase:b>"),
            ("en", "b", "<phrase:a>"),
        ])));
        store.reload().await.unwrap();
        let renderer = Renderer::builder()
            .store(store)
            .engine(MarkupEngine::with_max_depth(4))
            .build()
            .unwrap();

        let result = renderer.render("a", None);
        assert!(matches!(
            result,
            Err(RenderError::Parse(ParseError::DepthExceeded { limit: 4, .. }))
        ));
        assert!(matches!(
            Renderer::from_store(renderer.store().clone()).render("b", None),
            Err(RenderError::Parse(ParseError::DepthExceeded { .. }))
        ));
    }
}
