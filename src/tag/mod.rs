//! Placeholder tag registries
//!
//! A [`TagRegistryBuilder`] accumulates named tag definitions for a single
//! render and freezes them into a [`TagRegistry`], which the template engine
//! queries as a [`TagResolver`].
//!
//! # Example
//!
//! ```ignore
//! let mut tags = renderer.tags();
//! tags.unparsed("name", player_name)        // untrusted: inserted literally
//!     .parsed("badge", "<gold>VIP</gold>")  // trusted markup
//!     .with_phrase_tag(None);
//! let registry = tags.build()?;
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{BuildError, ParseError};
use crate::locale::Locale;
use crate::markup::{ArgumentQueue, Context, Tag, TagResolver, TextNode, is_valid_tag_name};
use crate::renderer::Renderer;
use crate::store::TranslationStore;

pub mod phrase;

pub use phrase::{PHRASE_TAG_NAME, PhraseTag};

type LazyFn = dyn Fn() -> Tag + Send + Sync;
type TagFn = dyn Fn(&mut ArgumentQueue, &Context) -> Result<Tag, ParseError> + Send + Sync;

#[derive(Clone)]
enum TagDefinition {
    Static(Tag),
    Lazy(Arc<LazyFn>),
    Function(Arc<TagFn>),
}

impl TagDefinition {
    fn resolve(&self, arguments: &mut ArgumentQueue, ctx: &Context) -> Result<Tag, ParseError> {
        match self {
            TagDefinition::Static(tag) => Ok(tag.clone()),
            TagDefinition::Lazy(supplier) => Ok(supplier()),
            TagDefinition::Function(function) => function(arguments, ctx),
        }
    }
}

#[derive(Clone)]
enum Entry {
    Named {
        name: String,
        definition: TagDefinition,
    },
    Resolver(Arc<dyn TagResolver>),
}

impl Entry {
    fn claims(&self, name: &str) -> bool {
        match self {
            Entry::Named { name: own, .. } => own == name,
            Entry::Resolver(resolver) => resolver.has(name),
        }
    }
}

/// Everything the phrase tag needs from the renderer.
#[derive(Clone)]
struct PhraseSource {
    store: Arc<TranslationStore>,
    default_locale: Locale,
}

/// An immutable set of tag definitions used by one render.
///
/// When several entries claim the same name, the one registered last wins.
#[derive(Clone, Default)]
pub struct TagRegistry {
    entries: Arc<[Entry]>,
}

impl TagRegistry {
    pub fn empty() -> Self {
        TagRegistry::default()
    }

    /// A builder without access to a translation store. Use
    /// [`Renderer::tags`] when the phrase tag is needed.
    pub fn builder() -> TagRegistryBuilder {
        TagRegistryBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names registered directly on this registry, oldest first.
    pub fn names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Named { name, .. } => Some(name.as_str()),
                Entry::Resolver(_) => None,
            })
            .collect()
    }
}

impl TagResolver for TagRegistry {
    fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.claims(name))
    }

    fn resolve(
        &self,
        name: &str,
        arguments: &mut ArgumentQueue,
        ctx: &Context,
    ) -> Result<Option<Tag>, ParseError> {
        for entry in self.entries.iter().rev() {
            match entry {
                Entry::Named {
                    name: own,
                    definition,
                } if own == name => return definition.resolve(arguments, ctx).map(Some),
                Entry::Resolver(resolver) if resolver.has(name) => {
                    if let Some(tag) = resolver.resolve(name, arguments, ctx)? {
                        return Ok(Some(tag));
                    }
                    arguments.reset();
                }
                _ => {}
            }
        }
        Ok(None)
    }
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagRegistry")
            .field("names", &self.names())
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Accumulates tag definitions; [`build`](Self::build) freezes a copy.
#[derive(Clone, Default)]
pub struct TagRegistryBuilder {
    entries: Vec<Entry>,
    phrase: Option<PhraseSource>,
    invalid: Option<BuildError>,
}

impl TagRegistryBuilder {
    pub fn new() -> Self {
        TagRegistryBuilder::default()
    }

    /// A builder whose phrase tag reads from `renderer`'s store.
    pub fn for_renderer(renderer: &Renderer) -> Self {
        TagRegistryBuilder {
            phrase: Some(PhraseSource {
                store: Arc::clone(renderer.store()),
                default_locale: renderer.default_locale().clone(),
            }),
            ..TagRegistryBuilder::default()
        }
    }

    /// Adds an unparsed placeholder: `value` is inserted literally and is
    /// never interpreted as markup. Use this for untrusted input.
    pub fn unparsed(&mut self, name: &str, value: impl fmt::Display) -> &mut Self {
        self.tag(name, Tag::text(value.to_string()))
    }

    /// Adds a parsed placeholder: `value` is parsed as markup in place of
    /// the tag.
    pub fn parsed(&mut self, name: &str, value: impl fmt::Display) -> &mut Self {
        self.tag(name, Tag::parsed(value.to_string()))
    }

    /// Adds an unparsed placeholder computed only if the template uses it.
    pub fn unparsed_lazy<F>(&mut self, name: &str, supplier: F) -> &mut Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.define(name, TagDefinition::Lazy(Arc::new(move || Tag::text(supplier()))))
    }

    /// Adds a parsed placeholder computed only if the template uses it.
    pub fn parsed_lazy<F>(&mut self, name: &str, supplier: F) -> &mut Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.define(
            name,
            TagDefinition::Lazy(Arc::new(move || Tag::parsed(supplier()))),
        )
    }

    /// Adds a tag that inserts an already structured node.
    pub fn component(&mut self, name: &str, node: TextNode) -> &mut Self {
        self.tag(name, Tag::Inserting(node))
    }

    pub fn component_lazy<F>(&mut self, name: &str, supplier: F) -> &mut Self
    where
        F: Fn() -> TextNode + Send + Sync + 'static,
    {
        self.define(
            name,
            TagDefinition::Lazy(Arc::new(move || Tag::Inserting(supplier()))),
        )
    }

    pub fn tag(&mut self, name: &str, tag: Tag) -> &mut Self {
        self.define(name, TagDefinition::Static(tag))
    }

    /// Adds a tag computed from its arguments, e.g. `<dice:6>`.
    ///
    /// Errors returned by `function` fail the whole render.
    pub fn tag_fn<F>(&mut self, name: &str, function: F) -> &mut Self
    where
        F: Fn(&mut ArgumentQueue, &Context) -> Result<Tag, ParseError> + Send + Sync + 'static,
    {
        self.define(name, TagDefinition::Function(Arc::new(function)))
    }

    /// Adds a nested resolver; it takes precedence over earlier entries.
    pub fn resolver(&mut self, resolver: impl TagResolver + 'static) -> &mut Self {
        self.entries.push(Entry::Resolver(Arc::new(resolver)));
        self
    }

    /// Copies every entry of `other` into this builder, replacing earlier
    /// definitions of the same names.
    pub fn merge(&mut self, other: &TagRegistry) -> &mut Self {
        for entry in other.entries.iter() {
            if let Entry::Named { name, .. } = entry {
                self.remove_named(name);
            }
            self.entries.push(entry.clone());
        }
        self
    }

    /// Adds the `<phrase:<key>:[locale]>` tag, optionally with an overridden
    /// default locale.
    pub fn with_phrase_tag(&mut self, locale: Option<Locale>) -> &mut Self {
        match self.phrase.clone() {
            Some(source) => {
                let phrase = PhraseTag::new(source.store, source.default_locale, locale);
                self.tag_fn(PHRASE_TAG_NAME, move |arguments, ctx| {
                    phrase.resolve(arguments, ctx)
                })
            }
            None => {
                self.invalid.get_or_insert(BuildError::PhraseTagUnavailable);
                self
            }
        }
    }

    /// Freeze the current definitions.
    ///
    /// # Errors
    ///
    /// * `BuildError::InvalidTagName` - a name did not match `[!?#]?[a-z0-9_-]+`
    /// * `BuildError::PhraseTagUnavailable` - the phrase tag was requested on a
    ///   builder without a renderer
    pub fn build(&self) -> Result<TagRegistry, BuildError> {
        if let Some(error) = &self.invalid {
            return Err(error.clone());
        }
        Ok(TagRegistry {
            entries: self.entries.clone().into(),
        })
    }

    fn define(&mut self, name: &str, definition: TagDefinition) -> &mut Self {
        if !is_valid_tag_name(name) {
            debug!(name, "rejected invalid tag name");
            self.invalid
                .get_or_insert_with(|| BuildError::InvalidTagName(name.to_string()));
            return self;
        }
        self.remove_named(name);
        self.entries.push(Entry::Named {
            name: name.to_string(),
            definition,
        });
        self
    }

    fn remove_named(&mut self, name: &str) {
        self.entries
            .retain(|entry| !matches!(entry, Entry::Named { name: own, .. } if own == name));
    }
}

impl fmt::Debug for TagRegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagRegistryBuilder")
            .field("entries", &self.entries.len())
            .field("phrase", &self.phrase.is_some())
            .field("invalid", &self.invalid)
            .finish()
    }
}
