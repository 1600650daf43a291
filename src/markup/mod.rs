//! Rich-text markup: the text-node tree, the tag resolution contract and the
//! default template engine.

pub mod engine;
pub mod node;
pub mod parser;
pub mod tag;

pub use engine::{DEFAULT_MAX_DEPTH, MarkupEngine, TemplateEngine};
pub use node::{Decoration, NamedColor, Style, TextNode};
pub use parser::is_valid_tag_name;
pub use tag::{Argument, ArgumentQueue, Context, Tag, TagResolver, TagSite};
