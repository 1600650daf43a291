use tracing::debug;

use crate::error::ParseError;
use crate::markup::node::{Decoration, NamedColor, Style, TextNode};
use crate::markup::parser::{TagToken, Token, Tokenizer};
use crate::markup::tag::{ArgumentQueue, Context, Tag, TagResolver, TagSite};

/// Turns a template string plus a tag resolver into rich text.
///
/// The renderer only depends on this trait; [`MarkupEngine`] is the
/// implementation used by default.
pub trait TemplateEngine: Send + Sync {
    fn parse(&self, template: &str, resolver: &dyn TagResolver) -> Result<TextNode, ParseError>;
}

pub const DEFAULT_MAX_DEPTH: usize = 16;

/// A small angle-bracket markup language.
///
/// * `<name>` and `<name:arg1:'arg 2'>` are looked up in the resolver first.
/// * Unclaimed names fall back to the style tags: `bold`/`b`, `italic`/`i`/`em`,
///   `underlined`/`u`, `strikethrough`/`st`, `obfuscated`/`obf`,
///   `color:<name>` (also `colour`, `c`), a bare colour name such as `<red>`,
///   and `reset`.
/// * `</name>` closes the innermost open span of that name.
/// * Unknown tags and unmatched closing tags are kept as literal text.
///
/// Parsed insertions ([`Tag::PreProcessParsed`]) are parsed recursively and
/// may nest at most `max_depth` levels deep.
#[derive(Debug, Clone)]
pub struct MarkupEngine {
    max_depth: usize,
}

impl Default for MarkupEngine {
    fn default() -> Self {
        MarkupEngine {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

struct Frame {
    name: Option<String>,
    style: Style,
    children: Vec<TextNode>,
}

impl Frame {
    fn root() -> Self {
        Frame {
            name: None,
            style: Style::default(),
            children: Vec::new(),
        }
    }

    fn into_node(self) -> TextNode {
        TextNode::styled(self.style, self.children)
    }
}

impl MarkupEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        MarkupEngine { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn parse_nodes(
        &self,
        template: &str,
        resolver: &dyn TagResolver,
        depth: usize,
    ) -> Result<Vec<TextNode>, ParseError> {
        let mut stack = vec![Frame::root()];

        for token in Tokenizer::new(template).tokenize() {
            match token {
                Token::Text(text) => current(&mut stack).push(TextNode::text(text)),
                Token::Open(tag) => self.open_tag(tag, resolver, depth, &mut stack)?,
                Token::Close(site) => close_tag(&site, &mut stack),
            }
        }

        while stack.len() > 1 {
            fold_top(&mut stack);
        }

        Ok(stack.pop().map(|root| root.children).unwrap_or_default())
    }

    fn open_tag(
        &self,
        tag: TagToken,
        resolver: &dyn TagResolver,
        depth: usize,
        stack: &mut Vec<Frame>,
    ) -> Result<(), ParseError> {
        let TagToken { site, arguments } = tag;
        let mut queue = ArgumentQueue::new(site.clone(), arguments.clone());
        let ctx = Context::new(site.clone(), depth);

        let resolved = if resolver.has(&site.name) {
            resolver.resolve(&site.name, &mut queue, &ctx)?
        } else {
            None
        };

        let resolved = match resolved {
            Some(tag) => Some(tag),
            None if site.name == "reset" => {
                while stack.len() > 1 {
                    fold_top(stack);
                }
                return Ok(());
            }
            None => builtin_style(&site.name, &arguments),
        };

        match resolved {
            None => {
                debug!(tag = %site.source, "unknown tag kept as text");
                current(stack).push(TextNode::text(site.source));
            }
            Some(Tag::Inserting(node)) => current(stack).push(node),
            Some(Tag::PreProcessParsed(markup)) => {
                if depth + 1 > self.max_depth {
                    return Err(ParseError::DepthExceeded {
                        limit: self.max_depth,
                        tag: site.source,
                        position: site.position,
                    });
                }
                let nodes = self.parse_nodes(&markup, resolver, depth + 1)?;
                current(stack).extend(nodes);
            }
            Some(Tag::Styling(style)) => stack.push(Frame {
                name: Some(canonical_name(&site.name).to_string()),
                style,
                children: Vec::new(),
            }),
        }

        Ok(())
    }
}

impl TemplateEngine for MarkupEngine {
    fn parse(&self, template: &str, resolver: &dyn TagResolver) -> Result<TextNode, ParseError> {
        let children = self.parse_nodes(template, resolver, 0)?;
        Ok(TextNode::styled(Style::default(), children).compact())
    }
}

fn current(stack: &mut [Frame]) -> &mut Vec<TextNode> {
    // The root frame is never popped while tokens remain.
    let last = stack.len() - 1;
    &mut stack[last].children
}

fn fold_top(stack: &mut Vec<Frame>) {
    if let Some(frame) = stack.pop() {
        current(stack).push(frame.into_node());
    }
}

fn close_tag(site: &TagSite, stack: &mut Vec<Frame>) {
    let name = canonical_name(&site.name);
    let open = stack
        .iter()
        .rposition(|frame| frame.name.as_deref() == Some(name));

    match open {
        Some(index) if index > 0 => {
            while stack.len() > index {
                fold_top(stack);
            }
        }
        _ => current(stack).push(TextNode::text(site.source.clone())),
    }
}

/// Aliases close the span opened by any spelling of the same tag.
fn canonical_name(name: &str) -> &str {
    match name {
        "colour" | "c" => "color",
        other => Decoration::from_name(other)
            .map(|decoration| decoration.name())
            .unwrap_or(other),
    }
}

fn builtin_style(name: &str, arguments: &[String]) -> Option<Tag> {
    if let Some(decoration) = Decoration::from_name(name) {
        return Some(Tag::Styling(Style::decorated(decoration)));
    }

    match name {
        "color" | "colour" | "c" => arguments
            .first()
            .and_then(|color| NamedColor::from_name(color))
            .map(|color| Tag::Styling(Style::color(color))),
        other => NamedColor::from_name(other).map(|color| Tag::Styling(Style::color(color))),
    }
}
