use crate::error::{ArgumentRef, ParseError};
use crate::markup::node::{Style, TextNode};

/// What a resolved tag contributes to the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    /// Inserted as-is; never re-read as markup.
    Inserting(TextNode),
    /// Markup parsed in place of the tag, with the same resolver.
    PreProcessParsed(String),
    /// Opens a styled span that lasts until the matching closing tag.
    Styling(Style),
}

impl Tag {
    /// Literal text that is immune to markup interpretation.
    pub fn text(content: impl Into<String>) -> Self {
        Tag::Inserting(TextNode::text(content))
    }

    pub fn parsed(markup: impl Into<String>) -> Self {
        Tag::PreProcessParsed(markup.into())
    }
}

/// Where a tag occurs in the template being parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSite {
    /// Lowercased tag name.
    pub name: String,
    /// The tag exactly as written, brackets included.
    pub source: String,
    /// Byte offset of the opening `<`.
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument(String);

impl Argument {
    pub fn new(value: impl Into<String>) -> Self {
        Argument(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    pub fn lower_value(&self) -> String {
        self.0.to_lowercase()
    }
}

/// The `:`-separated arguments that follow a tag name, consumed front to back.
#[derive(Debug, Clone)]
pub struct ArgumentQueue {
    arguments: Vec<Argument>,
    cursor: usize,
    site: TagSite,
}

impl ArgumentQueue {
    pub fn new(site: TagSite, arguments: Vec<String>) -> Self {
        ArgumentQueue {
            arguments: arguments.into_iter().map(Argument).collect(),
            cursor: 0,
            site,
        }
    }

    pub fn pop(&mut self) -> Option<Argument> {
        let argument = self.arguments.get(self.cursor).cloned();
        if argument.is_some() {
            self.cursor += 1;
        }
        argument
    }

    /// Pop the next argument, or fail at this tag site with `message`.
    pub fn pop_or(&mut self, message: &str) -> Result<Argument, ParseError> {
        self.pop().ok_or_else(|| ParseError::Tag {
            message: message.to_string(),
            tag: self.site.source.clone(),
            position: self.site.position,
            argument: None,
        })
    }

    pub fn peek(&self) -> Option<&Argument> {
        self.arguments.get(self.cursor)
    }

    pub fn has_next(&self) -> bool {
        self.cursor < self.arguments.len()
    }

    /// Index of the argument `pop` would return next.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

/// Parse state handed to tag functions.
#[derive(Debug, Clone)]
pub struct Context {
    site: TagSite,
    depth: usize,
}

impl Context {
    pub fn new(site: TagSite, depth: usize) -> Self {
        Context { site, depth }
    }

    pub fn site(&self) -> &TagSite {
        &self.site
    }

    /// How many parsed insertions enclose the current tag.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::Tag {
            message: message.into(),
            tag: self.site.source.clone(),
            position: self.site.position,
            argument: None,
        }
    }

    /// An error blaming the argument at `index` of this tag.
    pub fn argument_error(
        &self,
        message: impl Into<String>,
        index: usize,
        argument: &Argument,
    ) -> ParseError {
        ParseError::Tag {
            message: message.into(),
            tag: self.site.source.clone(),
            position: self.site.position,
            argument: Some(ArgumentRef {
                index,
                value: argument.value().to_string(),
            }),
        }
    }
}

/// Resolves tag names encountered by a [`TemplateEngine`](crate::markup::TemplateEngine).
pub trait TagResolver: Send + Sync {
    /// Whether this resolver claims `name`.
    fn has(&self, name: &str) -> bool;

    /// Produce the tag for `name`, or `None` to let the engine fall back to
    /// its built-in tags.
    fn resolve(
        &self,
        name: &str,
        arguments: &mut ArgumentQueue,
        ctx: &Context,
    ) -> Result<Option<Tag>, ParseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> TagSite {
        TagSite {
            name: "phrase".to_string(),
            source: "<phrase:a:b>".to_string(),
            position: 3,
        }
    }

    #[test]
    fn test_queue_pops_in_order() {
        let mut queue = ArgumentQueue::new(site(), vec!["a".to_string(), "B".to_string()]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().unwrap().value(), "a");
        assert_eq!(queue.position(), 1);
        assert_eq!(queue.peek().unwrap().lower_value(), "b");
        assert!(queue.has_next());
        queue.pop();
        assert!(!queue.has_next());
        assert!(queue.pop().is_none());
        queue.reset();
        assert_eq!(queue.position(), 0);
    }

    #[test]
    fn test_pop_or_reports_site() {
        let mut queue = ArgumentQueue::new(site(), Vec::new());
        let error = queue.pop_or("No key provided.").unwrap_err();
        assert_eq!(
            error,
            ParseError::Tag {
                message: "No key provided.".to_string(),
                tag: "<phrase:a:b>".to_string(),
                position: 3,
                argument: None,
            }
        );
    }

    #[test]
    fn test_argument_error_names_argument() {
        let ctx = Context::new(site(), 0);
        let error = ctx.argument_error("bad", 1, &Argument::new("b"));
        assert_eq!(
            error.argument(),
            Some(&ArgumentRef {
                index: 1,
                value: "b".to_string()
            })
        );
    }
}
