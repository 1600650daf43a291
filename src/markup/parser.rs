use std::sync::LazyLock;

use regex::Regex;

use crate::markup::tag::TagSite;

static TAG_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[!?#]?[a-z0-9_-]+$").expect("tag name pattern is a valid regex")
});

/// Whether `name` may be used as a tag name (`[!?#]?[a-z0-9_-]+`).
pub fn is_valid_tag_name(name: &str) -> bool {
    TAG_NAME.is_match(name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Text(String),
    Open(TagToken),
    Close(TagSite),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TagToken {
    pub site: TagSite,
    pub arguments: Vec<String>,
}

/// Splits a template into text runs and tags.
///
/// Anything that does not form a well-formed tag stays in the text, so a
/// stray `<` never fails a parse. `\<` and `\\` escape the next character.
pub(crate) struct Tokenizer<'a> {
    source: &'a str,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Tokenizer { source }
    }

    pub fn tokenize(&self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut text = String::new();
        let mut chars = self.source.char_indices().peekable();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '\\' => match chars.peek() {
                    Some(&(_, next)) if next == '<' || next == '\\' => {
                        text.push(next);
                        chars.next();
                    }
                    _ => text.push('\\'),
                },
                '<' => match self.scan_tag(offset) {
                    Some((token, end)) => {
                        if !text.is_empty() {
                            tokens.push(Token::Text(std::mem::take(&mut text)));
                        }
                        tokens.push(token);
                        while chars.next_if(|&(next, _)| next < end).is_some() {}
                    }
                    None => text.push('<'),
                },
                _ => text.push(ch),
            }
        }

        if !text.is_empty() {
            tokens.push(Token::Text(text));
        }

        tokens
    }

    /// Try to read a tag starting at the `<` at byte `start`.
    ///
    /// Returns the token and the byte offset just past its closing `>`.
    fn scan_tag(&self, start: usize) -> Option<(Token, usize)> {
        let rest = &self.source[start + 1..];
        let mut parts: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut quote: Option<char> = None;
        let mut chars = rest.char_indices().peekable();

        while let Some((index, ch)) = chars.next() {
            if let Some(open) = quote {
                match ch {
                    '\\' if chars.peek().is_some_and(|&(_, next)| next == open || next == '\\') => {
                        if let Some((_, escaped)) = chars.next() {
                            current.push(escaped);
                        }
                    }
                    c if c == open => quote = None,
                    c => current.push(c),
                }
                continue;
            }

            match ch {
                '\'' | '"' if current.is_empty() && !parts.is_empty() => quote = Some(ch),
                ':' => parts.push(std::mem::take(&mut current)),
                '>' => {
                    parts.push(current);
                    let end = start + 1 + index + 1;
                    let token = self.build_token(&self.source[start..end], start, parts)?;
                    return Some((token, end));
                }
                '<' | '\n' => return None,
                c => current.push(c),
            }
        }

        None
    }

    fn build_token(&self, source: &str, position: usize, parts: Vec<String>) -> Option<Token> {
        let mut parts = parts.into_iter();
        let head = parts.next()?;
        let (closing, name) = match head.strip_prefix('/') {
            Some(name) => (true, name.to_lowercase()),
            None => (false, head.to_lowercase()),
        };

        if !is_valid_tag_name(&name) {
            return None;
        }

        let site = TagSite {
            name,
            source: source.to_string(),
            position,
        };

        if closing {
            Some(Token::Close(site))
        } else {
            Some(Token::Open(TagToken {
                site,
                arguments: parts.collect(),
            }))
        }
    }
}
