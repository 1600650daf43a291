use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decoration {
    Bold,
    Italic,
    Underlined,
    Strikethrough,
    Obfuscated,
}

impl Decoration {
    /// Look up a decoration by tag name or one of its short aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bold" | "b" => Some(Decoration::Bold),
            "italic" | "i" | "em" => Some(Decoration::Italic),
            "underlined" | "u" => Some(Decoration::Underlined),
            "strikethrough" | "st" => Some(Decoration::Strikethrough),
            "obfuscated" | "obf" => Some(Decoration::Obfuscated),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Decoration::Bold => "bold",
            Decoration::Italic => "italic",
            Decoration::Underlined => "underlined",
            Decoration::Strikethrough => "strikethrough",
            Decoration::Obfuscated => "obfuscated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedColor {
    Black,
    DarkBlue,
    DarkGreen,
    DarkAqua,
    DarkRed,
    DarkPurple,
    Gold,
    Gray,
    DarkGray,
    Blue,
    Green,
    Aqua,
    Red,
    LightPurple,
    Yellow,
    White,
}

impl NamedColor {
    pub const ALL: [NamedColor; 16] = [
        NamedColor::Black,
        NamedColor::DarkBlue,
        NamedColor::DarkGreen,
        NamedColor::DarkAqua,
        NamedColor::DarkRed,
        NamedColor::DarkPurple,
        NamedColor::Gold,
        NamedColor::Gray,
        NamedColor::DarkGray,
        NamedColor::Blue,
        NamedColor::Green,
        NamedColor::Aqua,
        NamedColor::Red,
        NamedColor::LightPurple,
        NamedColor::Yellow,
        NamedColor::White,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NamedColor::Black => "black",
            NamedColor::DarkBlue => "dark_blue",
            NamedColor::DarkGreen => "dark_green",
            NamedColor::DarkAqua => "dark_aqua",
            NamedColor::DarkRed => "dark_red",
            NamedColor::DarkPurple => "dark_purple",
            NamedColor::Gold => "gold",
            NamedColor::Gray => "gray",
            NamedColor::DarkGray => "dark_gray",
            NamedColor::Blue => "blue",
            NamedColor::Green => "green",
            NamedColor::Aqua => "aqua",
            NamedColor::Red => "red",
            NamedColor::LightPurple => "light_purple",
            NamedColor::Yellow => "yellow",
            NamedColor::White => "white",
        }
    }

    /// Accepts both `gray` and `grey` spellings.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase().replace("grey", "gray");
        NamedColor::ALL.into_iter().find(|color| color.name() == name)
    }
}

/// Visual attributes of a [`TextNode`]. Children inherit them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<NamedColor>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub decorations: BTreeSet<Decoration>,
}

impl Style {
    pub fn color(color: NamedColor) -> Self {
        Style {
            color: Some(color),
            decorations: BTreeSet::new(),
        }
    }

    pub fn decorated(decoration: Decoration) -> Self {
        Style {
            color: None,
            decorations: BTreeSet::from([decoration]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.decorations.is_empty()
    }
}

/// A node of rendered rich text.
///
/// A node's own `content` comes first, followed by its children in order.
/// Children inherit the node's style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextNode {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Style::is_empty")]
    pub style: Style,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TextNode>,
}

impl TextNode {
    /// An unstyled node holding `content` verbatim.
    pub fn text(content: impl Into<String>) -> Self {
        TextNode {
            content: content.into(),
            style: Style::default(),
            children: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        TextNode::default()
    }

    pub fn styled(style: Style, children: Vec<TextNode>) -> Self {
        TextNode {
            content: String::new(),
            style,
            children,
        }
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn push(&mut self, child: TextNode) -> &mut Self {
        self.children.push(child);
        self
    }

    /// All text of this node and its descendants, styles dropped.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.write_plain_text(&mut out);
        out
    }

    fn write_plain_text(&self, out: &mut String) {
        out.push_str(&self.content);
        for child in &self.children {
            child.write_plain_text(out);
        }
    }

    /// True for an unstyled node without children.
    pub fn is_plain(&self) -> bool {
        self.style.is_empty() && self.children.is_empty()
    }

    /// Collapse the tree into its smallest equivalent shape.
    ///
    /// Empty plain children are dropped, adjacent plain children are joined,
    /// a leading plain child moves into empty `content`, and a wrapper with a
    /// single child is folded into it when one of the two is unstyled.
    pub fn compact(self) -> TextNode {
        let TextNode {
            mut content,
            style,
            children,
        } = self;

        let mut merged: Vec<TextNode> = Vec::with_capacity(children.len());
        for child in children.into_iter().map(TextNode::compact) {
            if child.is_plain() && child.content.is_empty() {
                continue;
            }
            match merged.last_mut() {
                Some(last) if last.is_plain() && child.is_plain() => {
                    last.content.push_str(&child.content);
                }
                _ => merged.push(child),
            }
        }

        if content.is_empty() && merged.first().is_some_and(TextNode::is_plain) {
            content = merged.remove(0).content;
        }

        if content.is_empty() && merged.len() == 1 {
            if style.is_empty() {
                return merged.remove(0);
            }
            if merged[0].style.is_empty() {
                let only = merged.remove(0);
                return TextNode {
                    content: only.content,
                    style,
                    children: only.children,
                };
            }
        }

        TextNode {
            content,
            style,
            children: merged,
        }
    }
}

impl From<&str> for TextNode {
    fn from(content: &str) -> Self {
        TextNode::text(content)
    }
}

impl From<String> for TextNode {
    fn from(content: String) -> Self {
        TextNode::text(content)
    }
}
