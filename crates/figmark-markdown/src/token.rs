//! Token stream data model.
//!
//! A parsed document is a flat list of block tokens with explicit open/close
//! markers. Inline content of a block lives in the `children` of a single
//! [`TokenKind::Inline`] token.

/// Token type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    ParagraphOpen,
    ParagraphClose,
    HeadingOpen,
    HeadingClose,
    BlockquoteOpen,
    BlockquoteClose,
    BulletListOpen,
    BulletListClose,
    OrderedListOpen,
    OrderedListClose,
    ListItemOpen,
    ListItemClose,
    TableOpen,
    TableClose,
    TheadOpen,
    TheadClose,
    TbodyOpen,
    TbodyClose,
    TrOpen,
    TrClose,
    ThOpen,
    ThClose,
    TdOpen,
    TdClose,
    /// Fenced code block; language in `info`, code in `content`.
    Fence,
    /// Indented code block.
    CodeBlock,
    HtmlBlock,
    Hr,
    /// Container for the inline children of a block.
    Inline,
    Text,
    Softbreak,
    Hardbreak,
    CodeInline,
    HtmlInline,
    EmOpen,
    EmClose,
    StrongOpen,
    StrongClose,
    StrikethroughOpen,
    StrikethroughClose,
    LinkOpen,
    LinkClose,
    /// Image; alt text tokens in `children`, raw alt source in `content`.
    Image,
    /// Task list checkbox.
    Checkbox,
    FigureOpen,
    FigureClose,
    FigcaptionOpen,
    FigcaptionClose,
}

impl TokenKind {
    /// Returns the opener kind that pairs with this closing kind.
    #[must_use]
    pub fn opener(self) -> Option<Self> {
        let open = match self {
            Self::ParagraphClose => Self::ParagraphOpen,
            Self::HeadingClose => Self::HeadingOpen,
            Self::BlockquoteClose => Self::BlockquoteOpen,
            Self::BulletListClose => Self::BulletListOpen,
            Self::OrderedListClose => Self::OrderedListOpen,
            Self::ListItemClose => Self::ListItemOpen,
            Self::TableClose => Self::TableOpen,
            Self::TheadClose => Self::TheadOpen,
            Self::TbodyClose => Self::TbodyOpen,
            Self::TrClose => Self::TrOpen,
            Self::ThClose => Self::ThOpen,
            Self::TdClose => Self::TdOpen,
            Self::EmClose => Self::EmOpen,
            Self::StrongClose => Self::StrongOpen,
            Self::StrikethroughClose => Self::StrikethroughOpen,
            Self::LinkClose => Self::LinkOpen,
            Self::FigureClose => Self::FigureOpen,
            Self::FigcaptionClose => Self::FigcaptionOpen,
            _ => return None,
        };
        Some(open)
    }
}

/// Whether a token opens, closes, or is self-contained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nesting {
    Opening,
    SelfClosing,
    Closing,
}

/// Ordered attribute list.
///
/// Attributes render in insertion order. Names are unique: [`set`](Self::set)
/// replaces an existing value in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attrs(Vec<(String, String)>);

impl Attrs {
    /// Create an empty attribute list.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Get an attribute value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether an attribute with this name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(key, _)| key == name)
    }

    /// Set an attribute, replacing the value in place or appending it.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((name, value)),
        }
    }

    /// Append a space-separated value to an attribute (used for `class`).
    pub fn join(&mut self, name: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        match self.0.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) if existing.is_empty() => value.clone_into(existing),
            Some((_, existing)) => {
                existing.push(' ');
                existing.push_str(value);
            }
            None => self.0.push((name.to_owned(), value.to_owned())),
        }
    }

    /// Remove an attribute, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.0.iter().position(|(key, _)| key == name)?;
        Some(self.0.remove(pos).1)
    }

    /// Iterate over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attrs {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut attrs = Self::new();
        for (name, value) in iter {
            attrs.set(name, value);
        }
        attrs
    }
}

/// A single token of the stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// HTML tag name (empty for text-like tokens).
    pub tag: &'static str,
    pub attrs: Attrs,
    pub nesting: Nesting,
    pub level: u32,
    pub content: String,
    /// Fence info string.
    pub info: String,
    /// Marker that produced the token (e.g. `linkify` for autolinked URLs).
    pub markup: String,
    /// Block-level token (affects newline rendering).
    pub block: bool,
    /// Hidden tokens render nothing (paragraphs in tight lists).
    pub hidden: bool,
    pub children: Vec<Token>,
}

impl Token {
    /// Create a token with no attributes or content.
    #[must_use]
    pub fn new(kind: TokenKind, tag: &'static str, nesting: Nesting) -> Self {
        Self {
            kind,
            tag,
            attrs: Attrs::new(),
            nesting,
            level: 0,
            content: String::new(),
            info: String::new(),
            markup: String::new(),
            block: false,
            hidden: false,
            children: Vec::new(),
        }
    }

    /// Create a text token.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        let mut token = Self::new(TokenKind::Text, "", Nesting::SelfClosing);
        token.content = content.into();
        token
    }

    /// Create an inline container holding the given children.
    #[must_use]
    pub fn inline(content: impl Into<String>, children: Vec<Token>) -> Self {
        let mut token = Self::new(TokenKind::Inline, "", Nesting::SelfClosing);
        token.content = content.into();
        token.children = children;
        token
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.set(name, value);
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Mark as block-level.
    #[must_use]
    pub fn into_block(mut self) -> Self {
        self.block = true;
        self
    }

    /// Whether this is a text token holding only ASCII whitespace.
    ///
    /// Non-breaking and other Unicode spaces count as content.
    #[must_use]
    pub fn is_blank_text(&self) -> bool {
        self.kind == TokenKind::Text
            && self.content.trim_matches(|c: char| c.is_ascii_whitespace()).is_empty()
    }
}
