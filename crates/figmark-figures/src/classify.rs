//! Paragraph shape check.

use figmark_markdown::{Token, TokenKind};

/// Shape of a paragraph's inline content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    NotQualifying,
    /// `[image]`
    Image,
    /// `[link_open, image, link_close]`
    LinkedImage,
}

impl Classification {
    pub fn qualifies(self) -> bool {
        self != Self::NotQualifying
    }
}

/// Classify a paragraph from its open, inline and close tokens.
///
/// Whitespace-only text children are ignored. Hidden paragraphs (tight list
/// items) never qualify: they render no element to turn into a figure.
pub fn classify(open: &Token, inline: &Token, close: &Token) -> Classification {
    if open.kind != TokenKind::ParagraphOpen
        || open.hidden
        || inline.kind != TokenKind::Inline
        || close.kind != TokenKind::ParagraphClose
    {
        return Classification::NotQualifying;
    }

    let shape: Vec<TokenKind> = inline
        .children
        .iter()
        .filter(|child| !child.is_blank_text())
        .map(|child| child.kind)
        .collect();

    match shape.as_slice() {
        [TokenKind::Image] => Classification::Image,
        [TokenKind::LinkOpen, TokenKind::Image, TokenKind::LinkClose] => {
            Classification::LinkedImage
        }
        _ => Classification::NotQualifying,
    }
}
