//! Figure captions.
//!
//! Caption text is stored flat (the image title, or the raw alt source) and is
//! parsed again as inline markdown so links and emphasis come back as markup.

use figmark_markdown::{Env, MarkdownParser, Nesting, Token, TokenKind};

use crate::options::CaptionSource;

/// Caption source text of an image token.
pub(crate) fn caption_text(image: &Token, source: CaptionSource) -> String {
    match source {
        CaptionSource::Title => image.attrs.get("title").unwrap_or_default().to_owned(),
        CaptionSource::Alt => image.content.clone(),
    }
}

/// `figcaption_open`, the parsed inline tokens, `figcaption_close`.
pub(crate) fn caption_tokens(
    parser: &MarkdownParser,
    text: &str,
    env: &mut Env,
    level: u32,
) -> Vec<Token> {
    let children = parser
        .parse_inline(text, env)
        .pop()
        .map(|inline| inline.children)
        .unwrap_or_default();

    let mut tokens = Vec::with_capacity(children.len() + 2);
    tokens.push(Token::new(TokenKind::FigcaptionOpen, "figcaption", Nesting::Opening).with_level(level));
    tokens.extend(children.into_iter().map(|mut child| {
        child.level += level + 1;
        child
    }));
    tokens.push(
        Token::new(TokenKind::FigcaptionClose, "figcaption", Nesting::Closing).with_level(level),
    );
    tokens
}
