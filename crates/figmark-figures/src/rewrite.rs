//! The `image_figures` core rule.

use figmark_markdown::{CoreRule, CoreState, MarkdownParser, Nesting, Token, TokenKind};

use crate::caption::{caption_text, caption_tokens};
use crate::classify::{Classification, classify};
use crate::error::FigureError;
use crate::options::FigureOptions;

/// Render-scoped counter used for `tabindex`.
const TABINDEX_COUNTER: &str = "image_figures.tabindex";

/// Core rule turning image-only paragraphs into figures.
///
/// The rule keeps no per-render state: the tabindex counter lives in the
/// [`Env`](figmark_markdown::Env) of the current call.
pub struct ImageFigures {
    options: FigureOptions,
}

impl ImageFigures {
    /// Rule name in the core chain.
    pub const NAME: &'static str = "image_figures";

    #[must_use]
    pub fn new(options: FigureOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &FigureOptions {
        &self.options
    }

    /// Add the rule to the parser's core chain, before `linkify`.
    ///
    /// Register attribute rules such as
    /// [`CurlyAttributes`](figmark_markdown::CurlyAttributes) first, so their
    /// syntax is consumed before paragraphs are classified.
    pub fn register(self, md: &mut MarkdownParser) -> Result<(), FigureError> {
        md.core_mut().insert_before("linkify", self)?;
        Ok(())
    }

    fn rewrite(&self, state: &mut CoreState<'_>, idx: usize, shape: Classification) {
        let tokens = &mut *state.tokens;
        let options = &self.options;

        for pos in [idx - 1, idx + 1] {
            let token = &mut tokens[pos];
            token.kind = if token.nesting == Nesting::Opening {
                TokenKind::FigureOpen
            } else {
                TokenKind::FigureClose
            };
            token.tag = "figure";
        }

        if options.data_type {
            tokens[idx - 1].attrs.set("data-type", "image");
        }
        if options.tabindex {
            let n = state.env.next(TABINDEX_COUNTER);
            tokens[idx - 1].attrs.set("tabindex", n.to_string());
        }

        let children = &mut tokens[idx].children;
        children.retain(|child| !child.is_blank_text());
        let mut image_pos = usize::from(shape == Classification::LinkedImage);

        if options.link && shape == Classification::Image {
            let image = &mut children[0];
            let href = image.attrs.get("src").unwrap_or_default().to_owned();
            let level = image.level;
            image.level += 1;
            children.insert(
                0,
                Token::new(TokenKind::LinkOpen, "a", Nesting::Opening)
                    .with_attr("href", href)
                    .with_level(level),
            );
            children.push(Token::new(TokenKind::LinkClose, "a", Nesting::Closing).with_level(level));
            image_pos = 1;
        }

        let image = &mut children[image_pos];
        if let Some(classes) = &options.classes {
            image.attrs.join("class", classes);
        }
        if options.lazy && !image.attrs.contains("loading") {
            image.attrs.set("loading", "lazy");
        }
        if options.async_decoding && !image.attrs.contains("decoding") {
            image.attrs.set("decoding", "async");
        }
        if options.remove_src
            && let Some(src) = image.attrs.remove("src")
        {
            image.attrs.set("data-src", src);
        }

        let copied: Vec<(String, String)> = match &options.copy_attrs {
            Some(pattern) => image
                .attrs
                .iter()
                .filter(|(name, _)| pattern.is_match(name))
                .map(|(name, value)| (name.to_owned(), value.to_owned()))
                .collect(),
            None => Vec::new(),
        };

        let caption = options
            .figcaption
            .map(|source| caption_text(image, source))
            .filter(|text| !text.is_empty());
        if caption.is_some() {
            image.attrs.remove("title");
        }
        let level = children.first().map_or(0, |first| first.level);

        for (name, value) in copied {
            state.tokens[idx - 1].attrs.set(name, value);
        }
        if let Some(text) = caption {
            let tokens = caption_tokens(state.parser, &text, state.env, level);
            state.tokens[idx].children.extend(tokens);
        }
    }
}

impl CoreRule for ImageFigures {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, state: &mut CoreState<'_>) {
        if state.inline_mode {
            return;
        }

        let mut figures = 0usize;
        let mut idx = 1;
        while idx + 1 < state.tokens.len() {
            let tokens = &*state.tokens;
            let shape = classify(&tokens[idx - 1], &tokens[idx], &tokens[idx + 1]);
            if !shape.qualifies() {
                if tokens[idx - 1].kind == TokenKind::ParagraphOpen
                    && tokens[idx].kind == TokenKind::Inline
                {
                    tracing::trace!(index = idx, "Paragraph is not image-only");
                }
                idx += 1;
                continue;
            }

            self.rewrite(state, idx, shape);
            figures += 1;
            idx += 2;
        }

        if figures > 0 {
            tracing::debug!(figures, "Rewrote image paragraphs as figures");
        }
    }
}
