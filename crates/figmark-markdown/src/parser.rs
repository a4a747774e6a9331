//! Markdown parser front end.
//!
//! Converts `pulldown-cmark` events into the flat token stream, then runs the
//! core rule chain over it.

use std::ops::Range;
use std::sync::LazyLock;

use pulldown_cmark::{
    Alignment, BrokenLink, CodeBlockKind, CowStr, Event, HeadingLevel, LinkType, Options, Parser,
    Tag, TagEnd,
};
use regex::Regex;

use crate::env::Env;
use crate::renderer::{HtmlRenderer, render_inline_as_text};
use crate::rules::{CoreState, RuleChain};
use crate::token::{Nesting, Token, TokenKind};
use crate::url::normalize_link;

/// Ordered list marker at the start of a line (`1.` or `1)`).
static ORDERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,9})([.)])").unwrap());

/// Link reference definition at the start of a line (`[label]:`).
static REFERENCE_DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[^\]]+\]:").unwrap());

/// Parser and renderer options.
#[derive(Clone, Debug)]
pub struct MarkdownOptions {
    /// Tables, strikethrough and task lists.
    pub gfm: bool,
    /// Turn bare URLs and email addresses into links.
    pub linkify: bool,
    /// Render soft line breaks as `<br>`.
    pub breaks: bool,
    /// Close void elements with ` />`.
    pub xhtml_out: bool,
    /// Pass raw HTML through. When disabled, HTML is escaped and shown as text.
    pub html: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            gfm: true,
            linkify: false,
            breaks: false,
            xhtml_out: false,
            html: false,
        }
    }
}

impl MarkdownOptions {
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    #[must_use]
    pub fn with_linkify(mut self, enabled: bool) -> Self {
        self.linkify = enabled;
        self
    }

    #[must_use]
    pub fn with_breaks(mut self, enabled: bool) -> Self {
        self.breaks = enabled;
        self
    }

    #[must_use]
    pub fn with_xhtml_out(mut self, enabled: bool) -> Self {
        self.xhtml_out = enabled;
        self
    }

    #[must_use]
    pub fn with_html(mut self, enabled: bool) -> Self {
        self.html = enabled;
        self
    }
}

/// Markdown parser with a pluggable core rule chain.
///
/// The parser itself holds no per-render state and can be shared between
/// threads; everything scoped to one call lives in [`Env`].
///
/// # Example
///
/// ```
/// use figmark_markdown::{MarkdownOptions, MarkdownParser};
///
/// let md = MarkdownParser::new(MarkdownOptions::default());
/// assert_eq!(md.render("Hello *world*"), "<p>Hello <em>world</em></p>\n");
/// ```
pub struct MarkdownParser {
    options: MarkdownOptions,
    core: RuleChain,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new(MarkdownOptions::default())
    }
}

impl MarkdownParser {
    /// Create a parser with the built-in core rules.
    #[must_use]
    pub fn new(options: MarkdownOptions) -> Self {
        Self {
            options,
            core: RuleChain::builtin(),
        }
    }

    #[must_use]
    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    /// Core rule chain, for inspection.
    #[must_use]
    pub fn core(&self) -> &RuleChain {
        &self.core
    }

    /// Core rule chain, for plugin registration.
    pub fn core_mut(&mut self) -> &mut RuleChain {
        &mut self.core
    }

    /// Parse a document into block tokens and run the core rules.
    pub fn parse(&self, src: &str, env: &mut Env) -> Vec<Token> {
        let mut tokens = self.tokenize(src, env);
        self.run_core(&mut tokens, env, false);
        tokens
    }

    /// Parse inline markdown only.
    ///
    /// Returns a single [`TokenKind::Inline`] token. Block syntax at the start
    /// of a line (headings, list markers, quotes, fences, reference
    /// definitions) is kept as literal text. HTML that would open an HTML
    /// block stays inline HTML. Separate paragraphs are joined with soft
    /// breaks. Reference links resolve against the definitions already
    /// recorded in `env`.
    pub fn parse_inline(&self, src: &str, env: &mut Env) -> Vec<Token> {
        let guarded = guard_block_markers(src);
        let mut children = Vec::new();
        for token in self.tokenize(&guarded, env) {
            let parts = match token.kind {
                TokenKind::Inline => token.children,
                TokenKind::HtmlBlock => {
                    let mut html = Token::new(TokenKind::HtmlInline, "", Nesting::SelfClosing);
                    token.content.trim_end().clone_into(&mut html.content);
                    vec![html]
                }
                _ => continue,
            };
            if !children.is_empty() {
                children.push(Token::new(TokenKind::Softbreak, "br", Nesting::SelfClosing));
            }
            children.extend(parts);
        }

        let mut tokens = vec![Token::inline(src, children)];
        self.run_core(&mut tokens, env, true);
        tokens
    }

    /// Render a document to HTML with a fresh [`Env`].
    pub fn render(&self, src: &str) -> String {
        let mut env = Env::new();
        self.render_with_env(src, &mut env)
    }

    /// Render a document to HTML with a caller-provided [`Env`].
    pub fn render_with_env(&self, src: &str, env: &mut Env) -> String {
        let tokens = self.parse(src, env);
        self.renderer().render(&tokens)
    }

    /// HTML renderer configured with this parser's options.
    #[must_use]
    pub fn renderer(&self) -> HtmlRenderer<'_> {
        HtmlRenderer::new(&self.options)
    }

    fn pulldown_options(&self) -> Options {
        if self.options.gfm {
            Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
        } else {
            Options::empty()
        }
    }

    /// Tokenize `src`, resolving unknown references from `env` and recording
    /// the definitions found in `src` there.
    fn tokenize(&self, src: &str, env: &mut Env) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(src);
        let definitions: Vec<(String, String, String)> = {
            let known = &*env;
            let resolve = |link: BrokenLink<'_>| {
                let (dest, title) = known.reference(&link.reference)?;
                Some((CowStr::from(dest.to_owned()), CowStr::from(title.to_owned())))
            };
            let mut events =
                Parser::new_with_broken_link_callback(src, self.pulldown_options(), Some(resolve))
                    .into_offset_iter();
            for (event, range) in events.by_ref() {
                tokenizer.event(event, range);
            }
            events
                .reference_definitions()
                .iter()
                .map(|(label, def)| {
                    let title = def.title.as_deref().unwrap_or_default();
                    (label.to_owned(), def.dest.to_string(), title.to_owned())
                })
                .collect()
        };
        for (label, dest, title) in definitions {
            env.define_reference(&label, dest, title);
        }
        tokenizer.finish()
    }

    fn run_core(&self, tokens: &mut Vec<Token>, env: &mut Env, inline_mode: bool) {
        let mut state = CoreState {
            tokens,
            env,
            parser: self,
            inline_mode,
        };
        for rule in self.core.iter() {
            rule.apply(&mut state);
        }
    }
}

/// Escape block-level markers at line starts so a fragment parses as inline text.
fn guard_block_markers(src: &str) -> String {
    src.split('\n').map(guard_line).collect::<Vec<_>>().join("\n")
}

fn guard_line(line: &str) -> String {
    let line = line.trim_start();
    let Some(first) = line.chars().next() else {
        return String::new();
    };
    let escape = match first {
        '#' | '>' | '-' | '+' | '=' | '|' => true,
        '[' => REFERENCE_DEFINITION.is_match(line),
        '*' => {
            line[1..].starts_with([' ', '\t']) || line.len() == 1 || is_thematic_break(line, '*')
        }
        '_' => is_thematic_break(line, '_'),
        '`' => line.starts_with("```"),
        '~' => line.starts_with("~~~"),
        _ => return ORDERED_MARKER.replace(line, r"$1\$2").into_owned(),
    };
    if escape {
        format!("\\{line}")
    } else {
        line.to_owned()
    }
}

fn is_thematic_break(line: &str, marker: char) -> bool {
    line.chars().all(|c| c == marker || c == ' ' || c == '\t')
        && line.chars().filter(|&c| c == marker).count() >= 3
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

fn alignment_style(alignment: Alignment) -> Option<&'static str> {
    match alignment {
        Alignment::None => None,
        Alignment::Left => Some("text-align:left"),
        Alignment::Center => Some("text-align:center"),
        Alignment::Right => Some("text-align:right"),
    }
}

fn extend_span(span: &mut Option<Range<usize>>, range: &Range<usize>) {
    *span = Some(match span.take() {
        Some(existing) => existing.start.min(range.start)..existing.end.max(range.end),
        None => range.clone(),
    });
}

/// Image whose alt tokens are being collected.
struct ImageFrame {
    token: Token,
    children: Vec<Token>,
    level: u32,
    span: Option<Range<usize>>,
}

/// Inline children of the block currently being built.
#[derive(Default)]
struct InlineBuilder {
    children: Vec<Token>,
    level: u32,
    span: Option<Range<usize>>,
    images: Vec<ImageFrame>,
}

impl InlineBuilder {
    fn push(&mut self, mut token: Token, range: &Range<usize>) {
        let (children, level, span) = match self.images.last_mut() {
            Some(frame) => (&mut frame.children, &mut frame.level, &mut frame.span),
            None => (&mut self.children, &mut self.level, &mut self.span),
        };
        extend_span(span, range);

        if token.nesting == Nesting::Closing {
            *level = level.saturating_sub(1);
        }
        token.level = *level;
        if token.nesting == Nesting::Opening {
            *level += 1;
        }

        if token.kind == TokenKind::Text
            && let Some(last) = children.last_mut()
            && last.kind == TokenKind::Text
        {
            last.content.push_str(&token.content);
            return;
        }
        children.push(token);
    }

    fn start_image(&mut self, token: Token, range: &Range<usize>) {
        match self.images.last_mut() {
            Some(frame) => extend_span(&mut frame.span, range),
            None => extend_span(&mut self.span, range),
        }
        self.images.push(ImageFrame {
            token,
            children: Vec::new(),
            level: 0,
            span: None,
        });
    }

    fn end_image(&mut self, source: &str, range: &Range<usize>) {
        let Some(frame) = self.images.pop() else {
            return;
        };
        let mut token = frame.token;
        token.content = frame
            .span
            .and_then(|span| source.get(span))
            .unwrap_or_default()
            .to_owned();
        token.children = frame.children;
        token.attrs.set("alt", render_inline_as_text(&token.children));
        self.push(token, range);
    }
}

#[derive(Default)]
struct TableState {
    alignments: Vec<Alignment>,
    in_head: bool,
    has_body: bool,
    cell: usize,
}

/// Builds the token stream from `pulldown-cmark` events.
struct Tokenizer<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    level: u32,
    inline: Option<InlineBuilder>,
    /// Inline content opened without a paragraph (tight list items).
    implicit_paragraph: bool,
    code: Option<Token>,
    html: Option<Token>,
    table: TableState,
}

impl<'s> Tokenizer<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            tokens: Vec::new(),
            level: 0,
            inline: None,
            implicit_paragraph: false,
            code: None,
            html: None,
            table: TableState::default(),
        }
    }

    fn finish(mut self) -> Vec<Token> {
        self.close_implicit();
        self.tokens
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Start(tag) => self.start(tag, &range),
            Event::End(tag) => self.end(tag, &range),
            Event::Text(text) => {
                if let Some(code) = self.code.as_mut() {
                    code.content.push_str(&text);
                } else {
                    self.inline_mut().push(Token::text(text.as_ref()), &range);
                }
            }
            Event::Code(code) => {
                let mut token = Token::new(TokenKind::CodeInline, "code", Nesting::SelfClosing);
                token.content = code.into_string();
                self.inline_mut().push(token, &range);
            }
            Event::Html(html) => {
                if let Some(block) = self.html.as_mut() {
                    block.content.push_str(&html);
                } else {
                    self.push_inline_html(&html, &range);
                }
            }
            Event::InlineHtml(html) => self.push_inline_html(&html, &range),
            Event::SoftBreak => {
                let token = Token::new(TokenKind::Softbreak, "br", Nesting::SelfClosing);
                self.inline_mut().push(token, &range);
            }
            Event::HardBreak => {
                let token = Token::new(TokenKind::Hardbreak, "br", Nesting::SelfClosing);
                self.inline_mut().push(token, &range);
            }
            Event::Rule => {
                self.close_implicit();
                let token = Token::new(TokenKind::Hr, "hr", Nesting::SelfClosing)
                    .with_level(self.level)
                    .into_block();
                self.tokens.push(token);
            }
            Event::TaskListMarker(checked) => {
                let mut token = Token::new(TokenKind::Checkbox, "input", Nesting::SelfClosing)
                    .with_attr("type", "checkbox");
                if checked {
                    token.attrs.set("checked", "");
                }
                token.attrs.set("disabled", "");
                self.inline_mut().push(token, &range);
            }
            Event::FootnoteReference(label) => {
                self.inline_mut()
                    .push(Token::text(format!("[^{label}]")), &range);
            }
            Event::InlineMath(math) | Event::DisplayMath(math) => {
                self.inline_mut().push(Token::text(math.as_ref()), &range);
            }
        }
    }

    fn push_inline_html(&mut self, html: &str, range: &Range<usize>) {
        let mut token = Token::new(TokenKind::HtmlInline, "", Nesting::SelfClosing);
        token.content = html.to_owned();
        self.inline_mut().push(token, range);
    }

    fn start(&mut self, tag: Tag<'_>, range: &Range<usize>) {
        match tag {
            Tag::Paragraph => {
                self.close_implicit();
                self.open(Token::new(TokenKind::ParagraphOpen, "p", Nesting::Opening));
                self.inline = Some(InlineBuilder::default());
            }
            Tag::Heading { level, .. } => {
                self.close_implicit();
                let tag = heading_tag(level);
                self.open(Token::new(TokenKind::HeadingOpen, tag, Nesting::Opening));
                self.inline = Some(InlineBuilder::default());
            }
            Tag::BlockQuote(_) => {
                self.close_implicit();
                self.open(Token::new(TokenKind::BlockquoteOpen, "blockquote", Nesting::Opening));
            }
            Tag::CodeBlock(kind) => {
                self.close_implicit();
                let token = match kind {
                    CodeBlockKind::Fenced(info) => {
                        let mut token = Token::new(TokenKind::Fence, "code", Nesting::SelfClosing);
                        token.info = info.into_string();
                        token
                    }
                    CodeBlockKind::Indented => {
                        Token::new(TokenKind::CodeBlock, "code", Nesting::SelfClosing)
                    }
                };
                self.code = Some(token.with_level(self.level).into_block());
            }
            Tag::HtmlBlock => {
                self.close_implicit();
                let token = Token::new(TokenKind::HtmlBlock, "", Nesting::SelfClosing)
                    .with_level(self.level)
                    .into_block();
                self.html = Some(token);
            }
            Tag::List(start) => {
                self.close_implicit();
                let token = match start {
                    Some(1) => Token::new(TokenKind::OrderedListOpen, "ol", Nesting::Opening),
                    Some(n) => Token::new(TokenKind::OrderedListOpen, "ol", Nesting::Opening)
                        .with_attr("start", n.to_string()),
                    None => Token::new(TokenKind::BulletListOpen, "ul", Nesting::Opening),
                };
                self.open(token);
            }
            Tag::Item => {
                self.close_implicit();
                self.open(Token::new(TokenKind::ListItemOpen, "li", Nesting::Opening));
            }
            Tag::Table(alignments) => {
                self.close_implicit();
                self.table = TableState {
                    alignments,
                    ..TableState::default()
                };
                self.open(Token::new(TokenKind::TableOpen, "table", Nesting::Opening));
            }
            Tag::TableHead => {
                self.table.in_head = true;
                self.table.cell = 0;
                self.open(Token::new(TokenKind::TheadOpen, "thead", Nesting::Opening));
                self.open(Token::new(TokenKind::TrOpen, "tr", Nesting::Opening));
            }
            Tag::TableRow => {
                if !self.table.has_body {
                    self.table.has_body = true;
                    self.open(Token::new(TokenKind::TbodyOpen, "tbody", Nesting::Opening));
                }
                self.table.cell = 0;
                self.open(Token::new(TokenKind::TrOpen, "tr", Nesting::Opening));
            }
            Tag::TableCell => {
                let mut token = if self.table.in_head {
                    Token::new(TokenKind::ThOpen, "th", Nesting::Opening)
                } else {
                    Token::new(TokenKind::TdOpen, "td", Nesting::Opening)
                };
                let alignment = self
                    .table
                    .alignments
                    .get(self.table.cell)
                    .copied()
                    .unwrap_or(Alignment::None);
                if let Some(style) = alignment_style(alignment) {
                    token.attrs.set("style", style);
                }
                self.open(token);
                self.inline = Some(InlineBuilder::default());
            }
            Tag::Emphasis => {
                let token = Token::new(TokenKind::EmOpen, "em", Nesting::Opening);
                self.inline_mut().push(token, range);
            }
            Tag::Strong => {
                let token = Token::new(TokenKind::StrongOpen, "strong", Nesting::Opening);
                self.inline_mut().push(token, range);
            }
            Tag::Strikethrough => {
                let token = Token::new(TokenKind::StrikethroughOpen, "s", Nesting::Opening);
                self.inline_mut().push(token, range);
            }
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                let href = if link_type == LinkType::Email {
                    format!("mailto:{dest_url}")
                } else {
                    dest_url.into_string()
                };
                let mut token = Token::new(TokenKind::LinkOpen, "a", Nesting::Opening)
                    .with_attr("href", normalize_link(&href));
                if !title.is_empty() {
                    token.attrs.set("title", title.as_ref());
                }
                if matches!(link_type, LinkType::Autolink | LinkType::Email) {
                    "autolink".clone_into(&mut token.markup);
                }
                self.inline_mut().push(token, range);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                let mut token = Token::new(TokenKind::Image, "img", Nesting::SelfClosing)
                    .with_attr("src", normalize_link(&dest_url))
                    .with_attr("alt", "");
                if !title.is_empty() {
                    token.attrs.set("title", title.as_ref());
                }
                self.inline_mut().start_image(token, range);
            }
            Tag::FootnoteDefinition(_)
            | Tag::MetadataBlock(_)
            | Tag::DefinitionList
            | Tag::DefinitionListTitle
            | Tag::DefinitionListDefinition
            | Tag::Superscript
            | Tag::Subscript => {}
        }
    }

    fn end(&mut self, tag: TagEnd, range: &Range<usize>) {
        match tag {
            TagEnd::Paragraph => {
                self.finish_inline();
                self.close(TokenKind::ParagraphClose, "p");
            }
            TagEnd::Heading(level) => {
                self.finish_inline();
                self.close(TokenKind::HeadingClose, heading_tag(level));
            }
            TagEnd::BlockQuote(_) => {
                self.close_implicit();
                self.close(TokenKind::BlockquoteClose, "blockquote");
            }
            TagEnd::CodeBlock => {
                if let Some(code) = self.code.take() {
                    self.push_raw_block(code);
                }
            }
            TagEnd::HtmlBlock => {
                if let Some(html) = self.html.take() {
                    self.push_raw_block(html);
                }
            }
            TagEnd::List(ordered) => {
                self.close_implicit();
                if ordered {
                    self.close(TokenKind::OrderedListClose, "ol");
                } else {
                    self.close(TokenKind::BulletListClose, "ul");
                }
            }
            TagEnd::Item => {
                self.close_implicit();
                self.close(TokenKind::ListItemClose, "li");
            }
            TagEnd::Table => {
                if self.table.has_body {
                    self.close(TokenKind::TbodyClose, "tbody");
                }
                self.close(TokenKind::TableClose, "table");
                self.table = TableState::default();
            }
            TagEnd::TableHead => {
                self.close(TokenKind::TrClose, "tr");
                self.close(TokenKind::TheadClose, "thead");
                self.table.in_head = false;
            }
            TagEnd::TableRow => self.close(TokenKind::TrClose, "tr"),
            TagEnd::TableCell => {
                self.finish_inline();
                if self.table.in_head {
                    self.close(TokenKind::ThClose, "th");
                } else {
                    self.close(TokenKind::TdClose, "td");
                }
                self.table.cell += 1;
            }
            TagEnd::Emphasis => self.push_close(TokenKind::EmClose, "em", range),
            TagEnd::Strong => self.push_close(TokenKind::StrongClose, "strong", range),
            TagEnd::Strikethrough => self.push_close(TokenKind::StrikethroughClose, "s", range),
            TagEnd::Link => self.push_close(TokenKind::LinkClose, "a", range),
            TagEnd::Image => {
                let source = self.source;
                self.inline_mut().end_image(source, range);
            }
            TagEnd::FootnoteDefinition
            | TagEnd::MetadataBlock(_)
            | TagEnd::DefinitionList
            | TagEnd::DefinitionListTitle
            | TagEnd::DefinitionListDefinition
            | TagEnd::Superscript
            | TagEnd::Subscript => {}
        }
    }

    /// Code and HTML blocks always end with a line break, even at end of input.
    fn push_raw_block(&mut self, mut token: Token) {
        if !token.content.is_empty() && !token.content.ends_with('\n') {
            token.content.push('\n');
        }
        self.tokens.push(token);
    }

    fn push_close(&mut self, kind: TokenKind, tag: &'static str, range: &Range<usize>) {
        self.inline_mut()
            .push(Token::new(kind, tag, Nesting::Closing), range);
    }

    /// Inline builder for the current block, opening a hidden paragraph when
    /// inline content appears directly inside a container.
    fn inline_mut(&mut self) -> &mut InlineBuilder {
        if self.inline.is_none() {
            let mut token = Token::new(TokenKind::ParagraphOpen, "p", Nesting::Opening);
            token.hidden = true;
            self.open(token);
            self.implicit_paragraph = true;
        }
        self.inline.get_or_insert_with(InlineBuilder::default)
    }

    fn close_implicit(&mut self) {
        if !self.implicit_paragraph {
            return;
        }
        self.implicit_paragraph = false;
        self.finish_inline();
        let mut token = Token::new(TokenKind::ParagraphClose, "p", Nesting::Closing);
        token.hidden = true;
        self.level = self.level.saturating_sub(1);
        self.tokens.push(token.with_level(self.level).into_block());
    }

    fn finish_inline(&mut self) {
        let Some(builder) = self.inline.take() else {
            return;
        };
        let content = builder
            .span
            .and_then(|span| self.source.get(span))
            .unwrap_or_default();
        let token = Token::inline(content, builder.children).with_level(self.level);
        self.tokens.push(token);
    }

    fn open(&mut self, token: Token) {
        self.tokens.push(token.with_level(self.level).into_block());
        self.level += 1;
    }

    fn close(&mut self, kind: TokenKind, tag: &'static str) {
        self.level = self.level.saturating_sub(1);
        let token = Token::new(kind, tag, Nesting::Closing)
            .with_level(self.level)
            .into_block();
        self.tokens.push(token);
    }
}
