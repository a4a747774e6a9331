//! HTML renderer for the token stream.
//!
//! Open/close tokens render generically from their tag and attributes;
//! text-like tokens (text, code, breaks, HTML, images) have dedicated rules.

use std::fmt::Write;

use crate::parser::MarkdownOptions;
use crate::token::{Attrs, Nesting, Token, TokenKind};

/// Escape text for HTML content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

/// Plain text of inline tokens, as used for image `alt` attributes.
pub fn render_inline_as_text(tokens: &[Token]) -> String {
    let mut out = String::new();
    collect_text(tokens, &mut out);
    out
}

fn collect_text(tokens: &[Token], out: &mut String) {
    for token in tokens {
        match token.kind {
            TokenKind::Text | TokenKind::CodeInline | TokenKind::HtmlInline => {
                out.push_str(&token.content);
            }
            TokenKind::Image => collect_text(&token.children, out),
            TokenKind::Softbreak | TokenKind::Hardbreak => out.push('\n'),
            _ => {}
        }
    }
}

/// Token stream to HTML renderer.
pub struct HtmlRenderer<'o> {
    options: &'o MarkdownOptions,
}

impl<'o> HtmlRenderer<'o> {
    #[must_use]
    pub fn new(options: &'o MarkdownOptions) -> Self {
        Self { options }
    }

    /// Render a block token stream.
    pub fn render(&self, tokens: &[Token]) -> String {
        let mut out = String::with_capacity(4096);
        for (idx, token) in tokens.iter().enumerate() {
            match token.kind {
                TokenKind::Inline => self.inline_into(&token.children, &mut out),
                TokenKind::Fence => self.fence(token, &mut out),
                TokenKind::CodeBlock => self.code_block(token, &mut out),
                TokenKind::HtmlBlock => self.html_block(token, &mut out),
                _ => self.token(tokens, idx, &mut out),
            }
        }
        out
    }

    /// Render inline tokens (the children of an inline token).
    pub fn render_inline(&self, tokens: &[Token]) -> String {
        let mut out = String::new();
        self.inline_into(tokens, &mut out);
        out
    }

    fn inline_into(&self, tokens: &[Token], out: &mut String) {
        for (idx, token) in tokens.iter().enumerate() {
            match token.kind {
                TokenKind::Text => out.push_str(&escape_html(&token.content)),
                TokenKind::Softbreak if !self.options.breaks => out.push('\n'),
                TokenKind::Softbreak | TokenKind::Hardbreak => self.line_break(out),
                TokenKind::CodeInline => {
                    out.push_str("<code");
                    render_attrs(&token.attrs, out);
                    write!(out, ">{}</code>", escape_html(&token.content)).unwrap();
                }
                TokenKind::HtmlInline => self.raw_html(&token.content, out),
                TokenKind::Image => self.image(token, out),
                _ => self.token(tokens, idx, out),
            }
        }
    }

    fn line_break(&self, out: &mut String) {
        out.push_str(if self.options.xhtml_out {
            "<br />\n"
        } else {
            "<br>\n"
        });
    }

    fn raw_html(&self, html: &str, out: &mut String) {
        if self.options.html {
            out.push_str(html);
        } else {
            out.push_str(&escape_html(html));
        }
    }

    fn image(&self, token: &Token, out: &mut String) {
        let mut attrs = token.attrs.clone();
        if attrs.contains("alt") {
            attrs.set("alt", render_inline_as_text(&token.children));
        }
        out.push_str("<img");
        render_attrs(&attrs, out);
        self.close_void(out);
    }

    fn fence(&self, token: &Token, out: &mut String) {
        let mut attrs = token.attrs.clone();
        if let Some(lang) = token.info.split_whitespace().next() {
            // Language class goes first, ahead of any attribute classes.
            let class = match attrs.get("class") {
                Some(existing) => format!("language-{lang} {existing}"),
                None => format!("language-{lang}"),
            };
            attrs.set("class", class);
        }
        out.push_str("<pre><code");
        render_attrs(&attrs, out);
        writeln!(out, ">{}</code></pre>", escape_html(&token.content)).unwrap();
    }

    fn code_block(&self, token: &Token, out: &mut String) {
        out.push_str("<pre><code");
        render_attrs(&token.attrs, out);
        writeln!(out, ">{}</code></pre>", escape_html(&token.content)).unwrap();
    }

    fn html_block(&self, token: &Token, out: &mut String) {
        if self.options.html {
            out.push_str(&token.content);
        } else {
            writeln!(out, "<p>{}</p>", escape_html(token.content.trim_end())).unwrap();
        }
    }

    fn close_void(&self, out: &mut String) {
        out.push_str(if self.options.xhtml_out { " />" } else { ">" });
    }

    /// Generic open/close/void tag rendering with block newline handling.
    fn token(&self, tokens: &[Token], idx: usize, out: &mut String) {
        let token = &tokens[idx];
        if token.hidden {
            return;
        }

        // Newline between a hidden paragraph and a following block opener.
        if token.block
            && token.nesting != Nesting::Closing
            && idx > 0
            && tokens[idx - 1].hidden
        {
            out.push('\n');
        }

        out.push_str(if token.nesting == Nesting::Closing {
            "</"
        } else {
            "<"
        });
        out.push_str(token.tag);
        render_attrs(&token.attrs, out);
        if token.nesting == Nesting::SelfClosing && self.options.xhtml_out {
            out.push_str(" /");
        }

        let mut needs_newline = token.block;
        if token.block
            && token.nesting == Nesting::Opening
            && let Some(next) = tokens.get(idx + 1)
            && (next.kind == TokenKind::Inline
                || next.hidden
                || (next.nesting == Nesting::Closing && next.tag == token.tag))
        {
            needs_newline = false;
        }
        out.push_str(if needs_newline { ">\n" } else { ">" });
    }
}

/// Render attributes as ` name="value"` pairs in order.
pub fn render_attrs(attrs: &Attrs, out: &mut String) {
    for (name, value) in attrs.iter() {
        write!(out, r#" {}="{}""#, escape_html(name), escape_html(value)).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MarkdownParser;
    use pretty_assertions::assert_eq;

    fn render(markdown: &str) -> String {
        MarkdownParser::default().render(markdown)
    }

    fn render_with(markdown: &str, options: MarkdownOptions) -> String {
        MarkdownParser::new(options).render(markdown)
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&"#), "&lt;a href=&quot;x&quot;&gt;&amp;");
        assert_eq!(escape_html("it's"), "it's");
    }

    #[test]
    fn test_paragraphs() {
        assert_eq!(render("one\n\ntwo"), "<p>one</p>\n<p>two</p>\n");
    }

    #[test]
    fn test_image_in_text() {
        assert_eq!(
            render("text with ![](img.png)"),
            "<p>text with <img src=\"img.png\" alt=\"\"></p>\n"
        );
    }

    #[test]
    fn test_image_alt_from_children() {
        assert_eq!(
            render(r#"![An **alt** `x`](a.png "T")"#),
            "<p><img src=\"a.png\" alt=\"An alt x\" title=\"T\"></p>\n"
        );
    }

    #[test]
    fn test_inline_code_and_emphasis() {
        assert_eq!(
            render("And `code` *em* **strong** ~~del~~."),
            "<p>And <code>code</code> <em>em</em> <strong>strong</strong> <s>del</s>.</p>\n"
        );
    }

    #[test]
    fn test_heading() {
        assert_eq!(render("## Title"), "<h2>Title</h2>\n");
    }

    #[test]
    fn test_tight_list() {
        assert_eq!(render("- a\n- b"), "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n");
    }

    #[test]
    fn test_nested_tight_list() {
        assert_eq!(
            render("- a\n  - b"),
            "<ul>\n<li>a\n<ul>\n<li>b</li>\n</ul>\n</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_loose_list() {
        assert_eq!(
            render("1. a\n\n2. b"),
            "<ol>\n<li>\n<p>a</p>\n</li>\n<li>\n<p>b</p>\n</li>\n</ol>\n"
        );
    }

    #[test]
    fn test_ordered_list_start() {
        assert_eq!(render("3. c"), "<ol start=\"3\">\n<li>c</li>\n</ol>\n");
    }

    #[test]
    fn test_blockquote() {
        assert_eq!(
            render("> quote"),
            "<blockquote>\n<p>quote</p>\n</blockquote>\n"
        );
    }

    #[test]
    fn test_fence() {
        assert_eq!(
            render("```rust\nfn main() {}\n```"),
            "<pre><code class=\"language-rust\">fn main() {}\n</code></pre>\n"
        );
    }

    #[test]
    fn test_indented_code() {
        assert_eq!(render("    a < b"), "<pre><code>a &lt; b\n</code></pre>\n");
    }

    #[test]
    fn test_hr() {
        assert_eq!(render("a\n\n---"), "<p>a</p>\n<hr>\n");
    }

    #[test]
    fn test_table() {
        assert_eq!(
            render("| A | B |\n|:--|---|\n| 1 | 2 |"),
            "<table>\n<thead>\n<tr>\n<th style=\"text-align:left\">A</th>\n<th>B</th>\n</tr>\n</thead>\n<tbody>\n<tr>\n<td style=\"text-align:left\">1</td>\n<td>2</td>\n</tr>\n</tbody>\n</table>\n"
        );
    }

    #[test]
    fn test_links() {
        assert_eq!(
            render(r#"[link](page.html "Title")"#),
            "<p><a href=\"page.html\" title=\"Title\">link</a></p>\n"
        );
    }

    #[test]
    fn test_soft_and_hard_breaks() {
        assert_eq!(render("a\nb"), "<p>a\nb</p>\n");
        assert_eq!(render("a  \nb"), "<p>a<br>\nb</p>\n");
        assert_eq!(
            render_with("a\nb", MarkdownOptions::default().with_breaks(true)),
            "<p>a<br>\nb</p>\n"
        );
    }

    #[test]
    fn test_xhtml_out() {
        let options = MarkdownOptions::default().with_xhtml_out(true);
        assert_eq!(
            render_with("![x](a.png)", options.clone()),
            "<p><img src=\"a.png\" alt=\"x\" /></p>\n"
        );
        assert_eq!(render_with("---", options), "<hr />\n");
    }

    #[test]
    fn test_html_disabled_escapes() {
        assert_eq!(render("a <b>x</b>"), "<p>a &lt;b&gt;x&lt;/b&gt;</p>\n");
    }

    #[test]
    fn test_html_enabled_passthrough() {
        let options = MarkdownOptions::default().with_html(true);
        assert_eq!(render_with("a <b>x</b>", options.clone()), "<p>a <b>x</b></p>\n");
        assert_eq!(render_with("<div>\nx\n</div>", options), "<div>\nx\n</div>\n");
    }

    #[test]
    fn test_task_list() {
        let html = render("- [x] done\n- [ ] todo");
        assert!(html.contains(r#"<li><input type="checkbox" checked="" disabled="">"#));
        assert!(html.contains(r#"<li><input type="checkbox" disabled="">"#));
    }

    #[test]
    fn test_render_inline() {
        let md = MarkdownParser::default();
        let tokens = md.parse_inline("a *b*", &mut crate::Env::new());
        assert_eq!(md.renderer().render_inline(&tokens[0].children), "a <em>b</em>");
    }
}
