//! Implicit figures for markdown.
//!
//! A paragraph whose only content is an image, optionally wrapped in a single
//! link, is rendered as `<figure>` instead of `<p>`:
//!
//! ```text
//! ![Alt](fig.png "A caption")
//! ```
//!
//! becomes, with `figcaption = "title"`,
//!
//! ```html
//! <figure><img src="fig.png" alt="Alt"><figcaption>A caption</figcaption></figure>
//! ```
//!
//! The plugin is a core rule (`image_figures`) on a
//! [`MarkdownParser`](figmark_markdown::MarkdownParser), registered before
//! `linkify`. Options are validated once, when the rule is registered.
//!
//! # Example
//!
//! ```
//! use figmark_figures::RawFigureOptions;
//! use figmark_markdown::MarkdownParser;
//!
//! let mut md = MarkdownParser::default();
//! let options = RawFigureOptions {
//!     data_type: true,
//!     ..RawFigureOptions::default()
//! };
//! figmark_figures::register(&mut md, options).unwrap();
//!
//! assert_eq!(
//!     md.render("![](fig.png)"),
//!     "<figure data-type=\"image\"><img src=\"fig.png\" alt=\"\"></figure>\n"
//! );
//! ```

mod caption;
mod classify;
mod error;
mod options;
mod rewrite;

pub use classify::{Classification, classify};
pub use error::FigureError;
pub use options::{CaptionSource, FigureOptions, RawCopyAttrs, RawFigcaption, RawFigureOptions};
pub use rewrite::ImageFigures;

use figmark_markdown::MarkdownParser;

/// Validate raw options and register the `image_figures` rule.
///
/// Invalid options fail here, before any document is rendered.
pub fn register(md: &mut MarkdownParser, options: RawFigureOptions) -> Result<(), FigureError> {
    let options = FigureOptions::resolve(options)?;
    ImageFigures::new(options).register(md)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figmark_markdown::{CurlyAttributes, MarkdownOptions};
    use pretty_assertions::assert_eq;

    fn raw(json: &str) -> RawFigureOptions {
        serde_json::from_str(json).unwrap()
    }

    fn render_with(json: &str, src: &str) -> String {
        let mut md = MarkdownParser::default();
        register(&mut md, raw(json)).unwrap();
        md.render(src)
    }

    /// Parser with curly attributes registered ahead of figures.
    fn render_with_attrs(json: &str, src: &str) -> String {
        let mut md = MarkdownParser::default();
        CurlyAttributes::register(&mut md).unwrap();
        register(&mut md, raw(json)).unwrap();
        md.render(src)
    }

    #[test]
    fn test_image_alone_becomes_figure() {
        assert_eq!(
            render_with("{}", "text with ![](img.png)\n\n![](fig.png)\n\nanother paragraph"),
            "<p>text with <img src=\"img.png\" alt=\"\"></p>\n<figure><img src=\"fig.png\" alt=\"\"></figure>\n<p>another paragraph</p>\n"
        );
    }

    #[test]
    fn test_linked_image_with_caption() {
        assert_eq!(
            render_with(
                r#"{"dataType": true, "figcaption": true}"#,
                r#"[![](fig.png "Caption")](http://example.com)"#
            ),
            "<figure data-type=\"image\"><a href=\"http://example.com\"><img src=\"fig.png\" alt=\"\"></a><figcaption>Caption</figcaption></figure>\n"
        );
    }

    #[test]
    fn test_data_type() {
        assert_eq!(
            render_with(r#"{"dataType": true}"#, "![](fig.png)\n"),
            "<figure data-type=\"image\"><img src=\"fig.png\" alt=\"\"></figure>\n"
        );
    }

    #[test]
    fn test_title_caption() {
        for figcaption in ["true", r#""title""#] {
            assert_eq!(
                render_with(
                    &format!(r#"{{"figcaption": {figcaption}}}"#),
                    "![alt 1](fig.png \"caption 1\")\n\n![alt 2](fig2.png \"caption 2\")"
                ),
                "<figure><img src=\"fig.png\" alt=\"alt 1\"><figcaption>caption 1</figcaption></figure>\n<figure><img src=\"fig2.png\" alt=\"alt 2\"><figcaption>caption 2</figcaption></figure>\n",
                "{figcaption}"
            );
        }
    }

    #[test]
    fn test_alt_caption() {
        assert_eq!(
            render_with(
                r#"{"figcaption": "alt"}"#,
                r#"![This is an alt](fig.png "This is a caption")"#
            ),
            "<figure><img src=\"fig.png\" alt=\"This is an alt\"><figcaption>This is an alt</figcaption></figure>\n"
        );
    }

    #[test]
    fn test_alt_caption_keeps_markup() {
        assert_eq!(
            render_with(r#"{"figcaption": "alt"}"#, "![A *big* cat](cat.png)"),
            "<figure><img src=\"cat.png\" alt=\"A big cat\"><figcaption>A <em>big</em> cat</figcaption></figure>\n"
        );
    }

    #[test]
    fn test_empty_caption_emits_nothing() {
        assert_eq!(
            render_with(r#"{"figcaption": "title"}"#, "![alt](fig.png)"),
            "<figure><img src=\"fig.png\" alt=\"alt\"></figure>\n"
        );
        assert_eq!(
            render_with(r#"{"figcaption": "alt"}"#, "![](fig.png \"T\")"),
            "<figure><img src=\"fig.png\" alt=\"\" title=\"T\"></figure>\n"
        );
    }

    #[test]
    fn test_invalid_figcaption_fails_on_empty_document() {
        let mut md = MarkdownParser::default();
        let err = register(&mut md, raw(r#"{"figcaption": "ttitle"}"#)).unwrap_err();
        assert!(
            err.to_string()
                .contains("figcaption must be one of: true,false,alt,title")
        );
        assert!(!md.core().contains(ImageFigures::NAME));
    }

    #[test]
    fn test_tabindex_increments() {
        assert_eq!(
            render_with(r#"{"tabindex": true}"#, "![](fig.png)\n\n![](fig2.png)"),
            "<figure tabindex=\"1\"><img src=\"fig.png\" alt=\"\"></figure>\n<figure tabindex=\"2\"><img src=\"fig2.png\" alt=\"\"></figure>\n"
        );
    }

    #[test]
    fn test_tabindex_resets_per_render() {
        let mut md = MarkdownParser::default();
        register(&mut md, raw(r#"{"tabindex": true}"#)).unwrap();
        let src = "![](fig.png)\n\n![](fig2.png)";
        let first = md.render(src);
        assert_eq!(md.render(src), first);
        assert!(first.contains("tabindex=\"2\""));
        assert!(!first.contains("tabindex=\"3\""));
    }

    #[test]
    fn test_tabindex_independent_across_threads() {
        let mut md = MarkdownParser::default();
        register(&mut md, raw(r#"{"tabindex": true}"#)).unwrap();
        let src = "![](a.png)\n\n![](b.png)\n\n![](c.png)";
        let expected = md.render(src);

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| md.render(src))).collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn test_text_paragraphs_untouched() {
        assert_eq!(
            render_with("{}", "Text.\n\nAnd `code`."),
            "<p>Text.</p>\n<p>And <code>code</code>.</p>\n"
        );
        assert_eq!(
            render_with("{}", "[link](page.html)"),
            "<p><a href=\"page.html\">link</a></p>\n"
        );
    }

    #[test]
    fn test_tight_list_image_untouched() {
        assert_eq!(
            render_with("{}", "- ![](a.png)"),
            "<ul>\n<li><img src=\"a.png\" alt=\"\"></li>\n</ul>\n"
        );
    }

    #[test]
    fn test_loose_list_image_becomes_figure() {
        assert_eq!(
            render_with("{}", "- ![](a.png)\n\n- b"),
            "<ul>\n<li>\n<figure><img src=\"a.png\" alt=\"\"></figure>\n</li>\n<li>\n<p>b</p>\n</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_linkify_caption() {
        let mut md = MarkdownParser::new(MarkdownOptions::default().with_linkify(true));
        register(&mut md, raw(r#"{"figcaption": true}"#)).unwrap();
        assert_eq!(
            md.render(r#"![](fig.png "www.google.com")"#),
            "<figure><img src=\"fig.png\" alt=\"\"><figcaption><a href=\"http://www.google.com\">www.google.com</a></figcaption></figure>\n"
        );
    }

    #[test]
    fn test_curly_attributes() {
        assert_eq!(
            render_with_attrs("{}", "![](fig.png){.asdf}"),
            "<figure><img src=\"fig.png\" alt=\"\" class=\"asdf\"></figure>\n"
        );
    }

    #[test]
    fn test_link_wraps_unlinked_image() {
        assert_eq!(
            render_with(r#"{"link": true}"#, "![www.google.com](fig.png)"),
            "<figure><a href=\"fig.png\"><img src=\"fig.png\" alt=\"www.google.com\"></a></figure>\n"
        );
    }

    #[test]
    fn test_link_with_caption() {
        assert_eq!(
            render_with(
                r#"{"figcaption": true, "link": true}"#,
                r#"![](fig.png "www.google.com")"#
            ),
            "<figure><a href=\"fig.png\"><img src=\"fig.png\" alt=\"\"></a><figcaption>www.google.com</figcaption></figure>\n"
        );
    }

    #[test]
    fn test_link_keeps_existing_link() {
        assert_eq!(
            render_with(r#"{"link": true}"#, "[![www.google.com](fig.png)](link.html)"),
            "<figure><a href=\"link.html\"><img src=\"fig.png\" alt=\"www.google.com\"></a></figure>\n"
        );
    }

    #[test]
    fn test_caption_markup() {
        assert_eq!(
            render_with(
                r#"{"figcaption": true}"#,
                r#"![](fig.png "Image from [source](to)")"#
            ),
            "<figure><img src=\"fig.png\" alt=\"\"><figcaption>Image from <a href=\"to\">source</a></figcaption></figure>\n"
        );
    }

    #[test]
    fn test_caption_block_markers_stay_inline() {
        assert_eq!(
            render_with(r#"{"figcaption": true}"#, r##"![](fig.png "# Not a heading")"##),
            "<figure><img src=\"fig.png\" alt=\"\"><figcaption># Not a heading</figcaption></figure>\n"
        );
    }

    #[test]
    fn test_caption_html_block_stays_inline() {
        assert_eq!(
            render_with(r#"{"figcaption": true}"#, r#"![](fig.png "<div>hello</div>")"#),
            "<figure><img src=\"fig.png\" alt=\"\"><figcaption>&lt;div&gt;hello&lt;/div&gt;</figcaption></figure>\n"
        );
    }

    #[test]
    fn test_caption_reference_definition_stays_text() {
        assert_eq!(
            render_with(r#"{"figcaption": true}"#, r#"![](fig.png "[a]: http://x.com")"#),
            "<figure><img src=\"fig.png\" alt=\"\"><figcaption>[a]: http://x.com</figcaption></figure>\n"
        );
    }

    #[test]
    fn test_caption_uses_document_references() {
        assert_eq!(
            render_with(
                r#"{"figcaption": true}"#,
                "![](fig.png \"see [docs]\")\n\n[docs]: http://example.com"
            ),
            "<figure><img src=\"fig.png\" alt=\"\"><figcaption>see <a href=\"http://example.com\">docs</a></figcaption></figure>\n"
        );
        assert_eq!(
            render_with(
                r#"{"figcaption": "alt"}"#,
                "![see [docs]](fig.png)\n\n[docs]: http://example.com"
            ),
            "<figure><img src=\"fig.png\" alt=\"see docs\"><figcaption>see <a href=\"http://example.com\">docs</a></figcaption></figure>\n"
        );
    }

    #[test]
    fn test_non_breaking_space_keeps_paragraph() {
        assert_eq!(
            render_with("{}", "![](fig.png)&nbsp;"),
            "<p><img src=\"fig.png\" alt=\"\">\u{a0}</p>\n"
        );
    }

    #[test]
    fn test_copy_attrs() {
        assert_eq!(
            render_with_attrs(r#"{"copyAttrs": "^class$"}"#, "![alt](fig.png){.cls attr=val}"),
            "<figure class=\"cls\"><img src=\"fig.png\" alt=\"alt\" class=\"cls\" attr=\"val\"></figure>\n"
        );
    }

    #[test]
    fn test_lazy() {
        assert_eq!(
            render_with_attrs(r#"{"lazy": true}"#, "![alt](fig.png)"),
            "<figure><img src=\"fig.png\" alt=\"alt\" loading=\"lazy\"></figure>\n"
        );
        assert_eq!(
            render_with_attrs(r#"{"lazy": true}"#, "![alt](fig.png){loading=eager}"),
            "<figure><img src=\"fig.png\" alt=\"alt\" loading=\"eager\"></figure>\n"
        );
    }

    #[test]
    fn test_async_decoding() {
        assert_eq!(
            render_with_attrs(r#"{"async": true}"#, "![alt](fig.png)"),
            "<figure><img src=\"fig.png\" alt=\"alt\" decoding=\"async\"></figure>\n"
        );
        assert_eq!(
            render_with_attrs(r#"{"async": true}"#, "![alt](fig.png){decoding=sync}"),
            "<figure><img src=\"fig.png\" alt=\"alt\" decoding=\"sync\"></figure>\n"
        );
    }

    #[test]
    fn test_remove_src() {
        assert_eq!(
            render_with_attrs(r#"{"removeSrc": true}"#, "![alt](fig.png)"),
            "<figure><img alt=\"alt\" data-src=\"fig.png\"></figure>\n"
        );
    }

    #[test]
    fn test_classes() {
        assert_eq!(
            render_with_attrs(r#"{"classes": "one two"}"#, "![alt](fig.png)"),
            "<figure><img src=\"fig.png\" alt=\"alt\" class=\"one two\"></figure>\n"
        );
    }

    #[test]
    fn test_copy_attrs_with_classes() {
        assert_eq!(
            render_with_attrs(
                r#"{"copyAttrs": "^class$", "classes": "one two"}"#,
                "![alt](fig.png){.cls attr=val}"
            ),
            "<figure class=\"cls one two\"><img src=\"fig.png\" alt=\"alt\" class=\"cls one two\" attr=\"val\"></figure>\n"
        );
    }

    #[test]
    fn test_builder_options() {
        let mut md = MarkdownParser::default();
        ImageFigures::new(
            FigureOptions::default()
                .with_figcaption(CaptionSource::Alt)
                .with_tabindex(true)
                .with_lazy(true),
        )
        .register(&mut md)
        .unwrap();
        assert_eq!(
            md.render("![Cat](cat.png)"),
            "<figure tabindex=\"1\"><img src=\"cat.png\" alt=\"Cat\" loading=\"lazy\"><figcaption>Cat</figcaption></figure>\n"
        );
    }
}
