//! Token-stream markdown parser with a pluggable core rule chain.
//!
//! Markdown is parsed with `pulldown-cmark` into a flat stream of [`Token`]s:
//! block tokens with explicit open/close markers, and inline content held in
//! the children of [`TokenKind::Inline`] tokens. Core rules ([`CoreRule`])
//! then rewrite the stream in order before [`HtmlRenderer`] serializes it.
//!
//! # Architecture
//!
//! - [`MarkdownParser`]: options, tokenizer and the [`RuleChain`]
//! - [`Env`]: state scoped to one render call (counters)
//! - [`HtmlRenderer`]: token stream to HTML
//!
//! Built-in rules: `linkify` (bare URLs, enabled by
//! [`MarkdownOptions::linkify`]). [`CurlyAttributes`] is opt-in.
//!
//! # Example
//!
//! ```
//! use figmark_markdown::{CurlyAttributes, MarkdownParser};
//!
//! let mut md = MarkdownParser::default();
//! CurlyAttributes::register(&mut md).unwrap();
//! assert_eq!(
//!     md.render("![](a.png){.wide}"),
//!     "<p><img src=\"a.png\" alt=\"\" class=\"wide\"></p>\n"
//! );
//! ```

mod attrs;
mod env;
mod linkify;
mod parser;
mod renderer;
mod rules;
mod token;
mod url;

pub use attrs::CurlyAttributes;
pub use env::Env;
pub use parser::{MarkdownOptions, MarkdownParser};
pub use renderer::{HtmlRenderer, escape_html, render_attrs, render_inline_as_text};
pub use rules::{CoreRule, CoreState, RuleChain, RuleError};
pub use token::{Attrs, Nesting, Token, TokenKind};
