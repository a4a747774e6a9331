//! Autolinking of bare URLs and email addresses in text tokens.

use std::sync::LazyLock;

use regex::Regex;

use crate::rules::{CoreRule, CoreState};
use crate::token::{Nesting, Token, TokenKind};
use crate::url::normalize_link;

static LINK_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:https?://|ftp://|mailto:|www\.)[^\s<>]+|\b[a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)+",
    )
    .unwrap()
});

/// Built-in `linkify` core rule; active when `MarkdownOptions::linkify` is set.
pub(crate) struct Linkify;

impl CoreRule for Linkify {
    fn name(&self) -> &str {
        "linkify"
    }

    fn apply(&self, state: &mut CoreState<'_>) {
        if !state.parser.options().linkify {
            return;
        }
        for token in state.tokens.iter_mut() {
            if token.kind == TokenKind::Inline {
                let children = std::mem::take(&mut token.children);
                token.children = linkify_children(children);
            }
        }
    }
}

fn linkify_children(children: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(children.len());
    let mut link_depth = 0usize;
    for token in children {
        match token.kind {
            TokenKind::LinkOpen => link_depth += 1,
            TokenKind::LinkClose => link_depth = link_depth.saturating_sub(1),
            TokenKind::Text if link_depth == 0 => {
                split_text(token, &mut out);
                continue;
            }
            _ => {}
        }
        out.push(token);
    }
    out
}

/// Split a text token around the links it contains.
fn split_text(token: Token, out: &mut Vec<Token>) {
    let text = token.content.as_str();
    let level = token.level;
    let mut last = 0;

    for candidate in LINK_CANDIDATE.find_iter(text) {
        let start = candidate.start();
        if start < last {
            continue;
        }
        let link_text = trim_trailing(candidate.as_str());
        if link_text.is_empty() {
            continue;
        }

        if start > last {
            out.push(Token::text(&text[last..start]).with_level(level));
        }
        out.push(
            Token::new(TokenKind::LinkOpen, "a", Nesting::Opening)
                .with_attr("href", normalize_link(&href_for(link_text)))
                .with_level(level),
        );
        if let Some(open) = out.last_mut() {
            "linkify".clone_into(&mut open.markup);
        }
        out.push(Token::text(link_text).with_level(level + 1));
        out.push(Token::new(TokenKind::LinkClose, "a", Nesting::Closing).with_level(level));
        last = start + link_text.len();
    }

    if last == 0 {
        out.push(token);
    } else if last < text.len() {
        out.push(Token::text(&text[last..]).with_level(level));
    }
}

fn href_for(link_text: &str) -> String {
    let lower = link_text.to_ascii_lowercase();
    if lower.starts_with("www.") {
        format!("http://{link_text}")
    } else if !lower.contains("://") && !lower.starts_with("mailto:") && link_text.contains('@') {
        format!("mailto:{link_text}")
    } else {
        link_text.to_owned()
    }
}

/// Drop trailing punctuation and unbalanced closing parentheses.
fn trim_trailing(candidate: &str) -> &str {
    let mut end = candidate.len();
    loop {
        let current = &candidate[..end];
        let Some(last) = current.chars().last() else {
            break;
        };
        let strip = match last {
            '.' | ',' | ':' | ';' | '!' | '?' | '"' | '\'' | '*' | '_' | '~' => true,
            ')' => current.matches('(').count() < current.matches(')').count(),
            _ => false,
        };
        if !strip {
            break;
        }
        end -= last.len_utf8();
    }
    &candidate[..end]
}
