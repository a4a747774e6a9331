//! Curly attribute syntax: `{.class #id key=value key="quoted value"}`.
//!
//! An attribute block directly after an inline element applies to that
//! element (`![](a.png){.wide}`, `*em*{.x}`); at the end of a paragraph or
//! heading it applies to the block (`# Title {#top}`).

use crate::parser::MarkdownParser;
use crate::rules::{CoreRule, CoreState, RuleError};
use crate::token::{Attrs, Token, TokenKind};

/// Core rule applying curly attribute blocks.
///
/// Not part of the default chain; register it with [`CurlyAttributes::register`].
pub struct CurlyAttributes;

impl CurlyAttributes {
    /// Rule name in the core chain.
    pub const NAME: &'static str = "curly_attributes";

    /// Register the rule before `linkify`.
    pub fn register(md: &mut MarkdownParser) -> Result<(), RuleError> {
        md.core_mut().insert_before("linkify", Self)
    }
}

impl CoreRule for CurlyAttributes {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, state: &mut CoreState<'_>) {
        let tokens = &mut *state.tokens;
        for idx in 0..tokens.len() {
            if tokens[idx].kind != TokenKind::Inline {
                continue;
            }
            apply_inline(&mut tokens[idx].children);

            if idx == 0 {
                continue;
            }
            let (before, rest) = tokens.split_at_mut(idx);
            let opener = &mut before[idx - 1];
            if matches!(opener.kind, TokenKind::ParagraphOpen | TokenKind::HeadingOpen)
                && !opener.hidden
                && let Some(attrs) = take_trailing(&mut rest[0].children)
            {
                apply_attrs(&mut opener.attrs, attrs);
            }
        }
    }
}

/// Apply attribute blocks that directly follow an inline element.
fn apply_inline(children: &mut Vec<Token>) {
    let mut idx = 1;
    while idx < children.len() {
        if children[idx].kind == TokenKind::Text
            && children[idx].content.starts_with('{')
            && let Some(target) = attr_target(children, idx - 1)
            && let Some((attrs, consumed)) = parse_attr_block(&children[idx].content)
        {
            apply_attrs(&mut children[target].attrs, attrs);
            children[idx].content.replace_range(..consumed, "");
            if children[idx].content.is_empty() {
                children.remove(idx);
                continue;
            }
        }
        idx += 1;
    }
}

/// Index of the token an attribute block after `prev` applies to.
fn attr_target(children: &[Token], prev: usize) -> Option<usize> {
    let token = &children[prev];
    match token.kind {
        TokenKind::Image | TokenKind::CodeInline => Some(prev),
        TokenKind::LinkClose
        | TokenKind::EmClose
        | TokenKind::StrongClose
        | TokenKind::StrikethroughClose => {
            let opener = token.kind.opener()?;
            children[..prev]
                .iter()
                .rposition(|t| t.kind == opener && t.level == token.level)
        }
        _ => None,
    }
}

/// Remove a trailing `{...}` block from the last text child.
fn take_trailing(children: &mut Vec<Token>) -> Option<Vec<(String, String)>> {
    let last = children.last_mut()?;
    if last.kind != TokenKind::Text || !last.content.ends_with('}') {
        return None;
    }
    let start = last.content.rfind('{')?;
    let (attrs, consumed) = parse_attr_block(&last.content[start..])?;
    if start + consumed != last.content.len() {
        return None;
    }

    last.content.truncate(start);
    let trimmed = last.content.trim_end().len();
    last.content.truncate(trimmed);
    if last.content.is_empty() {
        children.pop();
    }
    Some(attrs)
}

fn apply_attrs(target: &mut Attrs, attrs: Vec<(String, String)>) {
    for (name, value) in attrs {
        if name == "class" {
            target.join("class", &value);
        } else {
            target.set(name, value);
        }
    }
}

/// Parse a `{...}` block at the start of `s`.
///
/// Returns the attributes and the number of bytes consumed.
fn parse_attr_block(s: &str) -> Option<(Vec<(String, String)>, usize)> {
    if !s.starts_with('{') {
        return None;
    }
    let mut quote: Option<char> = None;
    let mut close = None;
    for (i, c) in s.char_indices().skip(1) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '}' => {
                    close = Some(i);
                    break;
                }
                '{' => return None,
                _ => {}
            },
        }
    }
    let close = close?;
    let attrs = parse_attr_list(&s[1..close])?;
    if attrs.is_empty() {
        return None;
    }
    Some((attrs, close + 1))
}

fn parse_attr_list(body: &str) -> Option<Vec<(String, String)>> {
    split_words(body)
        .into_iter()
        .map(|word| parse_word(&word))
        .collect()
}

/// Split on whitespace outside quotes.
fn split_words(body: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in body.chars() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                current.push(c);
            }
            Some(_) => current.push(c),
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                current.push(c);
            }
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn parse_word(word: &str) -> Option<(String, String)> {
    if let Some(class) = word.strip_prefix('.') {
        return is_value(class).then(|| ("class".to_owned(), class.to_owned()));
    }
    if let Some(id) = word.strip_prefix('#') {
        return is_value(id).then(|| ("id".to_owned(), id.to_owned()));
    }
    let (name, value) = match word.split_once('=') {
        Some((name, value)) => (name, unquote(value)),
        None => (word, ""),
    };
    is_name(name).then(|| (name.to_owned(), value.to_owned()))
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(q).and_then(|v| v.strip_suffix(q)) {
            return inner;
        }
    }
    value
}

fn is_value(s: &str) -> bool {
    !s.is_empty() && !s.contains(['"', '\'', '=', '{', '}'])
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}
