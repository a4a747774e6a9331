//! Core rule chain.
//!
//! Core rules run in order over the whole token stream after markdown has
//! been tokenized and before it is rendered. Plugins register their rules
//! relative to named anchors so they never disturb unrelated ordering.

use crate::env::Env;
use crate::linkify::Linkify;
use crate::parser::MarkdownParser;
use crate::token::Token;

/// Error returned when modifying a [`RuleChain`].
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The anchor rule does not exist.
    #[error("Unknown core rule: {0}")]
    UnknownRule(String),
    /// A rule with this name is already registered.
    #[error("Core rule already registered: {0}")]
    DuplicateRule(String),
}

/// Mutable view handed to each core rule.
pub struct CoreState<'a> {
    /// Token stream of the document (or a single inline token in inline mode).
    pub tokens: &'a mut Vec<Token>,
    /// Per-call environment.
    pub env: &'a mut Env,
    /// Parser running the chain, for re-parsing fragments.
    pub parser: &'a MarkdownParser,
    /// Whether the chain runs for [`MarkdownParser::parse_inline`].
    pub inline_mode: bool,
}

/// A named transformation over the token stream.
///
/// Rules must be `Send + Sync`; any per-render state belongs in [`Env`].
pub trait CoreRule: Send + Sync {
    /// Rule name used as an anchor for other rules.
    fn name(&self) -> &str;

    /// Apply the rule to the token stream.
    fn apply(&self, state: &mut CoreState<'_>);
}

/// Ordered list of core rules.
#[derive(Default)]
pub struct RuleChain {
    rules: Vec<Box<dyn CoreRule>>,
}

impl RuleChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain holding the built-in rules (`linkify`).
    pub(crate) fn builtin() -> Self {
        Self {
            rules: vec![Box::new(Linkify)],
        }
    }

    /// Append a rule at the end of the chain.
    pub fn push<R: CoreRule + 'static>(&mut self, rule: R) -> Result<(), RuleError> {
        self.ensure_unique(rule.name())?;
        tracing::debug!(rule = rule.name(), "Registered core rule");
        self.rules.push(Box::new(rule));
        Ok(())
    }

    /// Insert a rule immediately before the named anchor.
    pub fn insert_before<R: CoreRule + 'static>(
        &mut self,
        anchor: &str,
        rule: R,
    ) -> Result<(), RuleError> {
        let pos = self.position(anchor)?;
        self.insert_at(pos, rule)
    }

    /// Insert a rule immediately after the named anchor.
    pub fn insert_after<R: CoreRule + 'static>(
        &mut self,
        anchor: &str,
        rule: R,
    ) -> Result<(), RuleError> {
        let pos = self.position(anchor)?;
        self.insert_at(pos + 1, rule)
    }

    /// Rule names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules.iter().map(|rule| rule.name())
    }

    /// Whether a rule with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names().any(|n| n == name)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &dyn CoreRule> + '_ {
        self.rules.iter().map(|rule| &**rule)
    }

    fn insert_at<R: CoreRule + 'static>(&mut self, pos: usize, rule: R) -> Result<(), RuleError> {
        self.ensure_unique(rule.name())?;
        tracing::debug!(rule = rule.name(), position = pos, "Registered core rule");
        self.rules.insert(pos, Box::new(rule));
        Ok(())
    }

    fn position(&self, anchor: &str) -> Result<usize, RuleError> {
        self.names()
            .position(|name| name == anchor)
            .ok_or_else(|| RuleError::UnknownRule(anchor.to_owned()))
    }

    fn ensure_unique(&self, name: &str) -> Result<(), RuleError> {
        if self.contains(name) {
            return Err(RuleError::DuplicateRule(name.to_owned()));
        }
        Ok(())
    }
}
