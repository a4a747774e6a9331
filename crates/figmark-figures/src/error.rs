//! Figure plugin errors.

use figmark_markdown::RuleError;

/// Error resolving figure options or registering the rule.
#[derive(Debug, thiserror::Error)]
pub enum FigureError {
    /// `figcaption` is not one of the accepted values.
    #[error("figcaption must be one of: true,false,alt,title (got {0:?})")]
    InvalidFigcaption(String),
    /// `copyAttrs` is not a valid regular expression.
    #[error("Invalid copyAttrs pattern: {0}")]
    InvalidCopyAttrs(#[from] regex::Error),
    /// The rule could not be added to the parser's core chain.
    #[error("Rule registration failed: {0}")]
    Rule(#[from] RuleError),
}
