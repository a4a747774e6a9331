//! Configuration for figmark parsers.
//!
//! Parses `figmark.toml` with serde and discovers the file in the current
//! directory or its parents.
//!
//! ```toml
//! [markdown]
//! linkify = true
//! curly_attributes = true
//!
//! [figures]
//! figcaption = "title"
//! tabindex = true
//! classes = "figure-img"
//! copyAttrs = "^class$"
//! ```
//!
//! ## Environment Variable Expansion
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `figures.classes`
//! - `figures.copyAttrs`

mod expand;

use std::path::{Path, PathBuf};

use figmark_figures::{FigureError, FigureOptions, ImageFigures, RawCopyAttrs, RawFigureOptions};
use figmark_markdown::{CurlyAttributes, MarkdownOptions, MarkdownParser, RuleError};
use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "figmark.toml";

/// Parser configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Markdown parser options.
    pub markdown: MarkdownConfig,
    /// Figure options as written in the file.
    pub figures: RawFigureOptions,

    /// Validated figure options (set after loading).
    #[serde(skip)]
    pub figures_resolved: FigureOptions,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// `[markdown]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Tables, strikethrough and task lists.
    pub gfm: bool,
    /// Autolink bare URLs.
    pub linkify: bool,
    /// Soft line breaks render as `<br>`.
    pub breaks: bool,
    /// Self-closing void elements.
    pub xhtml_out: bool,
    /// Raw HTML passthrough.
    pub html: bool,
    /// `{.class key=value}` attribute syntax.
    pub curly_attributes: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            gfm: true,
            linkify: false,
            breaks: false,
            xhtml_out: false,
            html: false,
            curly_attributes: false,
        }
    }
}

impl MarkdownConfig {
    /// Parser options for this section.
    #[must_use]
    pub fn options(&self) -> MarkdownOptions {
        MarkdownOptions::default()
            .with_gfm(self.gfm)
            .with_linkify(self.linkify)
            .with_breaks(self.breaks)
            .with_xhtml_out(self.xhtml_out)
            .with_html(self.html)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`figures.classes`").
        field: String,
        /// Error message (e.g., "${`FIGURE_CLASSES`} not set").
        message: String,
    },
    /// Invalid `[figures]` options.
    #[error("Invalid [figures] configuration: {0}")]
    Figures(#[from] FigureError),
    /// Rule registration failed while building a parser.
    #[error("Parser setup failed: {0}")]
    Rule(#[from] RuleError),
}

impl Config {
    /// Load configuration from file.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `figmark.toml` in current directory and parents,
    /// falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the figure options are invalid.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_from_file(path);
        }

        let cwd = std::env::current_dir()?;
        match discover_config(&cwd) {
            Some(discovered) => Self::load_from_file(&discovered),
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.expand_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Build a parser with the configured extensions registered.
    ///
    /// Curly attributes (when enabled) are registered ahead of figures so
    /// `![](a.png){.wide}` still counts as an image-only paragraph.
    pub fn build_parser(&self) -> Result<MarkdownParser, ConfigError> {
        let mut md = MarkdownParser::new(self.markdown.options());
        if self.markdown.curly_attributes {
            CurlyAttributes::register(&mut md)?;
        }
        ImageFigures::new(self.figures_resolved.clone()).register(&mut md)?;
        Ok(md)
    }

    /// Validate configuration values and resolve figure options.
    ///
    /// Called automatically after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figures` for an invalid `figcaption` value or
    /// `copyAttrs` pattern.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if let Some(classes) = &self.figures.classes
            && classes.contains(['"', '<', '>'])
        {
            return Err(ConfigError::Validation(
                "figures.classes cannot contain quotes or angle brackets".to_owned(),
            ));
        }
        self.figures_resolved = FigureOptions::resolve(self.figures.clone())?;
        Ok(())
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref classes) = self.figures.classes {
            self.figures.classes = Some(expand::expand_env(classes, "figures.classes")?);
        }
        if let RawCopyAttrs::Pattern(ref pattern) = self.figures.copy_attrs {
            self.figures.copy_attrs =
                RawCopyAttrs::Pattern(expand::expand_env(pattern, "figures.copyAttrs")?);
        }
        Ok(())
    }
}

/// Search for the config file in `start` and its parents.
fn discover_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}
