//! Figure options: raw (deserialized) and resolved forms.
//!
//! [`RawFigureOptions`] mirrors the loosely typed option object (camelCase
//! keys, `figcaption` as bool or string). Resolving it into
//! [`FigureOptions`] validates every value once, at registration time.

use regex::Regex;
use serde::Deserialize;

use crate::error::FigureError;

/// Untyped figure options as written in configuration.
///
/// Unknown keys are ignored; every key defaults to off.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct RawFigureOptions {
    pub data_type: bool,
    pub figcaption: RawFigcaption,
    pub tabindex: bool,
    pub link: bool,
    pub lazy: bool,
    #[serde(rename = "async")]
    pub async_decoding: bool,
    pub remove_src: bool,
    pub classes: Option<String>,
    pub copy_attrs: RawCopyAttrs,
}

/// `figcaption` value: `true`, `false`, `"alt"` or `"title"`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RawFigcaption {
    Flag(bool),
    Source(String),
}

impl Default for RawFigcaption {
    fn default() -> Self {
        Self::Flag(false)
    }
}

/// `copyAttrs` value: a pattern over attribute names, or `true` for all.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RawCopyAttrs {
    Flag(bool),
    Pattern(String),
}

impl Default for RawCopyAttrs {
    fn default() -> Self {
        Self::Flag(false)
    }
}

/// Where caption text comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptionSource {
    /// The image title (`figcaption = true` or `"title"`).
    Title,
    /// The raw alt text.
    Alt,
}

impl CaptionSource {
    /// Resolve a raw `figcaption` value. `None` means captions are off.
    pub fn resolve(raw: &RawFigcaption) -> Result<Option<Self>, FigureError> {
        match raw {
            RawFigcaption::Flag(false) => Ok(None),
            RawFigcaption::Flag(true) => Ok(Some(Self::Title)),
            RawFigcaption::Source(value) => match value.as_str() {
                "false" => Ok(None),
                "true" | "title" => Ok(Some(Self::Title)),
                "alt" => Ok(Some(Self::Alt)),
                _ => Err(FigureError::InvalidFigcaption(value.clone())),
            },
        }
    }
}

/// Validated figure options.
///
/// # Example
///
/// ```
/// use figmark_figures::{CaptionSource, FigureOptions};
///
/// let options = FigureOptions::default()
///     .with_figcaption(CaptionSource::Alt)
///     .with_tabindex(true);
/// assert!(options.tabindex);
/// ```
#[derive(Clone, Debug, Default)]
pub struct FigureOptions {
    /// Add `data-type="image"` to the figure.
    pub data_type: bool,
    /// Caption source; `None` disables captions.
    pub figcaption: Option<CaptionSource>,
    /// Number figures with `tabindex`, starting at 1 per render.
    pub tabindex: bool,
    /// Wrap unlinked images in a link to their source.
    pub link: bool,
    /// Add `loading="lazy"` unless set explicitly.
    pub lazy: bool,
    /// Add `decoding="async"` unless set explicitly.
    pub async_decoding: bool,
    /// Move `src` to `data-src`.
    pub remove_src: bool,
    /// Classes appended to the image `class`.
    pub classes: Option<String>,
    /// Image attributes copied onto the figure.
    pub copy_attrs: Option<Regex>,
}

impl FigureOptions {
    /// Validate raw options.
    pub fn resolve(raw: RawFigureOptions) -> Result<Self, FigureError> {
        let figcaption = CaptionSource::resolve(&raw.figcaption)?;
        let copy_attrs = match raw.copy_attrs {
            RawCopyAttrs::Flag(false) => None,
            RawCopyAttrs::Flag(true) => Some(Regex::new("")?),
            RawCopyAttrs::Pattern(pattern) if pattern.is_empty() => None,
            RawCopyAttrs::Pattern(pattern) => Some(Regex::new(&pattern)?),
        };
        let classes = raw
            .classes
            .map(|classes| classes.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|classes| !classes.is_empty());

        Ok(Self {
            data_type: raw.data_type,
            figcaption,
            tabindex: raw.tabindex,
            link: raw.link,
            lazy: raw.lazy,
            async_decoding: raw.async_decoding,
            remove_src: raw.remove_src,
            classes,
            copy_attrs,
        })
    }

    #[must_use]
    pub fn with_data_type(mut self, enabled: bool) -> Self {
        self.data_type = enabled;
        self
    }

    #[must_use]
    pub fn with_figcaption(mut self, source: CaptionSource) -> Self {
        self.figcaption = Some(source);
        self
    }

    #[must_use]
    pub fn with_tabindex(mut self, enabled: bool) -> Self {
        self.tabindex = enabled;
        self
    }

    #[must_use]
    pub fn with_link(mut self, enabled: bool) -> Self {
        self.link = enabled;
        self
    }

    #[must_use]
    pub fn with_lazy(mut self, enabled: bool) -> Self {
        self.lazy = enabled;
        self
    }

    #[must_use]
    pub fn with_async_decoding(mut self, enabled: bool) -> Self {
        self.async_decoding = enabled;
        self
    }

    #[must_use]
    pub fn with_remove_src(mut self, enabled: bool) -> Self {
        self.remove_src = enabled;
        self
    }

    #[must_use]
    pub fn with_classes(mut self, classes: impl Into<String>) -> Self {
        self.classes = Some(classes.into());
        self
    }

    #[must_use]
    pub fn with_copy_attrs(mut self, pattern: Regex) -> Self {
        self.copy_attrs = Some(pattern);
        self
    }
}

impl TryFrom<RawFigureOptions> for FigureOptions {
    type Error = FigureError;

    fn try_from(raw: RawFigureOptions) -> Result<Self, Self::Error> {
        Self::resolve(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw(json: &str) -> RawFigureOptions {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_defaults_are_off() {
        let options = FigureOptions::resolve(RawFigureOptions::default()).unwrap();
        assert!(!options.data_type);
        assert_eq!(options.figcaption, None);
        assert!(options.classes.is_none());
        assert!(options.copy_attrs.is_none());
    }

    #[test]
    fn test_camel_case_keys() {
        let raw = raw(
            r#"{"dataType": true, "removeSrc": true, "async": true, "copyAttrs": "^class$", "unknown": 1}"#,
        );
        assert!(raw.data_type);
        assert!(raw.remove_src);
        assert!(raw.async_decoding);
        assert_eq!(raw.copy_attrs, RawCopyAttrs::Pattern("^class$".to_owned()));
    }

    #[test]
    fn test_figcaption_values() {
        for (json, expected) in [
            (r#"{"figcaption": true}"#, Some(CaptionSource::Title)),
            (r#"{"figcaption": false}"#, None),
            (r#"{"figcaption": "title"}"#, Some(CaptionSource::Title)),
            (r#"{"figcaption": "alt"}"#, Some(CaptionSource::Alt)),
            (r#"{"figcaption": "true"}"#, Some(CaptionSource::Title)),
        ] {
            let options = FigureOptions::resolve(raw(json)).unwrap();
            assert_eq!(options.figcaption, expected, "{json}");
        }
    }

    #[test]
    fn test_invalid_figcaption() {
        let err = FigureOptions::resolve(raw(r#"{"figcaption": "ttitle"}"#)).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"figcaption must be one of: true,false,alt,title (got "ttitle")"#
        );
    }

    #[test]
    fn test_figcaption_is_case_sensitive() {
        let result = FigureOptions::try_from(raw(r#"{"figcaption": "Alt"}"#));
        assert!(matches!(result, Err(FigureError::InvalidFigcaption(v)) if v == "Alt"));
    }

    #[test]
    fn test_invalid_copy_attrs_pattern() {
        let result = FigureOptions::resolve(raw(r#"{"copyAttrs": "("}"#));
        assert!(matches!(result, Err(FigureError::InvalidCopyAttrs(_))));
    }

    #[test]
    fn test_copy_attrs_true_matches_everything() {
        let options = FigureOptions::resolve(raw(r#"{"copyAttrs": true}"#)).unwrap();
        let pattern = options.copy_attrs.unwrap();
        assert!(pattern.is_match("class"));
        assert!(pattern.is_match("data-x"));
    }

    #[test]
    fn test_empty_values_disable() {
        let options = FigureOptions::resolve(raw(r#"{"copyAttrs": "", "classes": "  "}"#)).unwrap();
        assert!(options.copy_attrs.is_none());
        assert!(options.classes.is_none());
    }

    #[test]
    fn test_classes_normalized() {
        let options = FigureOptions::resolve(raw(r#"{"classes": " one   two "}"#)).unwrap();
        assert_eq!(options.classes.as_deref(), Some("one two"));
    }
}
