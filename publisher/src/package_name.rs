//! Semantic wrapper for action package names.
//!
//! This module provides the [`PackageName`] newtype for type-safe handling of
//! package names throughout the publisher, together with the URL- and
//! filesystem-safe slug derived from them.

use std::fmt;

/// The display name of an action package, as declared in its descriptor.
///
/// Names are kept verbatim (they may contain spaces and capitals, e.g.
/// `"Google Mail"`). Use [`PackageName::slug`] wherever the name becomes a
/// path segment or part of a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName(String);

impl PackageName {
    /// Create a new package name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the package name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the lower-cased, hyphen-separated form of the name.
    ///
    /// Runs of characters that are not ASCII alphanumerics collapse to a
    /// single `-`, and leading or trailing separators are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use gallery_publisher::package_name::PackageName;
    ///
    /// assert_eq!(PackageName::from("Google Mail").slug(), "google-mail");
    /// assert_eq!(PackageName::from("  Wayback  Machine!").slug(), "wayback-machine");
    /// ```
    #[must_use]
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.0.len());
        let mut pending_separator = false;
        for ch in self.0.chars() {
            if ch.is_ascii_alphanumeric() {
                if pending_separator && !slug.is_empty() {
                    slug.push('-');
                }
                pending_separator = false;
                slug.push(ch.to_ascii_lowercase());
            } else {
                pending_separator = true;
            }
        }
        slug
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::already_slug("alpha", "alpha")]
    #[case::spaces("Google Mail", "google-mail")]
    #[case::mixed_separators("Microsoft_Graph / Mail", "microsoft-graph-mail")]
    #[case::digits("PDF OCR 2", "pdf-ocr-2")]
    #[case::only_symbols("***", "")]
    fn slug_collapses_separators(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(PackageName::from(name).slug(), expected);
    }

    #[test]
    fn display_keeps_original_name() {
        let name = PackageName::from("Google Docs");
        assert_eq!(name.to_string(), "Google Docs");
    }
}
