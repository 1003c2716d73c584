//! Restricted distribution variants.
//!
//! A whitelist file names the packages each distribution may carry:
//!
//! ```json
//! { "standard": ["Google Mail", "slack"], "spcs": ["snowflake"] }
//! ```
//!
//! Entries match a package's display name or its slug.

use super::MANIFEST_FILE;
use crate::error::{PublisherError, Result};
use crate::package_name::PackageName;
use camino::Utf8Path;
use serde::Deserialize;
use std::collections::BTreeSet;

/// File name of the `spcs` manifest variant.
pub const SPCS_MANIFEST_FILE: &str = "manifest_spcs.json";

/// Package names allowed in each distribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Whitelist {
    /// Packages in the standard distribution.
    #[serde(default)]
    pub standard: BTreeSet<String>,
    /// Packages in the `spcs` distribution.
    #[serde(default)]
    pub spcs: BTreeSet<String>,
}

impl Whitelist {
    /// Load a whitelist file.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidWhitelist`] if the file cannot be
    /// read or parsed. A bad whitelist is fatal: publishing an unfiltered
    /// manifest in its place would leak packages into a restricted variant.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let invalid = |reason: String| PublisherError::InvalidWhitelist {
            path: path.to_owned(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))
    }
}

/// One manifest file to produce and the packages it may list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestVariant {
    /// File name under the gallery root.
    pub file_name: &'static str,
    /// Allowed names; `None` allows everything.
    pub allowed: Option<BTreeSet<String>>,
}

impl ManifestVariant {
    /// Return true when `name` may appear in this variant.
    #[must_use]
    pub fn allows(&self, name: &PackageName) -> bool {
        self.allowed.as_ref().is_none_or(|allowed| {
            allowed.contains(name.as_str()) || allowed.contains(&name.slug())
        })
    }
}

/// The manifests a run writes.
///
/// Without a whitelist there is one unrestricted `manifest.json`. With one,
/// `manifest.json` carries the `standard` list and `manifest_spcs.json` the
/// `spcs` list.
#[must_use]
pub fn variants(whitelist: Option<&Whitelist>) -> Vec<ManifestVariant> {
    match whitelist {
        None => vec![ManifestVariant {
            file_name: MANIFEST_FILE,
            allowed: None,
        }],
        Some(list) => vec![
            ManifestVariant {
                file_name: MANIFEST_FILE,
                allowed: Some(list.standard.clone()),
            },
            ManifestVariant {
                file_name: SPCS_MANIFEST_FILE,
                allowed: Some(list.spcs.clone()),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::utf8_temp_dir;
    use rstest::rstest;

    #[test]
    fn loads_both_lists() {
        let (_temp, root) = utf8_temp_dir();
        let path = root.join("whitelist.json");
        std::fs::write(&path, r#"{"standard": ["Google Mail"], "spcs": ["snowflake"]}"#)
            .expect("write whitelist");

        let list = Whitelist::load(&path).expect("whitelist parses");

        assert!(list.standard.contains("Google Mail"));
        assert!(list.spcs.contains("snowflake"));
    }

    #[rstest]
    #[case::not_json("standard = []")]
    #[case::wrong_shape(r#"{"standard": "all"}"#)]
    #[case::unknown_variant(r#"{"standard": [], "premium": []}"#)]
    fn malformed_whitelist_is_fatal(#[case] text: &str) {
        let (_temp, root) = utf8_temp_dir();
        let path = root.join("whitelist.json");
        std::fs::write(&path, text).expect("write whitelist");

        let err = Whitelist::load(&path).expect_err("malformed");
        assert!(matches!(err, PublisherError::InvalidWhitelist { .. }));
    }

    #[test]
    fn missing_whitelist_is_fatal() {
        let err = Whitelist::load(Utf8Path::new("/nowhere/whitelist.json")).expect_err("missing");
        assert!(matches!(err, PublisherError::InvalidWhitelist { .. }));
    }

    #[test]
    fn no_whitelist_means_one_open_manifest() {
        let all = variants(None);
        assert_eq!(all.len(), 1);
        assert!(all[0].allows(&PackageName::from("anything")));
    }

    #[rstest]
    #[case::display_name("Google Mail", true)]
    #[case::slug_match("Slack", true)]
    #[case::absent("snowflake", false)]
    fn standard_variant_filters(#[case] name: &str, #[case] allowed: bool) {
        let list = Whitelist {
            standard: ["Google Mail".to_owned(), "slack".to_owned()].into(),
            spcs: ["snowflake".to_owned()].into(),
        };
        let all = variants(Some(&list));
        assert_eq!(all[0].file_name, MANIFEST_FILE);
        assert_eq!(all[1].file_name, SPCS_MANIFEST_FILE);
        assert_eq!(all[0].allows(&PackageName::from(name)), allowed);
    }
}
