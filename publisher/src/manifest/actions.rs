//! Action names from the packaged API-route metadata.
//!
//! `metadata.json` embeds the OpenAPI document the action server generated
//! at build time. Each action is a `POST` route; its display name is the
//! operation's `summary`, then its `operationId`, then the route itself.

use camino::Utf8Path;
use serde_json::Value;
use std::io::ErrorKind;

/// Extract action names from metadata JSON text, sorted by route.
///
/// # Errors
///
/// Returns a JSON error if `text` is not valid JSON.
///
/// # Examples
///
/// ```
/// use gallery_publisher::manifest::actions::parse_actions;
///
/// let text = r#"{"openapi.json": {"paths": {
///     "/api/actions/mail/send/run": {"post": {"summary": "Send email"}}
/// }}}"#;
/// assert_eq!(parse_actions(text)?, ["Send email"]);
/// # Ok::<(), serde_json::Error>(())
/// ```
pub fn parse_actions(text: &str) -> Result<Vec<String>, serde_json::Error> {
    let metadata: Value = serde_json::from_str(text)?;
    let Some(paths) = metadata
        .get("openapi.json")
        .and_then(|doc| doc.get("paths"))
        .and_then(Value::as_object)
    else {
        return Ok(Vec::new());
    };

    Ok(paths
        .iter()
        .filter_map(|(route, item)| {
            let post = item.get("post")?;
            let label = ["summary", "operationId"]
                .iter()
                .filter_map(|key| post.get(*key).and_then(Value::as_str))
                .map(str::trim)
                .find(|label| !label.is_empty())
                .unwrap_or_else(|| route.trim_start_matches('/'));
            Some(label.to_owned())
        })
        .collect())
}

/// Read action names from the metadata file at `path`.
///
/// A missing file yields no actions.
///
/// # Errors
///
/// Returns a description of the read or parse failure.
pub fn read_actions(path: &Utf8Path) -> Result<Vec<String>, String> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_actions(&text).map_err(|e| format!("invalid {path}: {e}")),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(format!("cannot read {path}: {e}")),
    }
}
