//! Existence checks for published environment archives.

use std::sync::OnceLock;
use std::time::Duration;

/// Network timeout for a single existence check.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for asking whether a remote object exists.
///
/// Abstractions allow tests to mock HTTP behaviour without network access.
#[cfg_attr(test, mockall::automock)]
pub trait RemoteProbe {
    /// Return whether `url` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when the check itself fails. Callers treat
    /// that the same as "does not exist".
    fn exists(&self, url: &str) -> Result<bool, ProbeError>;
}

/// Errors arising from an existence check.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The request failed for a reason other than "not found".
    #[error("existence check failed for {url}: {reason}")]
    Http {
        /// The URL that was checked.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },
}

/// Probe issuing HTTP `HEAD` requests with `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpProbe;

impl RemoteProbe for HttpProbe {
    fn exists(&self, url: &str) -> Result<bool, ProbeError> {
        match http_agent().head(url).call() {
            Ok(_) => Ok(true),
            Err(e) => classify(url, &e),
        }
    }
}

/// Shared `ureq` agent with request timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(PROBE_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to an existence answer.
fn classify(url: &str, err: &ureq::Error) -> Result<bool, ProbeError> {
    match err {
        ureq::Error::StatusCode(404 | 410) => Ok(false),
        other => Err(ProbeError::Http {
            url: url.to_owned(),
            reason: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::not_found(404)]
    #[case::gone(410)]
    fn missing_statuses_mean_absent(#[case] status: u16) {
        let answer = classify("https://cdn.example.test/env.zip", &ureq::Error::StatusCode(status));
        assert!(matches!(answer, Ok(false)));
    }

    #[test]
    fn server_errors_are_reported() {
        let answer = classify("https://cdn.example.test/env.zip", &ureq::Error::StatusCode(503));
        assert!(matches!(answer, Err(ProbeError::Http { .. })));
    }
}
