//! Same-origin gate for the feed API.

use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessDenied {
    #[error("referer host {referer_host} does not match {host}")]
    ForeignReferer { referer_host: String, host: String },
    #[error("unparsable referer: {0}")]
    InvalidReferer(String),
    #[error("request without referer outside development mode")]
    MissingReferer,
}

impl AccessDenied {
    /// Message shown to the client; the variant detail only goes to the logs.
    pub fn public_message(&self) -> &'static str {
        "Zugriff verweigert"
    }
}

/// Allows a request when its referer points at the serving host.
///
/// - referer and host present: the referer's `host[:port]` must equal the host header
/// - referer present without host header: allowed
/// - no referer: allowed only in development mode
pub fn check_referer(
    referer: Option<&str>,
    host: Option<&str>,
    dev_mode: bool,
) -> Result<(), AccessDenied> {
    match (referer, host) {
        (Some(referer), Some(host)) => {
            let url = Url::parse(referer)
                .map_err(|_| AccessDenied::InvalidReferer(referer.to_string()))?;
            let referer_host = url_authority(&url)
                .ok_or_else(|| AccessDenied::InvalidReferer(referer.to_string()))?;
            if referer_host.eq_ignore_ascii_case(host) {
                Ok(())
            } else {
                Err(AccessDenied::ForeignReferer {
                    referer_host,
                    host: host.to_string(),
                })
            }
        }
        (Some(_), None) => Ok(()),
        (None, _) if dev_mode => Ok(()),
        (None, _) => Err(AccessDenied::MissingReferer),
    }
}

fn url_authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_host_referer_is_allowed() {
        assert!(check_referer(Some("https://advent.example/"), Some("advent.example"), false).is_ok());
        assert!(check_referer(
            Some("http://localhost:3000/gewinner"),
            Some("localhost:3000"),
            false
        )
        .is_ok());
    }

    #[test]
    fn default_port_is_not_part_of_the_host() {
        assert!(check_referer(Some("https://advent.example:443/"), Some("advent.example"), false).is_ok());
    }

    #[test]
    fn foreign_referer_is_denied() {
        let err = check_referer(Some("https://evil.example/"), Some("advent.example"), true)
            .unwrap_err();
        assert!(matches!(err, AccessDenied::ForeignReferer { .. }));
        assert_eq!(err.public_message(), "Zugriff verweigert");

        let err = check_referer(Some("http://localhost:3001/"), Some("localhost:3000"), true)
            .unwrap_err();
        assert!(matches!(err, AccessDenied::ForeignReferer { .. }));
    }

    #[test]
    fn garbage_referer_is_denied() {
        let err = check_referer(Some("not a url"), Some("advent.example"), true).unwrap_err();
        assert!(matches!(err, AccessDenied::InvalidReferer(_)));
    }

    #[test]
    fn referer_without_host_header_passes() {
        assert!(check_referer(Some("https://anything.example/"), None, false).is_ok());
    }

    #[test]
    fn missing_referer_only_allowed_in_development() {
        assert!(check_referer(None, Some("advent.example"), true).is_ok());
        assert_eq!(
            check_referer(None, Some("advent.example"), false),
            Err(AccessDenied::MissingReferer)
        );
    }
}
