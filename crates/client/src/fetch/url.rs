//! URL canonicalization for consistent cache keys.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a URL string as a page inside `scope` would issue it.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative references (`./app.js`, `/app.js`) against `scope`
/// 3. Require http or https
/// 4. Lowercase the host
/// 5. Remove fragment (#...)
/// 6. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str, scope: &Url) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        scope.join(trimmed)
    }
    .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Url {
        Url::parse("https://budget.example/app/").unwrap()
    }

    #[test]
    fn test_canonicalize_absolute() {
        let url = canonicalize("https://cdn.jsdelivr.net/npm/react", &scope()).unwrap();
        assert_eq!(url.as_str(), "https://cdn.jsdelivr.net/npm/react");
    }

    #[test]
    fn test_canonicalize_dot_relative() {
        let url = canonicalize("./icons/icon-192.png", &scope()).unwrap();
        assert_eq!(url.as_str(), "https://budget.example/app/icons/icon-192.png");
    }

    #[test]
    fn test_canonicalize_root_relative() {
        let url = canonicalize("/manifest.webmanifest", &scope()).unwrap();
        assert_eq!(url.as_str(), "https://budget.example/manifest.webmanifest");
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://CDN.Example.COM/x.js", &scope()).unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[test]
    fn test_canonicalize_remove_fragment_keep_query() {
        let url = canonicalize("./index.html?month=3#summary", &scope()).unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), Some("month=3"));
    }

    #[test]
    fn test_canonicalize_trim_whitespace() {
        let url = canonicalize("  ./  ", &scope()).unwrap();
        assert_eq!(url.as_str(), "https://budget.example/app/");
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd", &scope());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("", &scope()), Err(UrlError::Empty)));
        assert!(matches!(canonicalize("   ", &scope()), Err(UrlError::Empty)));
    }
}
