//! Endpoint URL builders

use url::Url;

use crate::error::TransportError;

/// Join a resource path onto the API base URL.
///
/// The base may or may not end in `/`; the path may or may not start with one.
pub fn resource_url(base_url: &str, path: &str) -> Result<Url, TransportError> {
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| TransportError::Endpoint(format!("{}: {}", joined, e)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_url_slashes() {
        let expected = "http://localhost:8080/cashback/republish";
        assert_eq!(resource_url("http://localhost:8080", "/cashback/republish").unwrap().as_str(), expected);
        assert_eq!(resource_url("http://localhost:8080/", "cashback/republish").unwrap().as_str(), expected);
        assert_eq!(resource_url("http://localhost:8080/", "/cashback/republish").unwrap().as_str(), expected);
    }

    #[test]
    fn test_resource_url_keeps_base_path() {
        let url = resource_url("https://api.example.com/v2", "/republish").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v2/republish");
    }

    #[test]
    fn test_resource_url_invalid_base() {
        assert!(matches!(
            resource_url("not a url", "/republish"),
            Err(TransportError::Endpoint(_))
        ));
    }
}
