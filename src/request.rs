//! Request descriptors handed to a [`Transport`](crate::Transport).
//!
//! Endpoints are built from explicit parts with [`build_url`] (or from the
//! configured base URL with [`endpoint_url`]); a finished [`ApiRequest`] is
//! immutable.
use bytes::Bytes;
use serde::Serialize;
use url::Url;

use crate::error::DeferlinkError;

/// HTTP method of an [`ApiRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Fully-specified request: method, URL, headers and body bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    url: Url,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl ApiRequest {
    /// JSON `POST` to `url` with `body` serialized via serde_json.
    pub fn post_json<T: Serialize + ?Sized>(url: Url, body: &T) -> Result<Self, DeferlinkError> {
        let encoded = serde_json::to_vec(body).map_err(|e| {
            DeferlinkError::server(None, format!("failed to encode request body: {e}"))
        })?;
        Ok(Self {
            method: Method::Post,
            url,
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ],
            body: Some(Bytes::from(encoded)),
        })
    }

    /// Copy of this request with one more header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

/// Build a URL from explicit parts.
///
/// ```rust
/// let url = deferlink::build_url("https", "api.deferlink.io", "/v1/match", &[("sdk", "rust")]).unwrap();
/// assert_eq!(url.as_str(), "https://api.deferlink.io/v1/match?sdk=rust");
/// ```
pub fn build_url(
    scheme: &str,
    host: &str,
    path: &str,
    query: &[(&str, &str)],
) -> Result<Url, DeferlinkError> {
    if scheme.is_empty() || host.is_empty() {
        return Err(DeferlinkError::InvalidUrl(format!(
            "scheme and host are required, got {scheme:?} and {host:?}"
        )));
    }
    let mut url = Url::parse(&format!("{scheme}://{host}"))
        .map_err(|e| DeferlinkError::InvalidUrl(format!("{scheme}://{host}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(DeferlinkError::InvalidUrl(format!(
            "{scheme}://{host} cannot carry a path"
        )));
    }
    url.set_path(path);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Append `path` to the configured base URL, keeping any base path prefix.
pub fn endpoint_url(base_url: &str, path: &str) -> Result<Url, DeferlinkError> {
    let base = Url::parse(base_url.trim())
        .map_err(|e| DeferlinkError::InvalidUrl(format!("{base_url}: {e}")))?;
    if base.cannot_be_a_base() || base.host_str().is_none() {
        return Err(DeferlinkError::InvalidUrl(format!(
            "{base_url}: not a hierarchical http(s) url"
        )));
    }
    if !matches!(base.scheme(), "http" | "https") {
        return Err(DeferlinkError::InvalidUrl(format!(
            "{base_url}: unsupported scheme {}",
            base.scheme()
        )));
    }
    let joined = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = base;
    url.set_path(&joined);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn build_url_with_query() {
        let url = build_url("https", "api.example.com", "/v1/match", &[("a", "1"), ("b", "x y")])
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/match?a=1&b=x+y");
    }

    #[test]
    fn build_url_rejects_missing_parts() {
        assert!(matches!(
            build_url("https", "", "/p", &[]),
            Err(DeferlinkError::InvalidUrl(_))
        ));
        assert!(matches!(
            build_url("https", "bad host", "/p", &[]),
            Err(DeferlinkError::InvalidUrl(_))
        ));
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let url = endpoint_url("https://api.example.com/tenant-a/", "/v1/match").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/tenant-a/v1/match");

        let bare = endpoint_url("http://localhost:8080", "/v1/match").unwrap();
        assert_eq!(bare.as_str(), "http://localhost:8080/v1/match");
    }

    #[test]
    fn endpoint_rejects_garbage() {
        for base in ["not a url", "mailto:someone@example.com", "ftp://files.example.com"] {
            assert!(
                matches!(endpoint_url(base, "/v1/match"), Err(DeferlinkError::InvalidUrl(_))),
                "{base} should be rejected"
            );
        }
    }

    #[test]
    fn post_json_sets_body_and_headers() {
        let url = endpoint_url("https://api.example.com", "/v1/match").unwrap();
        let req = ApiRequest::post_json(url, &json!({"platform": "ios"}))
            .unwrap()
            .with_header("Authorization", "Bearer k");

        assert_eq!(req.method(), Method::Post);
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("authorization"), Some("Bearer k"));
        let body: serde_json::Value = serde_json::from_slice(req.body().unwrap()).unwrap();
        assert_eq!(body, json!({"platform": "ios"}));
    }
}
