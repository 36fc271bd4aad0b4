// ── Request / response descriptors ──
//
// Network operations are data before they are I/O: a `Request` names the
// verb, the resource URL, and an optional JSON payload. Interceptors and
// the default client both consume the same descriptor.

use serde_json::Value;
use url::Url;

/// HTTP verb subset used by resource operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single resource operation, ready to be offered to interceptors.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub body: Option<Value>,
}

impl Request {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            body: None,
        }
    }

    pub fn post(url: Url, body: Value) -> Self {
        Self {
            method: Method::Post,
            url,
            body: Some(body),
        }
    }

    pub fn patch(url: Url, body: Value) -> Self {
        Self {
            method: Method::Patch,
            url,
            body: Some(body),
        }
    }

    pub fn delete(url: Url) -> Self {
        Self {
            method: Method::Delete,
            url,
            body: None,
        }
    }
}

/// A successful transport outcome: 2xx status plus the parsed JSON body.
///
/// Non-2xx outcomes never become a `Response` — they surface as
/// [`ApiError::Http`](crate::ApiError::Http) so callers handle exactly one
/// failure channel.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    /// A `200 OK` response, convenient for interceptors and tests.
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// A `201 Created` response.
    pub fn created(body: Value) -> Self {
        Self { status: 201, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_round_trips_to_reqwest() {
        assert_eq!(reqwest::Method::from(Method::Get), reqwest::Method::GET);
        assert_eq!(
            reqwest::Method::from(Method::Patch),
            reqwest::Method::PATCH
        );
    }

    #[test]
    fn constructors_set_expected_verbs() {
        let url = Url::parse("https://api.example.com/customers/1")
            .expect("static URL");
        assert_eq!(Request::get(url.clone()).method, Method::Get);
        assert!(Request::get(url.clone()).body.is_none());

        let req = Request::patch(url, serde_json::json!({"name": "a"}));
        assert_eq!(req.method, Method::Patch);
        assert!(req.body.is_some());
    }
}
