use http::Method;
use std::collections::HashMap;

/// Request capability consumed by controllers.
///
/// Hosts adapt their own request type to this trait; [`HttpRequest`] is the
/// in-memory implementation used by tests and embedded callers.
pub trait Request: Send + Sync {
    /// HTTP method of the request
    fn method(&self) -> &Method;

    /// Request URI including the query string
    fn uri(&self) -> &str;

    /// POST or GET parameter by name
    fn param(&self, key: &str) -> Option<&str>;

    /// Header by name (case-insensitive per RFC 7230)
    fn header(&self, name: &str) -> Option<&str>;

    /// Whether the request method is `method`.
    fn is(&self, method: &Method) -> bool {
        self.method() == method
    }

    /// Whether the request was issued by `XMLHttpRequest`.
    fn is_ajax(&self) -> bool {
        self.header("x-requested-with")
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
    }
}

/// Parsed request data held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path including query string
    pub uri: String,
    /// Query string and form parameters; form values win on collision
    pub params: HashMap<String, String>,
    /// HTTP headers (lowercase keys)
    pub headers: HashMap<String, String>,
}

impl HttpRequest {
    /// Build a request, extracting parameters from the query string of `uri`.
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            params: parse_query_params(uri),
            headers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    #[must_use]
    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    /// Add a form parameter.
    #[must_use]
    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    /// Add a header; the name is stored lowercased.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Request path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.split('?').next().unwrap_or("")
    }
}

impl Request for HttpRequest {
    fn method(&self) -> &Method {
        &self.method
    }

    fn uri(&self) -> &str {
        &self.uri
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Parse query string parameters from a URL path
///
/// Extracts everything after the `?` character and URL-decodes parameter names and values.
#[must_use]
pub fn parse_query_params(path: &str) -> HashMap<String, String> {
    if let Some(pos) = path.find('?') {
        let query_str = &path[pos + 1..];
        url::form_urlencoded::parse(query_str.as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    } else {
        HashMap::new()
    }
}
