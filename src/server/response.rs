use parking_lot::Mutex;

/// Response capability consumed by controllers.
///
/// Methods take `&self` because a parent controller and the instances it
/// delegates to all write to the same response.
pub trait Response: Send + Sync {
    /// Commit the HTTP status code
    fn set_status(&self, status: u16);

    /// Redirect the client to `url` with the given status (usually 302)
    fn redirect(&self, url: &str, status: u16);

    /// Emit rendered content to the client
    fn write(&self, content: &str);
}

#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        301 => "Moved Permanently",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Buffered {
    status: Option<u16>,
    headers: Vec<(String, String)>,
    body: String,
}

/// In-memory response that records status, headers and body.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    inner: Mutex<Buffered>,
}

impl BufferedResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last committed status, `None` until something commits one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.inner.lock().status
    }

    #[must_use]
    pub fn body(&self) -> String {
        self.inner.lock().body.clone()
    }

    /// Get a header by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.inner
            .lock()
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    /// Status line such as `405 Method Not Allowed`.
    #[must_use]
    pub fn status_line(&self) -> String {
        let status = self.status().unwrap_or(200);
        format!("{status} {}", status_reason(status))
    }
}

impl Response for BufferedResponse {
    fn set_status(&self, status: u16) {
        self.inner.lock().status = Some(status);
    }

    fn redirect(&self, url: &str, status: u16) {
        let mut inner = self.inner.lock();
        inner.status = Some(status);
        inner.headers.retain(|(k, _)| !k.eq_ignore_ascii_case("location"));
        inner.headers.push(("Location".to_string(), url.to_string()));
    }

    fn write(&self, content: &str) {
        self.inner.lock().body.push_str(content);
    }
}
