//! IceCast handshake messages: HTTP-like request and response records.

/// Protocol version used by the SOURCE handshake.
pub const PROTOCOL_VERSION: f64 = 1.0;

/// Which variant `wire::decode` should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Client-originated: `METHOD PATH HTTP/X.Y`.
    Request,
    /// Server-originated: `HTTP/X.Y CODE PHRASE...`.
    Response,
}

/// Header name to value mapping. Keeps insertion order for encoding; a repeated
/// name replaces the earlier value in place. Names compare case-sensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (n, v) in iter {
            headers.insert(n, v);
        }
        headers
    }
}

/// Outbound record, e.g. `SOURCE /stream HTTP/1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub version: f64,
    /// `None` when the message had too few lines to carry a header block.
    pub headers: Option<Headers>,
    pub body: Option<String>,
}

impl Request {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            version: PROTOCOL_VERSION,
            headers: Some(Headers::new()),
            body: None,
        }
    }

    /// Headers, treating an unset block as empty.
    pub fn headers(&self) -> Headers {
        self.headers.clone().unwrap_or_default()
    }
}

/// Inbound record, e.g. `HTTP/1.0 200 OK`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub version: f64,
    pub status: u16,
    /// Status phrase: every token after the code joined by single spaces.
    pub reason: String,
    pub headers: Option<Headers>,
    pub body: Option<String>,
}

impl Response {
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            status,
            reason: reason.into(),
            headers: Some(Headers::new()),
            body: None,
        }
    }

    pub fn headers(&self) -> Headers {
        self.headers.clone().unwrap_or_default()
    }

    /// Body text, empty when absent.
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

/// A decoded handshake message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Request(_) => MessageKind::Request,
            Message::Response(_) => MessageKind::Response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_header_last_write_wins() {
        let mut h = Headers::new();
        h.insert("Host", "a");
        h.insert("User-Agent", "x");
        h.insert("Host", "b");
        assert_eq!(h.len(), 2);
        assert_eq!(h.get("Host"), Some("b"));
        let names: Vec<&str> = h.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Host", "User-Agent"]);
    }

    #[test]
    fn header_names_case_sensitive() {
        let h: Headers = [("Host", "a"), ("host", "b")].into_iter().collect();
        assert_eq!(h.len(), 2);
        assert_eq!(h.get("host"), Some("b"));
    }

    #[test]
    fn unset_headers_read_as_empty() {
        let mut r = Response::new(200, "OK");
        r.headers = None;
        assert!(r.headers().is_empty());
        assert_eq!(r.body_text(), "");
    }
}
