//! Just enough HTTP/1.1 for `GET` requests on a one-shot connection.

use std::time::Duration;

use serde::Serialize;
use url::form_urlencoded;

use crate::error::ServerError;

/// Requests whose head grows past this are rejected
pub const MAX_HEAD_LEN: usize = 8 * 1024;

/// Time a client gets to send the complete request head
pub const HEAD_TIMEOUT: Duration = Duration::from_secs(10);

const HEAD_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Raw path, still percent-encoded
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Header names are lowercased
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// Parses the request head at the start of `buf`.
    ///
    /// Returns `Ok(None)` while the head is incomplete. Any body is ignored.
    pub fn parse(buf: &[u8]) -> Result<Option<Request>, ServerError> {
        let end = match buf.windows(HEAD_END.len()).position(|w| w == HEAD_END) {
            Some(end) => end,
            None if buf.len() > MAX_HEAD_LEN => {
                return Err(ServerError::BadRequest("request head too large".to_owned()))
            }
            None => return Ok(None),
        };

        let head = std::str::from_utf8(&buf[..end])
            .map_err(|_| ServerError::BadRequest("request head is not UTF-8".to_owned()))?;
        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or_default();

        let mut parts = request_line.split(' ');
        let (method, target) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(target), Some(version), None)
                if !method.is_empty() && version.starts_with("HTTP/1.") =>
            {
                (method, target)
            }
            _ => {
                return Err(ServerError::BadRequest(format!(
                    "malformed request line {:?}",
                    request_line
                )))
            }
        };
        if !target.starts_with('/') {
            return Err(ServerError::BadRequest(format!(
                "unsupported request target {:?}",
                target
            )));
        }

        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let query = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();

        let mut headers = Vec::new();
        for line in lines.filter(|line| !line.is_empty()) {
            let (name, value) = line.split_once(':').ok_or_else(|| {
                ServerError::BadRequest(format!("malformed header {:?}", line))
            })?;
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_owned()));
        }

        Ok(Some(Request {
            method: method.to_owned(),
            path: path.to_owned(),
            query,
            headers,
        }))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// First value of a query parameter
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_body(self, content_type: &str, body: Vec<u8>) -> Self {
        let mut response = self.with_header("Content-Type", content_type);
        response.body = body;
        response
    }

    pub fn text(status: u16, message: &str) -> Self {
        let body = format!("{}\n", message).into_bytes();
        Self::new(status).with_body("text/plain; charset=utf-8", body)
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self, ServerError> {
        let body = serde_json::to_vec(value)
            .map_err(|err| ServerError::Internal(format!("JSON encoding failed: {}", err)))?;
        Ok(Self::new(200).with_body("application/json", body))
    }

    pub fn redirect(location: &str) -> Self {
        Self::new(302).with_header("Location", location)
    }

    pub fn from_error(err: &ServerError) -> Self {
        let response = Self::text(err.status(), &err.to_string());
        match err {
            ServerError::MethodNotAllowed(_) => response.with_header("Allow", "GET"),
            _ => response,
        }
    }

    /// Serializes the response for a connection that is closed afterwards
    pub fn serialize(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, reason(self.status));
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        if self.status != 304 {
            head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        }
        head.push_str("Connection: close\r\n\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        500 => "Internal Server Error",
        _ => "",
    }
}

#[cfg(test)]
impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_request_head() {
        let raw = b"GET /avatar/J%C3%B6rg.webp?color=3&palette=pale HTTP/1.1\r\n\
                    Host: localhost\r\n\
                    If-None-Match: \"abc\"\r\n\r\n";
        let request = Request::parse(raw).unwrap().unwrap();

        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/avatar/J%C3%B6rg.webp");
        assert_eq!(request.query("color"), Some("3"));
        assert_eq!(request.query("palette"), Some("pale"));
        assert_eq!(request.query("country"), None);
        assert_eq!(request.header("if-none-match"), Some("\"abc\""));
        assert_eq!(request.header("HOST"), Some("localhost"));
    }

    #[test]
    fn query_values_are_decoded() {
        let raw = b"GET /detect-gender/x?country=d%45&name=a+b HTTP/1.0\r\n\r\n";
        let request = Request::parse(raw).unwrap().unwrap();
        assert_eq!(request.query("country"), Some("dE"));
        assert_eq!(request.query("name"), Some("a b"));
    }

    #[test]
    fn incomplete_head_waits_for_more() {
        assert_eq!(Request::parse(b"GET /avatar HTTP/1.1\r\nHost: x\r\n").unwrap(), None);
        assert_eq!(Request::parse(b"").unwrap(), None);
    }

    #[test]
    fn oversized_head_is_rejected() {
        let mut raw = b"GET / HTTP/1.1\r\nX-Pad: ".to_vec();
        raw.extend(std::iter::repeat(b'a').take(MAX_HEAD_LEN));
        assert!(matches!(Request::parse(&raw), Err(ServerError::BadRequest(_))));
    }

    #[rstest]
    #[case(b"GET /avatar\r\n\r\n".as_slice())]
    #[case(b"GET /avatar HTTP/2\r\n\r\n".as_slice())]
    #[case(b"GET http://host/avatar HTTP/1.1\r\n\r\n".as_slice())]
    #[case(b"GET /avatar HTTP/1.1\r\nbroken header\r\n\r\n".as_slice())]
    #[case(b" /avatar HTTP/1.1\r\n\r\n".as_slice())]
    fn malformed_requests_are_rejected(#[case] raw: &[u8]) {
        let err = Request::parse(raw).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn serializes_response() {
        let response = Response::new(200)
            .with_header("ETag", "\"k\"")
            .with_body("image/webp", vec![1, 2, 3]);
        let bytes = response.serialize();

        let head_len = bytes.windows(4).position(|w| w == HEAD_END).unwrap() + 4;
        let head = std::str::from_utf8(&bytes[..head_len]).unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("ETag: \"k\"\r\n"));
        assert!(head.contains("Content-Type: image/webp\r\n"));
        assert!(head.contains("Content-Length: 3\r\n"));
        assert!(head.ends_with("Connection: close\r\n\r\n"));
        assert_eq!(&bytes[head_len..], &[1, 2, 3]);
    }

    #[test]
    fn not_modified_has_no_length() {
        let bytes = Response::new(304).serialize();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.1 304 Not Modified\r\n"));
        assert!(!text.contains("Content-Length"));
    }

    #[test]
    fn method_errors_advertise_get() {
        let response = Response::from_error(&ServerError::MethodNotAllowed("POST".to_owned()));
        assert_eq!(response.status, 405);
        assert_eq!(response.header("allow"), Some("GET"));
    }
}
