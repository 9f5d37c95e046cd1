//! Text framing for the SOURCE handshake.
//!
//! ```text
//! <start line>\n
//! <name>: <value>\n      (zero or more)
//! \n
//! <body>\n\r
//! ```
//!
//! Decoding only looks for a header block when the text splits into more than
//! three lines. The last line is the framing trailer and is dropped, the one
//! before it is the body, and everything between the start line and the blank
//! separator is a header.

use std::fmt::Write as _;

use crate::message::{Headers, Message, MessageKind, Request, Response};

const HTTP_PREFIX: &str = "HTTP/";

/// Structurally a request/response, but a sub-field is invalid.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("invalid protocol version: {0:?}")]
    InvalidVersion(String),
    #[error("invalid status code: {0:?}")]
    InvalidStatus(String),
    #[error("start line is missing the {0}")]
    MissingToken(&'static str),
    #[error("header line without a colon: {0:?}")]
    MalformedHeader(String),
}

/// Decode `text` as the requested variant.
///
/// Returns `Ok(None)` for text that is not HTTP-like yet (no newline, no
/// space, or a start line with fewer than two tokens); the caller should
/// ignore it or wait for more. Returns an error when the text has the right
/// shape but a version, status code or header line is invalid.
pub fn decode(text: &str, kind: MessageKind) -> Result<Option<Message>, CodecError> {
    if !text.contains('\n') || !text.contains(' ') {
        return Ok(None);
    }
    let lines: Vec<&str> = text.split('\n').collect();
    let head: Vec<&str> = lines[0].split(' ').collect();
    if head.len() < 2 {
        return Ok(None);
    }
    let (headers, body) = split_trailer(&lines)?;

    let message = match kind {
        MessageKind::Request => {
            let version = head
                .get(2)
                .ok_or(CodecError::MissingToken("protocol version"))?;
            Message::Request(Request {
                method: head[0].to_string(),
                path: head[1].to_string(),
                version: parse_version(version)?,
                headers,
                body,
            })
        }
        MessageKind::Response => {
            let status = head[1]
                .trim()
                .parse::<u16>()
                .map_err(|_| CodecError::InvalidStatus(head[1].to_string()))?;
            Message::Response(Response {
                version: parse_version(head[0])?,
                status,
                reason: head[2..].join(" ").trim().to_string(),
                headers,
                body,
            })
        }
    };
    Ok(Some(message))
}

/// Decode a client request (`METHOD PATH HTTP/X.Y`).
pub fn decode_request(text: &str) -> Result<Option<Request>, CodecError> {
    Ok(match decode(text, MessageKind::Request)? {
        Some(Message::Request(r)) => Some(r),
        _ => None,
    })
}

/// Decode a server response (`HTTP/X.Y CODE PHRASE`).
pub fn decode_response(text: &str) -> Result<Option<Response>, CodecError> {
    Ok(match decode(text, MessageKind::Response)? {
        Some(Message::Response(r)) => Some(r),
        _ => None,
    })
}

/// Encode a message. Versions are written with one decimal digit.
pub fn encode(message: &Message) -> String {
    let (mut out, headers, body) = match message {
        Message::Request(r) => (
            format!("{} {} {}{:.1}\n", r.method, r.path, HTTP_PREFIX, r.version),
            &r.headers,
            &r.body,
        ),
        Message::Response(r) => (
            format!("{}{:.1} {} {}\n", HTTP_PREFIX, r.version, r.status, r.reason),
            &r.headers,
            &r.body,
        ),
    };
    if let Some(headers) = headers {
        for (name, value) in headers.iter() {
            let _ = writeln!(out, "{name}: {value}");
        }
    }
    let _ = write!(out, "\n{}\n\r", body.as_deref().unwrap_or(""));
    out
}

impl Request {
    pub fn encode(&self) -> String {
        encode(&Message::Request(self.clone()))
    }
}

impl Response {
    pub fn encode(&self) -> String {
        encode(&Message::Response(self.clone()))
    }
}

fn parse_version(token: &str) -> Result<f64, CodecError> {
    let token = token.trim();
    let raw = token.strip_prefix(HTTP_PREFIX).unwrap_or(token);
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CodecError::InvalidVersion(token.to_string())),
    }
}

fn split_trailer(lines: &[&str]) -> Result<(Option<Headers>, Option<String>), CodecError> {
    if lines.len() <= 3 {
        return Ok((None, None));
    }
    let body = lines[lines.len() - 2];
    let mut headers = Headers::new();
    for line in &lines[1..lines.len() - 3] {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| CodecError::MalformedHeader(line.to_string()))?;
        headers.insert(name, value.trim_start());
    }
    let body = (!body.is_empty()).then(|| body.to_string());
    Ok((Some(headers), body))
}
