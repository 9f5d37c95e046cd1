//! SOURCE login handshake. Host-driven: the caller reports connection events
//! and received bytes; the handshake tracks the resulting login state.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::message::{Request, Response};
use crate::stream::StreamDescriptor;
use crate::wire::{self, CodecError};

/// Method used to start a source stream.
pub const SOURCE_METHOD: &str = "SOURCE";

/// Mountpoint used when none is configured.
pub const DEFAULT_MOUNT: &str = "/stream";

pub const USER_AGENT: &str = concat!("ice-source/", env!("CARGO_PKG_VERSION"));

/// Source credentials for HTTP basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Both halves present, or nothing to send.
    pub fn from_parts(user: Option<String>, password: Option<String>) -> Option<Self> {
        match (user, password) {
            (Some(user), Some(password)) => Some(Self { user, password }),
            _ => None,
        }
    }

    /// `Authorization` header value.
    pub fn basic_auth(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.user, self.password));
        format!("Basic {token}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Why a login did not succeed. Messages are meant for the end user.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoginError {
    #[error("the server requested login credentials but no credentials were specified")]
    MissingCredentials,
    #[error("the server requested login credentials but the specified credentials were invalid")]
    InvalidCredentials,
    #[error("the server denied the login because there are too many sources connected")]
    TooManySources,
    #[error("the server denied the login because the specified mountpoint is already in use")]
    MountpointInUse,
    #[error("the server denied the login without giving a valid reason")]
    Denied,
    #[error("an internal server error has occurred")]
    InternalServerError,
    #[error("expected response code 200, 401, 403 or 500 but got {0}")]
    UnexpectedStatus(u16),
    #[error("the server sent a response while not logging in")]
    UnsolicitedResponse,
    #[error("malformed server response: {0}")]
    Malformed(#[from] CodecError),
    #[error("the server closed the connection")]
    Disconnected,
    #[error("attempted to log in, but not connected")]
    NotConnected,
    #[error("attempted to send data, but not logged in")]
    NotLoggedIn,
    #[error("an unspecified login error has occurred")]
    Unspecified,
}

/// Login progress. `Failed` is terminal for a handshake.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginState {
    Idle,
    Connecting,
    AwaitingResponse,
    LoggedIn,
    Failed(LoginError),
}

impl LoginState {
    /// `LoggedIn` or `Failed`.
    pub fn is_resolved(&self) -> bool {
        matches!(self, LoginState::LoggedIn | LoginState::Failed(_))
    }
}

/// Map a server response to the login outcome. A 401 is attributed to missing
/// or invalid credentials purely from whether any were sent.
pub fn classify(response: &Response, credentials_sent: bool) -> Result<(), LoginError> {
    match response.status {
        200 => Ok(()),
        401 if credentials_sent => Err(LoginError::InvalidCredentials),
        401 => Err(LoginError::MissingCredentials),
        403 => {
            let body = response.body_text();
            if body.contains("too many sources connected") {
                Err(LoginError::TooManySources)
            } else if body.contains("Mountpoint in use") {
                Err(LoginError::MountpointInUse)
            } else {
                Err(LoginError::Denied)
            }
        }
        500 => Err(LoginError::InternalServerError),
        other => Err(LoginError::UnexpectedStatus(other)),
    }
}

/// Login state machine for one connection.
#[derive(Debug)]
pub struct Handshake {
    credentials: Option<Credentials>,
    state: LoginState,
}

impl Handshake {
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self {
            credentials,
            state: LoginState::Idle,
        }
    }

    pub fn state(&self) -> &LoginState {
        &self.state
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Transport is up; a login may now be sent.
    pub fn on_connected(&mut self) {
        if self.state == LoginState::Idle {
            self.state = LoginState::Connecting;
        }
    }

    /// Build the SOURCE request and start waiting for the server's answer.
    pub fn source_request(
        &mut self,
        host: &str,
        port: u16,
        mount: &str,
        stream: &StreamDescriptor,
    ) -> Result<Request, LoginError> {
        if self.state != LoginState::Connecting {
            self.fail(LoginError::NotConnected);
            return Err(LoginError::NotConnected);
        }
        let mut request = Request::new(SOURCE_METHOD, mount);
        let headers = request.headers.get_or_insert_with(Default::default);
        if let Some(creds) = &self.credentials {
            headers.insert("Authorization", creds.basic_auth());
        }
        headers.insert("Host", format!("{host}:{port}"));
        headers.insert("User-Agent", USER_AGENT);
        headers.insert("Content-Type", stream.content_type.as_str());
        for (name, value) in stream.ice_headers() {
            headers.insert(name, value);
        }
        self.state = LoginState::AwaitingResponse;
        Ok(request)
    }

    /// Bytes arrived from the server.
    pub fn on_data(&mut self, bytes: &[u8]) -> &LoginState {
        if self.state != LoginState::AwaitingResponse {
            self.fail(LoginError::UnsolicitedResponse);
            return &self.state;
        }
        match wire::decode_response(&String::from_utf8_lossy(bytes)) {
            Ok(Some(response)) => {
                self.on_response(&response);
            }
            Ok(None) => tracing::debug!(len = bytes.len(), "ignoring non-HTTP data"),
            Err(e) => self.fail(LoginError::Malformed(e)),
        }
        &self.state
    }

    /// A decoded server response arrived.
    pub fn on_response(&mut self, response: &Response) -> &LoginState {
        if self.state != LoginState::AwaitingResponse {
            self.fail(LoginError::UnsolicitedResponse);
            return &self.state;
        }
        match classify(response, self.credentials.is_some()) {
            Ok(()) => {
                tracing::debug!(status = response.status, "login accepted");
                self.state = LoginState::LoggedIn;
            }
            Err(e) => self.fail(e),
        }
        &self.state
    }

    /// Transport went away. Keeps an earlier failure reason.
    pub fn on_disconnected(&mut self) {
        if !matches!(self.state, LoginState::Idle | LoginState::Failed(_)) {
            self.fail(LoginError::Disconnected);
        }
    }

    /// Move to `Failed` unless already there; the first reason sticks.
    pub fn fail(&mut self, error: LoginError) {
        if matches!(self.state, LoginState::Failed(_)) {
            return;
        }
        tracing::debug!(%error, "login failed");
        self.state = LoginState::Failed(error);
    }
}
