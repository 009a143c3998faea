//! [`Transport`]-related definitions.

#[cfg(feature = "reqwest")]
pub mod reqwest;

use derive_more::{Display, Error as StdError, From};
use http::{HeaderMap, Method, StatusCode};

#[cfg(feature = "reqwest")]
pub use self::reqwest::Reqwest;

/// HTTP transport sending [`Request`]s to the API.
///
/// Implementors are expected to be [`Handler`]s of
/// `Handler<Request, Ok = Response, Err = Error>`.
///
/// [`Handler`]: common::Handler
pub use common::Handler as Transport;

/// HTTP request to the API.
#[derive(Clone, Debug)]
pub struct Request {
    /// HTTP method of this [`Request`].
    pub method: Method,

    /// Path of this [`Request`], relative to the API base URL.
    pub path: String,

    /// Headers of this [`Request`].
    pub headers: HeaderMap,

    /// JSON body of this [`Request`].
    pub body: Option<serde_json::Value>,
}

impl Request {
    /// Creates a new body-less [`Request`].
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Sets the JSON `body` of this [`Request`].
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// HTTP response of the API.
#[derive(Clone, Debug)]
pub struct Response {
    /// [`StatusCode`] of this [`Response`].
    pub status: StatusCode,

    /// Raw body of this [`Response`].
    pub body: Vec<u8>,
}

/// [`Transport`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`reqwest`] client error.
    ///
    /// [`reqwest`]: ::reqwest
    #[cfg(feature = "reqwest")]
    Reqwest(::reqwest::Error),

    /// Connection-level failure.
    #[from(ignore)]
    Connection(#[error(not(source))] String),

    /// URL of a [`Request`] cannot be resolved.
    #[display("invalid URL {_0}")]
    #[from(ignore)]
    InvalidUrl(#[error(not(source))] String),

    /// [`Request`] targets an origin other than the API one.
    #[display("`{_0}` is outside of the API origin")]
    #[from(ignore)]
    ForeignOrigin(#[error(not(source))] String),
}
