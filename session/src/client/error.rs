//! [`HttpClient`] errors.
//!
//! [`HttpClient`]: super::HttpClient

use derive_more::{Display, Error as StdError, From};
use http::StatusCode;
use serde::Deserialize;

use crate::infra::transport;

/// Error of an [`HttpClient`] request.
///
/// Its [`Display`] representation is the normalized message meant for
/// presenting to users: the `message` provided by the API, if any, or the
/// transport-level error description otherwise.
///
/// [`Display`]: std::fmt::Display
/// [`HttpClient`]: super::HttpClient
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`Transport`] failed to deliver the request.
    ///
    /// [`Transport`]: crate::infra::Transport
    Network(transport::Error),

    /// Request was rejected as unauthorized and the session couldn't be
    /// renewed.
    #[display("{message}")]
    #[from(ignore)]
    Unauthorized {
        /// Normalized error message.
        message: String,
    },

    /// API responded with a non-successful status.
    #[display("{message}")]
    #[from(ignore)]
    Status {
        /// [`StatusCode`] of the response.
        status: StatusCode,

        /// Normalized error message.
        message: String,
    },

    /// Request or response body is not the expected JSON.
    #[display("Malformed JSON body: {_0}")]
    Json(serde_json::Error),
}

impl Error {
    /// Creates a new [`Error::Unauthorized`] out of the provided response
    /// `body`.
    pub(crate) fn unauthorized(body: &[u8]) -> Self {
        Self::Unauthorized {
            message: message(StatusCode::UNAUTHORIZED, body),
        }
    }

    /// Creates a new [`Error::Status`] out of the provided response `status`
    /// and `body`.
    pub(crate) fn status(status: StatusCode, body: &[u8]) -> Self {
        Self::Status {
            status,
            message: message(status, body),
        }
    }

    /// Returns the [`StatusCode`] the API responded with, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            Self::Status { status, .. } => Some(*status),
            Self::Network(_) | Self::Json(_) => None,
        }
    }

    /// Indicates whether this [`Error`] is an [`Error::Unauthorized`].
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Error body of the API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    /// Error message(s).
    message: Option<Message>,
}

/// Error message of the API, which is either a single string, or a list of
/// strings for validation errors.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Message {
    /// Single message.
    One(String),

    /// Several messages.
    Many(Vec<String>),
}

/// Extracts the message of the API error `body`, falling back to a generic
/// description of the `status`.
fn message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .map(|m| match m {
            Message::One(msg) => msg,
            Message::Many(msgs) => msgs.join(", "),
        })
        .filter(|msg| !msg.is_empty())
        .unwrap_or_else(|| {
            format!("Request failed with status code {}", status.as_u16())
        })
}

#[cfg(test)]
mod spec {
    use http::StatusCode;

    use crate::infra::transport;

    use super::Error;

    #[test]
    fn uses_message_of_api() {
        let err = Error::status(
            StatusCode::NOT_FOUND,
            br#"{"statusCode": 404, "message": "Dish not found"}"#,
        );

        assert_eq!(err.to_string(), "Dish not found");
        assert_eq!(err.status_code(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn joins_validation_messages() {
        let err = Error::status(
            StatusCode::BAD_REQUEST,
            br#"{"message": ["email must be an email", "password is short"]}"#,
        );

        assert_eq!(
            err.to_string(),
            "email must be an email, password is short",
        );
    }

    #[test]
    fn falls_back_to_status_description() {
        let bodies: [&[u8]; 3] =
            [b"", b"<html></html>", br#"{"message": ""}"#];
        for body in bodies {
            let err = Error::status(StatusCode::BAD_GATEWAY, body);

            assert_eq!(
                err.to_string(),
                "Request failed with status code 502",
            );
        }
    }

    #[test]
    fn uses_transport_description() {
        let err = Error::from(transport::Error::Connection(
            "connection refused".to_owned(),
        ));

        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn describes_unauthorized() {
        let err = Error::unauthorized(br#"{"message": "Token expired"}"#);

        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "Token expired");
        assert_eq!(err.status_code(), Some(StatusCode::UNAUTHORIZED));
    }
}
