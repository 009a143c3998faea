//! Credential tokens issued by the API.

use derive_more::{AsRef, Debug, Display, From};
use serde::{Deserialize, Serialize};

/// Short-lived bearer credential sent with protected requests.
///
/// Opaque to the client, apart from its claims being decodable into an
/// [`Identity`].
///
/// [`Identity`]: crate::domain::Identity
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, From, PartialEq, Serialize,
)]
#[as_ref(str)]
#[debug("AccessToken(..)")]
#[from(&str, String)]
#[serde(transparent)]
pub struct AccessToken(String);

/// Longer-lived credential used only to obtain new [`AccessToken`]s.
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, From, PartialEq, Serialize,
)]
#[as_ref(str)]
#[debug("RefreshToken(..)")]
#[from(&str, String)]
#[serde(transparent)]
pub struct RefreshToken(String);

/// Pair of credentials returned by the login and refresh endpoints.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// [`AccessToken`] of this pair.
    pub access_token: AccessToken,

    /// [`RefreshToken`] of this pair.
    pub refresh_token: RefreshToken,
}

impl TokenPair {
    /// Creates a new [`TokenPair`] out of the provided tokens.
    #[must_use]
    pub fn new(
        access_token: impl Into<AccessToken>,
        refresh_token: impl Into<RefreshToken>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}
