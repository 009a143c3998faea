//! [`Identity`] definitions.

use std::sync::LazyLock;

use common::{unit, DateTimeOf};
use derive_more::{Display, Error, From, Into};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracerr::Traced;

use crate::domain::AccessToken;

/// Identity of the signed-in user, projected from the claims of an
/// [`AccessToken`].
///
/// Never persisted on its own: it's always re-derived from the current
/// [`AccessToken`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Identity {
    /// ID of the user.
    pub id: Id,

    /// Email address of the user.
    pub email: String,

    /// Username of the user.
    pub username: String,

    /// [`Role`] of the user.
    pub role: Role,

    /// [`DateTime`] when the [`AccessToken`] was issued.
    ///
    /// [`DateTime`]: common::DateTime
    #[serde(
        default,
        rename = "iat",
        skip_serializing_if = "Option::is_none",
        with = "common::datetime::serde::unix_timestamp::option"
    )]
    pub issued_at: Option<IssuanceDateTime>,

    /// [`DateTime`] when the [`AccessToken`] expires.
    ///
    /// [`DateTime`]: common::DateTime
    #[serde(
        default,
        rename = "exp",
        skip_serializing_if = "Option::is_none",
        with = "common::datetime::serde::unix_timestamp::option"
    )]
    pub expires_at: Option<ExpirationDateTime>,
}

impl Identity {
    /// Decodes an [`Identity`] out of the claims of the provided
    /// [`AccessToken`].
    ///
    /// The signature of the [`AccessToken`] is __not__ verified: the client
    /// trusts its issuer and only needs the claims.
    ///
    /// # Errors
    ///
    /// If the [`AccessToken`] is malformed or its claims don't match the
    /// expected shape.
    pub fn decode(token: &AccessToken) -> Result<Self, Traced<DecodeError>> {
        /// [`Validation`] accepting any signature, expiration and audience.
        static VALIDATION: LazyLock<Validation> = LazyLock::new(|| {
            let mut validation = Validation::default();
            validation.insecure_disable_signature_validation();
            validation.validate_exp = false;
            validation.validate_aud = false;
            validation.required_spec_claims.clear();
            validation
        });

        jsonwebtoken::decode::<Self>(
            token.as_ref(),
            &DecodingKey::from_secret(&[]),
            &VALIDATION,
        )
        .map(|data| data.claims)
        .map_err(tracerr::from_and_wrap!(=> DecodeError))
    }

    /// Indicates whether this [`Identity`] has the [`Role::Admin`].
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// ID of a user.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[serde(transparent)]
pub struct Id(i64);

/// Role of a user.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    PartialEq,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Role {
    /// Moderator of the catalog.
    Admin,

    /// Regular user.
    User,
}

/// [`DateTimeOf`] an [`AccessToken`] issuance.
pub type IssuanceDateTime = DateTimeOf<(AccessToken, unit::Issuance)>;

/// [`DateTimeOf`] an [`AccessToken`] expiration.
pub type ExpirationDateTime = DateTimeOf<(AccessToken, unit::Expiration)>;

/// Error of decoding an [`Identity`] out of an [`AccessToken`].
#[derive(Debug, Display, Error, From)]
pub enum DecodeError {
    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebToken(jsonwebtoken::errors::Error),
}
