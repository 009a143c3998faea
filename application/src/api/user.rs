//! [`User`]-related operations.

use common::{unit, DateTimeOf, Handler};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use session::{
    domain::{identity::Id, Identity, Role, TokenPair},
    infra::{transport, Request, Response},
    Access, Storage, Transport,
};
use tracerr::Traced;
use tracing as log;

use crate::{api::Api, Error};

/// User of the dish catalog.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// Username of this [`User`].
    pub username: String,

    /// Email address of this [`User`].
    pub email: String,

    /// [`Role`] of this [`User`].
    pub role: Role,

    /// [`DateTime`] when this [`User`] was created.
    ///
    /// [`DateTime`]: common::DateTime
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`User`] was updated last time.
    ///
    /// [`DateTime`]: common::DateTime
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub updated_at: UpdateDateTime,
}

/// [`DateTimeOf`] a [`User`] creation.
pub type CreationDateTime = DateTimeOf<(User, unit::Creation)>;

/// [`DateTimeOf`] a [`User`] update.
pub type UpdateDateTime = DateTimeOf<(User, unit::Update)>;

/// Registration of a new [`User`].
#[derive(Debug)]
pub struct Register {
    /// Email address of the new [`User`].
    pub email: String,

    /// Username of the new [`User`].
    pub username: String,

    /// Password of the new [`User`].
    pub password: SecretString,
}

impl<S, T> Handler<Register> for Api<S, T>
where
    S: Storage + 'static,
    T: Transport<Request, Ok = Response, Err = transport::Error> + 'static,
{
    type Ok = User;
    type Err = Traced<Error>;

    async fn execute(&self, op: Register) -> Result<Self::Ok, Self::Err> {
        let Register {
            email,
            username,
            password,
        } = op;

        self.session()
            .client()
            .post(
                "/users",
                &serde_json::json!({
                    "email": email,
                    "username": username,
                    "password": password.expose_secret(),
                }),
            )
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Signing in with credentials, starting a new session.
#[derive(Debug)]
pub struct Login {
    /// Email address of the [`User`].
    pub email: String,

    /// Password of the [`User`].
    pub password: SecretString,
}

impl<S, T> Handler<Login> for Api<S, T>
where
    S: Storage + 'static,
    T: Transport<Request, Ok = Response, Err = transport::Error> + 'static,
{
    type Ok = Identity;
    type Err = Traced<Error>;

    async fn execute(&self, op: Login) -> Result<Self::Ok, Self::Err> {
        let Login { email, password } = op;

        let pair: TokenPair = self
            .session()
            .client()
            .post(
                "/users/login",
                &serde_json::json!({
                    "email": email,
                    "password": password.expose_secret(),
                }),
            )
            .await
            .map_err(tracerr::map_from_and_wrap!())?;

        let projector = self.session().projector();
        projector.login(pair);
        let identity = projector
            .authorize(Access::Authenticated)
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        log::info!("signed in as `{}`", identity.username);
        Ok(identity)
    }
}

/// Signing out of the current session.
#[derive(Clone, Copy, Debug)]
pub struct Logout;

impl<S, T> Handler<Logout> for Api<S, T>
where
    S: Storage + 'static,
    T: Transport<Request, Ok = Response, Err = transport::Error> + 'static,
{
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(&self, _: Logout) -> Result<Self::Ok, Self::Err> {
        self.session().projector().logout();
        log::info!("signed out");
        Ok(())
    }
}

/// Listing of all the [`User`]s.
///
/// Available to administrators only.
#[derive(Clone, Copy, Debug)]
pub struct List;

impl<S, T> Handler<List> for Api<S, T>
where
    S: Storage + 'static,
    T: Transport<Request, Ok = Response, Err = transport::Error> + 'static,
{
    type Ok = Vec<User>;
    type Err = Traced<Error>;

    async fn execute(&self, _: List) -> Result<Self::Ok, Self::Err> {
        _ = self
            .session()
            .projector()
            .authorize(Access::Admin)
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        self.session()
            .client()
            .get("/users")
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Retrieval of a single [`User`].
#[derive(Clone, Copy, Debug)]
pub struct Get {
    /// ID of the [`User`] to retrieve.
    pub id: Id,
}

impl<S, T> Handler<Get> for Api<S, T>
where
    S: Storage + 'static,
    T: Transport<Request, Ok = Response, Err = transport::Error> + 'static,
{
    type Ok = User;
    type Err = Traced<Error>;

    async fn execute(&self, op: Get) -> Result<Self::Ok, Self::Err> {
        self.session()
            .client()
            .get(&format!("/users/{}", op.id))
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Update of a [`User`]'s profile.
#[derive(Debug)]
pub struct Update {
    /// ID of the [`User`] to update.
    pub id: Id,

    /// New email address of the [`User`], if any.
    pub email: Option<String>,

    /// New username of the [`User`], if any.
    pub username: Option<String>,

    /// New password of the [`User`], if any.
    pub password: Option<SecretString>,
}

/// Changed fields of a [`User`], as sent to the API.
#[derive(Debug, Serialize)]
struct Changes<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
}

impl<S, T> Handler<Update> for Api<S, T>
where
    S: Storage + 'static,
    T: Transport<Request, Ok = Response, Err = transport::Error> + 'static,
{
    type Ok = User;
    type Err = Traced<Error>;

    async fn execute(&self, op: Update) -> Result<Self::Ok, Self::Err> {
        let Update {
            id,
            email,
            username,
            password,
        } = op;

        _ = self
            .session()
            .projector()
            .authorize(Access::Authenticated)
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        let changes = Changes {
            email: email.as_deref(),
            username: username.as_deref(),
            password: password.as_ref().map(ExposeSecret::expose_secret),
        };
        self.session()
            .client()
            .patch(&format!("/users/{id}"), &changes)
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Change of a [`User`]'s [`Role`].
///
/// Available to administrators only.
#[derive(Clone, Copy, Debug)]
pub struct ChangeRole {
    /// ID of the [`User`] to change the [`Role`] of.
    pub id: Id,

    /// New [`Role`] of the [`User`].
    pub role: Role,
}

impl<S, T> Handler<ChangeRole> for Api<S, T>
where
    S: Storage + 'static,
    T: Transport<Request, Ok = Response, Err = transport::Error> + 'static,
{
    type Ok = User;
    type Err = Traced<Error>;

    async fn execute(&self, op: ChangeRole) -> Result<Self::Ok, Self::Err> {
        let ChangeRole { id, role } = op;

        _ = self
            .session()
            .projector()
            .authorize(Access::Admin)
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        self.session()
            .client()
            .patch(
                &format!("/users/{id}/role"),
                &serde_json::json!({ "role": role }),
            )
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Deletion of a [`User`].
///
/// Available to administrators only.
#[derive(Clone, Copy, Debug)]
pub struct Delete {
    /// ID of the [`User`] to delete.
    pub id: Id,
}

impl<S, T> Handler<Delete> for Api<S, T>
where
    S: Storage + 'static,
    T: Transport<Request, Ok = Response, Err = transport::Error> + 'static,
{
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(&self, op: Delete) -> Result<Self::Ok, Self::Err> {
        _ = self
            .session()
            .projector()
            .authorize(Access::Admin)
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        self.session()
            .client()
            .delete(&format!("/users/{}", op.id))
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}
