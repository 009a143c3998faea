//! Session management of the dish catalog API client.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod client;
pub mod domain;
pub mod infra;
pub mod projector;
pub mod refresh;
pub mod store;
#[cfg(test)]
mod testing;

use derive_more::Debug;

use self::infra::{transport, Request, Response};

pub use self::{
    client::HttpClient,
    infra::{Storage, Transport},
    projector::{Access, AccessError, SessionState, SessionStateProjector},
    refresh::RefreshCoordinator,
    store::{Subscription, TokenStore},
};

/// Session of the API client, wiring a [`TokenStore`], an [`HttpClient`] and
/// a [`SessionStateProjector`] together.
#[derive(Debug)]
pub struct Session<S, T> {
    /// [`TokenStore`] of this [`Session`].
    store: TokenStore<S>,

    /// [`HttpClient`] of this [`Session`].
    client: HttpClient<S, T>,

    /// [`SessionStateProjector`] of this [`Session`].
    projector: SessionStateProjector<S>,
}

impl<S, T> Session<S, T>
where
    S: Storage + 'static,
    T: Transport<Request, Ok = Response, Err = transport::Error> + 'static,
{
    /// Creates a new [`Session`] restored from the provided [`Storage`] and
    /// talking to the API via the provided [`Transport`].
    pub fn new(storage: S, transport: T) -> Self {
        let store = TokenStore::load(storage);
        let client = HttpClient::new(store.clone(), transport);
        let projector = SessionStateProjector::new(
            store.clone(),
            client.auth_header().clone(),
        );
        Self {
            store,
            client,
            projector,
        }
    }

    /// Returns the [`TokenStore`] of this [`Session`].
    #[must_use]
    pub fn store(&self) -> &TokenStore<S> {
        &self.store
    }

    /// Returns the [`HttpClient`] of this [`Session`].
    #[must_use]
    pub fn client(&self) -> &HttpClient<S, T> {
        &self.client
    }

    /// Returns the [`SessionStateProjector`] of this [`Session`].
    #[must_use]
    pub fn projector(&self) -> &SessionStateProjector<S> {
        &self.projector
    }
}

#[cfg(test)]
mod spec {
    use std::{cell::Cell, rc::Rc};

    use http::{header::AUTHORIZATION, StatusCode};

    use crate::{
        domain::{AccessToken, Role, TokenPair},
        infra::storage::{File, Memory, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY},
        refresh::REFRESH_PATH,
        testing::{self, Scripted},
    };

    use super::Session;

    #[tokio::test]
    async fn renews_expired_session_transparently() {
        let transport = Rc::new(Scripted::new());
        let session = Session::new(Memory::new(), Rc::clone(&transport));
        let first = testing::expired_access_token(1, Role::User);
        let second = testing::access_token(1, Role::User);
        session
            .projector()
            .login(TokenPair::new(first.clone(), "refresh-1"));
        transport.reply_json(
            StatusCode::UNAUTHORIZED,
            &serde_json::json!({ "message": "Token expired" }),
        );
        transport.reply_json(
            StatusCode::OK,
            &TokenPair::new(second.clone(), "refresh-2"),
        );
        transport.reply_json(StatusCode::OK, &serde_json::json!([]));

        let dishes: Vec<serde_json::Value> =
            session.client().get("/dishes").await.unwrap();

        assert!(dishes.is_empty());
        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(
            requests[0].headers[AUTHORIZATION].to_str().unwrap(),
            format!("Bearer {first}"),
        );
        assert_eq!(requests[1].path, REFRESH_PATH);
        assert_eq!(
            requests[2].headers[AUTHORIZATION].to_str().unwrap(),
            format!("Bearer {second}"),
        );
        assert_eq!(session.store().access(), Some(second));
        assert!(session.projector().is_authenticated());
        assert_eq!(
            session
                .projector()
                .identity()
                .and_then(|i| i.expires_at)
                .map(|exp| exp.is_past()),
            Some(false),
        );
    }

    #[tokio::test]
    async fn signs_out_once_refresh_is_rejected() {
        let transport = Rc::new(Scripted::new());
        let session = Session::new(Memory::new(), Rc::clone(&transport));
        session.projector().login(TokenPair::new(
            testing::access_token(1, Role::Admin),
            "refresh-1",
        ));
        let prompted = Rc::new(Cell::new(false));
        session.client().on_unauthorized({
            let prompted = Rc::clone(&prompted);
            move || prompted.set(true)
        });
        transport.reply_empty(StatusCode::UNAUTHORIZED);
        transport.reply_empty(StatusCode::UNAUTHORIZED);

        let err = session
            .client()
            .get::<serde_json::Value>("/users")
            .await
            .unwrap_err()
            .into_inner();

        assert!(err.is_unauthorized());
        assert!(prompted.get());
        assert!(!session.projector().is_authenticated());
        assert_eq!(session.client().auth_header().get(), None);
    }

    #[test]
    fn restores_session_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let token = testing::access_token(4, Role::User);
        {
            let session = Session::new(File::new(&path), Scripted::new());
            session
                .projector()
                .login(TokenPair::new(token.clone(), "refresh"));
        }

        let session = Session::new(File::new(&path), Scripted::new());

        assert_eq!(session.store().access(), Some(token));
        assert!(session.projector().is_authenticated());
        assert_eq!(
            session.projector().identity().map(|i| i64::from(i.id)),
            Some(4),
        );
    }

    #[test]
    fn discards_undecodable_stored_session() {
        let session = Session::new(
            Memory::with_entries([
                (ACCESS_TOKEN_KEY, "garbage"),
                (REFRESH_TOKEN_KEY, "refresh"),
            ]),
            Scripted::new(),
        );

        assert!(!session.projector().is_authenticated());
        assert_eq!(session.store().access(), None::<AccessToken>);
        assert_eq!(session.store().refresh(), None);
    }
}
