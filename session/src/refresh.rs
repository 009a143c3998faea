//! [`RefreshCoordinator`] definitions.

use std::{
    cell::RefCell,
    future::Future,
    rc::{Rc, Weak},
};

use derive_more::{Debug, Display, Error, From};
use futures::{
    future::{self, Either, LocalBoxFuture, Shared},
    FutureExt as _,
};
use http::{Method, StatusCode};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{AccessToken, RefreshToken, TokenPair},
    infra::{transport, Request, Response, Storage, Transport},
    TokenStore,
};

/// Path of the API endpoint redeeming [`RefreshToken`]s.
pub const REFRESH_PATH: &str = "/users/refresh";

/// Outstanding refresh operation, shared between all its callers.
type InFlight = Shared<LocalBoxFuture<'static, Option<AccessToken>>>;

/// Single-flight silent refresh of the [`AccessToken`].
///
/// While a refresh is outstanding, every caller of
/// [`RefreshCoordinator::refresh_access_token()`] awaits the very same
/// operation, so a [`RefreshToken`] is never redeemed twice concurrently.
#[derive(Debug)]
pub struct RefreshCoordinator<S, T> {
    /// [`TokenStore`] the refreshed tokens are written into.
    store: TokenStore<S>,

    /// [`Transport`] the refresh requests are sent with.
    transport: Rc<T>,

    /// Currently outstanding refresh operation, if any.
    #[debug(skip)]
    in_flight: Rc<RefCell<Option<InFlight>>>,
}

impl<S, T> RefreshCoordinator<S, T>
where
    S: Storage + 'static,
    T: Transport<Request, Ok = Response, Err = transport::Error> + 'static,
{
    /// Creates a new [`RefreshCoordinator`] redeeming the [`RefreshToken`]s
    /// of the provided [`TokenStore`] via the provided [`Transport`].
    pub fn new(store: TokenStore<S>, transport: Rc<T>) -> Self {
        Self {
            store,
            transport,
            in_flight: Rc::default(),
        }
    }

    /// Obtains a new [`AccessToken`] by redeeming the stored
    /// [`RefreshToken`].
    ///
    /// Resolves to [`None`] without any request if there is no
    /// [`RefreshToken`] stored. If the refresh fails for any reason, the
    /// stored tokens are cleared and [`None`] is returned.
    ///
    /// Joins the outstanding refresh operation, if there is one. Joining
    /// happens at the moment of the call, not on the first poll of the
    /// returned [`Future`].
    pub fn refresh_access_token(
        &self,
    ) -> impl Future<Output = Option<AccessToken>> + 'static {
        let Some(refresh_token) = self.store.refresh() else {
            return Either::Left(future::ready(None));
        };

        let in_flight = self.in_flight.borrow().clone();
        Either::Right(in_flight.unwrap_or_else(|| {
            let fut = Self::redeem(
                self.store.clone(),
                Rc::clone(&self.transport),
                refresh_token,
                Rc::downgrade(&self.in_flight),
            )
            .boxed_local()
            .shared();
            *self.in_flight.borrow_mut() = Some(fut.clone());
            fut
        }))
    }

    /// Indicates whether a refresh operation is outstanding at the moment.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.borrow().is_some()
    }

    /// Redeems the provided [`RefreshToken`] and writes the outcome into the
    /// provided [`TokenStore`].
    ///
    /// Releases the `in_flight` slot once settled.
    async fn redeem(
        store: TokenStore<S>,
        transport: Rc<T>,
        refresh_token: RefreshToken,
        in_flight: Weak<RefCell<Option<InFlight>>>,
    ) -> Option<AccessToken> {
        log::debug!("refreshing access token");

        let access_token = match exchange(&*transport, refresh_token).await {
            Ok(pair) => {
                log::debug!("access token refreshed");
                let access_token = pair.access_token.clone();
                store.set_pair(pair);
                Some(access_token)
            }
            Err(e) => {
                log::warn!("failed to refresh access token: {e}");
                store.clear();
                None
            }
        };

        if let Some(slot) = in_flight.upgrade() {
            drop(slot.borrow_mut().take());
        }

        access_token
    }
}

/// Exchanges the provided [`RefreshToken`] for a new [`TokenPair`].
async fn exchange<T>(
    transport: &T,
    refresh_token: RefreshToken,
) -> Result<TokenPair, Traced<RefreshError>>
where
    T: Transport<Request, Ok = Response, Err = transport::Error>,
{
    use RefreshError as E;

    let req = Request::new(Method::POST, REFRESH_PATH).with_body(
        serde_json::json!({ "refreshToken": refresh_token.as_ref() }),
    );

    let resp = transport
        .execute(req)
        .await
        .map_err(tracerr::from_and_wrap!(=> E))?;
    if !resp.status.is_success() {
        return Err(tracerr::new!(E::Rejected(resp.status)));
    }

    serde_json::from_slice(&resp.body).map_err(tracerr::from_and_wrap!(=> E))
}

/// Error of redeeming a [`RefreshToken`].
#[derive(Debug, Display, Error, From)]
pub enum RefreshError {
    /// [`Transport`] failed to deliver the request.
    #[display("`Transport` failed: {_0}")]
    Transport(transport::Error),

    /// Issuer rejected the [`RefreshToken`].
    #[display("refresh rejected with `{_0}` status")]
    #[from(ignore)]
    Rejected(#[error(not(source))] StatusCode),

    /// Issuer responded with an unexpected body.
    #[display("malformed refresh response: {_0}")]
    MalformedResponse(serde_json::Error),
}

#[cfg(test)]
mod spec {
    use std::rc::Rc;

    use futures::future;
    use http::{Method, StatusCode};

    use crate::{
        domain::{AccessToken, RefreshToken, TokenPair},
        infra::storage::Memory,
        testing::Scripted,
        TokenStore,
    };

    use super::{RefreshCoordinator, REFRESH_PATH};

    fn coordinator(
        transport: &Rc<Scripted>,
    ) -> (TokenStore<Memory>, RefreshCoordinator<Memory, Scripted>) {
        let store = TokenStore::load(Memory::new());
        store.set_pair(TokenPair::new("access-a", "refresh-a"));
        let coordinator =
            RefreshCoordinator::new(store.clone(), Rc::clone(transport));
        (store, coordinator)
    }

    #[tokio::test]
    async fn returns_none_without_refresh_token() {
        let transport = Rc::new(Scripted::new());
        let store = TokenStore::load(Memory::new());
        let coordinator =
            RefreshCoordinator::new(store.clone(), Rc::clone(&transport));

        assert_eq!(coordinator.refresh_access_token().await, None);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn stores_refreshed_pair() {
        let transport = Rc::new(Scripted::new());
        transport.reply_json(
            StatusCode::OK,
            &TokenPair::new("access-b", "refresh-b"),
        );
        let (store, coordinator) = coordinator(&transport);

        let token = coordinator.refresh_access_token().await;

        assert_eq!(token, Some(AccessToken::from("access-b")));
        assert_eq!(store.access(), Some(AccessToken::from("access-b")));
        assert_eq!(store.refresh(), Some(RefreshToken::from("refresh-b")));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].path, REFRESH_PATH);
        assert_eq!(
            requests[0].body,
            Some(serde_json::json!({ "refreshToken": "refresh-a" })),
        );
    }

    #[tokio::test]
    async fn issues_single_request_for_concurrent_callers() {
        let transport = Rc::new(Scripted::new());
        transport.reply_json(
            StatusCode::OK,
            &TokenPair::new("access-b", "refresh-b"),
        );
        let (_store, coordinator) = coordinator(&transport);

        let tokens = future::join_all(
            (0..5).map(|_| coordinator.refresh_access_token()),
        )
        .await;

        assert_eq!(transport.requests().len(), 1);
        assert!(tokens
            .iter()
            .all(|t| *t == Some(AccessToken::from("access-b"))));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn joins_refresh_started_before_first_poll() {
        let transport = Rc::new(Scripted::new());
        transport.reply_json(
            StatusCode::OK,
            &TokenPair::new("access-b", "refresh-b"),
        );
        let (_store, coordinator) = coordinator(&transport);

        let pending = (0..5)
            .map(|_| coordinator.refresh_access_token())
            .collect::<Vec<_>>();
        assert!(coordinator.is_refreshing());

        let tokens = future::join_all(pending).await;

        assert_eq!(transport.requests().len(), 1);
        assert!(tokens
            .iter()
            .all(|t| *t == Some(AccessToken::from("access-b"))));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn clears_tokens_when_rejected() {
        let transport = Rc::new(Scripted::new());
        transport.reply_json(
            StatusCode::UNAUTHORIZED,
            &serde_json::json!({ "message": "Invalid refresh token" }),
        );
        let (store, coordinator) = coordinator(&transport);

        assert_eq!(coordinator.refresh_access_token().await, None);
        assert_eq!(store.access(), None);
        assert_eq!(store.refresh(), None);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn clears_tokens_on_transport_failure() {
        let transport = Rc::new(Scripted::new());
        transport.fail("connection reset");
        let (store, coordinator) = coordinator(&transport);

        assert_eq!(coordinator.refresh_access_token().await, None);
        assert_eq!(store.access(), None);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn clears_tokens_on_malformed_response() {
        let transport = Rc::new(Scripted::new());
        transport.reply_json(
            StatusCode::OK,
            &serde_json::json!({ "accessToken": "only-access" }),
        );
        let (store, coordinator) = coordinator(&transport);

        assert_eq!(coordinator.refresh_access_token().await, None);
        assert_eq!(store.refresh(), None);
    }

    #[tokio::test]
    async fn starts_fresh_attempt_after_completion() {
        let transport = Rc::new(Scripted::new());
        transport.reply_json(
            StatusCode::OK,
            &TokenPair::new("access-b", "refresh-b"),
        );
        transport.reply_json(
            StatusCode::OK,
            &TokenPair::new("access-c", "refresh-c"),
        );
        let (_store, coordinator) = coordinator(&transport);

        let first = coordinator.refresh_access_token().await;
        let second = coordinator.refresh_access_token().await;

        assert_eq!(first, Some(AccessToken::from("access-b")));
        assert_eq!(second, Some(AccessToken::from("access-c")));

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[1].body,
            Some(serde_json::json!({ "refreshToken": "refresh-b" })),
        );
    }
}
