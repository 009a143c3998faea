//! [`HttpClient`] definitions.

mod error;

use std::{cell::RefCell, rc::Rc};

use derive_more::Debug;
use http::{
    header::{InvalidHeaderValue, AUTHORIZATION},
    HeaderValue, Method, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::AccessToken,
    infra::{transport, Request, Response, Storage, Transport},
    RefreshCoordinator, TokenStore,
};

pub use self::error::Error;

/// Default `Authorization` header of an [`HttpClient`].
///
/// Clones share the same value, so the session state may keep it in sync
/// with the [`TokenStore`] without owning the [`HttpClient`].
#[derive(Clone, Debug, Default)]
pub struct AuthHeader(Rc<RefCell<Option<HeaderValue>>>);

impl AuthHeader {
    /// Builds a `Bearer` header value out of the provided [`AccessToken`].
    ///
    /// # Errors
    ///
    /// If the [`AccessToken`] contains characters not allowed in headers.
    pub fn bearer(
        token: &AccessToken,
    ) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut value = HeaderValue::try_from(format!("Bearer {token}"))?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Sets this header to carry the provided [`AccessToken`].
    ///
    /// # Errors
    ///
    /// If the [`AccessToken`] contains characters not allowed in headers. The
    /// header is dropped in such case.
    pub fn set(&self, token: &AccessToken) -> Result<(), InvalidHeaderValue> {
        let value = Self::bearer(token);
        let mut header = self.0.borrow_mut();
        match value {
            Ok(value) => {
                *header = Some(value);
                Ok(())
            }
            Err(e) => {
                *header = None;
                Err(e)
            }
        }
    }

    /// Drops this header.
    pub fn clear(&self) {
        *self.0.borrow_mut() = None;
    }

    /// Returns the current value of this header, if any.
    #[must_use]
    pub fn get(&self) -> Option<HeaderValue> {
        self.0.borrow().clone()
    }
}

/// Request-scoped retry context, threaded through a single
/// [`HttpClient::send()`] call.
#[derive(Clone, Copy, Debug, Default)]
struct Attempt {
    /// Number of retries performed so far.
    retries: u8,
}

impl Attempt {
    /// Maximum number of retries after an unauthorized response.
    const MAX_RETRIES: u8 = 1;

    /// Indicates whether the request may be retried once more.
    fn can_retry(self) -> bool {
        self.retries < Self::MAX_RETRIES
    }

    /// Returns the context of the next retry.
    fn retried(self) -> Self {
        Self {
            retries: self.retries + 1,
        }
    }
}

/// HTTP client of the API, authorizing requests with the current session.
///
/// Every request carries the default [`AuthHeader`] (unless it specifies
/// its own `Authorization` header). Once a request is rejected as
/// unauthorized, the session is silently refreshed via the
/// [`RefreshCoordinator`] and the request is retried exactly once with the
/// new [`AccessToken`]. If the session cannot be refreshed, it's cleared and
/// the [`HttpClient::on_unauthorized()`] hook is invoked.
#[derive(Debug)]
pub struct HttpClient<S, T> {
    /// [`Transport`] the requests are sent with.
    transport: Rc<T>,

    /// [`TokenStore`] holding the session tokens.
    store: TokenStore<S>,

    /// [`RefreshCoordinator`] renewing the session.
    refresher: RefreshCoordinator<S, T>,

    /// Default `Authorization` header.
    auth: AuthHeader,

    /// Hook invoked once the session is no longer authorized.
    #[debug(skip)]
    on_unauthorized: RefCell<Option<Rc<dyn Fn()>>>,
}

impl<S, T> HttpClient<S, T>
where
    S: Storage + 'static,
    T: Transport<Request, Ok = Response, Err = transport::Error> + 'static,
{
    /// Creates a new [`HttpClient`] sending requests with the provided
    /// [`Transport`] on behalf of the session kept in the provided
    /// [`TokenStore`].
    pub fn new(store: TokenStore<S>, transport: T) -> Self {
        let transport = Rc::new(transport);
        Self {
            refresher: RefreshCoordinator::new(
                store.clone(),
                Rc::clone(&transport),
            ),
            transport,
            store,
            auth: AuthHeader::default(),
            on_unauthorized: RefCell::default(),
        }
    }

    /// Returns the [`RefreshCoordinator`] of this [`HttpClient`].
    #[must_use]
    pub fn refresher(&self) -> &RefreshCoordinator<S, T> {
        &self.refresher
    }

    /// Returns the default [`AuthHeader`] of this [`HttpClient`].
    #[must_use]
    pub fn auth_header(&self) -> &AuthHeader {
        &self.auth
    }

    /// Sets the default `Authorization` header to the provided
    /// [`AccessToken`].
    pub fn set_auth_token(&self, token: &AccessToken) {
        if let Err(e) = self.auth.set(token) {
            log::warn!("cannot use access token as header value: {e}");
        }
    }

    /// Drops the default `Authorization` header.
    pub fn clear_auth_token(&self) {
        self.auth.clear();
    }

    /// Sets the hook to invoke once the session is no longer authorized and
    /// the user should sign in again.
    pub fn on_unauthorized(&self, hook: impl Fn() + 'static) {
        *self.on_unauthorized.borrow_mut() = Some(Rc::new(hook));
    }

    /// Sends a `GET` request to the provided `path`.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::send()`].
    pub async fn get<R>(&self, path: &str) -> Result<R, Traced<Error>>
    where
        R: DeserializeOwned,
    {
        self.send(Request::new(Method::GET, path))
            .await
            .map_err(tracerr::wrap!())
    }

    /// Sends a `POST` request with the provided JSON `body` to the provided
    /// `path`.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::send()`].
    pub async fn post<B, R>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, Traced<Error>>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send_json(Method::POST, path, body)
            .await
            .map_err(tracerr::wrap!())
    }

    /// Sends a `PUT` request with the provided JSON `body` to the provided
    /// `path`.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::send()`].
    pub async fn put<B, R>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, Traced<Error>>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send_json(Method::PUT, path, body)
            .await
            .map_err(tracerr::wrap!())
    }

    /// Sends a `PATCH` request with the provided JSON `body` to the provided
    /// `path`.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::send()`].
    pub async fn patch<B, R>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, Traced<Error>>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send_json(Method::PATCH, path, body)
            .await
            .map_err(tracerr::wrap!())
    }

    /// Sends a `DELETE` request to the provided `path`.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::send()`].
    pub async fn delete<R>(&self, path: &str) -> Result<R, Traced<Error>>
    where
        R: DeserializeOwned,
    {
        self.send(Request::new(Method::DELETE, path))
            .await
            .map_err(tracerr::wrap!())
    }

    /// Sends the provided [`Request`] and deserializes the JSON body of its
    /// successful response. An empty body deserializes as `null`.
    ///
    /// # Errors
    ///
    /// - [`Error::Network`] if the [`Transport`] fails;
    /// - [`Error::Unauthorized`] if the request is rejected as unauthorized
    ///   and the session cannot be renewed;
    /// - [`Error::Status`] if the API responds with any other
    ///   non-successful status;
    /// - [`Error::Json`] if the response body is not the expected JSON.
    pub async fn send<R>(&self, req: Request) -> Result<R, Traced<Error>>
    where
        R: DeserializeOwned,
    {
        let resp = self.dispatch(req).await.map_err(tracerr::wrap!())?;

        let body: &[u8] = if resp.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            resp.body.as_slice()
        };
        serde_json::from_slice(body).map_err(tracerr::from_and_wrap!(=> Error))
    }

    /// Serializes the provided `body` and sends it with the provided
    /// `method` to the provided `path`.
    async fn send_json<B, R>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<R, Traced<Error>>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = serde_json::to_value(body)
            .map_err(tracerr::from_and_wrap!(=> Error))?;
        self.send(Request::new(method, path).with_body(body))
            .await
            .map_err(tracerr::wrap!())
    }

    /// Sends the provided [`Request`], retrying it once the session is
    /// renewed after an unauthorized response.
    async fn dispatch(&self, req: Request) -> Result<Response, Traced<Error>> {
        let mut attempt = Attempt::default();
        let mut renewed_auth = None;

        loop {
            let mut req = req.clone();
            match renewed_auth.clone() {
                Some(value) => drop(req.headers.insert(AUTHORIZATION, value)),
                None => {
                    if let Some(value) = self.auth.get() {
                        _ = req.headers.entry(AUTHORIZATION).or_insert(value);
                    }
                }
            }
            let (method, path) = (req.method.clone(), req.path.clone());

            let resp = self
                .transport
                .execute(req)
                .await
                .map_err(tracerr::from_and_wrap!(=> Error))?;

            if resp.status.is_success() {
                return Ok(resp);
            }
            if resp.status != StatusCode::UNAUTHORIZED {
                return Err(tracerr::new!(Error::status(
                    resp.status,
                    &resp.body,
                )));
            }
            if !attempt.can_retry() {
                log::debug!("`{method} {path}` is unauthorized after retry");
                self.handle_unauthorized();
                return Err(tracerr::new!(Error::unauthorized(&resp.body)));
            }

            attempt = attempt.retried();
            log::debug!("`{method} {path}` is unauthorized, refreshing");

            let renewed = self
                .refresher
                .refresh_access_token()
                .await
                .and_then(|token| {
                    self.set_auth_token(&token);
                    AuthHeader::bearer(&token).ok()
                });
            let Some(value) = renewed else {
                self.handle_unauthorized();
                return Err(tracerr::new!(Error::unauthorized(&resp.body)));
            };
            renewed_auth = Some(value);
        }
    }

    /// Clears the session and notifies the [`HttpClient::on_unauthorized()`]
    /// hook.
    fn handle_unauthorized(&self) {
        log::info!("session is no longer authorized, signing out");

        self.store.clear();
        self.clear_auth_token();

        let hook = self.on_unauthorized.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }
    }
}
