//! [`SessionStateProjector`] definitions.

use std::rc::Rc;

use derive_more::{Display, Error};
use tokio::sync::watch;
use tracing as log;

use crate::{
    client::AuthHeader,
    domain::{AccessToken, Identity, TokenPair},
    infra::Storage,
    store::{Subscription, WeakTokenStore},
    TokenStore,
};

/// Snapshot of the session, as observed by the rest of the application.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SessionState {
    /// [`Identity`] of the signed-in user, if any.
    pub identity: Option<Identity>,
}

impl SessionState {
    /// Indicates whether a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Indicates whether the signed-in user is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.identity.as_ref().is_some_and(Identity::is_admin)
    }
}

/// Level of access required by a part of the application.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Access {
    /// Any signed-in user.
    Authenticated,

    /// Signed-in administrator only.
    Admin,
}

/// Error of [`SessionStateProjector::authorize()`]ing an [`Access`].
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum AccessError {
    /// No user is signed in.
    #[display("authentication required")]
    AuthenticationRequired,

    /// Signed-in user is not an administrator.
    #[display("administrator role required")]
    AdminRequired,
}

/// Projection of the [`TokenStore`] into the [`SessionState`].
///
/// Re-derives the [`Identity`] on every [`TokenStore`] change, and keeps the
/// default [`AuthHeader`] of the [`HttpClient`] in sync with the current
/// [`AccessToken`]. An [`AccessToken`] that cannot be decoded ends the
/// session.
///
/// [`HttpClient`]: crate::HttpClient
#[derive(Debug)]
pub struct SessionStateProjector<S> {
    /// Projected [`TokenStore`].
    store: TokenStore<S>,

    /// Default [`AuthHeader`] kept in sync with the [`TokenStore`].
    auth: AuthHeader,

    /// Current [`SessionState`].
    state: Rc<watch::Sender<SessionState>>,

    /// [`TokenStore`] subscription, alive as long as this projector is.
    _subscription: Subscription,
}

impl<S: Storage + 'static> SessionStateProjector<S> {
    /// Creates a new [`SessionStateProjector`] of the provided
    /// [`TokenStore`], projecting the currently stored [`AccessToken`]
    /// right away.
    pub fn new(store: TokenStore<S>, auth: AuthHeader) -> Self {
        let state = Rc::new(watch::Sender::new(SessionState::default()));

        let projection = Projection {
            store: store.downgrade(),
            auth: auth.clone(),
            state: Rc::clone(&state),
        };
        projection.apply(store.access().as_ref());
        let subscription =
            store.subscribe(move |token| projection.apply(token));

        Self {
            store,
            auth,
            state,
            _subscription: subscription,
        }
    }

    /// Returns a snapshot of the current [`SessionState`].
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Returns the [`Identity`] of the signed-in user, if any.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    /// Indicates whether a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Indicates whether the signed-in user is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    /// Returns a [`watch::Receiver`] observing [`SessionState`] changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Starts a session with the provided [`TokenPair`].
    pub fn login(&self, pair: TokenPair) {
        self.store.set_pair(pair);
    }

    /// Ends the current session.
    pub fn logout(&self) {
        self.store.clear();
        self.auth.clear();
    }

    /// Checks whether the current session grants the provided [`Access`].
    ///
    /// # Errors
    ///
    /// - [`AccessError::AuthenticationRequired`] if no user is signed in;
    /// - [`AccessError::AdminRequired`] if [`Access::Admin`] is required,
    ///   but the signed-in user is not an administrator.
    pub fn authorize(&self, access: Access) -> Result<Identity, AccessError> {
        let identity = self
            .identity()
            .ok_or(AccessError::AuthenticationRequired)?;
        if access == Access::Admin && !identity.is_admin() {
            return Err(AccessError::AdminRequired);
        }
        Ok(identity)
    }
}

/// Listener projecting [`TokenStore`] notifications into the
/// [`SessionState`].
struct Projection<S> {
    /// Projected [`TokenStore`], held weakly as it owns this listener.
    store: WeakTokenStore<S>,

    /// Default [`AuthHeader`] to keep in sync.
    auth: AuthHeader,

    /// [`SessionState`] to update.
    state: Rc<watch::Sender<SessionState>>,
}

impl<S: Storage> Projection<S> {
    /// Projects the provided [`AccessToken`].
    fn apply(&self, token: Option<&AccessToken>) {
        let Some(token) = token else {
            self.auth.clear();
            self.replace(SessionState::default());
            return;
        };

        match Identity::decode(token) {
            Ok(identity) => {
                if let Err(e) = self.auth.set(token) {
                    log::warn!("cannot use access token as header value: {e}");
                }
                log::debug!("session of user `{}` is active", identity.id);
                self.replace(SessionState {
                    identity: Some(identity),
                });
            }
            Err(e) => {
                log::warn!("discarding undecodable access token: {e}");
                self.auth.clear();
                self.replace(SessionState::default());
                if let Some(store) = self.store.upgrade() {
                    store.clear();
                }
            }
        }
    }

    /// Replaces the current [`SessionState`] with the provided one.
    fn replace(&self, state: SessionState) {
        drop(self.state.send_replace(state));
    }
}
