//! [`TokenStore`] definitions.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::{Rc, Weak},
};

use derive_more::Debug;
use tracing as log;

use crate::{
    domain::{AccessToken, RefreshToken, TokenPair},
    infra::{
        storage::{Change, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY},
        Storage,
    },
};

/// Listener of [`TokenStore`] changes.
type Listener = Rc<dyn Fn(Option<&AccessToken>)>;

/// Durable storage of the credential pair, mirrored in an in-process cache.
///
/// Reads are served from the cache, so they're synchronous and always
/// observe the last mutation. Every mutation notifies all the subscribed
/// listeners, in their subscription order, with the new [`AccessToken`]
/// (or [`None`] once cleared). Consecutive identical values are notified
/// too.
///
/// Clones share the same state.
#[derive(Debug)]
pub struct TokenStore<S>(Rc<Inner<S>>);

/// Shared state of a [`TokenStore`].
#[derive(Debug)]
struct Inner<S> {
    /// Durable [`Storage`] the tokens are persisted into.
    storage: S,

    /// Cached tokens.
    cache: RefCell<Cache>,

    /// Subscribed listeners.
    listeners: Rc<RefCell<Listeners>>,

    /// Notifications waiting to be delivered.
    pending: RefCell<VecDeque<Option<AccessToken>>>,

    /// Whether notifications are being delivered right now.
    notifying: Cell<bool>,
}

/// Cached tokens of a [`TokenStore`].
#[derive(Debug, Default)]
struct Cache {
    /// Cached [`AccessToken`].
    access: Option<AccessToken>,

    /// Cached [`RefreshToken`].
    refresh: Option<RefreshToken>,
}

/// Subscribed listeners of a [`TokenStore`].
#[derive(Debug, Default)]
struct Listeners {
    /// ID to assign to the next subscribed listener.
    next_id: u64,

    /// Listeners in their subscription order.
    #[debug(skip)]
    entries: Vec<(u64, Listener)>,
}

impl<S> Clone for TokenStore<S> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<S: Storage> TokenStore<S> {
    /// Creates a new [`TokenStore`] loading the cached tokens from the
    /// provided [`Storage`].
    ///
    /// Entries that cannot be read are considered missing.
    pub fn load(storage: S) -> Self {
        let read = |key| {
            storage.get(key).unwrap_or_else(|e| {
                log::warn!("failed to read `{key}` from `Storage`: {e}");
                None
            })
        };
        let cache = Cache {
            access: read(ACCESS_TOKEN_KEY).map(AccessToken::from),
            refresh: read(REFRESH_TOKEN_KEY).map(RefreshToken::from),
        };

        Self(Rc::new(Inner {
            storage,
            cache: RefCell::new(cache),
            listeners: Rc::default(),
            pending: RefCell::default(),
            notifying: Cell::new(false),
        }))
    }

    /// Returns the current [`AccessToken`], if any.
    #[must_use]
    pub fn access(&self) -> Option<AccessToken> {
        self.0.cache.borrow().access.clone()
    }

    /// Returns the current [`RefreshToken`], if any.
    #[must_use]
    pub fn refresh(&self) -> Option<RefreshToken> {
        self.0.cache.borrow().refresh.clone()
    }

    /// Replaces the stored [`AccessToken`], and the [`RefreshToken`] if one
    /// is provided, then notifies the listeners.
    ///
    /// Without a `refresh` token, the currently stored one is kept.
    pub fn set(&self, access: AccessToken, refresh: Option<RefreshToken>) {
        let mut changes = vec![Change::Set(ACCESS_TOKEN_KEY, access.as_ref())];
        if let Some(refresh) = &refresh {
            changes.push(Change::Set(REFRESH_TOKEN_KEY, refresh.as_ref()));
        }
        self.persist(&changes);

        {
            let mut cache = self.0.cache.borrow_mut();
            cache.access = Some(access.clone());
            if let Some(refresh) = refresh {
                cache.refresh = Some(refresh);
            }
        }

        self.notify(Some(access));
    }

    /// Replaces both stored tokens with the provided [`TokenPair`], then
    /// notifies the listeners.
    pub fn set_pair(&self, pair: TokenPair) {
        let TokenPair {
            access_token,
            refresh_token,
        } = pair;
        self.set(access_token, Some(refresh_token));
    }

    /// Removes both stored tokens, then notifies the listeners with [`None`].
    pub fn clear(&self) {
        self.persist(&[
            Change::Remove(ACCESS_TOKEN_KEY),
            Change::Remove(REFRESH_TOKEN_KEY),
        ]);

        *self.0.cache.borrow_mut() = Cache::default();

        self.notify(None);
    }

    /// Writes the provided [`Change`]s into the durable [`Storage`].
    ///
    /// The cache stays authoritative if the [`Storage`] fails.
    fn persist(&self, changes: &[Change<'_>]) {
        if let Err(e) = self.0.storage.apply(changes) {
            log::warn!("failed to persist tokens into `Storage`: {e}");
        }
    }
}

impl<S> TokenStore<S> {
    /// Subscribes the provided `listener` to the changes of this
    /// [`TokenStore`].
    ///
    /// The `listener` stays subscribed until the returned [`Subscription`] is
    /// dropped.
    pub fn subscribe(
        &self,
        listener: impl Fn(Option<&AccessToken>) + 'static,
    ) -> Subscription {
        let mut listeners = self.0.listeners.borrow_mut();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Rc::new(listener)));

        Subscription {
            listeners: Rc::downgrade(&self.0.listeners),
            id,
        }
    }

    /// Creates a [`WeakTokenStore`] pointing to this [`TokenStore`].
    #[must_use]
    pub fn downgrade(&self) -> WeakTokenStore<S> {
        WeakTokenStore(Rc::downgrade(&self.0))
    }

    /// Delivers the provided notification to all the listeners.
    ///
    /// Notifications raised by listeners while being notified are queued and
    /// delivered once the current round completes, so every listener
    /// observes notifications in the order of mutations.
    fn notify(&self, token: Option<AccessToken>) {
        self.0.pending.borrow_mut().push_back(token);
        if self.0.notifying.replace(true) {
            return;
        }

        loop {
            let next = self.0.pending.borrow_mut().pop_front();
            let Some(token) = next else {
                break;
            };

            let listeners = self
                .0
                .listeners
                .borrow()
                .entries
                .iter()
                .map(|(_, l)| Rc::clone(l))
                .collect::<Vec<_>>();
            for listener in listeners {
                listener(token.as_ref());
            }
        }

        self.0.notifying.set(false);
    }
}

/// Non-owning handle to a [`TokenStore`].
#[derive(Debug)]
pub struct WeakTokenStore<S>(Weak<Inner<S>>);

impl<S> Clone for WeakTokenStore<S> {
    fn clone(&self) -> Self {
        Self(Weak::clone(&self.0))
    }
}

impl<S> WeakTokenStore<S> {
    /// Upgrades this [`WeakTokenStore`] into a [`TokenStore`], if it still
    /// exists.
    #[must_use]
    pub fn upgrade(&self) -> Option<TokenStore<S>> {
        self.0.upgrade().map(TokenStore)
    }
}

/// Handle of a [`TokenStore::subscribe()`]d listener.
#[derive(Debug)]
#[must_use = "dropping a `Subscription` unsubscribes its listener"]
pub struct Subscription {
    /// Listeners the listener is subscribed into.
    #[debug(skip)]
    listeners: Weak<RefCell<Listeners>>,

    /// ID of the subscribed listener.
    id: u64,
}

impl Subscription {
    /// Unsubscribes the listener.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .borrow_mut()
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}
