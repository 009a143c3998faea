//! Dish catalog API operations.

pub mod user;

use common::Handler;
use session::{
    infra::{transport, Request, Response},
    Session, Storage, Transport,
};
use tracerr::Traced;

use crate::Error;

pub use self::user::User;

/// Dish catalog API, operated on behalf of a [`Session`].
///
/// Every operation is a [`Handler`] of its arguments.
#[derive(Debug)]
pub struct Api<S, T> {
    /// [`Session`] the operations are performed on behalf of.
    session: Session<S, T>,
}

impl<S, T> Api<S, T> {
    /// Creates a new [`Api`] operating on behalf of the provided
    /// [`Session`].
    #[must_use]
    pub fn new(session: Session<S, T>) -> Self {
        Self { session }
    }

    /// Returns the [`Session`] of this [`Api`].
    #[must_use]
    pub fn session(&self) -> &Session<S, T> {
        &self.session
    }
}

/// Authenticated `GET` request to an arbitrary API path.
#[derive(Clone, Debug)]
pub struct Fetch {
    /// Path to request, relative to the API base URL.
    pub path: String,
}

impl<S, T> Handler<Fetch> for Api<S, T>
where
    S: Storage + 'static,
    T: Transport<Request, Ok = Response, Err = transport::Error> + 'static,
{
    type Ok = serde_json::Value;
    type Err = Traced<Error>;

    async fn execute(&self, op: Fetch) -> Result<Self::Ok, Self::Err> {
        self.session
            .client()
            .get(&op.path)
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}
