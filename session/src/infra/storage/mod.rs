//! [`Storage`]-related implementations.

pub mod file;
pub mod memory;

use std::{io, rc::Rc};

use derive_more::{Display, Error as StdError, From};
use tracerr::Traced;

pub use self::{file::File, memory::Memory};

/// Key the [`AccessToken`] is persisted under.
///
/// [`AccessToken`]: crate::domain::AccessToken
pub const ACCESS_TOKEN_KEY: &str = "token";

/// Key the [`RefreshToken`] is persisted under.
///
/// [`RefreshToken`]: crate::domain::RefreshToken
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Durable key-value storage of string entries.
pub trait Storage {
    /// Returns the value stored under the provided `key`, if any.
    ///
    /// # Errors
    ///
    /// If the underlying storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Traced<Error>>;

    /// Applies all the provided [`Change`]s at once.
    ///
    /// # Errors
    ///
    /// If the underlying storage cannot be written. None of the [`Change`]s
    /// is applied in such case.
    fn apply(&self, changes: &[Change<'_>]) -> Result<(), Traced<Error>>;
}

impl<S: Storage + ?Sized> Storage for Rc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, Traced<Error>> {
        (**self).get(key)
    }

    fn apply(&self, changes: &[Change<'_>]) -> Result<(), Traced<Error>> {
        (**self).apply(changes)
    }
}

/// Single change of a [`Storage`] entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Change<'a> {
    /// Sets the entry under the key to the value.
    Set(&'a str, &'a str),

    /// Removes the entry under the key.
    Remove(&'a str),
}

/// [`Storage`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// I/O operation failed.
    #[display("Storage I/O failed: {_0}")]
    Io(io::Error),

    /// Stored entries cannot be (de)serialized.
    #[display("Malformed storage contents: {_0}")]
    Json(serde_json::Error),
}
