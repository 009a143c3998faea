//! [`Error`]-related definitions.

use derive_more::{Display, Error as StdError, From};
use session::{client, AccessError};

/// Error of executing a command.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// API request failed.
    Api(client::Error),

    /// Current session doesn't grant the required access.
    Access(AccessError),

    /// Command output cannot be serialized.
    #[display("failed to serialize output: {_0}")]
    Output(serde_json::Error),
}
