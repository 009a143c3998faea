//! Infrastructure layer.

pub mod storage;
pub mod transport;

pub use self::{
    storage::Storage,
    transport::{Request, Response, Transport},
};
