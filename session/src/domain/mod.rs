//! Domain definitions.

pub mod identity;
pub mod token;

pub use self::{
    identity::{Identity, Role},
    token::{AccessToken, RefreshToken, TokenPair},
};
