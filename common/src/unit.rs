//! Marker types.

/// Marker type describing a credential issuance.
#[derive(Clone, Copy, Debug)]
pub struct Issuance;

/// Marker type describing a credential expiration.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing an entity update.
#[derive(Clone, Copy, Debug)]
pub struct Update;
