//! Marker types.
//!
//! Used as the `Of` parameter of [`DateTimeOf`] to tell apart timestamps of
//! different meaning.
//!
//! [`DateTimeOf`]: crate::DateTimeOf

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing an entity modification.
#[derive(Clone, Copy, Debug)]
pub struct Modification;

/// Marker type describing an entity expiration.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

/// Marker type describing a start of something.
#[derive(Clone, Copy, Debug)]
pub struct Start;

/// Marker type describing an end of something.
#[derive(Clone, Copy, Debug)]
pub struct End;
