//! Rental history definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf, Money};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{reservation, user, vehicle};

/// Immutable record of a completed rental.
///
/// Written exactly once, when its [`Reservation`] becomes
/// [`Completed`].
///
/// [`Completed`]: reservation::Status::Completed
/// [`Reservation`]: crate::domain::Reservation
#[derive(Clone, Debug)]
pub struct Entry {
    /// ID of this [`Entry`].
    pub id: Id,

    /// ID of the completed [`Reservation`].
    ///
    /// [`Reservation`]: crate::domain::Reservation
    pub reservation_id: reservation::Id,

    /// ID of the [`User`] who rented the [`Vehicle`].
    ///
    /// [`User`]: crate::domain::User
    /// [`Vehicle`]: crate::domain::Vehicle
    pub user_id: user::Id,

    /// ID of the rented [`Vehicle`].
    ///
    /// [`Vehicle`]: crate::domain::Vehicle
    pub vehicle_id: vehicle::Id,

    /// Rented [`reservation::Period`].
    pub period: reservation::Period,

    /// Total cost of the rental.
    pub total_cost: Money,

    /// [`DateTime`] when this [`Entry`] was recorded.
    pub created_at: CreationDateTime,
}

/// ID of an [`Entry`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// [`DateTime`] when an [`Entry`] was recorded.
pub type CreationDateTime = DateTimeOf<(Entry, unit::Creation)>;
