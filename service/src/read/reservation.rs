//! [`Reservation`] read model definitions.

use crate::domain::{reservation, vehicle};
#[cfg(doc)]
use crate::domain::Reservation;

/// Selector of [`reservation::Status::Booked`] [`Reservation`]s of a vehicle
/// overlapping some [`reservation::Period`].
#[derive(Clone, Copy, Debug)]
pub struct Overlapping {
    /// ID of the vehicle to check.
    pub vehicle_id: vehicle::Id,

    /// [`reservation::Period`] to check.
    pub period: reservation::Period,

    /// ID of the [`Reservation`] to ignore (being modified itself).
    pub excluding: Option<reservation::Id>,
}
