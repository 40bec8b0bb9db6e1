//! [`Reservation`] definitions.

use std::time::Duration;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{user, vehicle};

/// Booking of a [`Vehicle`] by a [`User`] for a [`Period`].
///
/// [`User`]: crate::domain::User
/// [`Vehicle`]: crate::domain::Vehicle
#[derive(Clone, Debug)]
pub struct Reservation {
    /// ID of this [`Reservation`].
    pub id: Id,

    /// ID of the [`User`] owning this [`Reservation`].
    ///
    /// [`User`]: crate::domain::User
    pub user_id: user::Id,

    /// ID of the reserved [`Vehicle`].
    ///
    /// [`Vehicle`]: crate::domain::Vehicle
    pub vehicle_id: vehicle::Id,

    /// Reserved [`Period`].
    pub period: Period,

    /// Current [`Status`] of this [`Reservation`].
    pub status: Status,

    /// [`DateTime`] when this [`Reservation`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Reservation`] was modified last time.
    pub updated_at: ModificationDateTime,
}

impl Reservation {
    /// Indicates whether this [`Reservation`] holds its [`Vehicle`] for the
    /// provided [`Period`].
    ///
    /// [`Vehicle`]: crate::domain::Vehicle
    #[must_use]
    pub fn holds(&self, period: &Period) -> bool {
        self.status == Status::Booked && self.period.overlaps(period)
    }
}

/// ID of a [`Reservation`].
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

/// Half-open `[start, end)` time range of a [`Reservation`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Period {
    /// Inclusive start of this [`Period`].
    start: StartDateTime,

    /// Exclusive end of this [`Period`].
    end: EndDateTime,
}

impl Period {
    /// Creates a new [`Period`] without checking its bounds.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `start` is strictly before `end`.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(
        start: StartDateTime,
        end: EndDateTime,
    ) -> Self {
        Self { start, end }
    }

    /// Creates a new [`Period`] if `start` is strictly before `end`.
    #[must_use]
    pub fn new(start: StartDateTime, end: EndDateTime) -> Option<Self> {
        (start.coerce::<()>() < end.coerce()).then_some(Self { start, end })
    }

    /// Returns the inclusive start of this [`Period`].
    #[must_use]
    pub const fn start(&self) -> StartDateTime {
        self.start
    }

    /// Returns the exclusive end of this [`Period`].
    #[must_use]
    pub const fn end(&self) -> EndDateTime {
        self.end
    }

    /// Returns the length of this [`Period`].
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end
            .duration_since(self.start)
            .unwrap_or(Duration::ZERO)
    }

    /// Indicates whether this [`Period`] shares at least one instant with the
    /// `other` one.
    ///
    /// Adjacent periods (`[a, b)` and `[b, c)`) don't overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start.coerce::<()>() < other.end.coerce()
            && other.start.coerce::<()>() < self.end.coerce()
    }

    /// Indicates whether this [`Period`] starts strictly after the provided
    /// instant.
    #[must_use]
    pub fn starts_after<Of: ?Sized>(&self, at: DateTimeOf<Of>) -> bool {
        self.start.coerce::<()>() > at.coerce()
    }

    /// Indicates whether this [`Period`] is over at the provided instant.
    #[must_use]
    pub fn has_ended_at<Of: ?Sized>(&self, at: DateTimeOf<Of>) -> bool {
        self.end.coerce::<()>() <= at.coerce()
    }

    /// Indicates whether this [`Period`] contains the provided instant.
    #[must_use]
    pub fn contains<Of: ?Sized>(&self, at: DateTimeOf<Of>) -> bool {
        self.start.coerce::<()>() <= at.coerce()
            && at.coerce::<()>() < self.end.coerce()
    }
}

define_kind! {
    #[doc = "Status of a [`Reservation`]."]
    enum Status {
        #[doc = "[`Reservation`] holds its vehicle."]
        Booked = 1,

        #[doc = "[`Reservation`] was cancelled by its owner."]
        Cancelled = 2,

        #[doc = "Rental is over."]
        Completed = 3,
    }
}

impl Status {
    /// Indicates whether no transitions are possible out of this [`Status`].
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

/// [`DateTime`] when a [`Reservation`] was created.
pub type CreationDateTime = DateTimeOf<(Reservation, unit::Creation)>;

/// [`DateTime`] when a [`Reservation`] was modified.
pub type ModificationDateTime = DateTimeOf<(Reservation, unit::Modification)>;

/// [`DateTime`] when a [`Period`] starts.
pub type StartDateTime = DateTimeOf<(Period, unit::Start)>;

/// [`DateTime`] when a [`Period`] ends.
pub type EndDateTime = DateTimeOf<(Period, unit::End)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use super::{Period, Status};

    fn at(s: &str) -> DateTime {
        DateTime::from_rfc3339(s).unwrap()
    }

    fn period(start: &str, end: &str) -> Period {
        Period::new(at(start).coerce(), at(end).coerce()).unwrap()
    }

    #[test]
    fn rejects_empty_and_reversed_periods() {
        let t = at("2030-01-01T10:00:00Z");

        assert!(Period::new(t.coerce(), t.coerce()).is_none());
        assert!(Period::new(
            (t + Duration::from_secs(1)).coerce(),
            t.coerce(),
        )
        .is_none());
    }

    #[test]
    fn overlaps_half_open() {
        let a = period("2030-01-01T10:00:00Z", "2030-01-01T12:00:00Z");
        let b = period("2030-01-01T11:00:00Z", "2030-01-01T13:00:00Z");
        let c = period("2030-01-01T12:00:00Z", "2030-01-01T14:00:00Z");
        let d = period("2030-01-01T09:00:00Z", "2030-01-01T15:00:00Z");

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
        assert!(a.overlaps(&d));
        assert!(d.overlaps(&c));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn contains_start_but_not_end() {
        let p = period("2030-01-01T10:00:00Z", "2030-01-01T12:00:00Z");

        assert!(p.contains(at("2030-01-01T10:00:00Z")));
        assert!(p.contains(at("2030-01-01T11:59:59Z")));
        assert!(!p.contains(at("2030-01-01T12:00:00Z")));
    }

    #[test]
    fn relates_to_instants() {
        let p = period("2030-01-01T10:00:00Z", "2030-01-01T12:00:00Z");

        assert!(p.starts_after(at("2030-01-01T09:59:59Z")));
        assert!(!p.starts_after(at("2030-01-01T10:00:00Z")));
        assert!(!p.has_ended_at(at("2030-01-01T11:59:59Z")));
        assert!(p.has_ended_at(at("2030-01-01T12:00:00Z")));
    }

    #[test]
    fn duration() {
        let p = period("2030-01-01T10:00:00Z", "2030-01-01T12:30:00Z");

        assert_eq!(p.duration(), Duration::from_secs(150 * 60));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!Status::Booked.is_terminal());
        assert!(Status::Cancelled.is_terminal());
        assert!(Status::Completed.is_terminal());
    }

    #[test]
    fn status_as_string() {
        assert_eq!(Status::Cancelled.to_string(), "CANCELLED");
        assert_eq!("COMPLETED".parse::<Status>(), Ok(Status::Completed));
        assert!("completed".parse::<Status>().is_err());
    }
}
