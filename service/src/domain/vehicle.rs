//! [`Vehicle`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Electric vehicle of the rental fleet.
///
/// Availability is not a property of a [`Vehicle`]: it is derived from the
/// booked [`Reservation`]s covering the requested time.
///
/// [`Reservation`]: crate::domain::Reservation
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// ID of this [`Vehicle`].
    pub id: Id,

    /// [`Model`] of this [`Vehicle`].
    pub model: Model,

    /// [`LicensePlate`] of this [`Vehicle`].
    pub license_plate: LicensePlate,

    /// Last reported [`ChargeLevel`] of this [`Vehicle`].
    pub charge_level: ChargeLevel,

    /// Last reported [`Location`] of this [`Vehicle`].
    pub location: Location,

    /// [`DateTime`] when this [`Vehicle`] was added to the fleet.
    pub created_at: CreationDateTime,
}

/// ID of a [`Vehicle`].
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

/// Model name of a [`Vehicle`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Model(String);

impl Model {
    /// Creates a new [`Model`] if the given `model` is valid.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Option<Self> {
        let model = model.into();
        Self::check(&model).then_some(Self(model))
    }

    /// Checks whether the given `model` is a valid [`Model`].
    fn check(model: impl AsRef<str>) -> bool {
        let model = model.as_ref();
        model.trim() == model && !model.is_empty() && model.len() <= 128
    }
}

impl FromStr for Model {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Model`")
    }
}

/// License plate of a [`Vehicle`].
#[derive(AsRef, Clone, Debug, Display, Eq, Ord, PartialEq, PartialOrd)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct LicensePlate(String);

impl LicensePlate {
    /// Creates a new [`LicensePlate`] if the given `plate` is valid.
    ///
    /// Plates are normalized to upper case.
    #[must_use]
    pub fn new(plate: impl AsRef<str>) -> Option<Self> {
        let plate = plate.as_ref().to_uppercase();
        Self::check(&plate).then_some(Self(plate))
    }

    /// Checks whether the given `plate` is a valid [`LicensePlate`].
    fn check(plate: impl AsRef<str>) -> bool {
        let plate = plate.as_ref();
        !plate.is_empty()
            && plate.len() <= 16
            && plate
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ' ')
    }
}

impl FromStr for LicensePlate {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `LicensePlate`")
    }
}

/// Battery charge level of a [`Vehicle`] in percents.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct ChargeLevel(i16);

impl ChargeLevel {
    /// Creates a new [`ChargeLevel`] if the given `percents` are in the
    /// `0..=100` range.
    #[must_use]
    pub fn new(percents: i16) -> Option<Self> {
        (0..=100).contains(&percents).then_some(Self(percents))
    }
}

/// Human-readable location of a [`Vehicle`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Location(String);

impl Location {
    /// Creates a new [`Location`] if the given `location` is valid.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Option<Self> {
        let location = location.into();
        Self::check(&location).then_some(Self(location))
    }

    /// Checks whether the given `location` is a valid [`Location`].
    fn check(location: impl AsRef<str>) -> bool {
        let location = location.as_ref();
        location.trim() == location
            && !location.is_empty()
            && location.len() <= 512
    }
}

/// [`DateTime`] when a [`Vehicle`] was added to the fleet.
pub type CreationDateTime = DateTimeOf<(Vehicle, unit::Creation)>;

#[cfg(test)]
mod spec {
    use super::{ChargeLevel, LicensePlate, Model};

    #[test]
    fn validates_model() {
        assert!(Model::new("Tesla Model 3").is_some());
        assert!(Model::new(" Tesla").is_none());
        assert!(Model::new("").is_none());
    }

    #[test]
    fn normalizes_license_plate() {
        assert_eq!(LicensePlate::new("ev-1234").unwrap().to_string(), "EV-1234");
        assert!(LicensePlate::new("EV_1234").is_none());
        assert!(LicensePlate::new("").is_none());
    }

    #[test]
    fn bounds_charge_level() {
        assert!(ChargeLevel::new(0).is_some());
        assert!(ChargeLevel::new(100).is_some());
        assert!(ChargeLevel::new(101).is_none());
        assert!(ChargeLevel::new(-1).is_none());
    }
}
