//! [`Vehicle`]-related definitions.
//!
//! [`Vehicle`]: domain::Vehicle

use std::time::Duration;

use common::DateTime;
use serde::{Deserialize, Serialize};
use service::{
    domain::{self, reservation, vehicle},
    query::{self, availability, CheckAvailability, DatabaseQuery},
    read, Query as _,
};

use crate::{
    api::{scalar, Json, Path, Query},
    define_error, AsError, Context, Error,
};

/// A rentable vehicle along with its availability.
#[derive(Clone, Debug, Serialize)]
pub struct Vehicle {
    /// Unique identifier of this `Vehicle`.
    pub id: vehicle::Id,

    /// Model name.
    pub model: String,

    /// License plate.
    pub license_plate: String,

    /// Battery charge level in percents.
    pub charge_level: i16,

    /// Parking location.
    pub location: String,

    /// Whether no reservation holds this `Vehicle` at the moment.
    pub is_available: bool,

    /// When this `Vehicle` was registered.
    pub created_at: DateTime,
}

impl From<read::vehicle::list::Item> for Vehicle {
    fn from((vehicle, available): read::vehicle::list::Item) -> Self {
        let domain::Vehicle {
            id,
            model,
            license_plate,
            charge_level,
            location,
            created_at,
        } = vehicle;
        Self {
            id,
            model: model.to_string(),
            license_plate: license_plate.to_string(),
            charge_level: charge_level.into(),
            location: location.to_string(),
            is_available: available.into(),
            created_at: created_at.coerce(),
        }
    }
}

/// Query string of a `GET /vehicles` request.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct ListInput {
    /// Whether to list only the vehicles available at the moment.
    #[serde(default)]
    pub available: bool,
}

/// Query string of a `GET /vehicles/{vehicle_id}/availability` request.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct AvailabilityInput {
    /// Start of the checked period.
    pub start_time: DateTime,

    /// End of the checked period.
    pub end_time: DateTime,
}

/// Response to a `GET /vehicles/{vehicle_id}/availability` request.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct AvailabilityOutput {
    /// ID of the checked `Vehicle`.
    pub vehicle_id: vehicle::Id,

    /// Start of the checked period.
    pub start_time: DateTime,

    /// End of the checked period.
    pub end_time: DateTime,

    /// Whether the `Vehicle` may be booked for the period.
    pub available: bool,
}

/// Lists vehicles sorted by their license plates.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - malformed query string.
#[tracing::instrument(skip_all, fields(http.handler = "vehicles.list"))]
pub async fn list(
    ctx: Context,
    Query(input): Query<ListInput>,
) -> Result<Json<Vec<Vehicle>>, Error> {
    let query: query::vehicle::List =
        DatabaseQuery::by(read::vehicle::list::Filter {
            at: DateTime::now(),
            only_available: input.available,
        });
    ctx.execute(query)
        .await
        .map(|vs| Json(vs.into_iter().map(Into::into).collect()))
        .map_err(AsError::into_error)
}

/// Returns a single vehicle and its current status.
///
/// # Errors
///
/// Possible error codes:
/// - `NOT_FOUND` - the `Vehicle` doesn't exist.
#[tracing::instrument(skip_all, fields(http.handler = "vehicles.get"))]
pub async fn get(
    ctx: Context,
    Path(vehicle_id): Path<vehicle::Id>,
) -> Result<Json<Vehicle>, Error> {
    let now = DateTime::now();
    // Smallest period covering exactly the current instant.
    let period = reservation::Period::new(
        now.coerce(),
        (now + Duration::from_micros(1)).coerce(),
    )
    .ok_or_else(|| Error::internal(&"empty period"))?;

    let query: query::vehicle::ById = DatabaseQuery::by(vehicle_id);
    let vehicle = ctx
        .execute(query)
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| Error::from(VehicleError::NotExists))?;
    let available = ctx
        .execute(CheckAvailability { vehicle_id, period })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json((vehicle, available).into()))
}

/// Checks whether a vehicle may be booked for a period.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - malformed or empty period;
/// - `NOT_FOUND` - the `Vehicle` doesn't exist.
#[tracing::instrument(skip_all, fields(http.handler = "vehicles.availability"))]
pub async fn availability(
    ctx: Context,
    Path(vehicle_id): Path<vehicle::Id>,
    Query(input): Query<AvailabilityInput>,
) -> Result<Json<AvailabilityOutput>, Error> {
    let AvailabilityInput {
        start_time,
        end_time,
    } = input;

    ctx.execute(CheckAvailability {
        vehicle_id,
        period: scalar::period(start_time, end_time)?,
    })
    .await
    .map(|available| {
        Json(AvailabilityOutput {
            vehicle_id,
            start_time,
            end_time,
            available: available.into(),
        })
    })
    .map_err(AsError::into_error)
}

define_error! {
    enum VehicleError {
        #[code = "NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "`Vehicle` doesn't exist"]
        NotExists,
    }
}

impl AsError for availability::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::VehicleNotExists(_) => Some(VehicleError::NotExists.into()),
        }
    }
}

#[cfg(test)]
mod spec {
    use super::{AvailabilityInput, ListInput};

    #[test]
    fn lists_all_vehicles_by_default() {
        let input: ListInput = serde_json::from_str("{}").unwrap();

        assert!(!input.available);
    }

    #[test]
    fn parses_availability_period() {
        let input: AvailabilityInput = serde_json::from_str(
            r#"{
                "start_time": "2100-01-01T10:00:00+02:00",
                "end_time": "2100-01-01T12:00:00Z"
            }"#,
        )
        .unwrap();

        assert_eq!(input.start_time.to_rfc3339(), "2100-01-01T08:00:00Z");
        assert!(serde_json::from_str::<AvailabilityInput>(
            r#"{"start_time": "tomorrow", "end_time": "2100-01-01T12:00:00Z"}"#,
        )
        .is_err());
    }
}
