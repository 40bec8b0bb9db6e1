//! [`Reservation`]-related definitions.
//!
//! [`Reservation`]: domain::Reservation

use common::DateTime;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, confirm_payment, Command as _},
    domain::{self, rental, reservation, user, vehicle},
    query::{self, DatabaseQuery},
};

use crate::{
    api::{scalar, Json, Path},
    define_error, AsError, Context, Error, Session,
};

/// A booking of a vehicle.
#[derive(Clone, Debug, Serialize)]
pub struct Reservation {
    /// Unique identifier of this `Reservation`.
    pub id: reservation::Id,

    /// ID of the owning `User`.
    pub user_id: user::Id,

    /// ID of the booked `Vehicle`.
    pub vehicle_id: vehicle::Id,

    /// Inclusive start of the booked period.
    pub start_time: DateTime,

    /// Exclusive end of the booked period.
    pub end_time: DateTime,

    /// `BOOKED`, `CANCELLED` or `COMPLETED`.
    pub status: String,

    /// When this `Reservation` was created.
    pub created_at: DateTime,

    /// When this `Reservation` was modified last time.
    pub updated_at: DateTime,
}

impl From<domain::Reservation> for Reservation {
    fn from(r: domain::Reservation) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            vehicle_id: r.vehicle_id,
            start_time: r.period.start().coerce(),
            end_time: r.period.end().coerce(),
            status: r.status.to_string(),
            created_at: r.created_at.coerce(),
            updated_at: r.updated_at.coerce(),
        }
    }
}

/// Invoice of a `Reservation`.
#[derive(Clone, Debug, Serialize)]
pub struct Billing {
    /// ID of the billed `Reservation`.
    pub reservation_id: reservation::Id,

    /// Billed amount.
    pub amount: scalar::Money,

    /// `PENDING`, `PAID`, `FAILED`, `REFUNDED` or `VOIDED`.
    pub status: String,

    /// When this `Billing` was issued.
    pub created_at: DateTime,

    /// When this `Billing` was modified last time.
    pub updated_at: DateTime,
}

impl From<domain::Billing> for Billing {
    fn from(b: domain::Billing) -> Self {
        Self {
            reservation_id: b.reservation_id,
            amount: b.amount.into(),
            status: b.status.to_string(),
            created_at: b.created_at.coerce(),
            updated_at: b.updated_at.coerce(),
        }
    }
}

/// Record of a completed rental.
#[derive(Clone, Debug, Serialize)]
pub struct RentalEntry {
    /// Unique identifier of this entry.
    pub id: rental::Id,

    /// ID of the completed `Reservation`.
    pub reservation_id: reservation::Id,

    /// ID of the `User` who rented the `Vehicle`.
    pub user_id: user::Id,

    /// ID of the rented `Vehicle`.
    pub vehicle_id: vehicle::Id,

    /// Start of the rental.
    pub start_time: DateTime,

    /// End of the rental.
    pub end_time: DateTime,

    /// Total cost of the rental.
    pub total_cost: scalar::Money,

    /// When this entry was recorded.
    pub created_at: DateTime,
}

impl From<rental::Entry> for RentalEntry {
    fn from(e: rental::Entry) -> Self {
        Self {
            id: e.id,
            reservation_id: e.reservation_id,
            user_id: e.user_id,
            vehicle_id: e.vehicle_id,
            start_time: e.period.start().coerce(),
            end_time: e.period.end().coerce(),
            total_cost: e.total_cost.into(),
            created_at: e.created_at.coerce(),
        }
    }
}

/// `Reservation` along with its `Billing`.
#[derive(Clone, Debug, Serialize)]
pub struct BookingOutput {
    /// Affected `Reservation`.
    pub reservation: Reservation,

    /// `Billing` of the `Reservation`.
    pub billing: Billing,
}

/// Completed rental along with its final `Billing`.
#[derive(Clone, Debug, Serialize)]
pub struct CompletionOutput {
    /// Recorded rental history entry.
    pub entry: RentalEntry,

    /// Final `Billing` of the rental.
    pub billing: Billing,
}

/// Body of a `POST /reservations` request.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct BookInput {
    /// ID of the booking `User`, must match the authenticated one.
    #[serde(default)]
    pub user_id: Option<user::Id>,

    /// ID of the `Vehicle` to book.
    pub vehicle_id: vehicle::Id,

    /// Start of the booked period.
    pub start_time: DateTime,

    /// End of the booked period.
    pub end_time: DateTime,
}

impl BookInput {
    /// Validates this [`BookInput`] on behalf of the provided [`Session`]
    /// into a [`command::BookVehicle`].
    ///
    /// # Errors
    ///
    /// If the period is empty or the `user_id` is not the [`Session`] one.
    pub fn into_command(
        self,
        session: &Session,
    ) -> Result<command::BookVehicle, Error> {
        let Self {
            user_id,
            vehicle_id,
            start_time,
            end_time,
        } = self;

        if user_id.is_some_and(|id| id != session.user_id) {
            return Err(ReservationError::ForeignUser.into());
        }

        Ok(command::BookVehicle {
            user_id: session.user_id,
            vehicle_id,
            period: scalar::period(start_time, end_time)?,
        })
    }
}

/// Body of a `PATCH /reservations/{reservation_id}` request.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct ModifyInput {
    /// New start of the booked period.
    pub start_time: DateTime,

    /// New end of the booked period.
    pub end_time: DateTime,
}

/// Body of a `POST /reservations/{reservation_id}/complete` request.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct CompleteInput {
    /// Final cost of the rental, the billed amount by default.
    #[serde(default)]
    pub total_cost: Option<scalar::Money>,

    /// Whether to complete the rental before its period ends.
    #[serde(default)]
    pub forced: bool,
}

/// Body of a `POST /reservations/{reservation_id}/billing/payment` request.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct PaymentInput {
    /// Outcome of the payment attempt.
    pub outcome: Outcome,
}

/// Outcome of a payment attempt.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Payment is received.
    Paid,

    /// Payment attempt has failed.
    Failed,
}

impl From<Outcome> for confirm_payment::Outcome {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Paid => Self::Paid,
            Outcome::Failed => Self::Failed,
        }
    }
}

/// Books a vehicle for the authenticated `User`.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - malformed, empty or past period, or foreign `user_id`;
/// - `NOT_FOUND` - the `Vehicle` doesn't exist;
/// - `CONFLICT` - the `Vehicle` is booked for an overlapping period;
/// - `TIMEOUT` - the `Vehicle` is busy, the request may be retried.
#[tracing::instrument(skip_all, fields(http.handler = "reservations.book"))]
pub async fn book(
    ctx: Context,
    session: Session,
    Json(input): Json<BookInput>,
) -> Result<(StatusCode, Json<BookingOutput>), Error> {
    ctx.execute(input.into_command(&session)?)
        .await
        .map(|out| {
            (
                StatusCode::CREATED,
                Json(BookingOutput {
                    reservation: out.reservation.into(),
                    billing: out.billing.into(),
                }),
            )
        })
        .map_err(AsError::into_error)
}

/// Returns a `Reservation` of the authenticated `User`.
///
/// # Errors
///
/// Possible error codes:
/// - `NOT_FOUND` - the `Reservation` doesn't exist or is a foreign one.
#[tracing::instrument(skip_all, fields(http.handler = "reservations.get"))]
pub async fn get(
    ctx: Context,
    session: Session,
    Path(reservation_id): Path<reservation::Id>,
) -> Result<Json<Reservation>, Error> {
    own_reservation(&ctx, &session, reservation_id)
        .await
        .map(|r| Json(r.into()))
}

/// Moves a `Reservation` of the authenticated `User` to another period.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - malformed, empty or past period;
/// - `NOT_FOUND` - the `Reservation` doesn't exist or is a foreign one;
/// - `CONFLICT` - the `Vehicle` is booked for an overlapping period;
/// - `INVALID_STATE` - the `Reservation` is not `BOOKED`;
/// - `TIMEOUT` - the `Vehicle` is busy, the request may be retried.
#[tracing::instrument(skip_all, fields(http.handler = "reservations.modify"))]
pub async fn modify(
    ctx: Context,
    session: Session,
    Path(reservation_id): Path<reservation::Id>,
    Json(input): Json<ModifyInput>,
) -> Result<Json<BookingOutput>, Error> {
    let ModifyInput {
        start_time,
        end_time,
    } = input;

    ctx.execute(command::ModifyBooking {
        reservation_id,
        user_id: session.user_id,
        period: scalar::period(start_time, end_time)?,
    })
    .await
    .map(|out| {
        Json(BookingOutput {
            reservation: out.reservation.into(),
            billing: out.billing.into(),
        })
    })
    .map_err(AsError::into_error)
}

/// Cancels a `Reservation` of the authenticated `User`.
///
/// # Errors
///
/// Possible error codes:
/// - `NOT_FOUND` - the `Reservation` doesn't exist or is a foreign one;
/// - `INVALID_STATE` - the `Reservation` is not `BOOKED`;
/// - `TIMEOUT` - the `Vehicle` is busy, the request may be retried.
#[tracing::instrument(skip_all, fields(http.handler = "reservations.cancel"))]
pub async fn cancel(
    ctx: Context,
    session: Session,
    Path(reservation_id): Path<reservation::Id>,
) -> Result<Json<BookingOutput>, Error> {
    ctx.execute(command::CancelBooking {
        reservation_id,
        user_id: session.user_id,
    })
    .await
    .map(|out| {
        Json(BookingOutput {
            reservation: out.reservation.into(),
            billing: out.billing.into(),
        })
    })
    .map_err(AsError::into_error)
}

/// Completes a rental of the authenticated `User`.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - negative `total_cost` or in a foreign currency;
/// - `NOT_FOUND` - the `Reservation` doesn't exist or is a foreign one;
/// - `INVALID_STATE` - the `Reservation` is not `BOOKED`, or its period
///                     hasn't ended and completion is not `forced`;
/// - `TIMEOUT` - the `Vehicle` is busy, the request may be retried.
#[tracing::instrument(skip_all, fields(http.handler = "reservations.complete"))]
pub async fn complete(
    ctx: Context,
    session: Session,
    Path(reservation_id): Path<reservation::Id>,
    Json(input): Json<CompleteInput>,
) -> Result<Json<CompletionOutput>, Error> {
    let CompleteInput { total_cost, forced } = input;

    ctx.execute(command::CompleteRental {
        reservation_id,
        user_id: session.user_id,
        total_cost: total_cost.map(Into::into),
        forced,
    })
    .await
    .map(|out| {
        Json(CompletionOutput {
            entry: out.entry.into(),
            billing: out.billing.into(),
        })
    })
    .map_err(AsError::into_error)
}

/// Returns the `Billing` of a `Reservation` of the authenticated `User`.
///
/// # Errors
///
/// Possible error codes:
/// - `NOT_FOUND` - the `Reservation` doesn't exist or is a foreign one.
#[tracing::instrument(skip_all, fields(http.handler = "reservations.billing"))]
pub async fn billing(
    ctx: Context,
    session: Session,
    Path(reservation_id): Path<reservation::Id>,
) -> Result<Json<Billing>, Error> {
    let reservation = own_reservation(&ctx, &session, reservation_id).await?;

    let query: query::billing::ByReservation =
        DatabaseQuery::by(reservation.id);
    ctx.execute(query)
        .await
        .map_err(AsError::into_error)?
        .map(|b| Json(b.into()))
        .ok_or_else(|| Error::from(ReservationError::NotExists))
}

/// Records a payment outcome of a `Reservation` of the authenticated `User`.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - unknown `outcome`;
/// - `NOT_FOUND` - the `Reservation` doesn't exist or is a foreign one;
/// - `INVALID_STATE` - the `Reservation` is cancelled or the `Billing` is
///                     settled already;
/// - `TIMEOUT` - the `Vehicle` is busy, the request may be retried.
#[tracing::instrument(skip_all, fields(http.handler = "reservations.payment"))]
pub async fn confirm_payment(
    ctx: Context,
    session: Session,
    Path(reservation_id): Path<reservation::Id>,
    Json(input): Json<PaymentInput>,
) -> Result<Json<Billing>, Error> {
    ctx.execute(command::ConfirmPayment {
        reservation_id,
        user_id: session.user_id,
        outcome: input.outcome.into(),
    })
    .await
    .map(|b| Json(b.into()))
    .map_err(AsError::into_error)
}

/// Returns the [`domain::Reservation`] if it's owned by the [`Session`]
/// `User`.
async fn own_reservation(
    ctx: &Context,
    session: &Session,
    reservation_id: reservation::Id,
) -> Result<domain::Reservation, Error> {
    let query: query::reservation::ById = DatabaseQuery::by(reservation_id);
    ctx.execute(query)
        .await
        .map_err(AsError::into_error)?
        .filter(|r| r.user_id == session.user_id)
        .ok_or_else(|| ReservationError::NotExists.into())
}

define_error! {
    enum ReservationError {
        #[code = "INVALID_INPUT"]
        #[status = BAD_REQUEST]
        #[message = "`user_id` doesn't match the authenticated `User`"]
        ForeignUser,

        #[code = "NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "`Reservation` doesn't exist"]
        NotExists,
    }
}

define_error! {
    enum BookingError {
        #[code = "CONFLICT"]
        #[status = CONFLICT]
        #[message = "`Vehicle` is already booked for an overlapping period"]
        Overlap,

        #[code = "INVALID_INPUT"]
        #[status = BAD_REQUEST]
        #[message = "Booked period must start in the future"]
        PeriodInPast,

        #[code = "INVALID_STATE"]
        #[status = CONFLICT]
        #[message = "`Reservation` is not `BOOKED` anymore"]
        NotBooked,

        #[code = "NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "`User` doesn't exist"]
        UserNotExists,

        #[code = "NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "`Vehicle` doesn't exist"]
        VehicleNotExists,
    }
}

impl AsError for command::book_vehicle::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Overlap(_) => Some(BookingError::Overlap.into()),
            Self::PeriodInPast => Some(BookingError::PeriodInPast.into()),
            Self::Timeout(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(BookingError::UserNotExists.into()),
            Self::VehicleNotExists(_) => {
                Some(BookingError::VehicleNotExists.into())
            }
        }
    }
}

impl AsError for command::modify_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::BillingNotExists(_) => None,
            Self::Db(e) => e.try_as_error(),
            Self::InvalidStatus(_) => Some(BookingError::NotBooked.into()),
            Self::Overlap(_) => Some(BookingError::Overlap.into()),
            Self::PeriodInPast => Some(BookingError::PeriodInPast.into()),
            Self::ReservationNotExists(_) => {
                Some(ReservationError::NotExists.into())
            }
            Self::Timeout(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::cancel_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::BillingNotExists(_) => None,
            Self::Db(e) => e.try_as_error(),
            Self::InvalidStatus(_) => Some(BookingError::NotBooked.into()),
            Self::ReservationNotExists(_) => {
                Some(ReservationError::NotExists.into())
            }
            Self::Timeout(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::complete_rental::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVALID_INPUT"]
                #[status = BAD_REQUEST]
                #[message = "`total_cost` must be in the billed currency"]
                CurrencyMismatch,

                #[code = "INVALID_INPUT"]
                #[status = BAD_REQUEST]
                #[message = "`total_cost` cannot be negative"]
                NegativeCost,

                #[code = "INVALID_STATE"]
                #[status = CONFLICT]
                #[message = "Rental period hasn't ended yet"]
                NotEnded,
            }
        }

        match self {
            Self::BillingNotExists(_) => None,
            Self::CurrencyMismatch(_) => Some(Error::CurrencyMismatch.into()),
            Self::Db(e) => e.try_as_error(),
            Self::InvalidStatus(_) => Some(BookingError::NotBooked.into()),
            Self::NegativeCost(_) => Some(Error::NegativeCost.into()),
            Self::NotEnded(_) => Some(Error::NotEnded.into()),
            Self::ReservationNotExists(_) => {
                Some(ReservationError::NotExists.into())
            }
            Self::Timeout(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::confirm_payment::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVALID_STATE"]
                #[status = CONFLICT]
                #[message = "`Reservation` is cancelled"]
                Cancelled,

                #[code = "INVALID_STATE"]
                #[status = CONFLICT]
                #[message = "`Billing` is settled already"]
                NotPayable,
            }
        }

        match self {
            Self::BillingNotExists(_) => None,
            Self::Cancelled(_) => Some(Error::Cancelled.into()),
            Self::Db(e) => e.try_as_error(),
            Self::NotPayable(_) => Some(Error::NotPayable.into()),
            Self::ReservationNotExists(_) => {
                Some(ReservationError::NotExists.into())
            }
            Self::Timeout(e) => e.try_as_error(),
        }
    }
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use service::{
        command::{book_vehicle, complete_rental},
        domain::{billing, reservation, user, vehicle},
    };

    use crate::{AsError as _, Session};

    use super::{BookInput, CompleteInput, Outcome, PaymentInput};

    #[expect(unsafe_code, reason = "test fixture")]
    fn session() -> Session {
        Session {
            user_id: user::Id::new(),
            // SAFETY: Never decoded in these tests.
            token: unsafe {
                user::session::Token::new_unchecked("token".to_owned())
            },
            expires_at: DateTime::now(),
        }
    }

    fn book_input(user_id: Option<user::Id>) -> BookInput {
        serde_json::from_value(serde_json::json!({
            "user_id": user_id,
            "vehicle_id": vehicle::Id::new(),
            "start_time": "2100-01-01T10:00:00Z",
            "end_time": "2100-01-01T12:00:00Z",
        }))
        .unwrap()
    }

    #[test]
    fn books_on_behalf_of_session_user() {
        let session = session();

        for user_id in [None, Some(session.user_id)] {
            let cmd = book_input(user_id).into_command(&session).unwrap();
            assert_eq!(cmd.user_id, session.user_id);
            assert_eq!(
                cmd.period.start().to_rfc3339(),
                "2100-01-01T10:00:00Z",
            );
        }
    }

    #[test]
    fn rejects_foreign_user_id() {
        let err = book_input(Some(user::Id::new()))
            .into_command(&session())
            .unwrap_err();

        assert_eq!(err.code, "INVALID_INPUT");
    }

    #[test]
    fn rejects_reversed_period() {
        let input: BookInput = serde_json::from_value(serde_json::json!({
            "vehicle_id": vehicle::Id::new(),
            "start_time": "2100-01-01T12:00:00Z",
            "end_time": "2100-01-01T10:00:00Z",
        }))
        .unwrap();

        let err = input.into_command(&session()).unwrap_err();
        assert_eq!(err.code, "INVALID_INPUT");
    }

    #[test]
    fn parses_completion_defaults() {
        let input: CompleteInput = serde_json::from_str("{}").unwrap();
        assert!(input.total_cost.is_none());
        assert!(!input.forced);

        let input: PaymentInput =
            serde_json::from_str(r#"{"outcome": "FAILED"}"#).unwrap();
        assert_eq!(input.outcome, Outcome::Failed);
    }

    #[test]
    fn maps_booking_errors_to_taxonomy() {
        let err =
            book_vehicle::ExecutionError::Overlap(vehicle::Id::new()).as_error();
        assert_eq!(err.code, "CONFLICT");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);

        let err = book_vehicle::ExecutionError::PeriodInPast.as_error();
        assert_eq!(err.code, "INVALID_INPUT");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);

        let err = complete_rental::ExecutionError::InvalidStatus(
            reservation::Status::Completed,
        )
        .as_error();
        assert_eq!(err.code, "INVALID_STATE");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);

        let err = complete_rental::ExecutionError::BillingNotExists(
            reservation::Id::new(),
        )
        .as_error();
        assert_eq!(err.code, "INTERNAL");
    }

    #[test]
    fn renders_statuses_in_screaming_case() {
        assert_eq!(billing::PaymentStatus::Refunded.to_string(), "REFUNDED");
        assert_eq!(reservation::Status::Booked.to_string(), "BOOKED");
    }
}
