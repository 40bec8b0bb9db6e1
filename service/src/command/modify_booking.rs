//! [`Command`] for moving a [`Reservation`] to another [`reservation::Period`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tokio::time;
use tracerr::Traced;

use crate::{
    domain::{
        reservation, user, vehicle, Billing, Reservation, User, Vehicle,
    },
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for moving a [`Reservation`] to another
/// [`reservation::Period`].
///
/// Unpaid [`Billing`] is repriced for the new [`reservation::Period`].
#[derive(Clone, Copy, Debug)]
pub struct ModifyBooking {
    /// ID of the [`Reservation`] to modify.
    pub reservation_id: reservation::Id,

    /// ID of the [`User`] modifying the [`Reservation`].
    pub user_id: user::Id,

    /// New [`reservation::Period`] of the [`Reservation`].
    pub period: reservation::Period,
}

/// Output of [`ModifyBooking`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Modified [`Reservation`].
    pub reservation: Reservation,

    /// [`Billing`] of the modified [`Reservation`].
    pub billing: Billing,
}

impl<Db> Command<ModifyBooking> for Service<Db>
where
    Db: Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Vehicle, vehicle::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Reservation>, read::reservation::Overlapping>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Billing>, reservation::Id>>,
            Ok = Option<Billing>,
            Err = Traced<database::Error>,
        > + Database<Update<Reservation>, Err = Traced<database::Error>>
        + Database<Update<Billing>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: ModifyBooking) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ModifyBooking {
            reservation_id,
            user_id,
            period,
        } = cmd;

        time::timeout(self.config().transaction_timeout, async {
            let now = DateTime::now();

            let reservation = self
                .database()
                .execute(Select(By::<Option<Reservation>, _>::new(
                    reservation_id,
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .filter(|r| r.user_id == user_id)
                .ok_or(E::ReservationNotExists(reservation_id))
                .map_err(tracerr::wrap!())?;
            let user = self
                .database()
                .execute(Select(By::<Option<User>, _>::new(user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::ReservationNotExists(reservation_id))
                .map_err(tracerr::wrap!())?;

            let tx = self
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            tx.execute(Lock(By::new(reservation.vehicle_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            let mut reservation = tx
                .execute(Select(By::<Option<Reservation>, _>::new(
                    reservation.id,
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::ReservationNotExists(reservation_id))
                .map_err(tracerr::wrap!())?;
            if reservation.status.is_terminal() {
                return Err(tracerr::new!(E::InvalidStatus(
                    reservation.status,
                )));
            }
            if self.config().policy.reject_past_bookings
                && !period.starts_after(now)
            {
                return Err(tracerr::new!(E::PeriodInPast));
            }

            let overlapping = tx
                .execute(Select(By::new(read::reservation::Overlapping {
                    vehicle_id: reservation.vehicle_id,
                    period,
                    excluding: Some(reservation.id),
                })))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if !overlapping.is_empty() {
                return Err(tracerr::new!(E::Overlap(reservation.vehicle_id)));
            }

            let mut billing = tx
                .execute(Select(By::<Option<Billing>, _>::new(reservation.id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::BillingNotExists(reservation_id))
                .map_err(tracerr::wrap!())?;

            reservation.period = period;
            reservation.updated_at = now.coerce();
            tx.execute(Update(reservation.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            // Settled amounts are never changed retroactively.
            if billing.is_payable() {
                billing.amount = self
                    .config()
                    .rates
                    .price(user.membership_tier, period.duration());
                billing.updated_at = now.coerce();
                tx.execute(Update(billing.clone()))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }

            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            Ok::<_, Traced<E>>(Output {
                reservation,
                billing,
            })
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> E))?
    }
}

/// Error of [`ModifyBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Billing`] of the [`Reservation`] is missing.
    #[display("`Billing` of `Reservation(id: {_0})` does not exist")]
    BillingNotExists(#[error(not(source))] reservation::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Reservation`] is not [`reservation::Status::Booked`] anymore.
    #[display("`Reservation` is already `{_0}`")]
    InvalidStatus(#[error(not(source))] reservation::Status),

    /// [`Vehicle`] is booked by another [`Reservation`] for an overlapping
    /// [`reservation::Period`].
    #[display("`Vehicle(id: {_0})` is already booked for the period")]
    Overlap(#[error(not(source))] vehicle::Id),

    /// New [`reservation::Period`] doesn't start in the future.
    #[display("Booked period must start in the future")]
    PeriodInPast,

    /// [`Reservation`] doesn't exist or belongs to another [`User`].
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// [`Command`] didn't finish in time.
    #[display("Booking modification timed out: {_0}")]
    #[from]
    Timeout(time::error::Elapsed),
}
