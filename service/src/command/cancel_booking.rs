//! [`Command`] for cancelling a [`Reservation`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tokio::time;
use tracerr::Traced;

use crate::{
    domain::{reservation, user, vehicle, Billing, Reservation, Vehicle},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for cancelling a [`Reservation`].
///
/// Cancelled [`Reservation`] stops holding its [`Vehicle`] and its [`Billing`]
/// is released.
#[derive(Clone, Copy, Debug)]
pub struct CancelBooking {
    /// ID of the [`Reservation`] to cancel.
    pub reservation_id: reservation::Id,

    /// ID of the [`User`] cancelling the [`Reservation`].
    ///
    /// [`User`]: crate::domain::User
    pub user_id: user::Id,
}

/// Output of [`CancelBooking`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Cancelled [`Reservation`].
    pub reservation: Reservation,

    /// Released [`Billing`].
    pub billing: Billing,
}

impl<Db> Command<CancelBooking> for Service<Db>
where
    Db: Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
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
            Select<By<Option<Billing>, reservation::Id>>,
            Ok = Option<Billing>,
            Err = Traced<database::Error>,
        > + Database<Update<Reservation>, Err = Traced<database::Error>>
        + Database<Update<Billing>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CancelBooking) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelBooking {
            reservation_id,
            user_id,
        } = cmd;

        time::timeout(self.config().transaction_timeout, async {
            let reservation = self
                .database()
                .execute(Select(By::new(reservation_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .filter(|r| r.user_id == user_id)
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
            let mut billing = tx
                .execute(Select(By::<Option<Billing>, _>::new(reservation.id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::BillingNotExists(reservation_id))
                .map_err(tracerr::wrap!())?;

            let now = DateTime::now();
            reservation.status = reservation::Status::Cancelled;
            reservation.updated_at = now.coerce();
            billing.release();
            billing.updated_at = now.coerce();

            tx.execute(Update(reservation.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            tx.execute(Update(billing.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
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

/// Error of [`CancelBooking`] [`Command`] execution.
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

    /// [`Reservation`] doesn't exist or belongs to another [`User`].
    ///
    /// [`User`]: crate::domain::User
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// [`Command`] didn't finish in time.
    #[display("Cancellation timed out: {_0}")]
    #[from]
    Timeout(time::error::Elapsed),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};

    use crate::{
        command::BookVehicle,
        domain::{
            billing::PaymentStatus, reservation, Billing, Reservation,
        },
        infra::Database as _,
        test,
    };

    use super::{CancelBooking, Command as _, ExecutionError};

    #[tokio::test]
    async fn frees_slot_and_voids_billing() {
        let (svc, f) = test::service().await;
        let book = BookVehicle {
            user_id: f.user.id,
            vehicle_id: f.vehicle.id,
            period: test::period(10, 12),
        };
        let booked = svc.execute(book).await.unwrap();

        let out = svc
            .execute(CancelBooking {
                reservation_id: booked.reservation.id,
                user_id: f.user.id,
            })
            .await
            .unwrap();
        assert_eq!(out.reservation.status, reservation::Status::Cancelled);
        assert_eq!(out.billing.status, PaymentStatus::Voided);

        let stored = svc
            .database()
            .execute(Select(By::<Option<Billing>, _>::new(
                booked.reservation.id,
            )))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, PaymentStatus::Voided);

        svc.execute(BookVehicle {
            user_id: f.stranger.id,
            ..book
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn cancels_only_once() {
        let (svc, f) = test::service().await;
        let booked = svc
            .execute(BookVehicle {
                user_id: f.user.id,
                vehicle_id: f.vehicle.id,
                period: test::period(10, 12),
            })
            .await
            .unwrap();
        let cancel = CancelBooking {
            reservation_id: booked.reservation.id,
            user_id: f.user.id,
        };

        svc.execute(cancel).await.unwrap();
        let err = svc.execute(cancel).await.unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::InvalidStatus(reservation::Status::Cancelled),
            ),
            "{err}",
        );
    }

    #[tokio::test]
    async fn hides_foreign_reservations() {
        let (svc, f) = test::service().await;
        let booked = svc
            .execute(BookVehicle {
                user_id: f.user.id,
                vehicle_id: f.vehicle.id,
                period: test::period(10, 12),
            })
            .await
            .unwrap();

        let err = svc
            .execute(CancelBooking {
                reservation_id: booked.reservation.id,
                user_id: f.stranger.id,
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::ReservationNotExists(_)),
            "{err}",
        );

        let stored = svc
            .database()
            .execute(Select(By::<Option<Reservation>, _>::new(
                booked.reservation.id,
            )))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, reservation::Status::Booked);
    }
}
