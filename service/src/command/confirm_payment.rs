//! [`Command`] for recording a payment outcome of a [`Billing`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tokio::time;
use tracerr::Traced;

use crate::{
    domain::{
        billing, reservation, user, vehicle, Billing, Reservation, Vehicle,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for recording a payment outcome of a [`Billing`].
#[derive(Clone, Copy, Debug)]
pub struct ConfirmPayment {
    /// ID of the [`Reservation`] whose [`Billing`] is paid.
    pub reservation_id: reservation::Id,

    /// ID of the [`User`] paying.
    ///
    /// [`User`]: crate::domain::User
    pub user_id: user::Id,

    /// Outcome of the payment.
    pub outcome: Outcome,
}

/// Outcome of a payment attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Payment is received.
    Paid,

    /// Payment attempt has failed.
    Failed,
}

impl From<Outcome> for billing::PaymentStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Paid => Self::Paid,
            Outcome::Failed => Self::Failed,
        }
    }
}

impl<Db> Command<ConfirmPayment> for Service<Db>
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
        > + Database<Update<Billing>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Billing;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ConfirmPayment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ConfirmPayment {
            reservation_id,
            user_id,
            outcome,
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

            let reservation = tx
                .execute(Select(By::<Option<Reservation>, _>::new(
                    reservation.id,
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::ReservationNotExists(reservation_id))
                .map_err(tracerr::wrap!())?;
            if reservation.status == reservation::Status::Cancelled {
                return Err(tracerr::new!(E::Cancelled(reservation.id)));
            }

            let mut billing = tx
                .execute(Select(By::<Option<Billing>, _>::new(reservation.id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::BillingNotExists(reservation_id))
                .map_err(tracerr::wrap!())?;
            if !billing.is_payable() {
                return Err(tracerr::new!(E::NotPayable(billing.status)));
            }

            billing.status = outcome.into();
            billing.updated_at = DateTime::now().coerce();
            tx.execute(Update(billing.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            Ok::<_, Traced<E>>(billing)
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> E))?
    }
}

/// Error of [`ConfirmPayment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Billing`] of the [`Reservation`] is missing.
    #[display("`Billing` of `Reservation(id: {_0})` does not exist")]
    BillingNotExists(#[error(not(source))] reservation::Id),

    /// [`Reservation`] is cancelled.
    #[display("`Reservation(id: {_0})` is cancelled")]
    Cancelled(#[error(not(source))] reservation::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Billing`] doesn't accept payments in its current status.
    #[display("`Billing` is already `{_0}`")]
    NotPayable(#[error(not(source))] billing::PaymentStatus),

    /// [`Reservation`] doesn't exist or belongs to another [`User`].
    ///
    /// [`User`]: crate::domain::User
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// [`Command`] didn't finish in time.
    #[display("Payment confirmation timed out: {_0}")]
    #[from]
    Timeout(time::error::Elapsed),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{BookVehicle, CancelBooking},
        domain::billing::PaymentStatus,
        test,
    };

    use super::{Command as _, ConfirmPayment, ExecutionError, Outcome};

    #[tokio::test]
    async fn retries_failed_payments() {
        let (svc, f) = test::service().await;
        let booked = svc
            .execute(BookVehicle {
                user_id: f.user.id,
                vehicle_id: f.vehicle.id,
                period: test::period(10, 12),
            })
            .await
            .unwrap();
        let pay = |outcome| ConfirmPayment {
            reservation_id: booked.reservation.id,
            user_id: f.user.id,
            outcome,
        };

        let billing = svc.execute(pay(Outcome::Failed)).await.unwrap();
        assert_eq!(billing.status, PaymentStatus::Failed);

        let billing = svc.execute(pay(Outcome::Paid)).await.unwrap();
        assert_eq!(billing.status, PaymentStatus::Paid);

        let err = svc.execute(pay(Outcome::Paid)).await.unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::NotPayable(PaymentStatus::Paid),
            ),
            "{err}",
        );
    }

    #[tokio::test]
    async fn refunds_paid_billing_on_cancel() {
        let (svc, f) = test::service().await;
        let booked = svc
            .execute(BookVehicle {
                user_id: f.user.id,
                vehicle_id: f.vehicle.id,
                period: test::period(10, 12),
            })
            .await
            .unwrap();
        svc.execute(ConfirmPayment {
            reservation_id: booked.reservation.id,
            user_id: f.user.id,
            outcome: Outcome::Paid,
        })
        .await
        .unwrap();

        let out = svc
            .execute(CancelBooking {
                reservation_id: booked.reservation.id,
                user_id: f.user.id,
            })
            .await
            .unwrap();
        assert_eq!(out.billing.status, PaymentStatus::Refunded);

        let err = svc
            .execute(ConfirmPayment {
                reservation_id: booked.reservation.id,
                user_id: f.user.id,
                outcome: Outcome::Paid,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Cancelled(_)), "{err}");
    }
}
