//! [`Command`] for completing a rental.

use common::{
    operations::{
        By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
    },
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tokio::time;
use tracerr::Traced;

use crate::{
    domain::{
        billing, rental, reservation, user, vehicle, Billing, Reservation,
        Vehicle,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for completing a rental of a booked [`Vehicle`].
///
/// Records a [`rental::Entry`] and makes the [`Reservation`]
/// [`reservation::Status::Completed`].
#[derive(Clone, Copy, Debug)]
pub struct CompleteRental {
    /// ID of the [`Reservation`] to complete.
    pub reservation_id: reservation::Id,

    /// ID of the [`User`] completing the rental.
    ///
    /// [`User`]: crate::domain::User
    pub user_id: user::Id,

    /// Final cost of the rental, if it differs from the billed one.
    pub total_cost: Option<Money>,

    /// Whether to complete the rental before its [`reservation::Period`]
    /// ends.
    pub forced: bool,
}

/// Output of [`CompleteRental`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Recorded [`rental::Entry`].
    pub entry: rental::Entry,

    /// Final [`Billing`] of the rental.
    pub billing: Billing,
}

impl<Db> Command<CompleteRental> for Service<Db>
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
        > + Database<Insert<rental::Entry>, Err = Traced<database::Error>>
        + Database<Update<Reservation>, Err = Traced<database::Error>>
        + Database<Update<Billing>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CompleteRental,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CompleteRental {
            reservation_id,
            user_id,
            total_cost,
            forced,
        } = cmd;

        if let Some(cost) = total_cost {
            if cost.is_negative() {
                return Err(tracerr::new!(E::NegativeCost(cost)));
            }
        }

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

            let now = DateTime::now();
            if !forced && !reservation.period.has_ended_at(now) {
                return Err(tracerr::new!(E::NotEnded(reservation.period)));
            }

            let mut billing = tx
                .execute(Select(By::<Option<Billing>, _>::new(reservation.id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::BillingNotExists(reservation_id))
                .map_err(tracerr::wrap!())?;
            if let Some(cost) = total_cost {
                if cost.currency != billing.amount.currency {
                    return Err(tracerr::new!(E::CurrencyMismatch(cost)));
                }
                if billing.is_payable() {
                    billing.amount = cost;
                }
            }
            if billing.is_payable()
                && self.config().policy.completion_billing
                    == billing::CompletionPolicy::Settle
            {
                billing.status = billing::PaymentStatus::Paid;
            }
            billing.updated_at = now.coerce();

            reservation.status = reservation::Status::Completed;
            reservation.updated_at = now.coerce();

            let entry = rental::Entry {
                id: rental::Id::new(),
                reservation_id: reservation.id,
                user_id: reservation.user_id,
                vehicle_id: reservation.vehicle_id,
                period: reservation.period,
                total_cost: total_cost.unwrap_or(billing.amount),
                created_at: now.coerce(),
            };

            tx.execute(Update(reservation))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            tx.execute(Update(billing.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            tx.execute(Insert(entry.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            Ok::<_, Traced<E>>(Output { entry, billing })
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> E))?
    }
}

/// Error of [`CompleteRental`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Billing`] of the [`Reservation`] is missing.
    #[display("`Billing` of `Reservation(id: {_0})` does not exist")]
    BillingNotExists(#[error(not(source))] reservation::Id),

    /// Provided total cost is in another currency than the [`Billing`].
    #[display("`{_0}` doesn't match the billed currency")]
    CurrencyMismatch(#[error(not(source))] Money),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Reservation`] is not [`reservation::Status::Booked`].
    #[display("`Reservation` is already `{_0}`")]
    InvalidStatus(#[error(not(source))] reservation::Status),

    /// Provided total cost is negative.
    #[display("Total cost cannot be negative: `{_0}`")]
    NegativeCost(#[error(not(source))] Money),

    /// [`reservation::Period`] hasn't ended yet and completion isn't forced.
    #[display("Rental period ends at `{}`", _0.end().to_rfc3339())]
    NotEnded(#[error(not(source))] reservation::Period),

    /// [`Reservation`] doesn't exist or belongs to another [`User`].
    ///
    /// [`User`]: crate::domain::User
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// [`Command`] didn't finish in time.
    #[display("Rental completion timed out: {_0}")]
    #[from]
    Timeout(time::error::Elapsed),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        money::Currency,
        operations::{By, Select},
        DateTime, Money,
    };
    use rust_decimal::Decimal;

    use crate::{
        command::BookVehicle,
        domain::{billing, rental, reservation, Reservation},
        infra::Database as _,
        test,
    };

    use super::{Command as _, CompleteRental, ExecutionError};

    #[tokio::test]
    async fn completes_only_once() {
        let (svc, f) = test::service().await;
        let booked = svc
            .execute(BookVehicle {
                user_id: f.user.id,
                vehicle_id: f.vehicle.id,
                period: test::period(10, 12),
            })
            .await
            .unwrap();
        let complete = CompleteRental {
            reservation_id: booked.reservation.id,
            user_id: f.user.id,
            total_cost: None,
            forced: true,
        };

        let out = svc.execute(complete).await.unwrap();
        assert_eq!(out.entry.reservation_id, booked.reservation.id);
        assert_eq!(out.entry.total_cost, booked.billing.amount);
        assert_eq!(out.billing.status, billing::PaymentStatus::Pending);

        let err = svc.execute(complete).await.unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::InvalidStatus(reservation::Status::Completed),
            ),
            "{err}",
        );

        let history = svc
            .database()
            .execute(Select(By::<Vec<rental::Entry>, _>::new(f.user.id)))
            .await
            .unwrap();
        assert_eq!(history.len(), 1);

        let stored = svc
            .database()
            .execute(Select(By::<Option<Reservation>, _>::new(
                booked.reservation.id,
            )))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, reservation::Status::Completed);
    }

    #[tokio::test]
    async fn waits_for_period_end_unless_forced() {
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
            .execute(CompleteRental {
                reservation_id: booked.reservation.id,
                user_id: f.user.id,
                total_cost: None,
                forced: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NotEnded(_)), "{err}");
    }

    #[tokio::test]
    async fn completes_ended_rentals() {
        let (svc, f) = test::service_with(|c| {
            c.policy.reject_past_bookings = false;
        })
        .await;
        let booked = svc
            .execute(BookVehicle {
                user_id: f.user.id,
                vehicle_id: f.vehicle.id,
                period: test::period_since(
                    DateTime::now() - Duration::from_secs(3 * 3600),
                    0,
                    2,
                ),
            })
            .await
            .unwrap();

        svc.execute(CompleteRental {
            reservation_id: booked.reservation.id,
            user_id: f.user.id,
            total_cost: None,
            forced: false,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn settles_billing_when_configured() {
        let (svc, f) = test::service_with(|c| {
            c.policy.completion_billing = billing::CompletionPolicy::Settle;
        })
        .await;
        let booked = svc
            .execute(BookVehicle {
                user_id: f.user.id,
                vehicle_id: f.vehicle.id,
                period: test::period(10, 12),
            })
            .await
            .unwrap();
        let cost = Money::new(Decimal::new(1750, 2), Currency::Usd);

        let out = svc
            .execute(CompleteRental {
                reservation_id: booked.reservation.id,
                user_id: f.user.id,
                total_cost: Some(cost),
                forced: true,
            })
            .await
            .unwrap();
        assert_eq!(out.billing.status, billing::PaymentStatus::Paid);
        assert_eq!(out.billing.amount, cost);
        assert_eq!(out.entry.total_cost, cost);
    }

    #[tokio::test]
    async fn validates_total_cost() {
        let (svc, f) = test::service().await;
        let booked = svc
            .execute(BookVehicle {
                user_id: f.user.id,
                vehicle_id: f.vehicle.id,
                period: test::period(10, 12),
            })
            .await
            .unwrap();
        let complete = |cost| CompleteRental {
            reservation_id: booked.reservation.id,
            user_id: f.user.id,
            total_cost: Some(cost),
            forced: true,
        };

        let err = svc
            .execute(complete(Money::new(Decimal::NEGATIVE_ONE, Currency::Usd)))
            .await
            .unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::NegativeCost(_)),
            "{err}",
        );

        let err = svc
            .execute(complete(Money::new(Decimal::ONE, Currency::Eur)))
            .await
            .unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::CurrencyMismatch(_)),
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
