//! [`Command`] for booking a [`Vehicle`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tokio::time;
use tracerr::Traced;

use crate::{
    domain::{
        billing, reservation, user, vehicle, Billing, Reservation, User,
        Vehicle,
    },
    infra::{database, Database},
    read,
    Service,
};

use super::Command;

/// [`Command`] for booking a [`Vehicle`].
#[derive(Clone, Copy, Debug)]
pub struct BookVehicle {
    /// ID of the [`User`] booking the [`Vehicle`].
    pub user_id: user::Id,

    /// ID of the [`Vehicle`] to book.
    pub vehicle_id: vehicle::Id,

    /// [`reservation::Period`] to book the [`Vehicle`] for.
    pub period: reservation::Period,
}

/// Output of [`BookVehicle`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Created [`Reservation`].
    pub reservation: Reservation,

    /// [`Billing`] issued for the created [`Reservation`].
    pub billing: Billing,
}

impl<Db> Command<BookVehicle> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Vehicle>, vehicle::Id>>,
            Ok = Option<Vehicle>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Vehicle, vehicle::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Reservation>, read::reservation::Overlapping>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        > + Database<Insert<Reservation>, Err = Traced<database::Error>>
        + Database<Insert<Billing>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: BookVehicle) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let BookVehicle {
            user_id,
            vehicle_id,
            period,
        } = cmd;

        time::timeout(self.config().transaction_timeout, async {
            let now = DateTime::now();
            if self.config().policy.reject_past_bookings
                && !period.starts_after(now)
            {
                return Err(tracerr::new!(E::PeriodInPast));
            }

            let user = self
                .database()
                .execute(Select(By::new(user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::UserNotExists(user_id))
                .map_err(tracerr::wrap!())?;
            let vehicle = self
                .database()
                .execute(Select(By::<Option<Vehicle>, _>::new(vehicle_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::VehicleNotExists(vehicle_id))
                .map_err(tracerr::wrap!())?;

            let amount = self
                .config()
                .rates
                .price(user.membership_tier, period.duration());

            let tx = self
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            // Serializes concurrent bookings of the same `Vehicle`.
            tx.execute(Lock(By::new(vehicle.id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            let overlapping = tx
                .execute(Select(By::new(read::reservation::Overlapping {
                    vehicle_id: vehicle.id,
                    period,
                    excluding: None,
                })))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if !overlapping.is_empty() {
                return Err(tracerr::new!(E::Overlap(vehicle.id)));
            }

            let reservation = Reservation {
                id: reservation::Id::new(),
                user_id: user.id,
                vehicle_id: vehicle.id,
                period,
                status: reservation::Status::Booked,
                created_at: now.coerce(),
                updated_at: now.coerce(),
            };
            let billing = Billing {
                reservation_id: reservation.id,
                amount,
                status: billing::PaymentStatus::Pending,
                created_at: now.coerce(),
                updated_at: now.coerce(),
            };
            tx.execute(Insert(reservation.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            tx.execute(Insert(billing.clone()))
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

/// Error of [`BookVehicle`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Vehicle`] is booked by another [`Reservation`] for an overlapping
    /// [`reservation::Period`].
    #[display("`Vehicle(id: {_0})` is already booked for the period")]
    Overlap(#[error(not(source))] vehicle::Id),

    /// [`reservation::Period`] doesn't start in the future.
    #[display("Booked period must start in the future")]
    PeriodInPast,

    /// [`Command`] didn't finish in time.
    #[display("Booking timed out: {_0}")]
    #[from]
    Timeout(time::error::Elapsed),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// [`Vehicle`] with the provided ID does not exist.
    #[display("`Vehicle(id: {_0})` does not exist")]
    VehicleNotExists(#[error(not(source))] vehicle::Id),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{By, Commit, Insert, Lock, Select, Transact},
        DateTime,
    };
    use futures::future;
    use rust_decimal::Decimal;
    use tracerr::Traced;

    use crate::{
        domain::{
            billing::PaymentStatus, reservation, user, vehicle, Billing,
            Reservation, User, Vehicle,
        },
        infra::{
            database::{
                self,
                memory::{self, NonTx, Tx},
            },
            Database, Memory,
        },
        read, test, Service,
    };

    use super::{BookVehicle, ExecutionError};

    #[tokio::test]
    async fn books_vehicle_with_pending_billing() {
        let (svc, f) = test::service().await;

        let out = svc
            .execute(BookVehicle {
                user_id: f.user.id,
                vehicle_id: f.vehicle.id,
                period: test::period(10, 12),
            })
            .await
            .unwrap();

        assert_eq!(out.reservation.status, reservation::Status::Booked);
        assert_eq!(out.reservation.user_id, f.user.id);
        assert_eq!(out.billing.reservation_id, out.reservation.id);
        assert_eq!(out.billing.status, PaymentStatus::Pending);
        assert_eq!(out.billing.amount.amount, Decimal::new(20, 0));

        let stored = svc
            .database()
            .execute(Select(By::<Option<Reservation>, _>::new(
                out.reservation.id,
            )))
            .await
            .unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn rejects_overlapping_and_accepts_adjacent() {
        let (svc, f) = test::service().await;
        let book = |period| BookVehicle {
            user_id: f.user.id,
            vehicle_id: f.vehicle.id,
            period,
        };

        svc.execute(book(test::period(10, 12))).await.unwrap();

        let err = svc.execute(book(test::period(11, 13))).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Overlap(_)), "{err}");

        svc.execute(book(test::period(12, 14))).await.unwrap();
    }

    #[tokio::test]
    async fn other_vehicles_stay_bookable() {
        let (svc, f) = test::service().await;

        svc.execute(BookVehicle {
            user_id: f.user.id,
            vehicle_id: f.vehicle.id,
            period: test::period(10, 12),
        })
        .await
        .unwrap();
        svc.execute(BookVehicle {
            user_id: f.stranger.id,
            vehicle_id: f.other_vehicle.id,
            period: test::period(10, 12),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn exactly_one_of_concurrent_bookings_wins() {
        let (svc, f) = test::service().await;

        let results = future::join_all((0..8).map(|i| {
            svc.execute(BookVehicle {
                user_id: if i % 2 == 0 { f.user.id } else { f.stranger.id },
                vehicle_id: f.vehicle.id,
                period: test::period(10, 12),
            })
        }))
        .await;

        let (won, lost): (Vec<_>, Vec<_>) =
            results.into_iter().partition(Result::is_ok);
        assert_eq!(won.len(), 1);
        assert_eq!(lost.len(), 7);
        for err in lost {
            let err = err.unwrap_err();
            assert!(
                matches!(err.as_ref(), ExecutionError::Overlap(_)),
                "{err}",
            );
        }

        let booked = svc
            .database()
            .execute(Select(By::<Vec<Reservation>, _>::new(
                read::reservation::Overlapping {
                    vehicle_id: f.vehicle.id,
                    period: test::period(0, 24),
                    excluding: None,
                },
            )))
            .await
            .unwrap();
        assert_eq!(booked.len(), 1);
    }

    #[tokio::test]
    async fn rejects_past_periods_by_default() {
        let (svc, f) = test::service().await;
        let past = test::period_since(
            DateTime::now() - Duration::from_secs(3 * 3600),
            0,
            1,
        );

        let err = svc
            .execute(BookVehicle {
                user_id: f.user.id,
                vehicle_id: f.vehicle.id,
                period: past,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::PeriodInPast), "{err}");
    }

    #[tokio::test]
    async fn accepts_past_periods_when_allowed() {
        let (svc, f) = test::service_with(|c| {
            c.policy.reject_past_bookings = false;
        })
        .await;
        let past = test::period_since(
            DateTime::now() - Duration::from_secs(3 * 3600),
            0,
            1,
        );

        svc.execute(BookVehicle {
            user_id: f.user.id,
            vehicle_id: f.vehicle.id,
            period: past,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn rejects_unknown_entities() {
        let (svc, f) = test::service().await;

        let err = svc
            .execute(BookVehicle {
                user_id: f.user.id,
                vehicle_id: vehicle::Id::new(),
                period: test::period(10, 12),
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::VehicleNotExists(_)),
            "{err}",
        );

        let err = svc
            .execute(BookVehicle {
                user_id: user::Id::new(),
                vehicle_id: f.vehicle.id,
                period: test::period(10, 12),
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::UserNotExists(_)),
            "{err}",
        );
    }

    #[tokio::test]
    async fn times_out_while_store_is_busy() {
        let (svc, f) = test::service_with(|c| {
            c.transaction_timeout = Duration::from_millis(50);
        })
        .await;

        // Holds the whole store until dropped.
        let tx = svc.database().execute(Transact).await.unwrap();

        let err = svc
            .execute(BookVehicle {
                user_id: f.user.id,
                vehicle_id: f.vehicle.id,
                period: test::period(10, 12),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Timeout(_)), "{err}");

        drop(tx);
        svc.execute(BookVehicle {
            user_id: f.user.id,
            vehicle_id: f.vehicle.id,
            period: test::period(10, 12),
        })
        .await
        .unwrap();
    }

    /// [`Memory`] database failing to store any [`Billing`].
    #[derive(Clone, Debug)]
    struct NoBillings<Db>(Db);

    macro_rules! delegate {
        ($db:ty: $($op:ty => $ok:ty),* $(,)?) => {$(
            impl Database<$op> for NoBillings<$db> {
                type Ok = $ok;
                type Err = Traced<database::Error>;

                async fn execute(&self, op: $op) -> Result<$ok, Self::Err> {
                    self.0.execute(op).await
                }
            }
        )*};
    }

    delegate!(Memory<NonTx>:
        Select<By<Option<User>, user::Id>> => Option<User>,
        Select<By<Option<Vehicle>, vehicle::Id>> => Option<Vehicle>,
    );
    delegate!(Memory<Tx>:
        Lock<By<Vehicle, vehicle::Id>> => (),
        Select<By<Vec<Reservation>, read::reservation::Overlapping>>
            => Vec<Reservation>,
        Insert<Reservation> => (),
        Commit => (),
    );

    impl Database<Transact> for NoBillings<Memory<NonTx>> {
        type Ok = NoBillings<Memory<Tx>>;
        type Err = Traced<database::Error>;

        async fn execute(&self, op: Transact) -> Result<Self::Ok, Self::Err> {
            self.0.execute(op).await.map(NoBillings)
        }
    }

    impl Database<Insert<Billing>> for NoBillings<Memory<Tx>> {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(&self, _: Insert<Billing>) -> Result<(), Self::Err> {
            Err(tracerr::new!(database::Error::from(
                memory::Error::TransactionFinished,
            )))
        }
    }

    #[tokio::test]
    async fn leaves_no_reservation_when_billing_fails() {
        let (svc, f) = test::service().await;
        let failing = Service {
            config: test::config(),
            database: NoBillings(svc.database().clone()),
        };

        let err = failing
            .execute(BookVehicle {
                user_id: f.user.id,
                vehicle_id: f.vehicle.id,
                period: test::period(10, 12),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Db(_)), "{err}");

        let booked = svc
            .database()
            .execute(Select(By::<Vec<Reservation>, _>::new(
                read::reservation::Overlapping {
                    vehicle_id: f.vehicle.id,
                    period: test::period(0, 24),
                    excluding: None,
                },
            )))
            .await
            .unwrap();
        assert!(booked.is_empty(), "{booked:?}");

        svc.execute(BookVehicle {
            user_id: f.user.id,
            vehicle_id: f.vehicle.id,
            period: test::period(10, 12),
        })
        .await
        .unwrap();
    }
}
