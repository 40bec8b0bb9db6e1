//! [`CheckAvailability`] definition.

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::Reservation;
use crate::{
    domain::{reservation, vehicle, Vehicle},
    infra::{database, Database},
    read::vehicle::IsAvailable,
    Query, Service,
};

/// [`Query`] checking whether a [`Vehicle`] may be booked for a
/// [`reservation::Period`].
#[derive(Clone, Copy, Debug)]
pub struct CheckAvailability {
    /// ID of the [`Vehicle`] to check.
    pub vehicle_id: vehicle::Id,

    /// [`reservation::Period`] to check.
    pub period: reservation::Period,
}

impl<Db> Query<CheckAvailability> for Service<Db>
where
    Db: Database<
            Select<By<Option<Vehicle>, vehicle::Id>>,
            Ok = Option<Vehicle>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<IsAvailable, (vehicle::Id, reservation::Period)>>,
            Ok = IsAvailable,
            Err = Traced<database::Error>,
        >,
{
    type Ok = IsAvailable;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        query: CheckAvailability,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CheckAvailability { vehicle_id, period } = query;

        drop(
            self.database()
                .execute(Select(By::<Option<Vehicle>, _>::new(vehicle_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::VehicleNotExists(vehicle_id))
                .map_err(tracerr::wrap!())?,
        );

        self.database()
            .execute(Select(By::new((vehicle_id, period))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`CheckAvailability`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Vehicle`] with the provided ID does not exist.
    #[display("`Vehicle(id: {_0})` does not exist")]
    #[from(ignore)]
    VehicleNotExists(#[error(not(source))] vehicle::Id),
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        command::{BookVehicle, CancelBooking},
        domain::vehicle,
        query::{self, DatabaseQuery},
        read::{self, vehicle::IsAvailable},
        test, Query as _,
    };

    use super::{CheckAvailability, ExecutionError};

    #[tokio::test]
    async fn follows_booked_reservations() {
        let (svc, f) = test::service().await;
        let check = |period| CheckAvailability {
            vehicle_id: f.vehicle.id,
            period,
        };

        let booked = svc
            .execute(BookVehicle {
                user_id: f.user.id,
                vehicle_id: f.vehicle.id,
                period: test::period(10, 12),
            })
            .await
            .unwrap();

        assert_eq!(
            svc.execute(check(test::period(11, 13))).await.unwrap(),
            IsAvailable(false),
        );
        assert_eq!(
            svc.execute(check(test::period(12, 13))).await.unwrap(),
            IsAvailable(true),
        );

        svc.execute(CancelBooking {
            reservation_id: booked.reservation.id,
            user_id: f.user.id,
        })
        .await
        .unwrap();
        assert_eq!(
            svc.execute(check(test::period(11, 13))).await.unwrap(),
            IsAvailable(true),
        );
    }

    #[tokio::test]
    async fn rejects_unknown_vehicle() {
        let (svc, _) = test::service().await;

        let err = svc
            .execute(CheckAvailability {
                vehicle_id: vehicle::Id::new(),
                period: test::period(10, 12),
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::VehicleNotExists(_)),
            "{err}",
        );
    }

    #[tokio::test]
    async fn lists_vehicles_with_current_availability() {
        let (svc, f) = test::service_with(|c| {
            c.policy.reject_past_bookings = false;
        })
        .await;
        let now = DateTime::now();
        let hour = std::time::Duration::from_secs(3600);
        svc.execute(BookVehicle {
            user_id: f.user.id,
            vehicle_id: f.vehicle.id,
            period: test::period_since(now - hour, 0, 2),
        })
        .await
        .unwrap();

        let all: query::vehicle::List =
            DatabaseQuery::by(read::vehicle::list::Filter {
                at: now,
                only_available: false,
            });
        let all = svc.execute(all).await.unwrap();
        assert_eq!(
            all.iter().map(|(v, a)| (v.id, *a)).collect::<Vec<_>>(),
            [
                (f.vehicle.id, IsAvailable(false)),
                (f.other_vehicle.id, IsAvailable(true)),
            ],
        );

        let available: query::vehicle::List =
            DatabaseQuery::by(read::vehicle::list::Filter {
                at: now,
                only_available: true,
            });
        let available = svc.execute(available).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].0.id, f.other_vehicle.id);
    }
}
