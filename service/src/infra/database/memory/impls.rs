//! [`Database`] implementations.

use common::operations::{
    By, Commit, Delete, Insert, Lock, Select, Transact, Update,
};
use tracerr::Traced;

use crate::{
    domain::{
        rental, reservation,
        user::{self, otp, Otp},
        vehicle, Billing, Reservation, User, Vehicle,
    },
    infra::{database, Database},
    read,
};

use super::{Connection, Memory, NonTx, Tx};

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Memory(Tx::begin(&self.0).await))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.commit().await.map_err(tracerr::wrap!())
    }
}

impl<C: Connection> Database<Select<By<Option<User>, user::Id>>> for Memory<C> {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.users.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<'l, C: Connection> Database<Select<By<Option<User>, &'l user::Email>>>
    for Memory<C>
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();
        self.with(|s| s.users.values().find(|u| &u.email == email).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<'l, C: Connection> Database<Select<By<Vec<User>, &'l user::Phone>>>
    for Memory<C>
{
    type Ok = Vec<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<User>, &'l user::Phone>>,
    ) -> Result<Self::Ok, Self::Err> {
        let phone = by.into_inner();
        self.with(|s| {
            s.users
                .values()
                .filter(|u| u.phone.as_ref() == Some(phone))
                .cloned()
                .collect()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Connection> Database<Insert<User>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(user)).await.map_err(tracerr::wrap!())
    }
}

impl<C: Connection> Database<Update<User>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| drop(s.users.insert(user.id, user)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Connection> Database<Select<By<Option<Vehicle>, vehicle::Id>>>
    for Memory<C>
{
    type Ok = Option<Vehicle>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Vehicle>, vehicle::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.vehicles.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Connection>
    Database<
        Select<By<Vec<read::vehicle::list::Item>, read::vehicle::list::Filter>>,
    > for Memory<C>
{
    type Ok = Vec<read::vehicle::list::Item>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<read::vehicle::list::Item>, read::vehicle::list::Filter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::vehicle::list::Filter { at, only_available } =
            by.into_inner();
        self.with(|s| {
            let mut items = s
                .vehicles
                .values()
                .map(|v| {
                    let busy = s.reservations.values().any(|r| {
                        r.vehicle_id == v.id
                            && r.status == reservation::Status::Booked
                            && r.period.contains(at)
                    });
                    (v.clone(), read::vehicle::IsAvailable(!busy))
                })
                .filter(|(_, available)| !only_available || available.0)
                .collect::<Vec<_>>();
            items.sort_by(|(a, _), (b, _)| a.license_plate.cmp(&b.license_plate));
            items
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Connection> Database<Insert<Vehicle>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(vehicle): Insert<Vehicle>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| drop(s.vehicles.insert(vehicle.id, vehicle)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Connection> Database<Lock<By<Vehicle, vehicle::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Vehicle, vehicle::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Transactions hold the whole `State` exclusively already.
        Ok(())
    }
}

impl<C: Connection>
    Database<Select<By<Option<Reservation>, reservation::Id>>> for Memory<C>
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.reservations.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Connection>
    Database<Select<By<Vec<Reservation>, read::reservation::Overlapping>>>
    for Memory<C>
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<Reservation>, read::reservation::Overlapping>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reservation::Overlapping {
            vehicle_id,
            period,
            excluding,
        } = by.into_inner();
        self.with(|s| {
            s.reservations
                .values()
                .filter(|r| {
                    r.vehicle_id == vehicle_id
                        && Some(r.id) != excluding
                        && r.holds(&period)
                })
                .cloned()
                .collect()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Connection>
    Database<
        Select<
            By<read::vehicle::IsAvailable, (vehicle::Id, reservation::Period)>,
        >,
    > for Memory<C>
{
    type Ok = read::vehicle::IsAvailable;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::vehicle::IsAvailable, (vehicle::Id, reservation::Period)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (vehicle_id, period) = by.into_inner();
        self.with(|s| {
            read::vehicle::IsAvailable(
                !s.reservations
                    .values()
                    .any(|r| r.vehicle_id == vehicle_id && r.holds(&period)),
            )
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Connection> Database<Insert<Reservation>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(reservation): Insert<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(reservation))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Connection> Database<Update<Reservation>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(reservation): Update<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| drop(s.reservations.insert(reservation.id, reservation)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Connection> Database<Select<By<Option<Billing>, reservation::Id>>>
    for Memory<C>
{
    type Ok = Option<Billing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Billing>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.billings.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Connection> Database<Select<By<Vec<Billing>, user::Id>>>
    for Memory<C>
{
    type Ok = Vec<Billing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Billing>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();
        self.with(|s| {
            let mut billings = s
                .billings
                .values()
                .filter(|b| {
                    s.reservations
                        .get(&b.reservation_id)
                        .is_some_and(|r| r.user_id == user_id)
                })
                .cloned()
                .collect::<Vec<_>>();
            billings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            billings
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Connection> Database<Insert<Billing>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(billing): Insert<Billing>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(billing)).await.map_err(tracerr::wrap!())
    }
}

impl<C: Connection> Database<Update<Billing>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(billing): Update<Billing>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| drop(s.billings.insert(billing.reservation_id, billing)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Connection> Database<Insert<rental::Entry>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(entry): Insert<rental::Entry>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| drop(s.rentals.insert(entry.id, entry)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Connection> Database<Select<By<Vec<rental::Entry>, user::Id>>>
    for Memory<C>
{
    type Ok = Vec<rental::Entry>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<rental::Entry>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();
        self.with(|s| {
            let mut entries = s
                .rentals
                .values()
                .filter(|e| e.user_id == user_id)
                .cloned()
                .collect::<Vec<_>>();
            entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            entries
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Connection> Database<Insert<Otp>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(otp): Insert<Otp>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| drop(s.otps.insert(otp.phone.clone(), otp)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<'l, C: Connection> Database<Select<By<Option<Otp>, &'l user::Phone>>>
    for Memory<C>
{
    type Ok = Option<Otp>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Otp>, &'l user::Phone>>,
    ) -> Result<Self::Ok, Self::Err> {
        let phone = by.into_inner();
        self.with(|s| s.otps.get(phone).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<'l, C: Connection> Database<Delete<By<Otp, &'l user::Phone>>>
    for Memory<C>
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Otp, &'l user::Phone>>,
    ) -> Result<Self::Ok, Self::Err> {
        let phone = by.into_inner();
        self.with(|s| drop(s.otps.remove(phone)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Connection> Database<Delete<By<Otp, otp::ExpirationDateTime>>>
    for Memory<C>
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Otp, otp::ExpirationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let now = by.into_inner();
        self.with(|s| s.otps.retain(|_, otp| otp.is_alive_at(now)))
            .await
            .map_err(tracerr::wrap!())
    }
}
