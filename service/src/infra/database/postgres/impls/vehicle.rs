//! [`Vehicle`]-related [`Database`] implementations.

use common::operations::{By, Lock, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{reservation, vehicle, Vehicle},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Builds a [`Vehicle`] from the provided [`Row`].
fn from_row(row: &Row) -> Vehicle {
    Vehicle {
        id: row.get("id"),
        model: row.get("model"),
        license_plate: row.get("license_plate"),
        charge_level: row.get("charge_level"),
        location: row.get("location"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Vehicle>, vehicle::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Vehicle>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Vehicle>, vehicle::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id, model, license_plate, \
                   charge_level, location, created_at \
            FROM vehicles \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C>
    Database<
        Select<By<Vec<read::vehicle::list::Item>, read::vehicle::list::Filter>>,
    > for Postgres<C>
where
    C: Connection,
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

        const SQL: &str = "\
            SELECT * \
            FROM (\
                SELECT v.id, v.model, v.license_plate, \
                       v.charge_level, v.location, v.created_at, \
                       NOT EXISTS (\
                           SELECT 1 \
                           FROM reservations AS r \
                           WHERE r.vehicle_id = v.id \
                             AND r.status = $2::INT2 \
                             AND r.start_time <= $1::TIMESTAMPTZ \
                             AND $1::TIMESTAMPTZ < r.end_time\
                       ) AS is_available \
                FROM vehicles AS v\
            ) AS listed \
            WHERE NOT $3::BOOL OR is_available \
            ORDER BY license_plate";
        Ok(self
            .query(SQL, &[&at, &reservation::Status::Booked, &only_available])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                (
                    from_row(row),
                    read::vehicle::IsAvailable(row.get("is_available")),
                )
            })
            .collect())
    }
}

impl<C>
    Database<
        Select<
            By<read::vehicle::IsAvailable, (vehicle::Id, reservation::Period)>,
        >,
    > for Postgres<C>
where
    C: Connection,
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

        const SQL: &str = "\
            SELECT NOT EXISTS (\
                SELECT 1 \
                FROM reservations \
                WHERE vehicle_id = $1::UUID \
                  AND status = $2::INT2 \
                  AND start_time < $4::TIMESTAMPTZ \
                  AND $3::TIMESTAMPTZ < end_time\
            ) AS is_available";
        self.query_opt(
            SQL,
            &[
                &vehicle_id,
                &reservation::Status::Booked,
                &period.start(),
                &period.end(),
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(|row| {
            read::vehicle::IsAvailable(
                row.is_some_and(|r| r.get::<_, bool>("is_available")),
            )
        })
    }
}

impl<C> Database<Lock<By<Vehicle, vehicle::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Vehicle, vehicle::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: vehicle::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM vehicles \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
