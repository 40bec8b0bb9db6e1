//! [`Reservation`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{reservation, Reservation},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `reservations` table a [`Reservation`] is built from.
const COLUMNS: &str = "\
    id, user_id, vehicle_id, \
    start_time, end_time, \
    status, created_at, updated_at";

/// Builds a [`reservation::Period`] from the provided [`Row`].
#[expect(unsafe_code, reason = "invariants are preserved")]
pub(super) fn period_from_row(row: &Row) -> reservation::Period {
    // SAFETY: `start_time < end_time` is checked by the `reservations` and
    //         `rental_history` tables.
    unsafe {
        reservation::Period::new_unchecked(
            row.get("start_time"),
            row.get("end_time"),
        )
    }
}

/// Builds a [`Reservation`] from the provided [`Row`] containing [`COLUMNS`].
fn from_row(row: &Row) -> Reservation {
    Reservation {
        id: row.get("id"),
        user_id: row.get("user_id"),
        vehicle_id: row.get("vehicle_id"),
        period: period_from_row(row),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Select<By<Option<Reservation>, reservation::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM reservations \
             WHERE id = $1::UUID"
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Reservation>, read::reservation::Overlapping>>>
    for Postgres<C>
where
    C: Connection,
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

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM reservations \
             WHERE vehicle_id = $1::UUID \
               AND status = $2::INT2 \
               AND start_time < $4::TIMESTAMPTZ \
               AND $3::TIMESTAMPTZ < end_time \
               AND ($5::UUID IS NULL OR id <> $5::UUID) \
             ORDER BY start_time"
        );
        Ok(self
            .query(
                &sql,
                &[
                    &vehicle_id,
                    &reservation::Status::Booked,
                    &period.start(),
                    &period.end(),
                    &excluding,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Reservation>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(reservation): Insert<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        let Reservation {
            id,
            user_id,
            vehicle_id,
            period,
            status,
            created_at,
            updated_at,
        } = reservation;

        const SQL: &str = "\
            INSERT INTO reservations (\
                id, user_id, vehicle_id, \
                start_time, end_time, \
                status, created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::TIMESTAMPTZ, $5::TIMESTAMPTZ, \
                $6::INT2, $7::TIMESTAMPTZ, $8::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &user_id,
                &vehicle_id,
                &period.start(),
                &period.end(),
                &status,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Reservation>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(reservation): Update<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        let Reservation {
            id,
            period,
            status,
            updated_at,
            ..
        } = reservation;

        // Owner and vehicle of a `Reservation` never change.
        const SQL: &str = "\
            UPDATE reservations \
            SET start_time = $2::TIMESTAMPTZ, \
                end_time = $3::TIMESTAMPTZ, \
                status = $4::INT2, \
                updated_at = $5::TIMESTAMPTZ \
            WHERE id = $1::UUID";
        self.exec(
            SQL,
            &[&id, &period.start(), &period.end(), &status, &updated_at],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
