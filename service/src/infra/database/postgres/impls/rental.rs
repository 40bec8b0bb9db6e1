//! [`rental::Entry`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select};
use tracerr::Traced;

use crate::{
    domain::{rental, user},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

use super::reservation::period_from_row;

impl<C> Database<Insert<rental::Entry>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(entry): Insert<rental::Entry>,
    ) -> Result<Self::Ok, Self::Err> {
        let rental::Entry {
            id,
            reservation_id,
            user_id,
            vehicle_id,
            period,
            total_cost,
            created_at,
        } = entry;

        const SQL: &str = "\
            INSERT INTO rental_history (\
                id, reservation_id, user_id, vehicle_id, \
                start_time, end_time, \
                total_cost, currency, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::UUID, \
                $5::TIMESTAMPTZ, $6::TIMESTAMPTZ, \
                $7::NUMERIC, $8::INT2, $9::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &reservation_id,
                &user_id,
                &vehicle_id,
                &period.start(),
                &period.end(),
                &total_cost.amount,
                &total_cost.currency,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Vec<rental::Entry>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<rental::Entry>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<rental::Entry>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();

        const SQL: &str = "\
            SELECT id, reservation_id, user_id, vehicle_id, \
                   start_time, end_time, \
                   total_cost, currency, created_at \
            FROM rental_history \
            WHERE user_id = $1::UUID \
            ORDER BY created_at DESC, id";
        Ok(self
            .query(SQL, &[&user_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| rental::Entry {
                id: row.get("id"),
                reservation_id: row.get("reservation_id"),
                user_id: row.get("user_id"),
                vehicle_id: row.get("vehicle_id"),
                period: period_from_row(row),
                total_cost: common::Money::new(
                    row.get("total_cost"),
                    row.get("currency"),
                ),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}
