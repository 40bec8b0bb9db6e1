//! [`Billing`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Select, Update},
    Money,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{reservation, user, Billing},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Builds a [`Billing`] from the provided [`Row`].
fn from_row(row: &Row) -> Billing {
    Billing {
        reservation_id: row.get("reservation_id"),
        amount: Money::new(row.get("amount"), row.get("currency")),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Select<By<Option<Billing>, reservation::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Billing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Billing>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT reservation_id, amount, currency, \
                   status, created_at, updated_at \
            FROM billing \
            WHERE reservation_id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Billing>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Billing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Billing>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();

        const SQL: &str = "\
            SELECT b.reservation_id, b.amount, b.currency, \
                   b.status, b.created_at, b.updated_at \
            FROM billing AS b \
            INNER JOIN reservations AS r \
                    ON r.id = b.reservation_id \
            WHERE r.user_id = $1::UUID \
            ORDER BY b.created_at DESC, b.reservation_id";
        Ok(self
            .query(SQL, &[&user_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Billing>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Billing>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(billing): Insert<Billing>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(billing)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Billing>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(billing): Update<Billing>,
    ) -> Result<Self::Ok, Self::Err> {
        let Billing {
            reservation_id,
            amount,
            status,
            created_at,
            updated_at,
        } = billing;

        const SQL: &str = "\
            INSERT INTO billing (\
                reservation_id, amount, currency, \
                status, created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, $2::NUMERIC, $3::INT2, \
                $4::INT2, $5::TIMESTAMPTZ, $6::TIMESTAMPTZ\
            ) \
            ON CONFLICT (reservation_id) DO UPDATE \
            SET amount = EXCLUDED.amount, \
                currency = EXCLUDED.currency, \
                status = EXCLUDED.status, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &reservation_id,
                &amount.amount,
                &amount.currency,
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
