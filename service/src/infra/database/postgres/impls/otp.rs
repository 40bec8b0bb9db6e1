//! [`Otp`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Select};
use tracerr::Traced;

use crate::{
    domain::user::{self, otp, Otp},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Insert<Otp>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(otp): Insert<Otp>,
    ) -> Result<Self::Ok, Self::Err> {
        let Otp {
            phone,
            code,
            expires_at,
        } = otp;

        // A new code always replaces the outstanding one.
        const SQL: &str = "\
            INSERT INTO otps (phone, code, expires_at) \
            VALUES ($1::VARCHAR, $2::VARCHAR, $3::TIMESTAMPTZ) \
            ON CONFLICT (phone) DO UPDATE \
            SET code = EXCLUDED.code, \
                expires_at = EXCLUDED.expires_at";
        self.exec(SQL, &[&phone, &code, &expires_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<'l, C> Database<Select<By<Option<Otp>, &'l user::Phone>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Otp>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Otp>, &'l user::Phone>>,
    ) -> Result<Self::Ok, Self::Err> {
        let phone = by.into_inner();

        const SQL: &str = "\
            SELECT phone, code, expires_at \
            FROM otps \
            WHERE phone = $1::VARCHAR \
            FOR UPDATE";
        Ok(self
            .query_opt(SQL, &[phone])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| Otp {
                phone: row.get("phone"),
                code: row.get("code"),
                expires_at: row.get("expires_at"),
            }))
    }
}

impl<'l, C> Database<Delete<By<Otp, &'l user::Phone>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Otp, &'l user::Phone>>,
    ) -> Result<Self::Ok, Self::Err> {
        let phone = by.into_inner();

        const SQL: &str = "\
            DELETE FROM otps \
            WHERE phone = $1::VARCHAR";
        self.exec(SQL, &[phone])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<Otp, otp::ExpirationDateTime>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Otp, otp::ExpirationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let now = by.into_inner();

        const SQL: &str = "\
            DELETE FROM otps \
            WHERE expires_at <= $1::TIMESTAMPTZ";
        self.exec(SQL, &[&now]).await.map_err(tracerr::wrap!()).map(drop)
    }
}
