//! [`SweepExpiredOtps`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Delete, Perform, Start};
use smart_default::SmartDefault;
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::user::{otp, Otp},
    infra::{database, Database},
    Service,
};

use super::Task;

/// Name of the [`SweepExpiredOtps`] [`Task`] in logs.
pub const NAME: &str = "sweep_expired_otps";

/// Configuration for [`SweepExpiredOtps`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between expired [`Otp`]s sweeps.
    #[default(time::Duration::from_secs(60))]
    pub interval: time::Duration,
}

/// [`Task`] for deleting expired [`Otp`]s.
#[derive(Clone, Copy, Debug)]
pub struct SweepExpiredOtps<S> {
    /// [`Service`] instance.
    service: S,
}

impl<Db> Task<Start<By<SweepExpiredOtps<Self>, Config>>> for Service<Db>
where
    SweepExpiredOtps<Service<Db>>:
        Task<Perform<()>, Ok = (), Err: Error> + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<SweepExpiredOtps<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let Config { interval: period } = by.into_inner();
        let task = SweepExpiredOtps {
            service: self.clone(),
        };

        let mut interval = interval(period);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await.map_err(|e| {
                log::error!("`{NAME}` task iteration failed: {e}");
            });
        }
    }
}

impl<Db> Task<Perform<()>> for SweepExpiredOtps<Service<Db>>
where
    Db: Database<
        Delete<By<Otp, otp::ExpirationDateTime>>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        log::debug!("sweeping expired OTPs");
        self.service
            .database()
            .execute(Delete(By::new(otp::ExpirationDateTime::now())))
            .await
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`SweepExpiredOtps`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::operations::{By, Insert, Perform, Select};

    use crate::{
        domain::user::{otp, Otp, Phone},
        infra::Database as _,
        test,
    };

    use super::{SweepExpiredOtps, Task as _};

    #[tokio::test]
    async fn deletes_only_expired_codes() {
        let (svc, _) = test::service().await;
        let expired = Phone::new("5550000001").unwrap();
        let alive = Phone::new("5550000002").unwrap();
        for (phone, expires_at) in [
            (&expired, otp::ExpirationDateTime::now() - Duration::from_secs(1)),
            (&alive, otp::ExpirationDateTime::now() + Duration::from_secs(60)),
        ] {
            svc.database()
                .execute(Insert(Otp {
                    phone: phone.clone(),
                    code: otp::Code::generate(),
                    expires_at,
                }))
                .await
                .unwrap();
        }

        SweepExpiredOtps {
            service: svc.clone(),
        }
        .execute(Perform(()))
        .await
        .unwrap();

        let db = svc.database();
        assert!(db
            .execute(Select(By::<Option<Otp>, _>::new(&expired)))
            .await
            .unwrap()
            .is_none());
        assert!(db
            .execute(Select(By::<Option<Otp>, _>::new(&alive)))
            .await
            .unwrap()
            .is_some());
    }
}
