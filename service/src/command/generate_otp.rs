//! [`Command`] for issuing an [`Otp`] to a [`Phone`].

use common::operations::Insert;
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::user::{otp, Otp, Phone},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for issuing an [`Otp`] to a [`Phone`].
///
/// Replaces any [`Otp`] outstanding for the same [`Phone`].
#[derive(Clone, Debug, From)]
pub struct GenerateOtp {
    /// [`Phone`] to issue the [`Otp`] to.
    pub phone: Phone,
}

impl<Db> Command<GenerateOtp> for Service<Db>
where
    Db: Database<Insert<Otp>, Err = Traced<database::Error>>,
{
    type Ok = otp::ExpirationDateTime;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: GenerateOtp) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let GenerateOtp { phone } = cmd;

        let otp = Otp {
            phone,
            code: otp::Code::generate(),
            expires_at: otp::ExpirationDateTime::now() + self.config().otp_ttl,
        };
        let expires_at = otp.expires_at;

        // Codes are not delivered anywhere else.
        log::debug!("OTP for `{}`: {}", otp.phone, otp.code);

        self.database()
            .execute(Insert(otp))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(expires_at)
    }
}

/// Error of [`GenerateOtp`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};

    use crate::{
        domain::user::{otp, Otp, Phone},
        infra::Database as _,
        test,
    };

    use super::{Command as _, GenerateOtp};

    #[tokio::test]
    async fn replaces_outstanding_code() {
        let (svc, _) = test::service().await;
        let phone = Phone::new("+380991234567").unwrap();

        let first = svc
            .execute(GenerateOtp {
                phone: phone.clone(),
            })
            .await
            .unwrap();
        let second = svc
            .execute(GenerateOtp {
                phone: phone.clone(),
            })
            .await
            .unwrap();
        assert!(second >= first);
        assert!(second > otp::ExpirationDateTime::now());

        let stored = svc
            .database()
            .execute(Select(By::<Option<Otp>, _>::new(&phone)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.expires_at, second);
    }
}
