//! [`Command`] for verifying a [`Phone`] with an [`Otp`].

use common::operations::{
    By, Commit, Delete, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        user::{otp, Otp, Phone},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for verifying a [`Phone`] with an [`Otp`].
///
/// Consumes the [`Otp`] and marks the [`Phone`] of every [`User`] having it
/// as verified.
#[derive(Clone, Debug)]
pub struct VerifyOtp {
    /// [`Phone`] the [`Otp`] was issued to.
    pub phone: Phone,

    /// [`otp::Code`] received by the [`Phone`].
    pub code: otp::Code,
}

impl<Db> Command<VerifyOtp> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: for<'l> Database<
            Select<By<Option<Otp>, &'l Phone>>,
            Ok = Option<Otp>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Delete<By<Otp, &'l Phone>>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Vec<User>, &'l Phone>>,
            Ok = Vec<User>,
            Err = Traced<database::Error>,
        > + Database<Update<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: VerifyOtp) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let VerifyOtp { phone, code } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Checked under the same `tx` it's deleted in.
        let otp = tx
            .execute(Select(By::<Option<Otp>, _>::new(&phone)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::InvalidOtp)
            .map_err(tracerr::wrap!())?;
        if !otp.is_alive_at(otp::ExpirationDateTime::now()) || otp.code != code
        {
            return Err(tracerr::new!(E::InvalidOtp));
        }

        tx.execute(Delete(By::<Otp, _>::new(&phone)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let users = tx
            .execute(Select(By::<Vec<User>, _>::new(&phone)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        for mut user in users.into_iter().filter(|u| !u.phone_verified) {
            user.phone_verified = true;
            tx.execute(Update(user))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)
    }
}

/// Error of [`VerifyOtp`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Otp`] is missing, expired or doesn't match.
    #[display("Invalid or expired OTP")]
    InvalidOtp,
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Insert, Select, Transact};
    use futures::future;
    use secrecy::SecretBox;

    use crate::{
        command::{CreateUser, GenerateOtp},
        domain::{
            user::{self, otp, Otp, Phone},
            User,
        },
        infra::Database as _,
        test,
    };

    use super::{Command as _, ExecutionError, VerifyOtp};

    const PHONE: &str = "+380991234567";

    #[tokio::test]
    async fn verifies_phone_of_users() {
        let (svc, _) = test::service().await;
        let phone = Phone::new(PHONE).unwrap();
        let user = svc
            .execute(CreateUser {
                email: user::Email::new("phone@example.com").unwrap(),
                password: SecretBox::new(Box::new(
                    user::Password::new(test::PASSWORD).unwrap(),
                )),
                phone: Some(phone.clone()),
                membership_tier: user::MembershipTier::Basic,
            })
            .await
            .unwrap();

        svc.execute(GenerateOtp {
            phone: phone.clone(),
        })
        .await
        .unwrap();
        let code = svc
            .database()
            .execute(Select(By::<Option<Otp>, _>::new(&phone)))
            .await
            .unwrap()
            .unwrap()
            .code;

        svc.execute(VerifyOtp {
            phone: phone.clone(),
            code: code.clone(),
        })
        .await
        .unwrap();

        let stored = svc
            .database()
            .execute(Select(By::<Option<User>, _>::new(user.id)))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.phone_verified);

        // Codes are single-use.
        let err = svc.execute(VerifyOtp { phone, code }).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidOtp), "{err}");
    }

    #[tokio::test]
    async fn rejects_mismatched_and_expired_codes() {
        let (svc, _) = test::service().await;
        let phone = Phone::new(PHONE).unwrap();
        let code = otp::Code::new("123456").unwrap();

        svc.database()
            .execute(Insert(Otp {
                phone: phone.clone(),
                code: code.clone(),
                expires_at: otp::ExpirationDateTime::now()
                    + svc.config().otp_ttl,
            }))
            .await
            .unwrap();
        let err = svc
            .execute(VerifyOtp {
                phone: phone.clone(),
                code: otp::Code::new("654321").unwrap(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidOtp), "{err}");

        svc.database()
            .execute(Insert(Otp {
                phone: phone.clone(),
                code: code.clone(),
                expires_at: otp::ExpirationDateTime::now()
                    - svc.config().otp_ttl,
            }))
            .await
            .unwrap();
        let err = svc.execute(VerifyOtp { phone, code }).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidOtp), "{err}");
    }

    #[tokio::test]
    async fn keeps_code_reissued_while_verifying() {
        let (svc, _) = test::service().await;
        let phone = Phone::new(PHONE).unwrap();
        let code = otp::Code::new("123456").unwrap();
        svc.database()
            .execute(Insert(Otp {
                phone: phone.clone(),
                code: code.clone(),
                expires_at: otp::ExpirationDateTime::now()
                    + svc.config().otp_ttl,
            }))
            .await
            .unwrap();

        // Holds both operations until they're queued in order.
        let blocker = svc.database().execute(Transact).await.unwrap();
        let (verified, reissued, ()) = future::join3(
            svc.execute(VerifyOtp {
                phone: phone.clone(),
                code,
            }),
            svc.execute(GenerateOtp {
                phone: phone.clone(),
            }),
            async move { drop(blocker) },
        )
        .await;
        verified.unwrap();
        reissued.unwrap();

        let otp = svc
            .database()
            .execute(Select(By::<Option<Otp>, _>::new(&phone)))
            .await
            .unwrap();
        assert!(otp.is_some(), "reissued code is deleted");
    }
}
