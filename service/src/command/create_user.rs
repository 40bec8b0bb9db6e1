//! [`Command`] for creating a new [`User`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Password, Phone};
use crate::{
    domain::{
        user::{self, otp, Otp},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`User`].
#[derive(Clone, Debug)]
pub struct CreateUser {
    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// [`Phone`] of a new [`User`].
    pub phone: Option<user::Phone>,

    /// [`user::MembershipTier`] of a new [`User`].
    pub membership_tier: user::MembershipTier,
}

impl<Db> Command<CreateUser> for Service<Db>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<Otp>, &'l user::Phone>>,
            Ok = Option<Otp>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            email,
            password,
            phone,
            membership_tier,
        } = cmd;

        let u = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if u.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        if let Some(phone) = &phone {
            let outstanding = self
                .database()
                .execute(Select(By::<Option<Otp>, _>::new(phone)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .filter(|otp| {
                    otp.is_alive_at(otp::ExpirationDateTime::now())
                });
            if outstanding.is_some() {
                return Err(tracerr::new!(E::PhoneNotVerified(phone.clone())));
            }
        }

        let password_hash = user::PasswordHash::new(
            password.expose_secret(),
            self.config().password_hash_cost,
        )
        .map_err(tracerr::from_and_wrap!(=> E))?;

        let user = User {
            id: user::Id::new(),
            email,
            password_hash,
            phone,
            phone_verified: false,
            membership_tier,
            created_at: DateTime::now().coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(user)
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Email`] is already occupied.
    #[display("`{_0}` email is occupied")]
    EmailOccupied(#[error(not(source))] user::Email),

    /// [`Password`] hashing failed.
    #[display("Failed to hash password: {_0}")]
    #[from]
    PasswordHash(bcrypt::BcryptError),

    /// [`Phone`] has an outstanding [`Otp`] awaiting verification.
    #[display("`{_0}` phone is not verified")]
    PhoneNotVerified(#[error(not(source))] user::Phone),
}
