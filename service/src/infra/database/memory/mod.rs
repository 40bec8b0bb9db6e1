//! In-memory [`Database`] implementation.
//!
//! Mirrors the transactional semantics of the [`Postgres`] one: a [`Tx`]
//! works on a private copy of the [`State`] which replaces the shared one on
//! [`Commit`] only, and is discarded on drop.
//!
//! Meant for tests and local runs only. Every [`Tx`] holds a single lock over
//! the whole [`State`], so transactions are serialized with each other and
//! with non-transactional operations, even when they touch unrelated
//! vehicles. Per-vehicle concurrency is provided by the [`Postgres`] one.
//!
//! [`Commit`]: common::operations::Commit
//! [`Postgres`]: crate::infra::Postgres

mod impls;

use std::{collections::HashMap, future::Future, sync::Arc};

use derive_more::{Deref, Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

#[cfg(doc)]
use crate::infra::Database;
use crate::{
    domain::{
        rental, reservation,
        user::{self, Otp},
        vehicle, Billing, Reservation, User, Vehicle,
    },
    infra::database,
};

/// In-memory [`Database`] client.
#[derive(Clone, Debug, Default, Deref)]
pub struct Memory<T = NonTx>(T);

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Whole data set stored in a [`Memory`] database.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Stored [`User`]s.
    users: HashMap<user::Id, User>,

    /// Stored [`Vehicle`]s.
    vehicles: HashMap<vehicle::Id, Vehicle>,

    /// Stored [`Reservation`]s.
    reservations: HashMap<reservation::Id, Reservation>,

    /// Stored [`Billing`]s.
    billings: HashMap<reservation::Id, Billing>,

    /// Stored [`rental::Entry`]s.
    rentals: HashMap<rental::Id, rental::Entry>,

    /// Outstanding [`Otp`]s.
    otps: HashMap<user::Phone, Otp>,
}

/// [`Memory`] database [`Error`].
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// [`Tx`] was already committed.
    #[display("Transaction is already finished")]
    TransactionFinished,
}

/// Connection to a [`State`].
pub trait Connection {
    /// Runs the provided function over the [`State`] visible to this
    /// [`Connection`].
    ///
    /// # Errors
    ///
    /// If this [`Connection`] cannot be used anymore.
    fn with<F, R>(
        &self,
        f: F,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>
    where
        F: FnOnce(&mut State) -> R;
}

/// Non-transactional [`Memory`] database client.
///
/// Every operation is applied to the shared [`State`] immediately.
#[derive(Clone, Debug, Default)]
pub struct NonTx {
    /// Shared [`State`].
    state: Arc<Mutex<State>>,
}

impl Connection for NonTx {
    async fn with<F, R>(&self, f: F) -> Result<R, Traced<database::Error>>
    where
        F: FnOnce(&mut State) -> R,
    {
        Ok(f(&mut *self.state.lock().await))
    }
}

/// Transactional [`Memory`] database client.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`Staged`] changes, if not committed yet.
    staged: Arc<Mutex<Option<Staged>>>,
}

/// Changes of a [`Tx`] not visible to others yet.
#[derive(Debug)]
struct Staged {
    /// Exclusive access to the shared [`State`].
    shared: OwnedMutexGuard<State>,

    /// Working copy of the shared [`State`].
    copy: State,
}

impl Tx {
    /// Begins a new [`Tx`] over the provided [`NonTx`] client's [`State`],
    /// waiting for other transactions to finish.
    async fn begin(client: &NonTx) -> Self {
        let shared = Arc::clone(&client.state).lock_owned().await;
        let copy = shared.clone();
        Self {
            staged: Arc::new(Mutex::new(Some(Staged { shared, copy }))),
        }
    }

    /// Publishes the changes of this [`Tx`].
    ///
    /// # Errors
    ///
    /// If this [`Tx`] was committed already.
    async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let Staged { mut shared, copy } = self
            .staged
            .lock()
            .await
            .take()
            .ok_or(Error::TransactionFinished)
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        *shared = copy;
        Ok(())
    }
}

impl Connection for Tx {
    async fn with<F, R>(&self, f: F) -> Result<R, Traced<database::Error>>
    where
        F: FnOnce(&mut State) -> R,
    {
        let mut staged = self.staged.lock().await;
        let staged = staged
            .as_mut()
            .ok_or(Error::TransactionFinished)
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        Ok(f(&mut staged.copy))
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::operations::{By, Commit, Insert, Select, Transact};

    use crate::{
        domain::user::{otp, Otp, Phone},
        infra::{database, Database as _},
    };

    use super::{Error, Memory};

    fn otp(phone: &Phone) -> Otp {
        Otp {
            phone: phone.clone(),
            code: otp::Code::new("123456").unwrap(),
            expires_at: otp::ExpirationDateTime::now()
                + Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn discards_uncommitted_changes() {
        let db = Memory::new();
        let phone = Phone::new("+380991234567").unwrap();

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(otp(&phone))).await.unwrap();
        let staged = tx
            .execute(Select(By::<Option<Otp>, _>::new(&phone)))
            .await
            .unwrap();
        assert!(staged.is_some());
        drop(tx);

        let stored = db
            .execute(Select(By::<Option<Otp>, _>::new(&phone)))
            .await
            .unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn publishes_changes_on_commit_once() {
        let db = Memory::new();
        let phone = Phone::new("+380991234567").unwrap();

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(otp(&phone))).await.unwrap();
        tx.execute(Commit).await.unwrap();

        let stored = db
            .execute(Select(By::<Option<Otp>, _>::new(&phone)))
            .await
            .unwrap();
        assert!(stored.is_some());

        let err = tx.execute(Commit).await.unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                database::Error::Memory(Error::TransactionFinished),
            ),
            "{err}",
        );
    }
}
