//! Business logic of the vehicle rental platform.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;
#[cfg(test)]
mod test;

use std::{error::Error, time::Duration};

use common::operations::{By, Start};
use derive_more::Debug;
use smart_default::SmartDefault;

use crate::domain::billing;
#[cfg(doc)]
use crate::{
    domain::{user, Billing},
    infra::Database,
};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] encoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_encoding_key: jsonwebtoken::EncodingKey,

    /// [JWT] decoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// Lifetime of an issued [`user::Session`].
    pub session_ttl: Duration,

    /// `bcrypt` cost of [`user::PasswordHash`]es.
    pub password_hash_cost: u32,

    /// Lifetime of an issued [`user::Otp`].
    pub otp_ttl: Duration,

    /// [`billing::Rates`] to price reservations with.
    pub rates: billing::Rates,

    /// [`Policy`] of reservations.
    pub policy: Policy,

    /// Maximum duration of a single [`Command`], including the time spent
    /// waiting for [`Database`] locks.
    pub transaction_timeout: Duration,

    /// [`task::SweepExpiredOtps`] configuration.
    pub sweep_expired_otps: task::sweep_expired_otps::Config,
}

/// Reservation policy of a [`Service`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Policy {
    /// Whether booking a period starting in the past is rejected.
    #[default(true)]
    pub reject_past_bookings: bool,

    /// What happens to a [`Billing`] once its rental is completed.
    pub completion_billing: billing::CompletionPolicy,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters.
    pub fn new(config: Config, database: Db) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<
                        task::SweepExpiredOtps<Self>,
                        task::sweep_expired_otps::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
    {
        let this = Service { config, database };

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn(task::sweep_expired_otps::NAME, async move {
            svc.execute(Start(By::new(svc.config().sweep_expired_otps)))
                .await
        });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }
}
