//! [`Query`] collection related to [`Billing`]s.

use common::operations::By;

#[cfg(doc)]
use crate::{domain::Reservation, Query};
use crate::domain::{reservation, user, Billing};

use super::DatabaseQuery;

/// Queries a [`Billing`] of a [`Reservation`].
pub type ByReservation = DatabaseQuery<By<Option<Billing>, reservation::Id>>;

/// Queries all the [`Billing`]s of a [`User`], newest first.
///
/// [`User`]: crate::domain::User
pub type ByUser = DatabaseQuery<By<Vec<Billing>, user::Id>>;
