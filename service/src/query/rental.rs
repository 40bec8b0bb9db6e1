//! [`Query`] collection related to the rental history.

use common::operations::By;

#[cfg(doc)]
use crate::{domain::User, Query};
use crate::domain::{rental, user};

use super::DatabaseQuery;

/// Queries the rental history of a [`User`], newest first.
pub type ByUser = DatabaseQuery<By<Vec<rental::Entry>, user::Id>>;
