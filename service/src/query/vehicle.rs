//! [`Query`] collection related to [`Vehicle`]s.

use common::operations::By;

#[cfg(doc)]
use crate::Query;
use crate::{
    domain::{vehicle, Vehicle},
    read,
};

use super::DatabaseQuery;

/// Queries a [`Vehicle`] by its [`vehicle::Id`].
pub type ById = DatabaseQuery<By<Option<Vehicle>, vehicle::Id>>;

/// Queries a list of [`Vehicle`]s along with their current availability.
pub type List = DatabaseQuery<
    By<Vec<read::vehicle::list::Item>, read::vehicle::list::Filter>,
>;
