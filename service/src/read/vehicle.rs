//! [`Vehicle`] read model definitions.

use derive_more::{Display, From, Into};

#[cfg(doc)]
use crate::domain::Vehicle;

/// Indicator whether a [`Vehicle`] is free of booked reservations for some
/// time.
///
/// Always derived from reservations, never stored.
#[derive(Clone, Copy, Debug, Display, Eq, From, Into, PartialEq)]
pub struct IsAvailable(pub bool);

pub mod list {
    //! [`Vehicle`]s list definitions.

    use common::DateTime;

    use crate::domain::Vehicle;

    use super::IsAvailable;

    /// Filter of a [`Vehicle`]s list.
    #[derive(Clone, Copy, Debug)]
    pub struct Filter {
        /// Moment the availability is computed at.
        pub at: DateTime,

        /// Whether to list only the [`Vehicle`]s available at the moment.
        pub only_available: bool,
    }

    /// Item of a [`Vehicle`]s list.
    pub type Item = (Vehicle, IsAvailable);
}
