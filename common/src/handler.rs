//! [`Handler`] abstractions.
//!
//! Every layer of the platform talks through this single trait: commands and
//! queries are [`Handler`]s of a service, storage operations are [`Handler`]s
//! of a database. The argument type selects the implementation.

use std::future::Future;

/// Executable handler.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided arguments.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
