//! [`Error`]-related definitions.

use std::fmt;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use derive_more::Error as StdError;
use itertools::Itertools as _;
use serde::Serialize;
use service::infra::database;
use tracerr::{Trace, Traced};
use tracing as log;

/// Defines a new error type.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        #[repr(u16)]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            status_code: ::http::StatusCode::$status_code,
                            message: $message.to_string(),
                            backtrace: None,
                        },
                    )*
                }
            }
        }
    };
}

/// HTTP API [`Error`].
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,
}

impl Error {
    /// Message exposed to clients instead of the one of an internal error.
    pub const INTERNAL_MESSAGE: &'static str = "Internal server error";

    /// Create a new [`Error`] representing an internal server error.
    ///
    /// The `msg` is logged, but never exposed in a response.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            backtrace: None,
        }
    }

    /// Create a new [`Error`] representing a malformed request.
    #[must_use]
    pub fn invalid_input(msg: &impl ToString) -> Self {
        Self {
            code: "INVALID_INPUT",
            status_code: http::StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            backtrace: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
        } = self;

        write!(
            f,
            "[{code}]: {message}{}",
            backtrace
                .iter()
                .format_with("\n", |trace, f| f(&format_args!("\n{trace}"))),
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        /// Body of an [`Error`] response.
        #[derive(Serialize)]
        struct Body<'a> {
            /// [`Error`] code.
            code: Code,

            /// [`Error`] message.
            message: &'a str,
        }

        if self.status_code.is_server_error() {
            log::error!("{self}");
        }

        let message =
            if self.status_code == http::StatusCode::INTERNAL_SERVER_ERROR {
                Self::INTERNAL_MESSAGE
            } else {
                &self.message
            };
        (
            self.status_code,
            axum::Json(Body {
                code: self.code,
                message,
            }),
        )
            .into_response()
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }

    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error().unwrap_or_else(|| {
            let mut error = Error::internal(&self);
            error.backtrace = Some(self.trace().clone());
            error
        })
    }
}

impl AsError for TypedHeaderRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::invalid_input(&self))
    }
}

impl AsError for JsonRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::invalid_input(&self.body_text()))
    }
}

impl AsError for PathRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::invalid_input(&self.body_text()))
    }
}

impl AsError for QueryRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::invalid_input(&self.body_text()))
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CONFLICT"]
                #[status = CONFLICT]
                #[message = "`Vehicle` is already booked for an overlapping \
                             period"]
                Overlap,

                #[code = "CONFLICT"]
                #[status = CONFLICT]
                #[message = "Entity already exists"]
                Duplicate,

                #[code = "TIMEOUT"]
                #[status = SERVICE_UNAVAILABLE]
                #[message = "Resource is busy, try again later"]
                LockTimeout,
            }
        }

        if self.is_overlap() {
            Some(Error::Overlap.into())
        } else if self.is_duplicate() {
            Some(Error::Duplicate.into())
        } else if self.is_lock_timeout() {
            Some(Error::LockTimeout.into())
        } else {
            None
        }
    }
}

define_error! {
    enum TimeoutError {
        #[code = "TIMEOUT"]
        #[status = SERVICE_UNAVAILABLE]
        #[message = "Operation timed out, try again later"]
        Elapsed,
    }
}

impl AsError for tokio::time::error::Elapsed {
    fn try_as_error(&self) -> Option<Error> {
        Some(TimeoutError::Elapsed.into())
    }
}

#[cfg(test)]
mod spec {
    use axum::{body, response::IntoResponse as _};

    use service::{
        command::book_vehicle,
        infra::{database, postgres},
    };

    use super::{AsError, Error, TimeoutError};

    async fn body_of(err: Error) -> (http::StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn renders_code_and_message() {
        let (status, body) =
            body_of(Error::invalid_input(&"`start_time` is missing")).await;

        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            serde_json::json!({
                "code": "INVALID_INPUT",
                "message": "`start_time` is missing",
            }),
        );
    }

    #[tokio::test]
    async fn maps_timeouts_to_service_unavailable() {
        let (status, body) = body_of(TimeoutError::Elapsed.into()).await;

        assert_eq!(status, http::StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "TIMEOUT");
    }

    #[test]
    fn unknown_errors_are_internal() {
        #[derive(Debug, derive_more::Display)]
        #[display("boom")]
        struct Unknown;

        impl AsError for Unknown {
            fn try_as_error(&self) -> Option<Error> {
                None
            }
        }

        let err = Unknown.as_error();
        assert_eq!(err.code, "INTERNAL");
        assert_eq!(err.status_code, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "boom");
    }

    #[tokio::test]
    async fn hides_store_errors_from_clients() {
        let err = book_vehicle::ExecutionError::Db(database::Error::from(
            postgres::Error::TransactionFinished,
        ))
        .as_error();
        assert_eq!(err.code, "INTERNAL");
        assert!(err.message.contains("Transaction is already finished"));

        let (status, body) = body_of(err).await;

        assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            serde_json::json!({
                "code": "INTERNAL",
                "message": Error::INTERNAL_MESSAGE,
            }),
        );
    }
}
