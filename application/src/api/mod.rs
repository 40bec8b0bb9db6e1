//! HTTP API definitions.

pub mod reservation;
pub mod scalar;
pub mod user;
pub mod vehicle;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{AsError as _, Error};

/// Builds the [`Router`] serving the whole HTTP API.
///
/// [`Service`] is expected to be provided as an [`axum::Extension`].
///
/// [`Service`]: crate::Service
pub fn router() -> Router {
    Router::new()
        .route("/users", post(user::create))
        .route("/users/me", get(user::me))
        .route("/users/me/rentals", get(user::rentals))
        .route("/users/me/invoices", get(user::invoices))
        .route("/sessions", post(user::create_session))
        .route("/otp", post(user::generate_otp))
        .route("/otp/verify", post(user::verify_otp))
        .route("/vehicles", get(vehicle::list))
        .route("/vehicles/:vehicle_id", get(vehicle::get))
        .route("/vehicles/:vehicle_id/availability", get(vehicle::availability))
        .route("/reservations", post(reservation::book))
        .route(
            "/reservations/:reservation_id",
            get(reservation::get).patch(reservation::modify),
        )
        .route("/reservations/:reservation_id/cancel", post(reservation::cancel))
        .route(
            "/reservations/:reservation_id/complete",
            post(reservation::complete),
        )
        .route(
            "/reservations/:reservation_id/billing",
            get(reservation::billing),
        )
        .route(
            "/reservations/:reservation_id/billing/payment",
            post(reservation::confirm_payment),
        )
}

/// JSON body extractor and response, rejecting malformed input with an
/// [`Error`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Json<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Error> {
        axum::Json::<T>::from_request(req, state)
            .await
            .map(|axum::Json(v)| Self(v))
            .map_err(|e| e.into_error())
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Path parameters extractor, rejecting malformed input with an [`Error`].
#[derive(Clone, Copy, Debug)]
pub struct Path<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        state: &S,
    ) -> Result<Self, Error> {
        axum::extract::Path::<T>::from_request_parts(parts, state)
            .await
            .map(|axum::extract::Path(v)| Self(v))
            .map_err(|e| e.into_error())
    }
}

/// Query string extractor, rejecting malformed input with an [`Error`].
#[derive(Clone, Copy, Debug)]
pub struct Query<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        state: &S,
    ) -> Result<Self, Error> {
        axum::extract::Query::<T>::from_request_parts(parts, state)
            .await
            .map(|axum::extract::Query(v)| Self(v))
            .map_err(|e| e.into_error())
    }
}
