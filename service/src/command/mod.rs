//! [`Command`] definition.

pub mod authorize_user_session;
pub mod book_vehicle;
pub mod cancel_booking;
pub mod complete_rental;
pub mod confirm_payment;
pub mod create_user;
pub mod create_user_session;
pub mod generate_otp;
pub mod modify_booking;
pub mod verify_otp;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession, book_vehicle::BookVehicle,
    cancel_booking::CancelBooking, complete_rental::CompleteRental,
    confirm_payment::ConfirmPayment, create_user::CreateUser,
    create_user_session::CreateUserSession, generate_otp::GenerateOtp,
    modify_booking::ModifyBooking, verify_otp::VerifyOtp,
};
