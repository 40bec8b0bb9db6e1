//! Domain definitions.

pub mod billing;
pub mod rental;
pub mod reservation;
pub mod user;
pub mod vehicle;

pub use self::{
    billing::Billing, reservation::Reservation, user::User, vehicle::Vehicle,
};
