//! Fixtures for testing [`Service`] against a [`Memory`] database.

use std::time::Duration;

use common::{operations::Insert, DateTime};

use crate::{
    domain::{reservation, user, vehicle, User, Vehicle},
    infra::{Database as _, Memory},
    task, Config, Policy, Service,
};

/// Password of the [`Fixture::user`].
pub(crate) const PASSWORD: &str = "correct horse";

/// Entities a [`Service`] is seeded with.
#[derive(Clone, Debug)]
pub(crate) struct Fixture {
    /// Registered [`User`] with a [`user::MembershipTier::Basic`].
    pub(crate) user: User,

    /// Another registered [`User`].
    pub(crate) stranger: User,

    /// [`Vehicle`] to book.
    pub(crate) vehicle: Vehicle,

    /// Another [`Vehicle`] to book.
    pub(crate) other_vehicle: Vehicle,
}

/// Returns the [`Config`] used in tests.
pub(crate) fn config() -> Config {
    let secret = b"test secret";
    Config {
        jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(secret),
        jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(secret),
        session_ttl: Duration::from_secs(3600),
        password_hash_cost: bcrypt::DEFAULT_COST - 8,
        otp_ttl: Duration::from_secs(5 * 60),
        rates: Default::default(),
        policy: Policy::default(),
        transaction_timeout: Duration::from_secs(5),
        sweep_expired_otps: task::sweep_expired_otps::Config::default(),
    }
}

/// Creates a new [`Service`] over a seeded [`Memory`] database.
pub(crate) async fn service() -> (Service<Memory>, Fixture) {
    service_with(|_| {}).await
}

/// Creates a new [`Service`] over a seeded [`Memory`] database, adjusting
/// its [`Config`] with the provided function.
pub(crate) async fn service_with(
    f: impl FnOnce(&mut Config),
) -> (Service<Memory>, Fixture) {
    let mut config = config();
    f(&mut config);
    let (svc, _) = Service::new(config, Memory::new());

    let fixture = Fixture {
        user: user("renter@example.com", user::MembershipTier::Basic),
        stranger: user("stranger@example.com", user::MembershipTier::Vip),
        vehicle: vehicle("EV-0001"),
        other_vehicle: vehicle("EV-0002"),
    };
    for u in [&fixture.user, &fixture.stranger] {
        svc.database().execute(Insert(u.clone())).await.unwrap();
    }
    for v in [&fixture.vehicle, &fixture.other_vehicle] {
        svc.database().execute(Insert(v.clone())).await.unwrap();
    }

    (svc, fixture)
}

/// Creates a new [`User`] with the [`PASSWORD`].
fn user(email: &str, membership_tier: user::MembershipTier) -> User {
    let password = user::Password::new(PASSWORD).unwrap();
    User {
        id: user::Id::new(),
        email: user::Email::new(email).unwrap(),
        password_hash: user::PasswordHash::new(
            &password,
            config().password_hash_cost,
        )
        .unwrap(),
        phone: None,
        phone_verified: false,
        membership_tier,
        created_at: DateTime::now().coerce(),
    }
}

/// Creates a new [`Vehicle`] with the provided license plate.
fn vehicle(plate: &str) -> Vehicle {
    Vehicle {
        id: vehicle::Id::new(),
        model: vehicle::Model::new("Nissan Leaf").unwrap(),
        license_plate: vehicle::LicensePlate::new(plate).unwrap(),
        charge_level: vehicle::ChargeLevel::new(80).unwrap(),
        location: vehicle::Location::new("Depot 1").unwrap(),
        created_at: DateTime::now().coerce(),
    }
}

/// Returns a [`reservation::Period`] between the provided hours of a day far
/// in the future.
pub(crate) fn period(start_hour: u32, end_hour: u32) -> reservation::Period {
    period_since(
        DateTime::from_rfc3339("2100-01-01T00:00:00Z").unwrap(),
        start_hour,
        end_hour,
    )
}

/// Returns a [`reservation::Period`] between the provided hours since the
/// provided moment.
pub(crate) fn period_since(
    since: DateTime,
    start_hour: u32,
    end_hour: u32,
) -> reservation::Period {
    let hour = Duration::from_secs(3600);
    reservation::Period::new(
        (since + hour * start_hour).coerce(),
        (since + hour * end_hour).coerce(),
    )
    .unwrap()
}
