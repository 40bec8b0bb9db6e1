//! [`User`]-related definitions.

use common::DateTime;
use http::StatusCode;
use secrecy::{ExposeSecret as _, SecretBox, SecretString};
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{self, user},
    query::{self, DatabaseQuery},
};

use crate::{
    api::{reservation, Json},
    define_error, AsError, Context, Error, Session,
};

/// A [`User`] of the platform.
///
/// [`User`]: domain::User
#[derive(Clone, Debug, Serialize)]
pub struct User {
    /// Unique identifier of this `User`.
    pub id: user::Id,

    /// Email of this `User`.
    pub email: String,

    /// Phone of this `User`.
    pub phone: Option<String>,

    /// Whether the phone of this `User` is verified.
    pub phone_verified: bool,

    /// Membership tier of this `User`.
    pub membership_tier: String,

    /// When this `User` was created.
    pub created_at: DateTime,
}

impl From<domain::User> for User {
    fn from(user: domain::User) -> Self {
        Self {
            id: user.id,
            email: user.email.to_string(),
            phone: user.phone.map(|p| p.to_string()),
            phone_verified: user.phone_verified,
            membership_tier: user.membership_tier.to_string(),
            created_at: user.created_at.coerce(),
        }
    }
}

/// Issued session of a [`User`].
#[derive(Clone, Debug, Serialize)]
pub struct SessionOutput {
    /// Bearer token authorizing requests.
    pub token: String,

    /// When the `token` expires.
    pub expires_at: DateTime,

    /// `User` the session was issued for.
    pub user: User,
}

impl From<command::create_user_session::Output> for SessionOutput {
    fn from(out: command::create_user_session::Output) -> Self {
        Self {
            token: out.token.to_string(),
            expires_at: out.expires_at.coerce(),
            user: out.user.into(),
        }
    }
}

/// Body of a `POST /users` request.
#[derive(Debug, Deserialize)]
pub struct CreateUserInput {
    /// Email to register with.
    pub email: String,

    /// Password to register with.
    pub password: SecretString,

    /// Optional phone number.
    #[serde(default)]
    pub phone: Option<String>,

    /// Optional membership tier, `BASIC` by default.
    #[serde(default)]
    pub membership_tier: Option<String>,
}

impl CreateUserInput {
    /// Validates this [`CreateUserInput`] into a [`command::CreateUser`].
    ///
    /// # Errors
    ///
    /// If any of the fields is malformed.
    pub fn into_command(self) -> Result<command::CreateUser, Error> {
        let Self {
            email,
            password,
            phone,
            membership_tier,
        } = self;

        Ok(command::CreateUser {
            email: parse_email(&email)?,
            password: parse_password(&password)?,
            phone: phone.as_deref().map(parse_phone).transpose()?,
            membership_tier: membership_tier
                .map(|t| {
                    t.parse::<user::MembershipTier>()
                        .map_err(|_| InputError::MembershipTier)
                })
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

/// Body of a `POST /sessions` request.
#[derive(Debug, Deserialize)]
pub struct CredentialsInput {
    /// Email of the `User`.
    pub email: String,

    /// Password of the `User`.
    pub password: SecretString,
}

/// Body of a `POST /otp` request.
#[derive(Debug, Deserialize)]
pub struct PhoneInput {
    /// Phone number to send the code to.
    pub phone: String,
}

/// Response to a `POST /otp` request.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct OtpOutput {
    /// When the issued code expires.
    pub expires_at: DateTime,
}

/// Body of a `POST /otp/verify` request.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpInput {
    /// Phone number the code was sent to.
    pub phone: String,

    /// Received code.
    pub code: String,
}

/// Response to a `POST /otp/verify` request.
#[derive(Clone, Debug, Serialize)]
pub struct VerifiedOutput {
    /// Verified phone number.
    pub phone: String,

    /// Always `true`.
    pub verified: bool,
}

/// Registers a new `User` and opens a session for them.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - malformed fields or the phone awaits verification;
/// - `CONFLICT` - the email is occupied by another `User`.
#[tracing::instrument(skip_all, fields(http.handler = "users.create"))]
pub async fn create(
    ctx: Context,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<SessionOutput>), Error> {
    let user = ctx
        .execute(input.into_command()?)
        .await
        .map_err(AsError::into_error)?;

    ctx.execute(command::CreateUserSession::ByUserId(user.id))
        .await
        .map(|out| (StatusCode::CREATED, Json(out.into())))
        .map_err(AsError::into_error)
}

/// Opens a new session by `User` credentials.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - malformed fields;
/// - `UNAUTHORIZED` - credentials don't match any `User`.
#[tracing::instrument(skip_all, fields(http.handler = "sessions.create"))]
pub async fn create_session(
    ctx: Context,
    Json(input): Json<CredentialsInput>,
) -> Result<Json<SessionOutput>, Error> {
    let CredentialsInput { email, password } = input;

    ctx.execute(command::CreateUserSession::ByCredentials {
        email: parse_email(&email)?,
        password: parse_password(&password)?,
    })
    .await
    .map(|out| Json(out.into()))
    .map_err(AsError::into_error)
}

/// Returns the authenticated `User`.
///
/// # Errors
///
/// Possible error codes:
/// - `UNAUTHORIZED` - the request is not authorized.
#[tracing::instrument(skip_all, fields(http.handler = "users.me"))]
pub async fn me(ctx: Context, session: Session) -> Result<Json<User>, Error> {
    let query: query::user::ById = DatabaseQuery::by(session.user_id);
    ctx.execute(query)
        .await
        .map_err(AsError::into_error)?
        .map(|u| Json(u.into()))
        .ok_or_else(|| Error::from(UserError::NotExists))
}

/// Returns the rental history of the authenticated `User`, newest first.
///
/// # Errors
///
/// Possible error codes:
/// - `UNAUTHORIZED` - the request is not authorized.
#[tracing::instrument(skip_all, fields(http.handler = "users.rentals"))]
pub async fn rentals(
    ctx: Context,
    session: Session,
) -> Result<Json<Vec<reservation::RentalEntry>>, Error> {
    let query: query::rental::ByUser = DatabaseQuery::by(session.user_id);
    ctx.execute(query)
        .await
        .map(|es| Json(es.into_iter().map(Into::into).collect()))
        .map_err(AsError::into_error)
}

/// Returns the invoices of the authenticated `User`, newest first.
///
/// # Errors
///
/// Possible error codes:
/// - `UNAUTHORIZED` - the request is not authorized.
#[tracing::instrument(skip_all, fields(http.handler = "users.invoices"))]
pub async fn invoices(
    ctx: Context,
    session: Session,
) -> Result<Json<Vec<reservation::Billing>>, Error> {
    let query: query::billing::ByUser = DatabaseQuery::by(session.user_id);
    ctx.execute(query)
        .await
        .map(|bs| Json(bs.into_iter().map(Into::into).collect()))
        .map_err(AsError::into_error)
}

/// Issues a one-time code to verify a phone number.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - malformed phone number.
#[tracing::instrument(skip_all, fields(http.handler = "otp.generate"))]
pub async fn generate_otp(
    ctx: Context,
    Json(input): Json<PhoneInput>,
) -> Result<Json<OtpOutput>, Error> {
    ctx.execute(command::GenerateOtp {
        phone: parse_phone(&input.phone)?,
    })
    .await
    .map(|expires_at| {
        Json(OtpOutput {
            expires_at: expires_at.coerce(),
        })
    })
    .map_err(AsError::into_error)
}

/// Verifies a phone number with a one-time code.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_INPUT` - malformed phone number or code;
/// - `UNAUTHORIZED` - the code is wrong or expired.
#[tracing::instrument(skip_all, fields(http.handler = "otp.verify"))]
pub async fn verify_otp(
    ctx: Context,
    Json(input): Json<VerifyOtpInput>,
) -> Result<Json<VerifiedOutput>, Error> {
    let VerifyOtpInput { phone, code } = input;
    let phone = parse_phone(&phone)?;
    let code = user::otp::Code::new(code)
        .ok_or_else(|| Error::from(InputError::OtpCode))?;

    ctx.execute(command::VerifyOtp {
        phone: phone.clone(),
        code,
    })
    .await
    .map(|()| {
        Json(VerifiedOutput {
            phone: phone.to_string(),
            verified: true,
        })
    })
    .map_err(AsError::into_error)
}

/// Parses a [`user::Email`].
fn parse_email(email: &str) -> Result<user::Email, Error> {
    user::Email::new(email).ok_or_else(|| InputError::Email.into())
}

/// Parses a [`user::Password`].
fn parse_password(
    password: &SecretString,
) -> Result<SecretBox<user::Password>, Error> {
    user::Password::new(password.expose_secret())
        .map(|p| SecretBox::new(Box::new(p)))
        .ok_or_else(|| InputError::Password.into())
}

/// Parses a [`user::Phone`].
fn parse_phone(phone: &str) -> Result<user::Phone, Error> {
    user::Phone::new(phone).ok_or_else(|| InputError::Phone.into())
}

define_error! {
    enum InputError {
        #[code = "INVALID_INPUT"]
        #[status = BAD_REQUEST]
        #[message = "Malformed `email`"]
        Email,

        #[code = "INVALID_INPUT"]
        #[status = BAD_REQUEST]
        #[message = "Unknown `membership_tier`"]
        MembershipTier,

        #[code = "INVALID_INPUT"]
        #[status = BAD_REQUEST]
        #[message = "`code` must consist of 6 digits"]
        OtpCode,

        #[code = "INVALID_INPUT"]
        #[status = BAD_REQUEST]
        #[message = "`password` must be 8 to 72 characters long"]
        Password,

        #[code = "INVALID_INPUT"]
        #[status = BAD_REQUEST]
        #[message = "Malformed `phone`"]
        Phone,
    }
}

define_error! {
    enum UserError {
        #[code = "NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "`User` doesn't exist"]
        NotExists,
    }
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CONFLICT"]
                #[status = CONFLICT]
                #[message = "`email` is occupied by another `User`"]
                EmailOccupied,

                #[code = "INVALID_INPUT"]
                #[status = BAD_REQUEST]
                #[message = "`phone` is not verified"]
                PhoneNotVerified,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmailOccupied(_) => Some(Error::EmailOccupied.into()),
            Self::PasswordHash(_) => None,
            Self::PhoneNotVerified(_) => Some(Error::PhoneNotVerified.into()),
        }
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "UNAUTHORIZED"]
                #[status = UNAUTHORIZED]
                #[message = "Provided credentials don't match any `User`"]
                WrongCredentials,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenEncodeError(_) => None,
            Self::UserNotExists(_) | Self::WrongCredentials => {
                Some(Error::WrongCredentials.into())
            }
        }
    }
}

impl AsError for command::generate_otp::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::verify_otp::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "UNAUTHORIZED"]
                #[status = UNAUTHORIZED]
                #[message = "Invalid or expired one-time code"]
                InvalidOtp,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InvalidOtp => Some(Error::InvalidOtp.into()),
        }
    }
}

#[cfg(test)]
mod spec {
    use service::{command, domain::user};

    use crate::AsError as _;

    use super::CreateUserInput;

    fn input(json: &str) -> CreateUserInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parses_registration() {
        let cmd = input(
            r#"{
                "email": "Renter@Example.com",
                "password": "correct horse",
                "phone": "+380991234567",
                "membership_tier": "VIP"
            }"#,
        )
        .into_command()
        .unwrap();

        assert_eq!(cmd.email.to_string(), "renter@example.com");
        assert_eq!(cmd.membership_tier, user::MembershipTier::Vip);
        assert!(cmd.phone.is_some());
    }

    #[test]
    fn defaults_to_basic_tier() {
        let cmd = input(
            r#"{"email": "renter@example.com", "password": "correct horse"}"#,
        )
        .into_command()
        .unwrap();

        assert_eq!(cmd.membership_tier, user::MembershipTier::Basic);
        assert!(cmd.phone.is_none());
    }

    #[test]
    fn rejects_malformed_fields() {
        for json in [
            r#"{"email": "nope", "password": "correct horse"}"#,
            r#"{"email": "a@b.io", "password": "short"}"#,
            r#"{"email": "a@b.io", "password": "correct horse",
                "phone": "call me"}"#,
            r#"{"email": "a@b.io", "password": "correct horse",
                "membership_tier": "GOLD"}"#,
        ] {
            let err = input(json).into_command().unwrap_err();
            assert_eq!(err.code, "INVALID_INPUT", "{json}");
            assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn maps_wrong_credentials_to_unauthorized() {
        let err = command::create_user_session::ExecutionError::WrongCredentials
            .as_error();

        assert_eq!(err.code, "UNAUTHORIZED");
        assert_eq!(err.status_code, http::StatusCode::UNAUTHORIZED);
    }
}
