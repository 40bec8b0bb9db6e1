//! [`Otp`] definitions.

use std::fmt;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rand::Rng as _;

use crate::domain::user::Phone;

/// One-time password sent to a [`Phone`] to verify it.
#[derive(Clone, Debug)]
pub struct Otp {
    /// [`Phone`] this [`Otp`] was issued for.
    ///
    /// At most one [`Otp`] is outstanding per [`Phone`].
    pub phone: Phone,

    /// Secret [`Code`] of this [`Otp`].
    pub code: Code,

    /// [`DateTime`] after which this [`Otp`] is no longer accepted.
    pub expires_at: ExpirationDateTime,
}

impl Otp {
    /// Indicates whether this [`Otp`] is still accepted at the provided
    /// moment.
    #[must_use]
    pub fn is_alive_at(&self, now: ExpirationDateTime) -> bool {
        now < self.expires_at
    }
}

/// Six-digit code of an [`Otp`].
#[derive(AsRef, Clone, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Code(String);

impl Code {
    /// Number of digits in a [`Code`].
    const DIGITS: usize = 6;

    /// Generates a new random [`Code`].
    #[must_use]
    pub fn generate() -> Self {
        let n = rand::thread_rng().gen_range(0..1_000_000);
        Self(format!("{n:0width$}", width = Self::DIGITS))
    }

    /// Creates a new [`Code`] if the given `code` is valid.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        Self::check(&code).then_some(Self(code))
    }

    /// Checks whether the given `code` is a valid [`Code`].
    fn check(code: impl AsRef<str>) -> bool {
        let code = code.as_ref();
        code.len() == Self::DIGITS && code.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Code(******)")
    }
}

/// [`DateTime`] when an [`Otp`] expires.
pub type ExpirationDateTime = DateTimeOf<(Otp, unit::Expiration)>;

#[cfg(test)]
mod spec {
    use super::Code;

    #[test]
    fn generates_six_digits() {
        for _ in 0..100 {
            let code = Code::generate();
            assert_eq!(code.as_ref().len(), 6);
            assert!(Code::new(code.as_ref()).is_some());
        }
    }

    #[test]
    fn validates_code() {
        assert!(Code::new("012345").is_some());
        assert!(Code::new("12345").is_none());
        assert!(Code::new("12345a").is_none());
        assert!(Code::new("1234567").is_none());
    }

    #[test]
    fn hides_code_in_debug() {
        let code = Code::new("123456").unwrap();

        assert!(!format!("{code:?}").contains("123456"));
    }
}
