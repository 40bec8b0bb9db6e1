//! [`Money`]-related definitions.

use std::{fmt, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy};

use crate::define_kind;

/// Amount of money in some [`Currency`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Money {
    /// Amount of this [`Money`].
    pub amount: Decimal,

    /// [`Currency`] of this amount.
    pub currency: Currency,
}

impl Money {
    /// Number of decimal places [`Money`] is stored with.
    pub const SCALE: u32 = 2;

    /// Creates a new [`Money`] rounded to [`Money::SCALE`] decimal places.
    ///
    /// Midpoints are rounded away from zero.
    #[must_use]
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp_with_strategy(
                Self::SCALE,
                RoundingStrategy::MidpointAwayFromZero,
            ),
            currency,
        }
    }

    /// Creates a zero [`Money`] amount in the provided [`Currency`].
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Indicates whether this [`Money`] amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { amount, currency } = self;
        write!(f, "{}{currency}", amount.normalize())
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 4 || !s.is_char_boundary(s.len() - 3) {
            return Err("too short");
        }

        let (amount, currency) = s.split_at(s.len() - 3);
        let amount = Decimal::from_str(amount).map_err(|_| "invalid amount")?;
        let currency =
            Currency::from_str(currency).map_err(|_| "invalid currency")?;

        Ok(Self::new(amount, currency))
    }
}

define_kind! {
    #[doc = "Currency of a [`Money`] amount."]
    enum Currency {
        #[doc = "US Dollar."]
        Usd = 1,

        #[doc = "Euro."]
        Eur = 2,

        #[doc = "Pound sterling."]
        Gbp = 3,
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::{Currency, Money};

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn rounds_to_cents() {
        assert_eq!(
            Money::new(decimal("13.335"), Currency::Usd).amount,
            decimal("13.34"),
        );
        assert_eq!(
            Money::new(decimal("13.334"), Currency::Usd).amount,
            decimal("13.33"),
        );
        assert_eq!(
            Money::new(decimal("-0.005"), Currency::Eur).amount,
            decimal("-0.01"),
        );
    }

    #[test]
    fn from_str() {
        assert_eq!(
            Money::from_str("123.45USD").unwrap(),
            Money {
                amount: decimal("123.45"),
                currency: Currency::Usd,
            },
        );
        assert_eq!(
            Money::from_str("7GBP").unwrap(),
            Money {
                amount: decimal("7"),
                currency: Currency::Gbp,
            },
        );

        assert!(Money::from_str("123.45").is_err());
        assert!(Money::from_str("123.45Us").is_err());
        assert!(Money::from_str("123.45Usdollar").is_err());
        assert!(Money::from_str("12€").is_err());
    }

    #[test]
    fn to_string() {
        assert_eq!(
            Money::new(decimal("123.45"), Currency::Eur).to_string(),
            "123.45EUR",
        );
        assert_eq!(
            Money::new(decimal("80.00"), Currency::Usd).to_string(),
            "80USD",
        );
        assert_eq!(
            Money::new(decimal("2.50"), Currency::Gbp).to_string(),
            "2.5GBP",
        );
    }

    #[test]
    fn negativity() {
        assert!(Money::new(decimal("-1"), Currency::Usd).is_negative());
        assert!(!Money::new(decimal("-0"), Currency::Usd).is_negative());
        assert!(!Money::zero(Currency::Usd).is_negative());
    }
}
