//! JSON representations of scalar values.

use common::{money::Currency, DateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service::domain::reservation;

use crate::define_error;

/// Amount of money in some [`Currency`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Money {
    /// Decimal amount, represented as a string.
    pub amount: Decimal,

    /// [`Currency`] code.
    pub currency: Currency,
}

impl From<common::Money> for Money {
    fn from(money: common::Money) -> Self {
        let common::Money { amount, currency } = money;
        Self { amount, currency }
    }
}

impl From<Money> for common::Money {
    fn from(money: Money) -> Self {
        let Money { amount, currency } = money;
        Self::new(amount, currency)
    }
}

/// Builds a [`reservation::Period`] out of the provided `start_time` and
/// `end_time`.
///
/// # Errors
///
/// If `start_time` is not strictly before `end_time`.
pub fn period(
    start_time: DateTime,
    end_time: DateTime,
) -> Result<reservation::Period, crate::Error> {
    reservation::Period::new(start_time.coerce(), end_time.coerce())
        .ok_or_else(|| PeriodError::Empty.into())
}

define_error! {
    enum PeriodError {
        #[code = "INVALID_INPUT"]
        #[status = BAD_REQUEST]
        #[message = "`start_time` must be strictly before `end_time`"]
        Empty,
    }
}

#[cfg(test)]
mod spec {
    use common::{money::Currency, DateTime};
    use rust_decimal::Decimal;

    use super::{period, Money};

    #[test]
    fn money_amount_is_a_string() {
        let money: Money = serde_json::from_str(
            r#"{"amount": "12.345", "currency": "EUR"}"#,
        )
        .unwrap();
        assert_eq!(money.currency, Currency::Eur);

        let money = common::Money::from(money);
        assert_eq!(money.amount, Decimal::new(1235, 2));
        assert_eq!(
            serde_json::to_value(Money::from(money)).unwrap(),
            serde_json::json!({"amount": "12.35", "currency": "EUR"}),
        );
    }

    #[test]
    fn rejects_unknown_currency() {
        assert!(serde_json::from_str::<Money>(
            r#"{"amount": "1", "currency": "BTC"}"#,
        )
        .is_err());
    }

    #[test]
    fn rejects_empty_periods() {
        let start = DateTime::from_rfc3339("2100-01-01T10:00:00Z").unwrap();
        let end = DateTime::from_rfc3339("2100-01-01T12:00:00Z").unwrap();

        assert!(period(start, end).is_ok());

        let err = period(end, start).unwrap_err();
        assert_eq!(err.code, "INVALID_INPUT");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert!(period(start, start).is_err());
    }
}
