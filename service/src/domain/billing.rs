//! [`Billing`] definitions.

use std::time::Duration;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, money::Currency, unit, DateTimeOf, Money};
use rust_decimal::Decimal;
use smart_default::SmartDefault;

use crate::domain::{reservation, user::MembershipTier};

/// Invoice of a [`Reservation`].
///
/// Exactly one [`Billing`] exists for every [`Reservation`].
///
/// [`Reservation`]: crate::domain::Reservation
#[derive(Clone, Debug)]
pub struct Billing {
    /// ID of the [`Reservation`] this [`Billing`] is issued for.
    ///
    /// [`Reservation`]: crate::domain::Reservation
    pub reservation_id: reservation::Id,

    /// Billed amount.
    pub amount: Money,

    /// [`PaymentStatus`] of this [`Billing`].
    pub status: PaymentStatus,

    /// [`DateTime`] when this [`Billing`] was issued.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Billing`] was modified last time.
    pub updated_at: ModificationDateTime,
}

impl Billing {
    /// Releases this [`Billing`] once its [`Reservation`] is cancelled.
    ///
    /// Unpaid amounts are voided, paid ones are refunded.
    ///
    /// [`Reservation`]: crate::domain::Reservation
    pub fn release(&mut self) {
        self.status = match self.status {
            PaymentStatus::Pending | PaymentStatus::Failed => {
                PaymentStatus::Voided
            }
            PaymentStatus::Paid => PaymentStatus::Refunded,
            s @ (PaymentStatus::Refunded | PaymentStatus::Voided) => s,
        };
    }

    /// Indicates whether a payment may still be recorded for this
    /// [`Billing`].
    #[must_use]
    pub const fn is_payable(&self) -> bool {
        matches!(self.status, PaymentStatus::Pending | PaymentStatus::Failed)
    }
}

define_kind! {
    #[doc = "Payment status of a [`Billing`]."]
    enum PaymentStatus {
        #[doc = "Payment is awaited."]
        Pending = 1,

        #[doc = "Payment is received."]
        Paid = 2,

        #[doc = "Payment attempt has failed."]
        Failed = 3,

        #[doc = "Received payment was returned."]
        Refunded = 4,

        #[doc = "Billing was cancelled before any payment."]
        Voided = 5,
    }
}

/// Hourly rental rates per [`MembershipTier`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Rates {
    /// Hourly rate of [`MembershipTier::Basic`].
    #[default(Decimal::TEN)]
    pub basic: Decimal,

    /// Hourly rate of [`MembershipTier::Premium`].
    #[default(Decimal::new(8, 0))]
    pub premium: Decimal,

    /// Hourly rate of [`MembershipTier::Vip`].
    #[default(Decimal::new(5, 0))]
    pub vip: Decimal,

    /// [`Currency`] of the rates.
    #[default(Currency::Usd)]
    pub currency: Currency,
}

impl Rates {
    /// Seconds in one hour.
    const SECONDS_PER_HOUR: u32 = 3600;

    /// Returns the hourly rate of the provided [`MembershipTier`].
    #[must_use]
    pub const fn hourly(&self, tier: MembershipTier) -> Decimal {
        match tier {
            MembershipTier::Basic => self.basic,
            MembershipTier::Premium => self.premium,
            MembershipTier::Vip => self.vip,
        }
    }

    /// Prices a rental of the provided [`Duration`] for the provided
    /// [`MembershipTier`].
    ///
    /// Partial hours are billed proportionally.
    #[must_use]
    pub fn price(&self, tier: MembershipTier, duration: Duration) -> Money {
        let hours = Decimal::from(duration.as_secs())
            / Decimal::from(Self::SECONDS_PER_HOUR);
        Money::new(self.hourly(tier) * hours, self.currency)
    }
}

/// What happens to a [`Billing`] when its rental is completed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CompletionPolicy {
    /// [`Billing`] is marked as [`PaymentStatus::Paid`].
    Settle,

    /// [`Billing`] status is left untouched until the payment is confirmed
    /// explicitly.
    #[default]
    KeepPending,
}

/// [`DateTime`] when a [`Billing`] was issued.
pub type CreationDateTime = DateTimeOf<(Billing, unit::Creation)>;

/// [`DateTime`] when a [`Billing`] was modified.
pub type ModificationDateTime = DateTimeOf<(Billing, unit::Modification)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{money::Currency, DateTime, Money};
    use rust_decimal::Decimal;

    use crate::domain::{reservation, user::MembershipTier};

    use super::{Billing, PaymentStatus, Rates};

    fn billing(status: PaymentStatus) -> Billing {
        Billing {
            reservation_id: reservation::Id::new(),
            amount: Money::zero(Currency::Usd),
            status,
            created_at: DateTime::now().coerce(),
            updated_at: DateTime::now().coerce(),
        }
    }

    #[test]
    fn prices_by_tier() {
        let rates = Rates::default();
        let two_hours = Duration::from_secs(2 * 3600);

        assert_eq!(
            rates.price(MembershipTier::Basic, two_hours),
            Money::new(Decimal::new(20, 0), Currency::Usd),
        );
        assert_eq!(
            rates.price(MembershipTier::Premium, two_hours),
            Money::new(Decimal::new(16, 0), Currency::Usd),
        );
        assert_eq!(
            rates.price(MembershipTier::Vip, two_hours),
            Money::new(Decimal::new(10, 0), Currency::Usd),
        );
    }

    #[test]
    fn prices_partial_hours() {
        let rates = Rates::default();

        assert_eq!(
            rates
                .price(MembershipTier::Basic, Duration::from_secs(90 * 60))
                .amount,
            Decimal::new(1500, 2),
        );
        // 10 minutes of 8/h is 1.3333...
        assert_eq!(
            rates
                .price(MembershipTier::Premium, Duration::from_secs(10 * 60))
                .amount,
            Decimal::new(133, 2),
        );
    }

    #[test]
    fn release_voids_unpaid_and_refunds_paid() {
        for (from, to) in [
            (PaymentStatus::Pending, PaymentStatus::Voided),
            (PaymentStatus::Failed, PaymentStatus::Voided),
            (PaymentStatus::Paid, PaymentStatus::Refunded),
            (PaymentStatus::Refunded, PaymentStatus::Refunded),
            (PaymentStatus::Voided, PaymentStatus::Voided),
        ] {
            let mut b = billing(from);
            b.release();
            assert_eq!(b.status, to, "releasing {from}");
        }
    }
}
