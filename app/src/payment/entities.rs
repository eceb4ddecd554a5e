//! Mock crypto payments for premium plans. A payment starts out pending and is resolved by
//! polling: once [`CONFIRMATION_DELAY`] has passed every poll has a chance of confirming it, and
//! once the payment window closes it expires. Both outcomes are final.

use crate::auth;
use crate::concurrency;
use crate::pricing::{self, Currency, Plan, Wallets};
use crate::seconds::Seconds;
use crate::user;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Minimum age of a payment before it can be confirmed.
pub const CONFIRMATION_DELAY: Seconds = Seconds(10);
/// Rolls above this value confirm a payment.
pub const CONFIRMATION_THRESHOLD: f64 = 0.3;
/// Confirmations reported for a confirmed payment.
pub const REQUIRED_CONFIRMATIONS: u32 = 3;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Pricing(#[from] pricing::Error),
    #[error("payment not found")]
    NotFound,
    #[error("{0:?}")]
    ConcurrencyConflict(#[from] concurrency::ConflictError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Id(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Confirmed { timestamp: DateTime<Utc> },
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Confirmed,
    Expired,
}

#[derive(Debug, Clone)]
pub struct Payment {
    pub id: Id,
    pub user_id: user::Id,
    pub plan: Plan,
    pub currency: Currency,
    pub usd_amount: f64,
    pub crypto_amount: f64,
    pub address: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    pub status: Status,
}

impl Payment {
    pub(crate) fn create(
        grant: &auth::UserGrant,
        wallets: &Wallets,
        plan: Plan,
        currency: Currency,
        now: DateTime<Utc>,
    ) -> Result<Self, Error> {
        let address = wallets.address(currency)?.to_owned();
        Ok(Self {
            id: Id(Uuid::new_v4()),
            user_id: grant.user_id,
            plan,
            currency,
            usd_amount: plan.usd_price(),
            crypto_amount: pricing::crypto_amount(plan, currency),
            address,
            created: now,
            expires: now + Seconds::thirty_minutes().duration(),
            status: Status::Pending,
        })
    }

    /// Advances a pending payment. `roll` is a uniform sample from `[0, 1)`. Expiry wins over
    /// confirmation, and payments that are no longer pending never change.
    pub(crate) fn poll(&mut self, now: DateTime<Utc>, roll: f64) -> Transition {
        if self.status != Status::Pending {
            return Transition::Unchanged;
        }
        if now >= self.expires {
            self.status = Status::Expired;
            Transition::Expired
        } else if now - self.created >= CONFIRMATION_DELAY.duration()
            && roll > CONFIRMATION_THRESHOLD
        {
            self.status = Status::Confirmed { timestamp: now };
            Transition::Confirmed
        } else {
            Transition::Unchanged
        }
    }

    pub fn confirmations(&self) -> u32 {
        match self.status {
            Status::Confirmed { .. } => REQUIRED_CONFIRMATIONS,
            Status::Pending | Status::Expired => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn wallets() -> Wallets {
        Wallets {
            btc: Some("bc1qexample".to_owned()),
            eth: None,
            usdt: None,
        }
    }

    fn pending() -> Payment {
        let grant = auth::UserGrant {
            user_id: user::Id(Uuid::from_u128(1)),
        };
        Payment::create(&grant, &wallets(), Plan::Monthly, Currency::Btc, now()).unwrap()
    }

    #[test]
    fn create_quotes_the_plan() {
        let payment = pending();
        assert_eq!(payment.status, Status::Pending);
        assert_eq!(payment.address, "bc1qexample");
        assert_eq!(payment.usd_amount, 9.99);
        assert_eq!(payment.crypto_amount, 0.00015369);
        assert_eq!(payment.expires - payment.created, Duration::minutes(30));
        assert_eq!(payment.confirmations(), 0);
    }

    #[test]
    fn create_requires_a_wallet() {
        let grant = auth::UserGrant {
            user_id: user::Id(Uuid::from_u128(1)),
        };
        let result = Payment::create(&grant, &wallets(), Plan::Yearly, Currency::Eth, now());
        assert!(matches!(
            result,
            Err(Error::Pricing(pricing::Error::WalletNotConfigured(Currency::Eth)))
        ));
    }

    #[test]
    fn young_payments_stay_pending() {
        let mut payment = pending();
        let at = now() + Duration::seconds(9);
        assert_eq!(payment.poll(at, 0.99), Transition::Unchanged);
        assert_eq!(payment.status, Status::Pending);
    }

    #[test]
    fn low_rolls_stay_pending() {
        let mut payment = pending();
        let at = now() + Duration::seconds(10);
        assert_eq!(payment.poll(at, 0.3), Transition::Unchanged);
        assert_eq!(payment.poll(at, 0.0), Transition::Unchanged);
        assert_eq!(payment.status, Status::Pending);
    }

    #[test]
    fn high_rolls_confirm_after_the_delay() {
        let mut payment = pending();
        let at = now() + Duration::seconds(10);
        assert_eq!(payment.poll(at, 0.31), Transition::Confirmed);
        assert_eq!(payment.status, Status::Confirmed { timestamp: at });
        assert_eq!(payment.confirmations(), REQUIRED_CONFIRMATIONS);
    }

    #[test]
    fn confirmation_happens_once() {
        let mut payment = pending();
        let at = now() + Duration::seconds(15);
        assert_eq!(payment.poll(at, 0.9), Transition::Confirmed);
        let later = at + Duration::minutes(45);
        assert_eq!(payment.poll(later, 0.9), Transition::Unchanged);
        assert_eq!(payment.status, Status::Confirmed { timestamp: at });
    }

    #[test]
    fn expiry_wins_over_confirmation() {
        let mut payment = pending();
        let at = now() + Duration::minutes(30);
        assert_eq!(payment.poll(at, 0.99), Transition::Expired);
        assert_eq!(payment.status, Status::Expired);
        assert_eq!(payment.poll(at, 0.99), Transition::Unchanged);
        assert_eq!(payment.confirmations(), 0);
    }
}
