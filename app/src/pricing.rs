//! Premium plans, the crypto currencies they can be paid in, and the wallets that receive them.
//! Exchange rates are fixed placeholders; nothing here talks to a price feed.

use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("unknown plan {0:?}")]
    UnknownPlan(String),
    #[error("unsupported currency {0:?}")]
    UnsupportedCurrency(String),
    #[error("no wallet configured for {0}")]
    WalletNotConfigured(Currency),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Monthly,
    Yearly,
}

impl Plan {
    pub fn usd_price(self) -> f64 {
        match self {
            Plan::Monthly => 9.99,
            Plan::Yearly => 99.99,
        }
    }

    /// In-app tokens credited when a payment for this plan is confirmed.
    pub fn tokens(self) -> i64 {
        match self {
            Plan::Monthly => 500,
            Plan::Yearly => 7500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Monthly => "monthly",
            Plan::Yearly => "yearly",
        }
    }
}

impl FromStr for Plan {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(Plan::Monthly),
            "yearly" => Ok(Plan::Yearly),
            _ => Err(Error::UnknownPlan(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Btc,
    Eth,
    Usdt,
}

impl Currency {
    fn usd_rate(self) -> f64 {
        match self {
            Currency::Btc => 65_000.0,
            Currency::Eth => 3_500.0,
            Currency::Usdt => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Currency::Btc => "BTC",
            Currency::Eth => "ETH",
            Currency::Usdt => "USDT",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BTC" => Ok(Currency::Btc),
            "ETH" => Ok(Currency::Eth),
            "USDT" => Ok(Currency::Usdt),
            _ => Err(Error::UnsupportedCurrency(s.to_owned())),
        }
    }
}

/// How much of `currency` pays for `plan`, rounded to 8 decimal places.
pub fn crypto_amount(plan: Plan, currency: Currency) -> f64 {
    let amount = plan.usd_price() / currency.usd_rate();
    (amount * 1e8).round() / 1e8
}

/// Receiving addresses, one per currency.
#[derive(Debug, Clone, Default)]
pub struct Wallets {
    pub btc: Option<String>,
    pub eth: Option<String>,
    pub usdt: Option<String>,
}

impl Wallets {
    pub fn address(&self, currency: Currency) -> Result<&str, Error> {
        let address = match currency {
            Currency::Btc => &self.btc,
            Currency::Eth => &self.eth,
            Currency::Usdt => &self.usdt,
        };
        address
            .as_deref()
            .filter(|address| !address.trim().is_empty())
            .ok_or(Error::WalletNotConfigured(currency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plans_and_currencies_loosely() {
        assert_eq!("Monthly".parse::<Plan>(), Ok(Plan::Monthly));
        assert_eq!(" yearly ".parse::<Plan>(), Ok(Plan::Yearly));
        assert_eq!(
            "weekly".parse::<Plan>(),
            Err(Error::UnknownPlan("weekly".to_owned()))
        );
        assert_eq!("btc".parse::<Currency>(), Ok(Currency::Btc));
        assert_eq!("USDT".parse::<Currency>(), Ok(Currency::Usdt));
        assert!("doge".parse::<Currency>().is_err());
    }

    #[test]
    fn amounts_are_rounded_to_eight_decimals() {
        assert_eq!(crypto_amount(Plan::Monthly, Currency::Usdt), 9.99);
        assert_eq!(crypto_amount(Plan::Monthly, Currency::Btc), 0.00015369);
        assert_eq!(crypto_amount(Plan::Yearly, Currency::Eth), 0.02856857);
    }

    #[test]
    fn missing_or_blank_wallets_are_reported() {
        let wallets = Wallets {
            btc: Some("bc1qexample".to_owned()),
            eth: Some("  ".to_owned()),
            usdt: None,
        };
        assert_eq!(wallets.address(Currency::Btc), Ok("bc1qexample"));
        assert_eq!(
            wallets.address(Currency::Eth),
            Err(Error::WalletNotConfigured(Currency::Eth))
        );
        assert_eq!(
            wallets.address(Currency::Usdt),
            Err(Error::WalletNotConfigured(Currency::Usdt))
        );
    }
}
