use crate::error::{PaymentError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of decimal places quoted for crypto amounts.
pub const AMOUNT_SCALE: u32 = 8;

/// A membership subscription level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Sapphire,
    Ruby,
    Diamond,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Sapphire, Tier::Ruby, Tier::Diamond];

    /// Monthly price in USD.
    pub fn price_usd(self) -> Decimal {
        match self {
            Tier::Sapphire => Decimal::ZERO,
            Tier::Ruby => dec!(10),
            Tier::Diamond => dec!(25),
        }
    }

    pub fn is_free(self) -> bool {
        self.price_usd().is_zero()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Sapphire => "sapphire",
            Tier::Ruby => "ruby",
            Tier::Diamond => "diamond",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Tier::Sapphire => "Sapphire",
            Tier::Ruby => "Ruby",
            Tier::Diamond => "Diamond",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sapphire" => Ok(Tier::Sapphire),
            "ruby" => Ok(Tier::Ruby),
            "diamond" => Ok(Tier::Diamond),
            other => Err(PaymentError::ValidationError(format!(
                "Unknown membership tier '{}'",
                other
            ))),
        }
    }
}

/// A cryptocurrency accepted for membership payments.
///
/// Rates and receiving addresses are static: there is no price feed and no
/// per-payment address derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cryptocurrency {
    Bitcoin,
    Ethereum,
    Litecoin,
    Usdt,
}

impl Cryptocurrency {
    pub const ALL: [Cryptocurrency; 4] = [
        Cryptocurrency::Bitcoin,
        Cryptocurrency::Ethereum,
        Cryptocurrency::Litecoin,
        Cryptocurrency::Usdt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Cryptocurrency::Bitcoin => "bitcoin",
            Cryptocurrency::Ethereum => "ethereum",
            Cryptocurrency::Litecoin => "litecoin",
            Cryptocurrency::Usdt => "usdt",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Cryptocurrency::Bitcoin => "BTC",
            Cryptocurrency::Ethereum => "ETH",
            Cryptocurrency::Litecoin => "LTC",
            Cryptocurrency::Usdt => "USDT",
        }
    }

    pub fn network(self) -> &'static str {
        match self {
            Cryptocurrency::Bitcoin => "Bitcoin",
            Cryptocurrency::Ethereum => "Ethereum",
            Cryptocurrency::Litecoin => "Litecoin",
            Cryptocurrency::Usdt => "Ethereum (ERC-20)",
        }
    }

    /// USD value of one unit.
    pub fn usd_rate(self) -> Decimal {
        match self {
            Cryptocurrency::Bitcoin => dec!(65000),
            Cryptocurrency::Ethereum => dec!(3500),
            Cryptocurrency::Litecoin => dec!(100),
            Cryptocurrency::Usdt => dec!(1),
        }
    }

    pub fn required_confirmations(self) -> u32 {
        match self {
            Cryptocurrency::Bitcoin => 1,
            Cryptocurrency::Ethereum => 12,
            Cryptocurrency::Litecoin => 6,
            Cryptocurrency::Usdt => 12,
        }
    }

    pub fn payment_address(self) -> &'static str {
        match self {
            Cryptocurrency::Bitcoin => "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh",
            Cryptocurrency::Ethereum => "0x742d35Cc6634C0532925a3b844Bc454e4438f44e",
            Cryptocurrency::Litecoin => "ltc1qg82tmqsnqkz8kfy2c8p3z5smm0jm5ek6n3y2sx",
            Cryptocurrency::Usdt => "0x8894E0a0c962CB723c1976a4421c95949bE2D4E3",
        }
    }

    fn uri_scheme(self) -> &'static str {
        match self {
            Cryptocurrency::Bitcoin => "bitcoin",
            Cryptocurrency::Ethereum | Cryptocurrency::Usdt => "ethereum",
            Cryptocurrency::Litecoin => "litecoin",
        }
    }

    /// Wallet URI encoded into the QR code shown to the payer.
    pub fn payment_uri(self, amount: Decimal) -> String {
        format!(
            "{}:{}?amount={}",
            self.uri_scheme(),
            self.payment_address(),
            amount
        )
    }
}

impl fmt::Display for Cryptocurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cryptocurrency {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bitcoin" => Ok(Cryptocurrency::Bitcoin),
            "ethereum" => Ok(Cryptocurrency::Ethereum),
            "litecoin" => Ok(Cryptocurrency::Litecoin),
            "usdt" => Ok(Cryptocurrency::Usdt),
            other => Err(PaymentError::ValidationError(format!(
                "Unsupported cryptocurrency '{}'",
                other
            ))),
        }
    }
}

/// Converts a tier price into an amount of `crypto`, rounded half away from zero
/// to [`AMOUNT_SCALE`] places.
pub fn quote(tier: Tier, crypto: Cryptocurrency) -> Result<Decimal> {
    if tier.is_free() {
        return Err(PaymentError::ValidationError(format!(
            "The {} tier is free and does not require payment",
            tier.display_name()
        )));
    }

    let amount = tier
        .price_usd()
        .checked_div(crypto.usd_rate())
        .ok_or_else(|| PaymentError::internal("Exchange rate produced an invalid amount"))?;

    Ok(amount
        .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
        .normalize())
}
