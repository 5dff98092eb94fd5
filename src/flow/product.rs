use std::fmt;
use std::str::FromStr;

use kioskflow_types::MachineStatus;

use crate::error::KioskError;
use crate::scan::AssetFamily;

/// Selects the per-asset fields of a [`MachineStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmountField {
    Matic,
    Eth,
    Sats,
}

impl AmountField {
    /// Amount the current deposit would buy.
    pub fn receivable(self, status: &MachineStatus) -> Option<f64> {
        match self {
            Self::Matic => status.matic_receivable,
            Self::Eth => status.eth_receivable,
            Self::Sats => status.sats_receivable,
        }
    }

    /// Units of the asset per CAD.
    pub fn rate(self, status: &MachineStatus) -> Option<f64> {
        match self {
            Self::Matic => status.matic_per_cad,
            Self::Eth => status.eth_per_cad,
            Self::Sats => status.sats_per_cad,
        }
    }
}

/// Binding for one asset/chain instance of the scan, insert, send, receipt
/// flow. Resolved when the product button is pressed and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leg {
    /// Configuration key
    pub key: &'static str,
    /// Ticker shown on screen
    pub label: &'static str,
    pub chain: &'static str,
    pub family: AssetFamily,
    /// Backend path that settles the deposit for this leg
    pub finalize_endpoint: &'static str,
    pub amount_field: AmountField,
    pub explorer_tx_base: Option<&'static str>,
}

pub const POLYGON_MATIC: Leg = Leg {
    key: "matic",
    label: "MATIC",
    chain: "Polygon",
    family: AssetFamily::Evm,
    finalize_endpoint: "deposit/end/matic",
    amount_field: AmountField::Matic,
    explorer_tx_base: Some("https://polygonscan.com/tx/"),
};

pub const ETHEREUM_ETH: Leg = Leg {
    key: "eth",
    label: "ETH",
    chain: "Ethereum",
    family: AssetFamily::Evm,
    finalize_endpoint: "deposit/end/eth",
    amount_field: AmountField::Eth,
    explorer_tx_base: Some("https://etherscan.io/tx/"),
};

pub const LIGHTNING_SATS: Leg = Leg {
    key: "lightning",
    label: "SATS",
    chain: "Lightning",
    family: AssetFamily::Lightning,
    finalize_endpoint: "deposit/end/lightning",
    amount_field: AmountField::Sats,
    explorer_tx_base: None,
};

pub const MEMBERSHIP_FINALIZE_ENDPOINT: &str = "deposit/end/membership";

impl Leg {
    pub fn explorer_link(&self, tx_hash: &str) -> Option<String> {
        self.explorer_tx_base
            .map(|base| format!("{}{}", base, tx_hash))
    }
}

/// What the customer chose on the main screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    BuyAsset(Leg),
    ExtendMembership,
}

impl Product {
    pub fn key(&self) -> &'static str {
        match self {
            Self::BuyAsset(leg) => leg.key,
            Self::ExtendMembership => "membership",
        }
    }

    pub fn leg(&self) -> Option<&Leg> {
        match self {
            Self::BuyAsset(leg) => Some(leg),
            Self::ExtendMembership => None,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuyAsset(leg) => write!(f, "BUY {} ({})", leg.label, leg.chain),
            Self::ExtendMembership => write!(f, "EXTEND MEMBERSHIP"),
        }
    }
}

impl FromStr for Product {
    type Err = KioskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "matic" => Ok(Self::BuyAsset(POLYGON_MATIC)),
            "eth" => Ok(Self::BuyAsset(ETHEREUM_ETH)),
            "lightning" => Ok(Self::BuyAsset(LIGHTNING_SATS)),
            "membership" => Ok(Self::ExtendMembership),
            other => Err(KioskError::UnknownProduct(other.to_string())),
        }
    }
}
