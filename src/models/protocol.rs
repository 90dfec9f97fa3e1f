use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of protocols the tracker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "AAVE")]
    Aave,
    #[serde(rename = "UNISWAP_V3")]
    UniswapV3,
    #[serde(rename = "CURVE")]
    Curve,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Aave, Protocol::UniswapV3, Protocol::Curve];

    /// Wire identifier, also used in cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Aave => "AAVE",
            Protocol::UniswapV3 => "UNISWAP_V3",
            Protocol::Curve => "CURVE",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Protocol::Aave => "Aave",
            Protocol::UniswapV3 => "Uniswap V3",
            Protocol::Curve => "Curve",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown protocol: {0}")]
pub struct UnknownProtocol(pub String);

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aave" | "aave_v3" | "aave-v3" => Ok(Protocol::Aave),
            "uniswap" | "uniswap_v3" | "uniswap-v3" | "uniswapv3" => Ok(Protocol::UniswapV3),
            "curve" => Ok(Protocol::Curve),
            other => Err(UnknownProtocol(other.to_string())),
        }
    }
}

/// Outcome of one protocol's fetch for one wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolStatus {
    /// Reads succeeded and returned at least one position.
    Ok,
    /// Reads succeeded, the wallet holds nothing there.
    Empty,
    /// Reads failed; the empty result says nothing about the wallet.
    Failed,
    /// No reads were made because fixture data was served.
    Skipped,
}
