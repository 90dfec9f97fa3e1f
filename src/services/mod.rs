pub mod environment;
pub mod fixtures;
pub mod price_oracle;
pub mod summarizer;
pub mod yield_tracker;

pub use environment::{ContractInfo, NetworkEnvironment, NetworkKind, WalletProbe};
pub use price_oracle::PriceOracle;
pub use summarizer::{summarize, summarize_at};
pub use yield_tracker::YieldTracker;
