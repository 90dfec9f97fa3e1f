use alloy::primitives::{address, Address};
use alloy::sol;

/// AaveProtocolDataProvider on Arbitrum One.
pub const POOL_DATA_PROVIDER: Address = address!("145dE30c929a065582Bfc8e9C1a8B0b8C3c3b5C3");
/// Aave V3 Pool on Arbitrum One.
pub const POOL: Address = address!("794a61358D6845594F94dc1DB02A252b5b4814aD");

sol! {
    interface IPoolDataProvider {
        function getUserReserveData(address asset, address user) external view returns (
            uint256 currentATokenBalance,
            uint256 currentStableDebt,
            uint256 currentVariableDebt,
            uint256 principalStableDebt,
            uint256 scaledVariableDebt,
            uint256 stableBorrowRate,
            uint256 liquidityRate,
            uint40 stableRateLastUpdated,
            bool usageAsCollateralEnabled
        );

        function getReserveData(address asset) external view returns (
            uint256 unbacked,
            uint256 accruedToTreasuryScaled,
            uint256 totalAToken,
            uint256 totalStableDebt,
            uint256 totalVariableDebt,
            uint256 liquidityRate,
            uint256 variableBorrowRate,
            uint256 stableBorrowRate,
            uint256 averageStableBorrowRate,
            uint256 liquidityIndex,
            uint256 variableBorrowIndex,
            uint40 lastUpdateTimestamp
        );
    }
}
