pub mod portfolio;
pub mod position;
pub mod price;
pub mod protocol;

pub use portfolio::*;
pub use position::*;
pub use price::*;
pub use protocol::*;
