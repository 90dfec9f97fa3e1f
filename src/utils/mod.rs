pub mod caching;
pub mod format;
pub mod logging;

pub use caching::*;
pub use format::*;
pub use logging::*;
