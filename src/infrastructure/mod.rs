pub mod messages;
pub mod price_oracle;
pub mod sink;

pub use messages::*;
pub use price_oracle::*;
pub use sink::*;
