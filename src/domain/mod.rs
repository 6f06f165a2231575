pub mod asset;
pub mod events;
pub mod records;

pub use asset::*;
pub use events::*;
pub use records::*;
