pub mod bitmex;
pub mod deserialize;
pub mod importer;
pub mod okx;
pub mod poloniex;


pub use bitmex::*;
pub use deserialize::*;
pub use importer::*;
pub use okx::*;
pub use poloniex::*;
